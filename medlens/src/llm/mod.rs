mod api;
pub mod prompts;
mod provider;

pub use api::{ImageInput, LlmApiClient};
pub use provider::{LlmBackend, LlmProvider};
