mod chat;
mod diagnosis;
mod pagination;

pub use chat::*;
pub use diagnosis::*;
pub use pagination::*;
