mod cloudinary;
mod local;
mod provider;

pub use cloudinary::CloudinaryClient;
pub use local::LocalStore;
pub use provider::StorageProvider;
