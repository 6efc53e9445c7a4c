mod chat;
mod diagnosis;

pub use chat::ChatService;
pub use diagnosis::{
    file_extension, file_too_large_message, invalid_file_type_message, validate_upload,
    DiagnosisService, ImageUpload,
};
