mod chat_messages;
mod diagnoses;

pub use chat_messages::ChatMessageRepository;
pub use diagnoses::DiagnosisRepository;
