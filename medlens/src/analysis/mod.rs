//! Reply normalization for the image-analysis and chat features.
//!
//! Everything here is a pure function of the reply text: no I/O.

pub mod classifier;
pub mod confidence;
pub mod extractor;

pub use classifier::{is_medical_topic, refusal_reply};
pub use confidence::{confidence_from_text, normalize_confidence};
pub use extractor::{extract_chat_reply, extract_diagnosis, extract_json_object};
