use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One persisted chat turn.
///
/// `confidence_score` stays on the 0..=100 scale the chat model reports,
/// unlike [`super::DiagnosisRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChatExchange {
    pub id: String,
    pub session_id: String,
    pub patient_id: Option<String>,
    pub user_message: String,
    pub response_english: String,
    pub response_arabic: String,
    pub is_medical: bool,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

/// Model-facing portion of a chat turn, before it is bound to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub response_english: String,
    pub response_arabic: String,
    pub is_medical: bool,
    pub confidence_score: f64,
}

impl ChatExchange {
    pub fn new(
        session_id: String,
        patient_id: Option<String>,
        user_message: String,
        reply: ChatReply,
    ) -> Self {
        Self {
            id: nanoid::nanoid!(),
            session_id,
            patient_id,
            user_message,
            response_english: reply.response_english,
            response_arabic: reply.response_arabic,
            is_medical: reply.is_medical,
            confidence_score: reply.confidence_score,
            // Microseconds are all the database keeps.
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}
