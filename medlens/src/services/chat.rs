use std::sync::Arc;

use tracing::{debug, info};

use crate::analysis::{extract_chat_reply, is_medical_topic, refusal_reply};
use crate::db::DatabaseBackend;
use crate::error::{MedlensError, Result};
use crate::llm::{prompts::CHAT_SYSTEM_PROMPT, LlmProvider};
use crate::models::{ChatExchange, ChatHistoryFilter};

#[derive(Clone)]
pub struct ChatService {
    llm: LlmProvider,
    db: Arc<dyn DatabaseBackend>,
}

impl ChatService {
    pub fn new(llm: LlmProvider, db: Arc<dyn DatabaseBackend>) -> Self {
        Self { llm, db }
    }

    /// Answer one chat turn and persist it.
    ///
    /// Messages that mention no medical keyword get the fixed bilingual
    /// refusal without the model being called. Refusals are stored like any
    /// other turn.
    pub async fn respond(
        &self,
        message: &str,
        patient_id: Option<String>,
        session_id: Option<String>,
    ) -> Result<ChatExchange> {
        let message = message.trim();
        if message.is_empty() {
            return Err(MedlensError::Validation(
                "Message cannot be empty".to_string(),
            ));
        }

        let session_id = session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let reply = if is_medical_topic(message) {
            let raw = self
                .llm
                .complete(message, Some(CHAT_SYSTEM_PROMPT))
                .await?;
            extract_chat_reply(&raw)
        } else {
            debug!(%session_id, "Chat message outside medical scope, refusing");
            refusal_reply()
        };

        let exchange = ChatExchange::new(session_id, patient_id, message.to_string(), reply);
        self.db.create_chat_message(&exchange).await?;

        info!(
            id = %exchange.id,
            session_id = %exchange.session_id,
            is_medical = exchange.is_medical,
            "Chat turn stored"
        );
        Ok(exchange)
    }

    pub async fn history(&self, filter: &ChatHistoryFilter) -> Result<(Vec<ChatExchange>, u64)> {
        self.db.list_chat_messages(filter).await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<u64> {
        let deleted = self.db.delete_chat_session(session_id).await?;
        if deleted == 0 {
            return Err(MedlensError::NotFound(format!(
                "Chat session {session_id} not found"
            )));
        }
        info!(%session_id, deleted, "Chat session deleted");
        Ok(deleted)
    }
}
