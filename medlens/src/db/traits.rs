use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChatExchange, ChatHistoryFilter, DiagnosisFilter, StoredDiagnosisRecord};

/// Append-only store for analysed images.
#[async_trait]
pub trait DiagnosisStore: Send + Sync {
    async fn create_diagnosis(&self, record: &StoredDiagnosisRecord) -> Result<()>;
    async fn get_diagnosis_by_id(&self, id: &str) -> Result<Option<StoredDiagnosisRecord>>;
    /// Returns the requested page plus the total number of matching records.
    async fn list_diagnoses(
        &self,
        filter: &DiagnosisFilter,
    ) -> Result<(Vec<StoredDiagnosisRecord>, u64)>;
    async fn delete_diagnosis(&self, id: &str) -> Result<u64>;
}

/// Chat turns grouped by session.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_chat_message(&self, exchange: &ChatExchange) -> Result<()>;
    async fn list_chat_messages(
        &self,
        filter: &ChatHistoryFilter,
    ) -> Result<(Vec<ChatExchange>, u64)>;
    async fn delete_chat_session(&self, session_id: &str) -> Result<u64>;
}

/// A complete database backend: both stores plus lifecycle operations.
#[async_trait]
pub trait DatabaseBackend: DiagnosisStore + ChatStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;

    /// Cheap liveness check for `/health`.
    async fn ping(&self) -> Result<()>;
}
