use crate::db::connection::Database;
use crate::db::repository::{ChatMessageRepository, DiagnosisRepository};
use crate::db::traits::{ChatStore, DatabaseBackend, DiagnosisStore};
use crate::error::Result;
use crate::models::{ChatExchange, ChatHistoryFilter, DiagnosisFilter, StoredDiagnosisRecord};
use async_trait::async_trait;

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DiagnosisStore for LibSqlBackend {
    async fn create_diagnosis(&self, record: &StoredDiagnosisRecord) -> Result<()> {
        let conn = self.db.connect()?;
        DiagnosisRepository::create(&conn, record).await
    }
    async fn get_diagnosis_by_id(&self, id: &str) -> Result<Option<StoredDiagnosisRecord>> {
        let conn = self.db.connect()?;
        DiagnosisRepository::get_by_id(&conn, id).await
    }
    async fn list_diagnoses(
        &self,
        filter: &DiagnosisFilter,
    ) -> Result<(Vec<StoredDiagnosisRecord>, u64)> {
        let conn = self.db.connect()?;
        DiagnosisRepository::list(&conn, filter).await
    }
    async fn delete_diagnosis(&self, id: &str) -> Result<u64> {
        let conn = self.db.connect()?;
        DiagnosisRepository::delete(&conn, id).await
    }
}

#[async_trait]
impl ChatStore for LibSqlBackend {
    async fn create_chat_message(&self, exchange: &ChatExchange) -> Result<()> {
        let conn = self.db.connect()?;
        ChatMessageRepository::create(&conn, exchange).await
    }
    async fn list_chat_messages(
        &self,
        filter: &ChatHistoryFilter,
    ) -> Result<(Vec<ChatExchange>, u64)> {
        let conn = self.db.connect()?;
        ChatMessageRepository::list(&conn, filter).await
    }
    async fn delete_chat_session(&self, session_id: &str) -> Result<u64> {
        let conn = self.db.connect()?;
        ChatMessageRepository::delete_session(&conn, session_id).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }
}
