use std::sync::Arc;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::llm::LlmProvider;
use crate::services::{ChatService, DiagnosisService};
use crate::storage::StorageProvider;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub llm: LlmProvider,
    pub storage: StorageProvider,
    pub diagnosis: DiagnosisService,
    pub chat: ChatService,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        llm: LlmProvider,
        storage: StorageProvider,
    ) -> Self {
        let config = Arc::new(config);
        let diagnosis = DiagnosisService::new(
            llm.clone(),
            storage.clone(),
            db.clone(),
            config.upload.clone(),
        );
        let chat = ChatService::new(llm.clone(), db.clone());

        Self {
            config,
            db,
            llm,
            storage,
            diagnosis,
            chat,
        }
    }
}
