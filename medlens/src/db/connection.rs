use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

const BUSY_TIMEOUT_MS: u64 = 5000;

/// Shared libsql handle. Cloning is cheap; every operation opens its own
/// connection.
#[derive(Clone)]
pub struct Database {
    pub(crate) db: Arc<libsql::Database>,
    in_memory: bool,
}

impl Database {
    /// Open the database named by `config.url` and create missing tables.
    ///
    /// Accepted forms: `libsql://` or `https://` (remote, or an embedded
    /// replica when `local_path` is set), `:memory:`, `file:<path>` and a bare
    /// path.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let in_memory = config.url == ":memory:";

        let db = if config.url.starts_with("libsql://") || config.url.starts_with("https://") {
            if let Some(ref local_path) = config.local_path {
                Builder::new_remote_replica(
                    local_path,
                    config.url.clone(),
                    config.auth_token.clone().unwrap_or_default(),
                )
                .build()
                .await?
            } else {
                Builder::new_remote(
                    config.url.clone(),
                    config.auth_token.clone().unwrap_or_default(),
                )
                .build()
                .await?
            }
        } else if in_memory {
            Builder::new_local(":memory:").build().await?
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let database = Self {
            db: Arc::new(db),
            in_memory,
        };
        database.configure_database().await;
        database.init_schema().await?;

        tracing::info!(url = %redact_url(&config.url), "Database ready");

        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    async fn configure_database(&self) {
        let Ok(conn) = self.connect() else {
            return;
        };

        let busy_timeout_sql = format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}");
        if let Err(error) = conn.execute_batch(&busy_timeout_sql).await {
            tracing::warn!(error = %error, "Failed to set SQLite busy_timeout");
        }

        if self.in_memory {
            return;
        }

        if let Err(error) = conn.execute_batch("PRAGMA journal_mode = WAL").await {
            tracing::warn!(error = %error, "Failed to set SQLite journal_mode");
        }
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        schema::init_schema(&conn).await?;
        Ok(())
    }

    pub async fn sync(&self) -> Result<()> {
        if let Ok(sync) = self.db.sync().await {
            tracing::info!("Database synced: {:?}", sync);
        }
        Ok(())
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.connect()?;
        let mut rows = conn.query("SELECT 1", ()).await?;
        rows.next().await?;
        Ok(())
    }
}

fn redact_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
