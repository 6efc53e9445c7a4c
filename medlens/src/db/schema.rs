use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per stored image analysis
        CREATE TABLE IF NOT EXISTS diagnoses (
            id TEXT PRIMARY KEY,
            image_url TEXT NOT NULL,
            patient_id TEXT,
            filename TEXT,
            image_type TEXT NOT NULL,
            diagnosis_english TEXT NOT NULL,
            diagnosis_arabic TEXT NOT NULL,
            confidence_score REAL NOT NULL,
            findings TEXT NOT NULL DEFAULT '[]',
            recommendations TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_diagnoses_patient_id ON diagnoses(patient_id);
        CREATE INDEX IF NOT EXISTS idx_diagnoses_created_at ON diagnoses(created_at);

        -- One row per chat turn (user message plus bilingual reply)
        CREATE TABLE IF NOT EXISTS chat_messages (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            patient_id TEXT,
            user_message TEXT NOT NULL,
            response_english TEXT NOT NULL,
            response_arabic TEXT NOT NULL,
            is_medical INTEGER NOT NULL DEFAULT 1,
            confidence_score REAL NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_session_id ON chat_messages(session_id);
        CREATE INDEX IF NOT EXISTS idx_chat_messages_patient_id ON chat_messages(patient_id);
        CREATE INDEX IF NOT EXISTS idx_chat_messages_created_at ON chat_messages(created_at);
        "#,
    )
    .await?;

    Ok(())
}
