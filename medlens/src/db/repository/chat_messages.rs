use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{ChatExchange, ChatHistoryFilter};

use super::diagnoses::{format_timestamp, parse_timestamp};

const COLUMNS: &str = "id, session_id, patient_id, user_message, response_english, \
     response_arabic, is_medical, confidence_score, created_at";

pub struct ChatMessageRepository;

impl ChatMessageRepository {
    pub async fn create(conn: &Connection, exchange: &ChatExchange) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO chat_messages (
                id, session_id, patient_id, user_message, response_english,
                response_arabic, is_medical, confidence_score, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                exchange.id.clone(),
                exchange.session_id.clone(),
                exchange.patient_id.clone(),
                exchange.user_message.clone(),
                exchange.response_english.clone(),
                exchange.response_arabic.clone(),
                i64::from(exchange.is_medical),
                exchange.confidence_score,
                format_timestamp(&exchange.created_at),
            ],
        )
        .await?;

        Ok(())
    }

    /// Newest first. Session and patient filters combine with AND.
    pub async fn list(
        conn: &Connection,
        filter: &ChatHistoryFilter,
    ) -> Result<(Vec<ChatExchange>, u64)> {
        let mut where_clauses = Vec::new();
        let mut filter_params: Vec<libsql::Value> = Vec::new();

        if let Some(session_id) = &filter.session_id {
            filter_params.push(libsql::Value::from(session_id.clone()));
            where_clauses.push(format!("session_id = ?{}", filter_params.len()));
        }
        if let Some(patient_id) = &filter.patient_id {
            filter_params.push(libsql::Value::from(patient_id.clone()));
            where_clauses.push(format!("patient_id = ?{}", filter_params.len()));
        }

        let where_clause = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM chat_messages {where_clause}");
        let mut count_rows = conn
            .query(&count_query, libsql::params_from_iter(filter_params.clone()))
            .await?;
        let total: i64 = if let Some(row) = count_rows.next().await? {
            row.get(0)?
        } else {
            0
        };

        let limit_idx = filter_params.len() + 1;
        let offset_idx = filter_params.len() + 2;
        let query = format!(
            "SELECT {COLUMNS} FROM chat_messages {where_clause} \
             ORDER BY created_at DESC, rowid DESC LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );

        let mut list_params = filter_params;
        list_params.push(libsql::Value::from(filter.page.limit as i64));
        list_params.push(libsql::Value::from(filter.page.skip as i64));

        let mut rows = conn
            .query(&query, libsql::params_from_iter(list_params))
            .await?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(Self::row_to_exchange(&row)?);
        }

        Ok((messages, total.max(0) as u64))
    }

    pub async fn delete_session(conn: &Connection, session_id: &str) -> Result<u64> {
        let affected = conn
            .execute(
                "DELETE FROM chat_messages WHERE session_id = ?1",
                params![session_id],
            )
            .await?;
        Ok(affected)
    }

    fn row_to_exchange(row: &libsql::Row) -> Result<ChatExchange> {
        Ok(ChatExchange {
            id: row.get(0)?,
            session_id: row.get(1)?,
            patient_id: row.get(2)?,
            user_message: row.get(3)?,
            response_english: row.get(4)?,
            response_arabic: row.get(5)?,
            is_medical: row.get::<i64>(6)? != 0,
            confidence_score: row.get(7)?,
            created_at: parse_timestamp(&row.get::<String>(8)?)?,
        })
    }
}
