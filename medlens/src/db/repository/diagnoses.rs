use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{params, Connection};

use crate::error::{MedlensError, Result};
use crate::models::{DiagnosisFilter, DiagnosisRecord, StoredDiagnosisRecord};

const COLUMNS: &str = "id, image_url, patient_id, filename, image_type, diagnosis_english, \
     diagnosis_arabic, confidence_score, findings, recommendations, created_at";

pub struct DiagnosisRepository;

impl DiagnosisRepository {
    pub async fn create(conn: &Connection, record: &StoredDiagnosisRecord) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO diagnoses (
                id, image_url, patient_id, filename, image_type, diagnosis_english,
                diagnosis_arabic, confidence_score, findings, recommendations, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                record.id.clone(),
                record.image_url.clone(),
                record.patient_id.clone(),
                record.filename.clone(),
                record.diagnosis.image_type.clone(),
                record.diagnosis.diagnosis_english.clone(),
                record.diagnosis.diagnosis_arabic.clone(),
                record.diagnosis.confidence_score,
                serde_json::to_string(&record.diagnosis.findings)?,
                record.diagnosis.recommendations.clone(),
                format_timestamp(&record.created_at),
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn get_by_id(conn: &Connection, id: &str) -> Result<Option<StoredDiagnosisRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM diagnoses WHERE id = ?1");
        let mut rows = conn.query(&sql, params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_record(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Newest first, with the total matching count before paging.
    pub async fn list(
        conn: &Connection,
        filter: &DiagnosisFilter,
    ) -> Result<(Vec<StoredDiagnosisRecord>, u64)> {
        let mut filter_params: Vec<libsql::Value> = Vec::new();
        let where_clause = match &filter.patient_id {
            Some(patient_id) => {
                filter_params.push(libsql::Value::from(patient_id.clone()));
                "WHERE patient_id = ?1"
            }
            None => "",
        };

        let count_query = format!("SELECT COUNT(*) FROM diagnoses {where_clause}");
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
            "SELECT {COLUMNS} FROM diagnoses {where_clause} \
             ORDER BY created_at DESC, rowid DESC LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );

        let mut list_params = filter_params;
        list_params.push(libsql::Value::from(filter.page.limit as i64));
        list_params.push(libsql::Value::from(filter.page.skip as i64));

        let mut rows = conn
            .query(&query, libsql::params_from_iter(list_params))
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::row_to_record(&row)?);
        }

        Ok((records, total.max(0) as u64))
    }

    pub async fn delete(conn: &Connection, id: &str) -> Result<u64> {
        let affected = conn
            .execute("DELETE FROM diagnoses WHERE id = ?1", params![id])
            .await?;
        Ok(affected)
    }

    fn row_to_record(row: &libsql::Row) -> Result<StoredDiagnosisRecord> {
        let id: String = row.get(0)?;
        let findings: Vec<String> = serde_json::from_str(&row.get::<String>(8)?).map_err(|e| {
            tracing::error!(%id, error = %e, "Stored findings are not a JSON string array");
            MedlensError::Internal(format!("Corrupt findings for diagnosis {id}"))
        })?;

        Ok(StoredDiagnosisRecord {
            id,
            image_url: row.get(1)?,
            patient_id: row.get(2)?,
            filename: row.get(3)?,
            diagnosis: DiagnosisRecord {
                image_type: row.get(4)?,
                diagnosis_english: row.get(5)?,
                diagnosis_arabic: row.get(6)?,
                confidence_score: row.get(7)?,
                findings,
                recommendations: row.get(9)?,
            },
            created_at: parse_timestamp(&row.get::<String>(10)?)?,
        })
    }
}

/// Fixed-width UTC timestamps so lexical order matches chronological order.
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            tracing::error!(raw, error = %e, "Stored timestamp is not RFC 3339");
            MedlensError::Internal(format!("Corrupt timestamp: {raw}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Page;
    use chrono::SubsecRound;
    use pretty_assertions::assert_eq;

    async fn setup_test_db() -> Connection {
        let conn = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap()
            .connect()
            .unwrap();
        crate::db::schema::init_schema(&conn).await.unwrap();
        conn
    }

    fn record(patient_id: Option<&str>, seconds_ago: i64) -> StoredDiagnosisRecord {
        let mut stored = StoredDiagnosisRecord::new(
            DiagnosisRecord {
                image_type: "X-ray".to_string(),
                diagnosis_english: "No acute findings".to_string(),
                diagnosis_arabic: "لا توجد نتائج حادة".to_string(),
                confidence_score: 0.82,
                findings: vec!["Clear lung fields".to_string()],
                recommendations: None,
            },
            "http://localhost:8000/uploads/medical_images/a.jpg".to_string(),
            patient_id.map(str::to_string),
            Some("chest.png".to_string()),
        );
        stored.created_at = Utc::now() - chrono::Duration::seconds(seconds_ago);
        stored
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let conn = setup_test_db().await;
        let stored = record(Some("p-1"), 0);

        DiagnosisRepository::create(&conn, &stored).await.unwrap();
        let fetched = DiagnosisRepository::get_by_id(&conn, &stored.id)
            .await
            .unwrap()
            .expect("record should exist");

        assert_eq!(fetched.diagnosis, stored.diagnosis);
        assert_eq!(fetched.patient_id.as_deref(), Some("p-1"));
        assert_eq!(
            format_timestamp(&fetched.created_at),
            format_timestamp(&stored.created_at)
        );
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let conn = setup_test_db().await;
        assert!(DiagnosisRepository::get_by_id(&conn, "nope")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_filtered() {
        let conn = setup_test_db().await;
        let oldest = record(Some("p-1"), 30);
        let middle = record(Some("p-2"), 20);
        let newest = record(Some("p-1"), 10);
        for r in [&oldest, &middle, &newest] {
            DiagnosisRepository::create(&conn, r).await.unwrap();
        }

        let (all, total) = DiagnosisRepository::list(&conn, &DiagnosisFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 3);
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![newest.id.as_str(), middle.id.as_str(), oldest.id.as_str()]);

        let filter = DiagnosisFilter {
            patient_id: Some("p-1".to_string()),
            page: Page::new(Some(1), Some(1)),
        };
        let (page, total) = DiagnosisRepository::list(&conn, &filter).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, oldest.id);
    }

    async fn insert_raw(conn: &Connection, id: &str, findings: &str, created_at: &str) {
        let sql = format!(
            "INSERT INTO diagnoses ({COLUMNS}) \
             VALUES (?1, ?2, NULL, NULL, ?3, ?4, ?5, ?6, ?7, NULL, ?8)"
        );
        conn.execute(
            &sql,
            params![
                id,
                "http://localhost:8000/uploads/medical_images/raw.jpg",
                "X-ray",
                "ok",
                "حسنا",
                0.5,
                findings,
                created_at
            ],
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_findings_surface_as_internal_error() {
        let conn = setup_test_db().await;
        insert_raw(&conn, "bad-findings", "not json", "2024-05-01T10:00:00.000000Z").await;

        let err = DiagnosisRepository::get_by_id(&conn, "bad-findings")
            .await
            .unwrap_err();
        assert!(matches!(err, MedlensError::Internal(ref msg) if msg.contains("bad-findings")));

        let err = DiagnosisRepository::list(&conn, &DiagnosisFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MedlensError::Internal(_)));
    }

    #[tokio::test]
    async fn test_corrupt_timestamp_surfaces_as_internal_error() {
        let conn = setup_test_db().await;
        insert_raw(&conn, "bad-time", r#"["Clear"]"#, "yesterday").await;

        let err = DiagnosisRepository::get_by_id(&conn, "bad-time")
            .await
            .unwrap_err();
        assert!(matches!(err, MedlensError::Internal(ref msg) if msg.contains("yesterday")));
    }

    #[test]
    fn test_parse_timestamp_reads_what_format_writes() {
        let at = Utc::now().trunc_subsecs(6);
        assert_eq!(parse_timestamp(&format_timestamp(&at)).unwrap(), at);
        assert!(parse_timestamp("").is_err());
    }

    #[tokio::test]
    async fn test_delete_reports_count() {
        let conn = setup_test_db().await;
        let stored = record(None, 0);
        DiagnosisRepository::create(&conn, &stored).await.unwrap();

        assert_eq!(DiagnosisRepository::delete(&conn, &stored.id).await.unwrap(), 1);
        assert_eq!(DiagnosisRepository::delete(&conn, &stored.id).await.unwrap(), 0);
    }
}
