use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Normalized result of one image analysis.
///
/// Built once per analysis call by the response extractor and never mutated
/// afterwards. `confidence_score` is on the 0..=1 scale, except for the
/// structured-path values above 100 that the normalizer deliberately leaves
/// unclamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DiagnosisRecord {
    pub image_type: String,
    pub diagnosis_english: String,
    pub diagnosis_arabic: String,
    pub confidence_score: f64,
    pub findings: Vec<String>,
    pub recommendations: Option<String>,
}

/// A diagnosis that has been uploaded and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StoredDiagnosisRecord {
    pub id: String,
    pub image_url: String,
    pub patient_id: Option<String>,
    pub filename: Option<String>,
    #[serde(flatten)]
    pub diagnosis: DiagnosisRecord,
    pub created_at: DateTime<Utc>,
}

impl StoredDiagnosisRecord {
    pub fn new(
        diagnosis: DiagnosisRecord,
        image_url: String,
        patient_id: Option<String>,
        filename: Option<String>,
    ) -> Self {
        Self {
            id: nanoid::nanoid!(),
            image_url,
            patient_id,
            filename,
            diagnosis,
            // Microseconds are all the database keeps.
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}
