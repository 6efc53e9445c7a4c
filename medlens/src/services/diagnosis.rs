use std::sync::Arc;

use tracing::{error, info};

use crate::analysis::extract_diagnosis;
use crate::config::{UploadConfig, ALLOWED_IMAGE_EXTENSIONS};
use crate::db::DatabaseBackend;
use crate::error::{MedlensError, Result};
use crate::llm::{prompts::DIAGNOSIS_PROMPT, LlmProvider};
use crate::models::{DiagnosisFilter, DiagnosisRecord, StoredDiagnosisRecord};
use crate::storage::StorageProvider;

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn extension(&self) -> String {
        file_extension(&self.filename)
    }

    /// Sniffed from the bytes first, then guessed from the filename.
    pub fn mime_type(&self) -> String {
        if let Some(kind) = infer::get(&self.bytes) {
            return kind.mime_type().to_string();
        }
        mime_guess::from_path(&self.filename)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string()
    }
}

/// Lower-cased text after the last `.`; the whole name when there is none.
pub fn file_extension(filename: &str) -> String {
    filename.rsplit('.').next().unwrap_or_default().to_lowercase()
}

pub fn invalid_file_type_message() -> String {
    format!(
        "Invalid file type. Allowed types: {}",
        ALLOWED_IMAGE_EXTENSIONS.join(", ")
    )
}

pub fn file_too_large_message(limits: &UploadConfig) -> String {
    format!("File size exceeds {} limit", limits.max_file_label())
}

/// Extension first, then size; nothing else about the content is checked.
pub fn validate_upload(upload: &ImageUpload, limits: &UploadConfig) -> Result<()> {
    if !ALLOWED_IMAGE_EXTENSIONS.contains(&upload.extension().as_str()) {
        return Err(MedlensError::Validation(invalid_file_type_message()));
    }
    if upload.bytes.len() > limits.max_file_bytes {
        return Err(MedlensError::Validation(file_too_large_message(limits)));
    }
    Ok(())
}

#[derive(Clone)]
pub struct DiagnosisService {
    llm: LlmProvider,
    storage: StorageProvider,
    db: Arc<dyn DatabaseBackend>,
    limits: UploadConfig,
}

impl DiagnosisService {
    pub fn new(
        llm: LlmProvider,
        storage: StorageProvider,
        db: Arc<dyn DatabaseBackend>,
        limits: UploadConfig,
    ) -> Self {
        Self {
            llm,
            storage,
            db,
            limits,
        }
    }

    /// Validate the upload, send it to the vision model and normalize the
    /// reply. Nothing is persisted.
    pub async fn analyze(&self, upload: &ImageUpload) -> Result<DiagnosisRecord> {
        validate_upload(upload, &self.limits)?;

        let mime_type = upload.mime_type();
        let reply = self
            .llm
            .complete_with_image(DIAGNOSIS_PROMPT, &upload.bytes, &mime_type)
            .await?;

        let record = extract_diagnosis(&reply);
        info!(
            filename = %upload.filename,
            image_type = %record.image_type,
            confidence = record.confidence_score,
            "Image analyzed"
        );
        Ok(record)
    }

    /// Analyze, upload, then persist, in that order.
    ///
    /// A failure at any step aborts the request. Earlier steps are not undone:
    /// an image uploaded before a failed insert stays in storage.
    pub async fn analyze_and_store(
        &self,
        upload: &ImageUpload,
        patient_id: Option<String>,
    ) -> Result<StoredDiagnosisRecord> {
        let diagnosis = self.analyze(upload).await?;

        let image_url = self
            .storage
            .upload(&upload.bytes, Some(&upload.filename))
            .await?;

        let record = StoredDiagnosisRecord::new(
            diagnosis,
            image_url,
            patient_id,
            Some(upload.filename.clone()),
        );

        if let Err(e) = self.db.create_diagnosis(&record).await {
            error!(
                image_url = %record.image_url,
                error = %e,
                "Diagnosis insert failed after upload; stored image is orphaned"
            );
            return Err(e);
        }

        info!(id = %record.id, patient_id = ?record.patient_id, "Diagnosis stored");
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<StoredDiagnosisRecord> {
        self.db
            .get_diagnosis_by_id(id)
            .await?
            .ok_or_else(|| MedlensError::NotFound(format!("Record {id} not found")))
    }

    pub async fn list(
        &self,
        filter: &DiagnosisFilter,
    ) -> Result<(Vec<StoredDiagnosisRecord>, u64)> {
        self.db.list_diagnoses(filter).await
    }

    pub async fn delete(&self, id: &str) -> Result<u64> {
        let deleted = self.db.delete_diagnosis(id).await?;
        if deleted == 0 {
            return Err(MedlensError::NotFound(format!("Record {id} not found")));
        }
        info!(%id, "Diagnosis deleted");
        Ok(deleted)
    }
}
