use reqwest::{multipart, Client, StatusCode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::{CloudinaryConfig, StorageConfig};
use crate::error::{MedlensError, Result};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Signed uploads against the Cloudinary image upload API.
///
/// Resizing happens server-side through an incoming transformation, so the
/// bytes are sent untouched.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: Client,
    config: CloudinaryConfig,
    folder: String,
    transformation: String,
}

impl CloudinaryClient {
    pub fn new(storage: &StorageConfig) -> Result<Self> {
        let config = storage.cloudinary.clone().ok_or_else(|| {
            MedlensError::StorageUnavailable("Cloudinary credentials are not configured".to_string())
        })?;

        let client = Client::builder().build().map_err(|e| {
            MedlensError::StorageUnavailable(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            config,
            folder: storage.folder.clone(),
            transformation: format!(
                "c_limit,w_{max},h_{max}/q_auto",
                max = storage.max_dimension
            ),
        })
    }

    pub fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    pub async fn upload(&self, bytes: &[u8], filename: Option<&str>) -> Result<String> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = [
            ("folder", self.folder.as_str()),
            ("timestamp", timestamp.as_str()),
            ("transformation", self.transformation.as_str()),
        ];
        let signature = sign_params(&params, &self.config.api_secret);

        let mut file_part = multipart::Part::bytes(bytes.to_vec());
        if let Some(name) = filename {
            file_part = file_part.file_name(name.to_string());
        }

        let mut form = multipart::Form::new()
            .part("file", file_part)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value.to_string());
        }

        let url = self.upload_url();
        debug!(%url, size = bytes.len(), "Uploading image to Cloudinary");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MedlensError::Storage(format!("Upload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(map_http_error(status, &error_body));
        }

        let uploaded: UploadResponse = response.json().await.map_err(|e| {
            MedlensError::Storage(format!("Failed to parse upload response: {e}"))
        })?;

        Ok(uploaded.secure_url)
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as a
/// query string, with the API secret appended, hashed with SHA-256.
pub(crate) fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn map_http_error(status: StatusCode, error_body: &str) -> MedlensError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MedlensError::Storage(format!(
            "Cloudinary authentication failed ({status}): {error_body}"
        )),
        _ => MedlensError::Storage(format!("Cloudinary upload failed ({status}): {error_body}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackendKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn storage_config(base_url: &str) -> StorageConfig {
        StorageConfig {
            backend: StorageBackendKind::Cloudinary,
            local_dir: "uploads".to_string(),
            public_base_url: "http://localhost:8000".to_string(),
            cloudinary: Some(CloudinaryConfig {
                cloud_name: "demo".to_string(),
                api_key: "key".to_string(),
                api_secret: "secret".to_string(),
                base_url: base_url.to_string(),
            }),
            folder: "medical_images".to_string(),
            max_dimension: 1024,
            quality: 85,
        }
    }

    #[test]
    fn test_signature_sorts_params() {
        let a = sign_params(&[("timestamp", "1"), ("folder", "x")], "s");
        let b = sign_params(&[("folder", "x"), ("timestamp", "1")], "s");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut hasher = Sha256::new();
        hasher.update(b"folder=x&timestamp=1s");
        assert_eq!(a, format!("{:x}", hasher.finalize()));
    }

    #[test]
    fn test_missing_credentials_is_unavailable() {
        let mut config = storage_config("http://localhost");
        config.cloudinary = None;

        assert!(matches!(
            CloudinaryClient::new(&config),
            Err(MedlensError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_returns_secure_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "public_id": "medical_images/abc",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/medical_images/abc.jpg"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CloudinaryClient::new(&storage_config(&server.uri())).unwrap();
        let url = client.upload(b"bytes", Some("xray.png")).await.unwrap();

        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/medical_images/abc.jpg"
        );

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("c_limit,w_1024,h_1024/q_auto"));
        assert!(body.contains("medical_images"));
        assert!(body.contains("sha256"));
    }

    #[tokio::test]
    async fn test_upload_failure_maps_to_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Signature"))
            .mount(&server)
            .await;

        let client = CloudinaryClient::new(&storage_config(&server.uri())).unwrap();
        let err = client.upload(b"bytes", None).await.unwrap_err();

        match err {
            MedlensError::Storage(message) => assert!(message.contains("Invalid Signature")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
