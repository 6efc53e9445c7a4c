// Shared helpers for the integration tests
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Once};

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::MockServer;

use medlens::api::{create_router, AppState};
use medlens::config::{
    Config, DatabaseConfig, LlmConfig, ServerConfig, StorageBackendKind, StorageConfig,
    UploadConfig, DEFAULT_MAX_REQUEST_BYTES,
};
use medlens::db::{Database, DatabaseBackend, LibSqlBackend};
use medlens::llm::LlmProvider;
use medlens::storage::StorageProvider;

pub use serial_test::serial;
pub use tempfile;
pub use wiremock;

pub const PUBLIC_BASE_URL: &str = "http://localhost:8000";
const BOUNDARY: &str = "medlens-test-boundary";

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn llm_config(base_url: String) -> LlmConfig {
    LlmConfig {
        model: "openai/gpt-4o-mini".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url),
        timeout_secs: Some(5),
        max_retries: 0,
    }
}

pub fn test_config(dir: &TempDir, llm_base_url: String) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        },
        database: DatabaseConfig {
            url: format!("file:{}", dir.path().join("medlens-test.db").display()),
            auth_token: None,
            local_path: None,
        },
        llm: llm_config(llm_base_url),
        storage: StorageConfig {
            backend: StorageBackendKind::Local,
            local_dir: dir.path().join("uploads").display().to_string(),
            public_base_url: PUBLIC_BASE_URL.to_string(),
            cloudinary: None,
            folder: "medical_images".to_string(),
            max_dimension: 1024,
            quality: 85,
        },
        upload: UploadConfig::default(),
    }
}

pub async fn test_db(dir: &TempDir) -> Arc<dyn DatabaseBackend> {
    let config = DatabaseConfig {
        url: format!("file:{}", dir.path().join("medlens-test.db").display()),
        auth_token: None,
        local_path: None,
    };
    let db = Database::new(&config).await.expect("open test database");
    Arc::new(LibSqlBackend::new(db))
}

/// A router wired to a temp database, temp upload dir and a mock model.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub llm: MockServer,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        init_test_logger();

        let llm = MockServer::start().await;
        let dir = TempDir::new().expect("create temp dir");
        let config = test_config(&dir, format!("{}/v1", llm.uri()));

        let db = test_db(&dir).await;
        let provider = LlmProvider::new(Some(&config.llm));
        let storage = StorageProvider::new(&config.storage);
        let state = AppState::new(config, db, provider, storage);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            llm,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

/// OpenAI-style chat completion body carrying `content`.
pub fn llm_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o-mini",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

pub fn api_error_body(message: &str, error_type: &str, code: &str) -> Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "param": Value::Null,
            "code": code
        }
    })
}

pub fn diagnosis_json() -> String {
    json!({
        "image_type": "X-ray",
        "diagnosis_english": "No acute cardiopulmonary abnormality",
        "diagnosis_arabic": "لا يوجد شذوذ قلبي رئوي حاد",
        "confidence_score": 85,
        "findings": ["Clear lung fields", "Normal heart size"],
        "recommendations": "Routine follow-up"
    })
    .to_string()
}

/// A small, decodable PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 120, 120]));
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("encode png");
    buffer
}

/// Hand-built `multipart/form-data` body with a `file` part and an optional
/// `patient_id` part.
pub fn multipart_request(
    uri: &str,
    filename: &str,
    bytes: &[u8],
    patient_id: Option<&str>,
) -> Request<Body> {
    let mut body = Vec::new();

    if let Some(patient_id) = patient_id {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"patient_id\"\r\n\r\n{patient_id}\r\n"
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("build multipart request")
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build json request")
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("body is json")
}
