use serde::Deserialize;
use std::env;
use thiserror::Error;

pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 25 * 1024 * 1024;

/// Image extensions accepted by the upload endpoints, in the order they are
/// reported back to callers.
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

/// Read a non-empty string variable.
fn env_non_empty(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVars(Vec<String>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Transport-level body cap. Must stay above `UploadConfig::max_file_bytes`
    /// so that oversize uploads reach the handler and get a descriptive 400.
    pub max_request_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

/// Generative vision/text model configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// `None` waits on the model for as long as the request lives.
    pub timeout_secs: Option<u64>,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Local,
    Cloudinary,
}

impl std::str::FromStr for StorageBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "fs" | "filesystem" => Ok(Self::Local),
            "cloudinary" => Ok(Self::Cloudinary),
            other => Err(format!("Unknown storage backend: {other}")),
        }
    }
}

impl std::fmt::Display for StorageBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Cloudinary => write!(f, "cloudinary"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub local_dir: String,
    pub public_base_url: String,
    pub cloudinary: Option<CloudinaryConfig>,
    pub folder: String,
    pub max_dimension: u32,
    pub quality: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_file_bytes: usize,
}

impl UploadConfig {
    /// Human readable limit, e.g. `10MB`. Limits that are not a whole number
    /// of megabytes fall back to kilobytes, then to bytes.
    pub fn max_file_label(&self) -> String {
        const KB: usize = 1024;
        const MB: usize = 1024 * KB;

        match self.max_file_bytes {
            bytes if bytes >= MB && bytes % MB == 0 => format!("{}MB", bytes / MB),
            bytes if bytes >= KB && bytes % KB == 0 => format!("{}KB", bytes / KB),
            bytes => format!("{bytes} bytes"),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_UPLOAD_MAX_BYTES,
        }
    }
}

impl Config {
    /// Build the configuration from the process environment.
    ///
    /// Every missing required variable is collected before failing so the
    /// operator sees the full list in one go.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut missing = Vec::new();

        let port: u16 = parse_env_or("MEDLENS_PORT", 8000);
        let server = ServerConfig {
            host: env::var("MEDLENS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            max_request_bytes: parse_env_or("MEDLENS_MAX_REQUEST_BYTES", DEFAULT_MAX_REQUEST_BYTES),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:medlens.db".to_string()),
            auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
            local_path: env::var("DATABASE_LOCAL_PATH").ok(),
        };

        let model = env_non_empty("LLM_MODEL")
            .unwrap_or_else(|| "gemini/gemini-1.5-flash-latest".to_string());
        let api_key = env_non_empty("LLM_API_KEY").or_else(|| env_non_empty("GEMINI_API_KEY"));
        if api_key.is_none() && llm_requires_api_key(&model) {
            missing.push("LLM_API_KEY".to_string());
        }
        let llm = LlmConfig {
            model,
            api_key,
            base_url: env_non_empty("LLM_BASE_URL"),
            timeout_secs: parse_env_opt("LLM_TIMEOUT"),
            max_retries: parse_env_or("LLM_MAX_RETRIES", 0),
        };

        // A bad backend name is reported only after the missing list, which is
        // still collected as if the local backend had been chosen.
        let mut invalid_backend = None;
        let requested_backend =
            env_non_empty("STORAGE_BACKEND").map(|raw| raw.parse::<StorageBackendKind>());
        let backend = match requested_backend {
            Some(Ok(kind)) => kind,
            Some(Err(message)) => {
                invalid_backend = Some(message);
                StorageBackendKind::Local
            }
            None => StorageBackendKind::Local,
        };

        let cloudinary = if backend == StorageBackendKind::Cloudinary {
            let cloud_name = env_non_empty("CLOUDINARY_CLOUD_NAME");
            let cloud_key = env_non_empty("CLOUDINARY_API_KEY");
            let cloud_secret = env_non_empty("CLOUDINARY_API_SECRET");

            for (var, value) in [
                ("CLOUDINARY_CLOUD_NAME", &cloud_name),
                ("CLOUDINARY_API_KEY", &cloud_key),
                ("CLOUDINARY_API_SECRET", &cloud_secret),
            ] {
                if value.is_none() {
                    missing.push(var.to_string());
                }
            }

            match (cloud_name, cloud_key, cloud_secret) {
                (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                    cloud_name,
                    api_key,
                    api_secret,
                    base_url: env_non_empty("CLOUDINARY_BASE_URL")
                        .unwrap_or_else(|| "https://api.cloudinary.com/v1_1".to_string()),
                }),
                _ => None,
            }
        } else {
            None
        };

        let storage = StorageConfig {
            backend,
            local_dir: env::var("STORAGE_LOCAL_DIR").unwrap_or_else(|_| "uploads".to_string()),
            public_base_url: env_non_empty("STORAGE_PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            cloudinary,
            folder: env::var("STORAGE_FOLDER").unwrap_or_else(|_| "medical_images".to_string()),
            max_dimension: parse_env_or("STORAGE_MAX_DIMENSION", 1024),
            quality: parse_env_or("STORAGE_QUALITY", 85),
        };

        let upload = UploadConfig {
            max_file_bytes: parse_env_or("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES),
        };

        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }

        if let Some(message) = invalid_backend {
            return Err(ConfigError::Invalid(message));
        }

        if server.max_request_bytes <= upload.max_file_bytes {
            return Err(ConfigError::Invalid(format!(
                "MEDLENS_MAX_REQUEST_BYTES ({}) must be larger than UPLOAD_MAX_BYTES ({})",
                server.max_request_bytes, upload.max_file_bytes
            )));
        }

        Ok(Self {
            server,
            database,
            llm,
            storage,
            upload,
        })
    }
}

/// Known LLM providers that expose OpenAI-compatible chat completion APIs.
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["gemini", "openai", "openrouter", "ollama", "lmstudio"];

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}

pub fn llm_requires_api_key(model: &str) -> bool {
    let (provider, _) = parse_llm_provider_model(model);
    !matches!(
        provider.to_lowercase().as_str(),
        "ollama" | "local" | "lmstudio"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const MANAGED_VARS: &[&str] = &[
        "LLM_MODEL",
        "LLM_API_KEY",
        "GEMINI_API_KEY",
        "LLM_TIMEOUT",
        "STORAGE_BACKEND",
        "CLOUDINARY_CLOUD_NAME",
        "CLOUDINARY_API_KEY",
        "CLOUDINARY_API_SECRET",
        "UPLOAD_MAX_BYTES",
        "MEDLENS_MAX_REQUEST_BYTES",
        "MEDLENS_PORT",
    ];

    fn clear_env() {
        for var in MANAGED_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_with_api_key() {
        clear_env();
        std::env::set_var("LLM_API_KEY", "test-key");

        let config = Config::from_env().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.model, "gemini/gemini-1.5-flash-latest");
        assert!(config.llm.timeout_secs.is_none());
        assert_eq!(config.llm.max_retries, 0);
        assert_eq!(config.storage.backend, StorageBackendKind::Local);
        assert_eq!(config.storage.public_base_url, "http://localhost:8000");
        assert_eq!(config.upload.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(config.upload.max_file_label(), "10MB");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_gemini_api_key_alias() {
        clear_env();
        std::env::set_var("GEMINI_API_KEY", "gemini-key");

        let config = Config::from_env().unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("gemini-key"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_vars_are_listed_together() {
        clear_env();
        std::env::set_var("STORAGE_BACKEND", "cloudinary");
        std::env::set_var("CLOUDINARY_API_KEY", "key");

        let err = Config::from_env().unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingVars(vec![
                "LLM_API_KEY".to_string(),
                "CLOUDINARY_CLOUD_NAME".to_string(),
                "CLOUDINARY_API_SECRET".to_string(),
            ])
        );
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: LLM_API_KEY, CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_SECRET"
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unknown_backend_does_not_hide_missing_vars() {
        clear_env();
        std::env::set_var("STORAGE_BACKEND", "s3");

        let err = Config::from_env().unwrap_err();
        assert_eq!(err, ConfigError::MissingVars(vec!["LLM_API_KEY".to_string()]));

        std::env::set_var("LLM_API_KEY", "test-key");
        let err = Config::from_env().unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid("Unknown storage backend: s3".to_string())
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_local_provider_needs_no_key() {
        clear_env();
        std::env::set_var("LLM_MODEL", "ollama/llava");

        let config = Config::from_env().unwrap();
        assert!(config.llm.api_key.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_request_cap_must_exceed_upload_limit() {
        clear_env();
        std::env::set_var("LLM_API_KEY", "test-key");
        std::env::set_var("MEDLENS_MAX_REQUEST_BYTES", "1024");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_timeout_is_ignored() {
        clear_env();
        std::env::set_var("LLM_API_KEY", "test-key");
        std::env::set_var("LLM_TIMEOUT", "soon");

        let config = Config::from_env().unwrap();
        assert!(config.llm.timeout_secs.is_none());

        clear_env();
    }

    #[test]
    fn test_max_file_label_keeps_odd_limits_exact() {
        let label = |max_file_bytes| UploadConfig { max_file_bytes }.max_file_label();

        assert_eq!(label(10 * 1024 * 1024), "10MB");
        assert_eq!(label(1536 * 1024), "1536KB");
        assert_eq!(label(500_000), "500000 bytes");
        assert_eq!(label(512), "512 bytes");
    }

    #[test]
    fn test_parse_llm_provider_model() {
        assert_eq!(
            parse_llm_provider_model("gemini/gemini-1.5-flash"),
            ("gemini", "gemini-1.5-flash")
        );
        assert_eq!(
            parse_llm_provider_model("openrouter/google/gemini-pro-vision"),
            ("openrouter", "google/gemini-pro-vision")
        );
        assert_eq!(parse_llm_provider_model("llava"), ("local", "llava"));
    }

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!(
            "Cloudinary".parse::<StorageBackendKind>().unwrap(),
            StorageBackendKind::Cloudinary
        );
        assert_eq!(
            "fs".parse::<StorageBackendKind>().unwrap(),
            StorageBackendKind::Local
        );
        assert!("s3".parse::<StorageBackendKind>().is_err());
    }
}
