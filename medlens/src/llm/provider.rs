use std::sync::Arc;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{MedlensError, Result};
use crate::llm::api::{ImageInput, LlmApiClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

/// Handle to the generative model shared by the diagnosis and chat services.
///
/// The API client is built once at construction. A provider that could not
/// be configured stays usable as a value but fails every call with
/// [`MedlensError::LlmUnavailable`].
#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    model: Option<String>,
    client: Option<Arc<LlmApiClient>>,
}

impl std::fmt::Debug for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmProvider")
            .field("backend", &self.backend)
            .field("model", &self.model)
            .finish()
    }
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "gemini" => LlmBackend::Gemini,
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => {
                if let Some(base_url) = &config.base_url {
                    LlmBackend::OpenAICompatible {
                        base_url: base_url.clone(),
                    }
                } else {
                    LlmBackend::Unavailable {
                        reason: format!("Unknown provider in model: {}", config.model),
                    }
                }
            }
        };

        if let LlmBackend::Unavailable { reason } = &backend {
            tracing::warn!(model = %config.model, %reason, "LLM provider unavailable");
            return Self::unavailable(reason);
        }

        match LlmApiClient::new(config) {
            Ok(client) => Self {
                backend,
                model: Some(config.model.clone()),
                client: Some(Arc::new(client)),
            },
            Err(error) => {
                tracing::warn!(model = %config.model, error = %error, "LLM provider unavailable");
                Self::unavailable(&error.to_string())
            }
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            model: None,
            client: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.client.as_deref().map(LlmApiClient::base_url)
    }

    /// Plain text completion with an optional system prompt.
    pub async fn complete(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        self.client()?.complete(prompt, system_prompt, None).await
    }

    /// Send `prompt` together with one image and return the raw reply text.
    pub async fn complete_with_image(
        &self,
        prompt: &str,
        image_bytes: &[u8],
        mime_type: &str,
    ) -> Result<String> {
        let image = ImageInput {
            bytes: image_bytes,
            mime_type,
        };
        self.client()?
            .complete(prompt, None, Some(image))
            .await
    }

    fn client(&self) -> Result<&LlmApiClient> {
        self.client
            .as_deref()
            .ok_or_else(|| MedlensError::LlmUnavailable(self.unavailable_reason()))
    }

    fn unavailable_reason(&self) -> String {
        match &self.backend {
            LlmBackend::Unavailable { reason } => reason.clone(),
            _ => "LLM client is not configured".to_string(),
        }
    }
}
