use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ImageUrlArgs,
    },
    Client,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    config::{llm_requires_api_key, parse_llm_provider_model, LlmConfig},
    error::{MedlensError, Result},
};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Image attached to a user turn, sent inline as a base64 data URL.
#[derive(Debug, Clone, Copy)]
pub struct ImageInput<'a> {
    pub bytes: &'a [u8],
    pub mime_type: &'a str,
}

impl ImageInput<'_> {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(self.bytes))
    }
}

#[derive(Debug, Clone)]
struct ApiConfig {
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout_secs: Option<u64>,
    max_retries: u32,
}

#[derive(Clone)]
pub struct LlmApiClient {
    client: Client<OpenAIConfig>,
    config: ApiConfig,
}

impl LlmApiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_config = ApiConfig::from_llm_config(config);

        if llm_requires_api_key(&config.model) && api_config.api_key.is_none() {
            return Err(MedlensError::LlmUnavailable(
                "API key required for this provider".to_string(),
            ));
        }

        let openai_config = OpenAIConfig::new()
            .with_api_base(api_config.base_url.clone())
            .with_api_key(api_config.api_key.clone().unwrap_or_default());

        let mut http_builder = reqwest::Client::builder();
        if let Some(timeout_secs) = api_config.timeout_secs {
            http_builder = http_builder.timeout(Duration::from_secs(timeout_secs));
        }
        let http_client = http_builder.build().map_err(|error| {
            MedlensError::LlmUnavailable(format!("Failed to create LLM HTTP client: {error}"))
        })?;

        // async-openai retries server errors on its own backoff; retries are
        // driven by max_retries in complete() instead.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::ZERO),
            ..Default::default()
        };

        let client = Client::with_config(openai_config)
            .with_http_client(http_client)
            .with_backoff(backoff);

        Ok(Self {
            client,
            config: api_config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one user turn, optionally with an image and a system prompt,
    /// and return the raw text of the first choice.
    ///
    /// An empty reply, or one with no choices at all, is returned as an empty
    /// string; callers decide what a blank answer means.
    pub async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        image: Option<ImageInput<'_>>,
    ) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(MedlensError::Validation("Prompt cannot be empty".to_string()));
        }

        let mut last_error: Option<MedlensError> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay_ms = 100 * 2_u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            let request = self.build_request(prompt, system_prompt, image)?;

            match self.client.chat().create(request).await {
                Ok(response) => {
                    let content = Self::extract_content(response);
                    tracing::debug!(
                        model = %self.config.model,
                        response_len = content.len(),
                        with_image = image.is_some(),
                        "LLM response received"
                    );
                    return Ok(content);
                }
                Err(error) => {
                    if let Some(rate_limit_error) = Self::rate_limit_error(&error) {
                        return Err(rate_limit_error);
                    }

                    if let Some(auth_error) = Self::auth_error(&error) {
                        return Err(auth_error);
                    }

                    let retryable = Self::is_retryable(&error);
                    let mapped_error = Self::map_openai_error(error);

                    if retryable && attempt < self.config.max_retries {
                        tracing::warn!(attempt, error = %mapped_error, "Retrying LLM request");
                        last_error = Some(mapped_error);
                        continue;
                    }

                    return Err(mapped_error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            MedlensError::Llm("LLM completion failed after retries".to_string())
        }))
    }

    fn build_request(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        image: Option<ImageInput<'_>>,
    ) -> Result<CreateChatCompletionRequest> {
        let mut messages = Vec::new();

        if let Some(system_prompt) = system_prompt.filter(|value| !value.trim().is_empty()) {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()
                    .map_err(|error| {
                        MedlensError::Validation(format!("Invalid system prompt: {error}"))
                    })?
                    .into(),
            );
        }

        let content = match image {
            Some(image) => Self::image_content(prompt, image)?,
            None => ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
        };

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .map_err(|error| {
                    MedlensError::Validation(format!("Invalid user prompt: {error}"))
                })?
                .into(),
        );

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(self.config.model.clone()).messages(messages);

        request.build().map_err(|error| {
            MedlensError::Validation(format!("Invalid LLM completion request: {error}"))
        })
    }

    fn image_content(
        prompt: &str,
        image: ImageInput<'_>,
    ) -> Result<ChatCompletionRequestUserMessageContent> {
        let invalid = |error: OpenAIError| {
            MedlensError::Validation(format!("Invalid image prompt: {error}"))
        };

        let text = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(prompt)
            .build()
            .map_err(invalid)?;

        let image_url = ImageUrlArgs::default()
            .url(image.data_url())
            .build()
            .map_err(invalid)?;

        let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(image_url)
            .build()
            .map_err(invalid)?;

        Ok(ChatCompletionRequestUserMessageContent::Array(vec![
            ChatCompletionRequestUserMessageContentPart::Text(text),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(image_part),
        ]))
    }

    fn extract_content(response: CreateChatCompletionResponse) -> String {
        let Some(choice) = response.choices.into_iter().next() else {
            tracing::warn!("LLM response contained no choices");
            return String::new();
        };

        let message = choice.message.content.unwrap_or_default();
        if message.trim().is_empty() {
            tracing::warn!("LLM response contained empty content");
        }

        message
    }

    fn is_retryable(error: &OpenAIError) -> bool {
        match error {
            OpenAIError::ApiError(api_error) => {
                api_error.r#type.is_none() && api_error.code.is_none()
            }
            OpenAIError::Reqwest(reqwest_error) => reqwest_error
                .status()
                .map(|status| status.is_server_error())
                .unwrap_or(true),
            _ => false,
        }
    }

    fn rate_limit_error(error: &OpenAIError) -> Option<MedlensError> {
        match error {
            OpenAIError::Reqwest(reqwest_error)
                if reqwest_error.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) =>
            {
                Some(MedlensError::LlmRateLimit { retry_after: None })
            }
            OpenAIError::ApiError(api_error) if Self::is_rate_limit_api_error(api_error) => {
                Some(MedlensError::LlmRateLimit { retry_after: None })
            }
            _ => None,
        }
    }

    fn auth_error(error: &OpenAIError) -> Option<MedlensError> {
        match error {
            OpenAIError::Reqwest(reqwest_error)
                if reqwest_error.status() == Some(reqwest::StatusCode::UNAUTHORIZED)
                    || reqwest_error.status() == Some(reqwest::StatusCode::FORBIDDEN) =>
            {
                Some(MedlensError::Llm(format!(
                    "LLM authentication failed: {reqwest_error}"
                )))
            }
            OpenAIError::ApiError(api_error) if Self::is_auth_api_error(api_error) => Some(
                MedlensError::Llm(format!("LLM authentication failed: {api_error}")),
            ),
            _ => None,
        }
    }

    fn is_rate_limit_api_error(api_error: &ApiError) -> bool {
        let message = api_error.message.to_lowercase();
        let error_type = api_error.r#type.clone().unwrap_or_default().to_lowercase();
        let code = api_error.code.clone().unwrap_or_default().to_lowercase();

        message.contains("rate limit")
            || message.contains("too many requests")
            || message.contains("resource has been exhausted")
            || error_type.contains("rate_limit")
            || code.contains("rate_limit")
            || code == "insufficient_quota"
            || code == "resource_exhausted"
    }

    fn is_auth_api_error(api_error: &ApiError) -> bool {
        let message = api_error.message.to_lowercase();
        let error_type = api_error.r#type.clone().unwrap_or_default().to_lowercase();
        let code = api_error.code.clone().unwrap_or_default().to_lowercase();

        message.contains("unauthorized")
            || message.contains("forbidden")
            || message.contains("authentication")
            || message.contains("invalid api key")
            || message.contains("api key not valid")
            || code.contains("invalid_api_key")
            || code.contains("authentication")
            || error_type.contains("authentication")
    }

    fn map_openai_error(error: OpenAIError) -> MedlensError {
        match error {
            OpenAIError::Reqwest(reqwest_error) => {
                MedlensError::Llm(format!("LLM request failed: {reqwest_error}"))
            }
            OpenAIError::ApiError(api_error) => {
                MedlensError::Llm(format!("LLM API error: {api_error}"))
            }
            OpenAIError::JSONDeserialize(err) => {
                MedlensError::Llm(format!("Failed to parse LLM response: {err}"))
            }
            OpenAIError::InvalidArgument(message) => MedlensError::Validation(message),
            other => MedlensError::Llm(other.to_string()),
        }
    }
}

impl ApiConfig {
    fn from_llm_config(config: &LlmConfig) -> Self {
        let (provider, model) = parse_llm_provider_model(&config.model);

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider).to_string());

        Self {
            base_url,
            api_key: config.api_key.clone(),
            model: model.to_string(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }
}

fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "gemini" => GEMINI_BASE_URL,
        "openai" => OPENAI_BASE_URL,
        "openrouter" => OPENROUTER_BASE_URL,
        "ollama" => OLLAMA_BASE_URL,
        "lmstudio" => LMSTUDIO_BASE_URL,
        _ => OPENAI_BASE_URL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_llm_config(model: &str) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: Some("test-key".to_string()),
            base_url: None,
            timeout_secs: None,
            max_retries: 0,
        }
    }

    fn user_message_json(request: &CreateChatCompletionRequest) -> serde_json::Value {
        let value = serde_json::to_value(request).unwrap();
        value["messages"]
            .as_array()
            .unwrap()
            .iter()
            .find(|message| message["role"] == "user")
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_gemini_model_prefix_is_stripped() {
        let client = LlmApiClient::new(&test_llm_config("gemini/gemini-1.5-flash-latest"))
            .expect("client should be created");

        assert_eq!(client.model(), "gemini-1.5-flash-latest");
        assert_eq!(client.base_url(), GEMINI_BASE_URL);
    }

    #[test]
    fn test_missing_api_key_is_unavailable() {
        let mut config = test_llm_config("gemini/gemini-1.5-flash-latest");
        config.api_key = None;

        let result = LlmApiClient::new(&config);
        assert!(matches!(result, Err(MedlensError::LlmUnavailable(_))));
    }

    #[test]
    fn test_local_models_need_no_key() {
        let mut config = test_llm_config("ollama/llava");
        config.api_key = None;

        let client = LlmApiClient::new(&config).expect("client should be created");
        assert_eq!(client.base_url(), OLLAMA_BASE_URL);
    }

    #[test]
    fn test_image_request_carries_data_url() {
        let client = LlmApiClient::new(&test_llm_config("openai/gpt-4o")).unwrap();
        let image = ImageInput {
            bytes: b"fake-png",
            mime_type: "image/png",
        };

        let request = client
            .build_request("Describe this", None, Some(image))
            .expect("request should build");

        let user = user_message_json(&request);
        let parts = user["content"].as_array().expect("content parts");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], "Describe this");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(
            parts[1]["image_url"]["url"],
            format!("data:image/png;base64,{}", STANDARD.encode(b"fake-png"))
        );
    }

    #[test]
    fn test_text_request_includes_system_prompt() {
        let client = LlmApiClient::new(&test_llm_config("openai/gpt-4o")).unwrap();

        let request = client
            .build_request("What causes fever?", Some("Be careful"), None)
            .expect("request should build");

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "What causes fever?");
        assert!(value["response_format"].is_null());
    }

    #[test]
    fn test_blank_system_prompt_is_skipped() {
        let client = LlmApiClient::new(&test_llm_config("openai/gpt-4o")).unwrap();

        let request = client
            .build_request("Hello", Some("   "), None)
            .expect("request should build");

        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn test_request_leaves_sampling_to_provider_defaults() {
        let client = LlmApiClient::new(&test_llm_config("openai/gpt-4o")).unwrap();

        let request = client
            .build_request("What causes fever?", None, None)
            .expect("request should build");

        let value = serde_json::to_value(&request).unwrap();
        for field in ["temperature", "max_tokens", "top_p", "stop"] {
            assert!(value[field].is_null(), "{field} should not be sent");
        }
    }
}
