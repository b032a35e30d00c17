use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ImageDetail, ImageUrlArgs,
    },
    Client,
};

use crate::{
    config::{parse_llm_provider_model, LlmConfig},
    error::{AppError, Result},
    llm::message::{ChatMessage, ContentBlock, Role},
};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

#[derive(Debug, Clone)]
struct ApiConfig {
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout_secs: u64,
    max_retries: u32,
    max_tokens: u32,
}

/// Chat-completions client for OpenAI-compatible vision models.
#[derive(Clone)]
pub struct LlmApiClient {
    client: Client<OpenAIConfig>,
    config: ApiConfig,
}

impl LlmApiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_config = ApiConfig::from_llm_config(config);

        let (provider, _) = parse_llm_provider_model(&config.model);
        let needs_api_key = !matches!(
            provider.to_lowercase().as_str(),
            "ollama" | "local" | "lmstudio"
        );

        if needs_api_key && api_config.api_key.is_none() {
            return Err(AppError::Model(
                "API key required for this provider".to_string(),
            ));
        }

        let openai_config = OpenAIConfig::new()
            .with_api_base(api_config.base_url.clone())
            .with_api_key(api_config.api_key.clone().unwrap_or_default());

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api_config.timeout_secs))
            .build()
            .map_err(|error| {
                AppError::Model(format!("Failed to create model HTTP client: {error}"))
            })?;

        // Bound async-openai's own 5xx retries by the request timeout; the
        // loop in generate() handles the rest.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(api_config.timeout_secs)),
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

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Run one chat completion and return the generated text.
    ///
    /// An empty completion is returned as an empty string; callers decide
    /// what an empty answer means.
    pub async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        if messages.is_empty() {
            return Err(AppError::Validation("Message list cannot be empty".to_string()));
        }

        let mut last_error: Option<AppError> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay_ms = 100 * 2_u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            let request = self.build_request(messages)?;

            match self.client.chat().create(request).await {
                Ok(response) => {
                    let content = Self::extract_content(response)?;
                    tracing::debug!(
                        model = %self.config.model,
                        response_len = content.len(),
                        "Model response received"
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
                        tracing::warn!(attempt, error = %mapped_error, "Retrying model request");
                        last_error = Some(mapped_error);
                        continue;
                    }

                    return Err(mapped_error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Model("Model request failed after retries".to_string())))
    }

    fn build_request(&self, messages: &[ChatMessage]) -> Result<CreateChatCompletionRequest> {
        let converted = messages
            .iter()
            .map(Self::convert_message)
            .collect::<Result<Vec<_>>>()?;

        let mut request = CreateChatCompletionRequestArgs::default();
        request
            .model(self.config.model.clone())
            .messages(converted)
            .max_tokens(self.config.max_tokens);

        request.build().map_err(|error| {
            AppError::Validation(format!("Invalid model completion request: {error}"))
        })
    }

    fn convert_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
        match message.role {
            Role::System => Ok(ChatCompletionRequestSystemMessageArgs::default()
                .content(message.text())
                .build()
                .map_err(|error| AppError::Validation(format!("Invalid system prompt: {error}")))?
                .into()),
            Role::User => {
                let parts = message
                    .content
                    .iter()
                    .map(Self::convert_block)
                    .collect::<Result<Vec<_>>>()?;

                Ok(ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(parts))
                    .build()
                    .map_err(|error| {
                        AppError::Validation(format!("Invalid user message: {error}"))
                    })?
                    .into())
            }
        }
    }

    fn convert_block(block: &ContentBlock) -> Result<ChatCompletionRequestUserMessageContentPart> {
        match block {
            ContentBlock::Text(text) => Ok(ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(text.clone())
                .build()
                .map_err(|error| AppError::Validation(format!("Invalid text block: {error}")))?
                .into()),
            ContentBlock::Image { .. } => {
                let url = block.data_url().unwrap_or_default();
                let image_url = ImageUrlArgs::default()
                    .url(url)
                    .detail(ImageDetail::Auto)
                    .build()
                    .map_err(|error| {
                        AppError::Validation(format!("Invalid image block: {error}"))
                    })?;

                Ok(ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(image_url)
                    .build()
                    .map_err(|error| {
                        AppError::Validation(format!("Invalid image block: {error}"))
                    })?
                    .into())
            }
        }
    }

    fn extract_content(response: CreateChatCompletionResponse) -> Result<String> {
        Ok(response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Model("Model response contained no choices".to_string()))?
            .message
            .content
            .unwrap_or_default())
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

    fn rate_limit_error(error: &OpenAIError) -> Option<AppError> {
        match error {
            OpenAIError::Reqwest(reqwest_error)
                if reqwest_error.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) =>
            {
                Some(AppError::ModelRateLimit { retry_after: None })
            }
            OpenAIError::ApiError(api_error) if Self::is_rate_limit_api_error(api_error) => {
                Some(AppError::ModelRateLimit { retry_after: None })
            }
            _ => None,
        }
    }

    fn auth_error(error: &OpenAIError) -> Option<AppError> {
        match error {
            OpenAIError::Reqwest(reqwest_error)
                if reqwest_error.status() == Some(reqwest::StatusCode::UNAUTHORIZED)
                    || reqwest_error.status() == Some(reqwest::StatusCode::FORBIDDEN) =>
            {
                Some(AppError::Model(format!(
                    "Model authentication failed: {reqwest_error}"
                )))
            }
            OpenAIError::ApiError(api_error) if Self::is_auth_api_error(api_error) => Some(
                AppError::Model(format!("Model authentication failed: {api_error}")),
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
            || error_type.contains("rate_limit")
            || code.contains("rate_limit")
            || code == "insufficient_quota"
    }

    fn is_auth_api_error(api_error: &ApiError) -> bool {
        let message = api_error.message.to_lowercase();
        let error_type = api_error.r#type.clone().unwrap_or_default().to_lowercase();
        let code = api_error.code.clone().unwrap_or_default().to_lowercase();

        message.contains("unauthorized")
            || message.contains("invalid api key")
            || code.contains("invalid_api_key")
            || error_type.contains("authentication")
    }

    fn map_openai_error(error: OpenAIError) -> AppError {
        match error {
            OpenAIError::Reqwest(reqwest_error) => {
                AppError::Model(format!("Model request failed: {reqwest_error}"))
            }
            OpenAIError::ApiError(api_error) => {
                AppError::Model(format!("Model API error: {api_error}"))
            }
            OpenAIError::JSONDeserialize(err) => {
                AppError::Model(format!("Failed to parse model response: {err}"))
            }
            OpenAIError::InvalidArgument(message) => AppError::Validation(message),
            other => AppError::Model(other.to_string()),
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

        let normalized_model = if provider.eq_ignore_ascii_case("local") {
            config.model.clone()
        } else {
            model.to_string()
        };

        Self {
            base_url,
            api_key: config.api_key.clone(),
            model: normalized_model,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            max_tokens: config.max_tokens,
        }
    }
}

fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
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
            api_key: None,
            base_url: None,
            timeout_secs: 30,
            max_retries: 0,
            max_tokens: 2000,
        }
    }

    #[test]
    fn test_hosted_provider_requires_api_key() {
        let result = LlmApiClient::new(&test_llm_config("openai/gpt-4o-mini"));
        assert!(matches!(result, Err(AppError::Model(_))));
    }

    #[test]
    fn test_local_provider_strips_prefix() {
        let client = LlmApiClient::new(&test_llm_config("ollama/llava")).unwrap();
        assert_eq!(client.model(), "llava");
        assert_eq!(client.config.base_url, OLLAMA_BASE_URL);
    }

    #[test]
    fn test_request_carries_image_and_text_parts_in_order() {
        let client = LlmApiClient::new(&test_llm_config("ollama/llava")).unwrap();
        let messages = vec![ChatMessage::user(vec![
            ContentBlock::image(vec![0xFF, 0xD8, 0xFF, 0xE0]),
            ContentBlock::text("Analyze this medicine image."),
        ])];

        let request = client.build_request(&messages).unwrap();
        assert_eq!(request.max_tokens, Some(2000));

        let json = serde_json::to_value(&request).unwrap();
        let parts = json["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "image_url");
        assert!(parts[0]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
        assert_eq!(parts[1]["type"], "text");
        assert_eq!(parts[1]["text"], "Analyze this medicine image.");
    }

    #[test]
    fn test_system_message_is_plain_text() {
        let client = LlmApiClient::new(&test_llm_config("ollama/llava")).unwrap();
        let request = client
            .build_request(&[ChatMessage::system("Output only JSON.")])
            .unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "Output only JSON.");
    }

    #[tokio::test]
    async fn test_empty_message_list_rejected() {
        let client = LlmApiClient::new(&test_llm_config("ollama/llava")).unwrap();
        assert!(matches!(
            client.generate(&[]).await,
            Err(AppError::Validation(_))
        ));
    }
}
