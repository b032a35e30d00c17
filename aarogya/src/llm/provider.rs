use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{AppError, Result};
use crate::llm::api::LlmApiClient;
use crate::llm::message::ChatMessage;

/// Something that turns an ordered list of messages into generated text.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

/// Process-wide handle to the configured vision model.
///
/// The API client is built on first use. Concurrent first callers await the
/// same initialization and every clone of the provider shares the result.
#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    config: Option<Arc<LlmConfig>>,
    client: Arc<OnceCell<LlmApiClient>>,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No model configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
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

        Self {
            backend,
            config: Some(Arc::new(config.clone())),
            client: Arc::new(OnceCell::new()),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: None,
            client: Arc::new(OnceCell::new()),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, LlmBackend::Unavailable { .. })
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn config(&self) -> Option<&LlmConfig> {
        self.config.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    async fn client(&self) -> Result<&LlmApiClient> {
        if let LlmBackend::Unavailable { reason } = &self.backend {
            return Err(AppError::ModelUnavailable(reason.clone()));
        }

        let config = self
            .config()
            .ok_or_else(|| AppError::ModelUnavailable("No config available".to_string()))?;

        self.client
            .get_or_try_init(|| async {
                tracing::info!(model = %config.model, "Initializing vision model client");
                LlmApiClient::new(config)
            })
            .await
    }
}

#[async_trait]
impl VisionModel for LlmProvider {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let client = self.client().await?;
        client.generate(messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::ContentBlock;

    fn config(model: &str, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: None,
            base_url: base_url.map(str::to_string),
            timeout_secs: 5,
            max_retries: 0,
            max_tokens: 100,
        }
    }

    #[test]
    fn test_backend_selection() {
        assert_eq!(
            LlmProvider::new(Some(&config("openrouter/qwen-vl", None))).backend(),
            &LlmBackend::OpenRouter
        );
        assert_eq!(
            LlmProvider::new(Some(&config("medgemma", Some("http://gpu:8000/v1")))).backend(),
            &LlmBackend::OpenAICompatible {
                base_url: "http://gpu:8000/v1".to_string()
            }
        );
        assert!(!LlmProvider::new(Some(&config("medgemma", None))).is_available());
        assert!(!LlmProvider::new(None).is_available());
    }

    #[tokio::test]
    async fn test_unavailable_provider_errors_without_initializing() {
        let provider = LlmProvider::new(None);
        let result = provider
            .generate(&[ChatMessage::user(vec![ContentBlock::text("hi")])])
            .await;
        assert!(matches!(result, Err(AppError::ModelUnavailable(_))));
        assert!(!provider.is_initialized());
    }

    #[tokio::test]
    async fn test_failed_initialization_is_not_cached() {
        // hosted provider without an API key fails to build its client
        let provider = LlmProvider::new(Some(&config("openai/gpt-4o-mini", None)));
        let messages = [ChatMessage::user(vec![ContentBlock::text("hi")])];

        assert!(matches!(
            provider.generate(&messages).await,
            Err(AppError::Model(_))
        ));
        assert!(!provider.is_initialized());
    }

    #[tokio::test]
    async fn test_clones_share_one_client() {
        let provider = LlmProvider::new(Some(&config("ollama/llava", None)));
        let clone = provider.clone();

        let (a, b) = tokio::join!(provider.client(), clone.client());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(std::ptr::eq(a, b));
        assert!(provider.is_initialized());
        assert!(clone.is_initialized());
    }
}
