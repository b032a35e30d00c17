use serde::Deserialize;
use std::env;

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

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub llm: Option<LlmConfig>,
    pub drug_lookup: DrugLookupConfig,
    pub storage: StorageConfig,
    pub pdf: PdfConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a single multipart upload, in bytes.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret. Token issuance and verification are refused while unset.
    pub secret_key: Option<String>,
    pub token_ttl_hours: i64,
}

/// Vision-language model used for both analysis stages.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DrugLookupConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Maximum characters kept for the free-text label fields.
    pub field_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub image_dir: String,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PdfConfig {
    pub render_dpi: u32,
    pub library_path: Option<String>,
}

pub const DEFAULT_OPENFDA_URL: &str = "https://api.fda.gov/drug/label.json";

impl Default for DrugLookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENFDA_URL.to_string(),
            timeout_secs: 15,
            field_limit: 500,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("AAROGYA_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("AAROGYA_PORT", 8000),
                max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:aarogya.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            auth: AuthConfig {
                secret_key: env::var("SECRET_KEY").ok().filter(|s| !s.is_empty()),
                token_ttl_hours: parse_env_or("TOKEN_TTL_HOURS", 12),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 120),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 2),
                max_tokens: parse_env_or("LLM_MAX_TOKENS", 2000),
            }),
            drug_lookup: DrugLookupConfig {
                base_url: env::var("OPENFDA_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_OPENFDA_URL.to_string()),
                timeout_secs: parse_env_or("OPENFDA_TIMEOUT", 15),
                field_limit: parse_env_or("OPENFDA_FIELD_LIMIT", 500),
            },
            storage: StorageConfig {
                image_dir: env::var("IMAGE_STORAGE_DIR")
                    .unwrap_or_else(|_| "storage/images".to_string()),
                public_base_url: env::var("IMAGE_PUBLIC_URL")
                    .unwrap_or_else(|_| "/api/v1/images".to_string()),
            },
            pdf: PdfConfig {
                render_dpi: parse_env_opt("PDF_RENDER_DPI").unwrap_or(150),
                library_path: env::var("PDFIUM_DYNAMIC_LIB_PATH").ok(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_server_config_defaults() {
        std::env::remove_var("AAROGYA_PORT");
        std::env::remove_var("MAX_UPLOAD_BYTES");

        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.max_upload_bytes, 20 * 1024 * 1024);
    }

    #[test]
    #[serial]
    fn test_llm_config_absent_without_model() {
        std::env::remove_var("LLM_MODEL");

        let config = Config::default();
        assert!(config.llm.is_none());
    }

    #[test]
    #[serial]
    fn test_llm_config_from_env() {
        std::env::set_var("LLM_MODEL", "openrouter/meta-llama/llama-3.2-11b-vision-instruct");
        std::env::set_var("LLM_MAX_TOKENS", "1024");

        let config = Config::default();
        let llm = config.llm.unwrap();
        assert_eq!(
            llm.model,
            "openrouter/meta-llama/llama-3.2-11b-vision-instruct"
        );
        assert_eq!(llm.max_tokens, 1024);
        assert_eq!(llm.timeout_secs, 120);

        std::env::remove_var("LLM_MODEL");
        std::env::remove_var("LLM_MAX_TOKENS");
    }

    #[test]
    #[serial]
    fn test_auth_config_ignores_empty_secret() {
        std::env::set_var("SECRET_KEY", "");

        let config = Config::default();
        assert!(config.auth.secret_key.is_none());
        assert_eq!(config.auth.token_ttl_hours, 12);

        std::env::remove_var("SECRET_KEY");
    }

    #[test]
    #[serial]
    fn test_drug_lookup_defaults() {
        std::env::remove_var("OPENFDA_BASE_URL");
        std::env::remove_var("OPENFDA_FIELD_LIMIT");

        let config = Config::default();
        assert_eq!(config.drug_lookup.base_url, DEFAULT_OPENFDA_URL);
        assert_eq!(config.drug_lookup.field_limit, 500);
    }

    #[test]
    #[serial]
    fn test_invalid_dpi_falls_back() {
        std::env::set_var("PDF_RENDER_DPI", "lots");

        let config = Config::default();
        assert_eq!(config.pdf.render_dpi, 150);

        std::env::remove_var("PDF_RENDER_DPI");
    }

    #[test]
    fn test_parse_llm_provider_model() {
        assert_eq!(
            parse_llm_provider_model("openai/gpt-4o-mini"),
            ("openai", "gpt-4o-mini")
        );
        assert_eq!(
            parse_llm_provider_model("llama-3.2-vision"),
            ("local", "llama-3.2-vision")
        );
    }
}
