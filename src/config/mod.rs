use std::env;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Capability provider settings.
    pub provider: ProviderConfig,
    /// HTTP request settings.
    pub request: RequestConfig,
    /// Conversion and orchestration thresholds.
    pub thresholds: ThresholdConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Capability provider (embedding/LLM service) configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API key; absent key means the converter runs provider-less with
    /// structural fallbacks.
    pub api_key: Option<String>,
    /// Base URL of the provider API.
    pub base_url: String,
    /// Model name for embedding requests.
    pub embedding_model: String,
    /// Model name for structured completion requests.
    pub completion_model: String,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Base delay between retries; doubles each attempt.
    pub retry_delay_ms: u64,
}

/// Numeric thresholds governing conversion and orchestration
#[derive(Debug, Clone)]
pub struct ThresholdConfig {
    /// Preservation score required for `semantic_integrity = true`.
    pub semantic_integrity: f64,
    /// Hard floor below which a conversion fails with an integrity error.
    pub integrity_floor: f64,
    /// Minimum confidence for a mode recommendation to be accepted.
    pub mode_confidence_floor: f64,
    /// Per-workflow-step timeout.
    pub step_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// Structured JSON lines.
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let provider = ProviderConfig {
            api_key: env::var("CROSSMODAL_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: env::var("CROSSMODAL_BASE_URL")
                .unwrap_or_else(|_| "https://api.crossmodal.dev".to_string()),
            embedding_model: env::var("CROSSMODAL_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            completion_model: env::var("CROSSMODAL_COMPLETION_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500),
        };

        let thresholds = ThresholdConfig {
            semantic_integrity: env::var("SEMANTIC_INTEGRITY_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.8),
            integrity_floor: env::var("INTEGRITY_FLOOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.3),
            mode_confidence_floor: env::var("MODE_CONFIDENCE_FLOOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.55),
            step_timeout_ms: env::var("STEP_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60000),
        };

        if thresholds.integrity_floor > thresholds.semantic_integrity {
            return Err(AppError::Config {
                message: format!(
                    "INTEGRITY_FLOOR ({}) must not exceed SEMANTIC_INTEGRITY_THRESHOLD ({})",
                    thresholds.integrity_floor, thresholds.semantic_integrity
                ),
            });
        }

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            provider,
            request,
            thresholds,
            logging,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            semantic_integrity: 0.8,
            integrity_floor: 0.3,
            mode_confidence_floor: 0.55,
            step_timeout_ms: 60000,
        }
    }
}
