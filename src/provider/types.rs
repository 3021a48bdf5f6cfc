use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for the embeddings endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRequest {
    /// Embedding model name.
    pub model: String,
    /// Texts to embed, one row each.
    pub input: Vec<String>,
}

/// One embedded row in an embeddings response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingRow {
    /// Embedding values.
    pub embedding: Vec<f64>,
    /// Position of the input text this row embeds.
    #[serde(default)]
    pub index: usize,
}

/// Response body from the embeddings endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingResponse {
    /// Embedded rows, not necessarily in input order.
    pub data: Vec<EmbeddingRow>,
    /// Model that served the request.
    pub model: Option<String>,
    /// Token accounting, when the provider reports it.
    pub usage: Option<Usage>,
}

/// Request body for the structured completion endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Completion model name.
    pub model: String,
    /// Prompt text.
    pub prompt: String,
    /// JSON schema the output must satisfy.
    pub schema: Value,
    /// Sampling temperature override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Output length cap override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Response body from the structured completion endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    /// Schema-shaped output value.
    pub output: Value,
    /// Model that served the request.
    pub model: Option<String>,
    /// Token accounting, when the provider reports it.
    pub usage: Option<Usage>,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: Option<u32>,
    /// Tokens produced in the completion.
    pub completion_tokens: Option<u32>,
    /// Prompt plus completion tokens.
    pub total_tokens: Option<u32>,
}

impl EmbeddingRequest {
    /// Create an embeddings request for the given model and inputs
    pub fn new(model: impl Into<String>, input: Vec<String>) -> Self {
        Self {
            model: model.into(),
            input,
        }
    }
}

impl CompletionRequest {
    /// Create a structured completion request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            schema,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
