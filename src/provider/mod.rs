//! Embedding/LLM capability providers.
//!
//! The converter and mode selector consume two async capabilities: "given
//! texts, return a fixed-width embedding matrix" and "given a prompt and a
//! schema, return structured JSON". Any implementation of
//! [`CapabilityProvider`] satisfies the contract - the HTTP client in
//! [`http`], the deterministic [`StubProvider`], or a test mock.

mod http;
mod stub;
mod types;

pub use http::HttpCapabilityProvider;
pub use stub::StubProvider;
pub use types::*;

use async_trait::async_trait;
use ndarray::Array2;
use serde_json::Value;

use crate::error::ProviderResult;

/// Async capability contract for embedding and structured-completion calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Embed each input text into a fixed-width numeric row.
    ///
    /// The returned matrix has one row per input string; every row has the
    /// same width.
    async fn generate_text_embeddings(&self, texts: &[String]) -> ProviderResult<Array2<f64>>;

    /// Produce structured JSON matching `schema` for the given prompt.
    async fn generate_structured_completion(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> ProviderResult<Value>;
}
