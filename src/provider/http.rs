use async_trait::async_trait;
use ndarray::Array2;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse};
use super::CapabilityProvider;
use crate::config::{ProviderConfig, RequestConfig};
use crate::error::{ProviderError, ProviderResult};

/// HTTP client for a remote embedding/LLM capability service
#[derive(Clone)]
pub struct HttpCapabilityProvider {
    client: Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    completion_model: String,
    request_config: RequestConfig,
}

impl HttpCapabilityProvider {
    /// Create a new provider client.
    ///
    /// Fails when no API key is configured; callers that want offline
    /// operation should use [`super::StubProvider`] or no provider at all.
    pub fn new(config: &ProviderConfig, request_config: RequestConfig) -> ProviderResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::Unavailable {
                message: "no API key configured".to_string(),
                retries: 0,
            })?;

        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ProviderError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            embedding_model: config.embedding_model.clone(),
            completion_model: config.completion_model.clone(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute_embeddings(
        &self,
        url: &str,
        request: &EmbeddingRequest,
    ) -> ProviderResult<EmbeddingResponse> {
        debug!(
            model = %request.model,
            inputs = request.input.len(),
            "Calling embeddings endpoint"
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                message: format!("Failed to parse embeddings response: {}", e),
            })
    }

    async fn execute_completion(
        &self,
        url: &str,
        request: &CompletionRequest,
    ) -> ProviderResult<CompletionResponse> {
        debug!(
            model = %request.model,
            prompt_len = request.prompt.len(),
            "Calling structured completion endpoint"
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                message: format!("Failed to parse completion response: {}", e),
            })
    }

    /// Assemble a rows x dim matrix from an embeddings response, rejecting
    /// ragged rows.
    fn matrix_from_response(
        response: EmbeddingResponse,
        expected_rows: usize,
    ) -> ProviderResult<Array2<f64>> {
        if response.data.len() != expected_rows {
            return Err(ProviderError::InvalidResponse {
                message: format!(
                    "Expected {} embedding rows, got {}",
                    expected_rows,
                    response.data.len()
                ),
            });
        }

        let dim = response
            .data
            .first()
            .map(|row| row.embedding.len())
            .unwrap_or(0);

        if dim == 0 {
            return Err(ProviderError::InvalidResponse {
                message: "Embedding rows are empty".to_string(),
            });
        }

        let mut rows = response.data;
        rows.sort_by_key(|r| r.index);

        let mut flat = Vec::with_capacity(expected_rows * dim);
        for row in &rows {
            if row.embedding.len() != dim {
                return Err(ProviderError::DimensionMismatch {
                    expected: dim,
                    actual: row.embedding.len(),
                });
            }
            flat.extend_from_slice(&row.embedding);
        }

        Array2::from_shape_vec((expected_rows, dim), flat).map_err(|e| {
            ProviderError::InvalidResponse {
                message: format!("Failed to shape embedding matrix: {}", e),
            }
        })
    }
}

#[async_trait]
impl CapabilityProvider for HttpCapabilityProvider {
    async fn generate_text_embeddings(&self, texts: &[String]) -> ProviderResult<Array2<f64>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let request = EmbeddingRequest::new(&self.embedding_model, texts.to_vec());

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying embeddings request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_embeddings(&url, &request).await {
                Ok(response) => {
                    let latency = start.elapsed();
                    info!(
                        inputs = texts.len(),
                        latency_ms = latency.as_millis(),
                        "Embeddings call succeeded"
                    );
                    return Self::matrix_from_response(response, texts.len());
                }
                Err(e) => {
                    let latency = start.elapsed();
                    error!(
                        error = %e,
                        latency_ms = latency.as_millis(),
                        retry = retries,
                        "Embeddings call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(ProviderError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    async fn generate_structured_completion(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> ProviderResult<Value> {
        let url = format!("{}/v1/completions/structured", self.base_url);
        let request = CompletionRequest::new(&self.completion_model, prompt, schema.clone());

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying structured completion request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_completion(&url, &request).await {
                Ok(response) => {
                    let latency = start.elapsed();
                    info!(
                        latency_ms = latency.as_millis(),
                        "Structured completion call succeeded"
                    );
                    return Ok(response.output);
                }
                Err(e) => {
                    let latency = start.elapsed();
                    error!(
                        error = %e,
                        latency_ms = latency.as_millis(),
                        retry = retries,
                        "Structured completion call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(ProviderError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }
}
