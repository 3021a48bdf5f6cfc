use async_trait::async_trait;
use ndarray::Array2;
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::CapabilityProvider;
use crate::error::ProviderResult;

/// Deterministic in-process capability provider.
///
/// Embeddings are seeded from a hash of the input text, so the same text
/// always maps to the same unit-length row. Useful for tests and for
/// running the pipeline offline.
#[derive(Debug, Clone)]
pub struct StubProvider {
    dim: usize,
}

impl StubProvider {
    /// Create a stub with the given embedding width.
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f64> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish() | 1;

        let mut row = Vec::with_capacity(self.dim);
        for _ in 0..self.dim {
            // xorshift over the text hash; values in [-1, 1]
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            row.push((state as f64 / u64::MAX as f64) * 2.0 - 1.0);
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut row {
                *v /= norm;
            }
        }
        row
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl CapabilityProvider for StubProvider {
    async fn generate_text_embeddings(&self, texts: &[String]) -> ProviderResult<Array2<f64>> {
        let mut flat = Vec::with_capacity(texts.len() * self.dim);
        for text in texts {
            flat.extend(self.embed_one(text));
        }
        Ok(Array2::from_shape_vec((texts.len(), self.dim), flat)
            .unwrap_or_else(|_| Array2::zeros((0, self.dim))))
    }

    async fn generate_structured_completion(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> ProviderResult<Value> {
        // Canned reply: echoes the request shape without claiming to satisfy
        // the schema. Callers with real parsing requirements fall back.
        Ok(json!({
            "stub": true,
            "prompt_chars": prompt.len(),
            "schema_kind": schema.get("type").cloned().unwrap_or(Value::Null),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_embeddings_are_deterministic() {
        let stub = StubProvider::new(8);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let a = stub.generate_text_embeddings(&texts).await.unwrap();
        let b = stub.generate_text_embeddings(&texts).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.nrows(), 2);
        assert_eq!(a.ncols(), 8);
    }

    #[tokio::test]
    async fn test_stub_embeddings_are_unit_length() {
        let stub = StubProvider::new(12);
        let texts = vec!["some entity text".to_string()];
        let m = stub.generate_text_embeddings(&texts).await.unwrap();
        let norm: f64 = m.row(0).iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stub_distinct_texts_distinct_rows() {
        let stub = StubProvider::new(8);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let m = stub.generate_text_embeddings(&texts).await.unwrap();
        assert_ne!(m.row(0).to_vec(), m.row(1).to_vec());
    }

    #[tokio::test]
    async fn test_stub_completion_is_canned() {
        let stub = StubProvider::default();
        let out = stub
            .generate_structured_completion("pick a mode", &json!({"type": "object"}))
            .await
            .unwrap();
        assert_eq!(out["stub"], json!(true));
        assert_eq!(out["schema_kind"], json!("object"));
    }

    #[tokio::test]
    async fn test_stub_empty_input() {
        let stub = StubProvider::new(4);
        let m = stub.generate_text_embeddings(&[]).await.unwrap();
        assert_eq!(m.nrows(), 0);
    }
}
