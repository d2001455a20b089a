//! Vector index client
//!
//! Embeds the query text, then runs a namespaced similarity query
//! against a Pinecone-style index. One namespace per file.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::chat::ports::{ScoredChunk, SemanticIndex};
use crate::clients::OpenAiClient;
use crate::config::IndexConfig;
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct PineconeIndex {
    http: reqwest::Client,
    config: IndexConfig,
    embedder: OpenAiClient,
}

impl PineconeIndex {
    pub fn new(http: reqwest::Client, config: IndexConfig, embedder: OpenAiClient) -> Self {
        Self {
            http,
            config,
            embedder,
        }
    }
}

#[async_trait]
impl SemanticIndex for PineconeIndex {
    async fn similarity_search(
        &self,
        namespace: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let vector = self.embedder.embed(query).await?;

        let url = format!("{}/query", self.config.host);
        let mut request = self.http.post(&url).json(&json!({
            "namespace": namespace,
            "topK": k,
            "vector": vector,
            "includeMetadata": true,
        }));
        if let Some(key) = &self.config.api_key {
            request = request.header("Api-Key", key);
        }

        let response: Value = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("index query failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Upstream(format!("index query failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("index response invalid: {}", e)))?;

        let matches = response["matches"]
            .as_array()
            .ok_or_else(|| AppError::Upstream("index response missing matches".to_string()))?;

        // The index returns matches best-first; order is preserved as-is
        let chunks = matches
            .iter()
            .filter_map(|m| {
                let content = m["metadata"]["text"].as_str()?;
                Some(ScoredChunk {
                    content: content.to_string(),
                    score: m["score"].as_f64().unwrap_or(0.0) as f32,
                })
            })
            .collect();

        Ok(chunks)
    }
}
