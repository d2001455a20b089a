//! OpenAI-compatible completion and embedding client

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest_eventsource::{Event as SseEvent, EventSource};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::chat::ports::{CompletionSource, DeltaStream, PromptMessage};
use crate::config::OpenAiConfig;
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, config: OpenAiConfig) -> Self {
        Self { http, config }
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration("OPENAI_API_KEY is not set".to_string()))
    }

    /// Embed a single text
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = self.api_key()?;
        let url = format!("{}/embeddings", self.config.api_base);

        let response: Value = self
            .http
            .post(&url)
            .bearer_auth(key)
            .json(&json!({
                "model": self.config.embedding_model,
                "input": text,
            }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("embedding request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Upstream(format!("embedding request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("embedding response invalid: {}", e)))?;

        let vector = response["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| AppError::Upstream("embedding response missing vector".to_string()))?
            .iter()
            .filter_map(|v| v.as_f64())
            .map(|v| v as f32)
            .collect();

        Ok(vector)
    }
}

#[async_trait]
impl CompletionSource for OpenAiClient {
    async fn stream_completion(&self, messages: Vec<PromptMessage>) -> Result<DeltaStream> {
        let key = self.api_key()?;
        let url = format!("{}/chat/completions", self.config.api_base);

        let body_messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect();

        let body = json!({
            "model": self.config.chat_model,
            "temperature": 0,
            "stream": true,
            "messages": body_messages,
        });

        let request = self
            .http
            .post(&url)
            .header(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| AppError::Internal(e.to_string()))?,
            )
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body.to_string());

        let mut source = EventSource::new(request)
            .map_err(|e| AppError::Upstream(format!("completion request failed: {}", e)))?;

        let (sender, receiver) = mpsc::channel::<Result<String>>(16);

        tokio::spawn(async move {
            while let Some(event) = source.next().await {
                match event {
                    Ok(SseEvent::Open) => {}
                    Ok(SseEvent::Message(message)) => {
                        if message.data.trim() == "[DONE]" {
                            source.close();
                            break;
                        }
                        let parsed: Value = match serde_json::from_str(&message.data) {
                            Ok(v) => v,
                            Err(e) => {
                                let _ = sender
                                    .send(Err(AppError::Upstream(format!(
                                        "completion chunk invalid: {}",
                                        e
                                    ))))
                                    .await;
                                source.close();
                                return;
                            }
                        };
                        if let Some(text) = parsed["choices"][0]["delta"]["content"].as_str() {
                            if sender.send(Ok(text.to_string())).await.is_err() {
                                // Receiver dropped, stop reading
                                source.close();
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        source.close();
                        let _ = sender
                            .send(Err(AppError::Upstream(format!(
                                "completion stream failed: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(receiver)))
    }
}
