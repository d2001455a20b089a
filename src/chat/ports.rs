//! Ports onto the hosted collaborators
//!
//! The orchestrator only sees these traits, so tests substitute
//! in-memory fakes and the process wires up real clients once at
//! startup.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// Resolved caller identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
    pub email: String,
}

/// Who is the caller, per request credential
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a session credential to an identity, `None` if invalid
    async fn resolve(&self, credential: &str) -> Result<Option<CallerIdentity>>;
}

/// One retrieved context chunk
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub content: String,
    pub score: f32,
}

/// Similarity search over a file's indexed content
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    /// Top-k chunks for `query` within `namespace`, best match first
    async fn similarity_search(
        &self,
        namespace: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

impl PromptRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptRole::System => "system",
            PromptRole::User => "user",
            PromptRole::Assistant => "assistant",
        }
    }
}

/// One message of an assembled prompt
#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

/// Finite, non-restartable sequence of completion text deltas
pub type DeltaStream = BoxStream<'static, Result<String>>;

/// Token-streaming completion oracle
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Start a deterministic (temperature zero) completion stream
    async fn stream_completion(&self, messages: Vec<PromptMessage>) -> Result<DeltaStream>;
}
