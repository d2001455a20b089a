//! HTTP clients for the hosted collaborators
//!
//! Constructed once at startup and passed into the orchestrator behind
//! the port traits.

pub mod identity;
pub mod openai;
pub mod pinecone;

pub use identity::HostedIdentityResolver;
pub use openai::OpenAiClient;
pub use pinecone::PineconeIndex;
