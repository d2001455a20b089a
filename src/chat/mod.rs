//! Retrieval-augmented chat
//!
//! The orchestrator drives one chat turn end to end: ownership check,
//! durable question write, similarity search, prompt assembly, and a
//! completion stream teed between the client and an accumulator that is
//! persisted when the stream ends cleanly.

pub mod framing;
pub mod orchestrator;
pub mod ports;
pub mod prompt;

pub use orchestrator::ChatOrchestrator;
pub use ports::{
    CallerIdentity, CompletionSource, DeltaStream, IdentityResolver, PromptMessage, PromptRole,
    ScoredChunk, SemanticIndex,
};
