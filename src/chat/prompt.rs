//! Prompt assembly
//!
//! Pure and deterministic: the same history, chunks and question always
//! produce the same prompt messages.

use crate::chat::ports::{PromptMessage, PromptRole, ScoredChunk};
use crate::db::Message;

const SYSTEM_INSTRUCTION: &str = "Use the following pieces of context (or previous conversation \
     if needed) to answer the users question in markdown format.";

/// Build the prompt for one chat turn
///
/// Layout: fixed system instruction, then a single user message carrying
/// the prior conversation, the retrieved context chunks joined by blank
/// lines in retrieval order, and the raw question.
pub fn assemble(history: &[Message], chunks: &[ScoredChunk], question: &str) -> Vec<PromptMessage> {
    let conversation = history
        .iter()
        .map(|m| {
            if m.is_user_message {
                format!("User: {}\n", m.text)
            } else {
                format!("Assistant: {}\n", m.text)
            }
        })
        .collect::<String>();

    let context = chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let user_content = format!(
        "{}\nIf you don't know the answer, just say that you don't know, \
         don't try to make up an answer.\n\n\
         ----------------\n\n\
         PREVIOUS CONVERSATION:\n{}\n\n\
         ----------------\n\n\
         CONTEXT:\n{}\n\n\
         USER INPUT: {}",
        SYSTEM_INSTRUCTION, conversation, context, question
    );

    vec![
        PromptMessage {
            role: PromptRole::System,
            content: SYSTEM_INSTRUCTION.to_string(),
        },
        PromptMessage {
            role: PromptRole::User,
            content: user_content,
        },
    ]
}
