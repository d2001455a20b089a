//! Chat turn orchestration
//!
//! One turn, in strict order: resolve caller, ownership-checked file
//! lookup, durable question write, retrieval + history (concurrent),
//! prompt assembly, completion stream. The completion is read exactly
//! once and teed: every delta goes to the client channel and into an
//! accumulator. The accumulator is persisted as the assistant message
//! only when the upstream stream ends cleanly; a client abort or an
//! upstream error leaves the question unanswered in the record.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::chat::ports::{
    CallerIdentity, CompletionSource, DeltaStream, IdentityResolver, SemanticIndex,
};
use crate::chat::prompt;
use crate::db::{FileRepository, MessageRepository};
use crate::error::{AppError, Result};

/// Retrieved context chunks per turn
const TOP_K: usize = 4;

/// Conversational history window per turn
const HISTORY_WINDOW: i32 = 6;

/// Orchestrates a chat turn against the ports and the record store
#[derive(Clone)]
pub struct ChatOrchestrator {
    pool: SqlitePool,
    messages: MessageRepository,
    identity: Arc<dyn IdentityResolver>,
    index: Arc<dyn SemanticIndex>,
    completion: Arc<dyn CompletionSource>,
}

impl ChatOrchestrator {
    pub fn new(
        pool: SqlitePool,
        identity: Arc<dyn IdentityResolver>,
        index: Arc<dyn SemanticIndex>,
        completion: Arc<dyn CompletionSource>,
    ) -> Self {
        let messages = MessageRepository::new(pool.clone());
        Self {
            pool,
            messages,
            identity,
            index,
            completion,
        }
    }

    /// Resolve the request credential to a caller identity
    pub async fn resolve_caller(&self, credential: &str) -> Result<CallerIdentity> {
        self.identity
            .resolve(credential)
            .await?
            .ok_or(AppError::Unauthenticated)
    }

    /// Run one chat turn, returning the assistant's delta stream
    ///
    /// The stream ends only after the assistant message has been
    /// persisted (on a clean upstream end) or abandoned (on error).
    pub async fn handle_chat_turn(
        &self,
        caller: &CallerIdentity,
        file_id: &str,
        question: &str,
    ) -> Result<DeltaStream> {
        let files = FileRepository::new(&self.pool);
        let file = files
            .get_for_owner(file_id, &caller.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        // The question is durable before anything else can fail
        self.messages
            .create(&file.id, &caller.user_id, question, true)
            .await?;

        // Retrieval and history are independent of each other
        let (chunks, history) = tokio::try_join!(
            self.index.similarity_search(&file.id, question, TOP_K),
            self.messages.recent_window(&file.id, HISTORY_WINDOW),
        )?;

        let prompt_messages = prompt::assemble(&history, &chunks, question);
        let mut upstream = self.completion.stream_completion(prompt_messages).await?;

        let (sender, receiver) = mpsc::channel::<Result<String>>(16);
        let messages = self.messages.clone();
        let owner_id = caller.user_id.clone();

        tokio::spawn(async move {
            let mut accumulated = String::new();

            while let Some(event) = upstream.next().await {
                match event {
                    Ok(delta) => {
                        accumulated.push_str(&delta);
                        if sender.send(Ok(delta)).await.is_err() {
                            // Client went away: no assistant message
                            tracing::debug!("chat stream aborted by client");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("completion stream failed: {}", e);
                        let _ = sender.send(Err(e)).await;
                        return;
                    }
                }
            }

            // Persist before dropping the sender so the client observes
            // end-of-stream only once the answer is durable.
            if let Err(e) = messages
                .create(&file.id, &owner_id, &accumulated, false)
                .await
            {
                tracing::error!("failed to persist assistant message: {}", e);
            }
        });

        Ok(Box::pin(ReceiverStream::new(receiver)))
    }
}
