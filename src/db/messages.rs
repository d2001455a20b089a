//! Chat message records
//!
//! Messages are append-only: one user message per turn written before
//! retrieval, one assistant message written after the completion stream
//! ends cleanly.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Message record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub file_id: String,
    pub user_id: String,
    pub text: String,
    pub is_user_message: bool,
    pub created_at: String,
}

/// Message repository
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message for a file
    pub async fn create(
        &self,
        file_id: &str,
        user_id: &str,
        text: &str,
        is_user_message: bool,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO messages (id, file_id, user_id, text, is_user_message, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(file_id)
        .bind(user_id)
        .bind(text)
        .bind(is_user_message)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// The most recent `limit` messages for a file, oldest first
    ///
    /// This is the conversational context window: newest messages win,
    /// but they are presented in chronological order for the prompt.
    pub async fn recent_window(&self, file_id: &str, limit: i32) -> Result<Vec<Message>> {
        let mut messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, file_id, user_id, text, is_user_message, created_at
            FROM messages
            WHERE file_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(file_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    /// All messages for a file, oldest first
    pub async fn list_for_file(&self, file_id: &str) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, file_id, user_id, text, is_user_message, created_at
            FROM messages
            WHERE file_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_recent_window_keeps_newest_presents_oldest_first() {
        let pool = test_pool().await;
        let repo = MessageRepository::new(pool);

        for i in 0..8 {
            repo.create("f1", "u1", &format!("msg {}", i), i % 2 == 0)
                .await
                .unwrap();
            // Distinct created_at values for deterministic ordering
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let window = repo.recent_window("f1", 6).await.unwrap();
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].text, "msg 2");
        assert_eq!(window[5].text, "msg 7");

        let mut sorted = window.clone();
        sorted.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        assert_eq!(
            window.iter().map(|m| &m.id).collect::<Vec<_>>(),
            sorted.iter().map(|m| &m.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_window_scoped_to_file() {
        let pool = test_pool().await;
        let repo = MessageRepository::new(pool);

        repo.create("f1", "u1", "mine", true).await.unwrap();
        repo.create("f2", "u1", "other file", true).await.unwrap();

        let window = repo.recent_window("f1", 6).await.unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].text, "mine");
    }
}
