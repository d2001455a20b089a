//! Uploaded file records
//!
//! Every read is scoped by owner. A file is never returned for a caller
//! who does not own it, so a foreign caller cannot distinguish "absent"
//! from "not mine".

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// File record
///
/// The id doubles as the vector-index namespace for this file's chunks.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct File {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: String,
}

/// File repository
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a file, only if the caller owns it
    pub async fn get_for_owner(&self, file_id: &str, owner_id: &str) -> Result<Option<File>> {
        let file = sqlx::query_as::<_, File>(
            r#"
            SELECT id, user_id, name, created_at
            FROM files
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(file_id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List a user's files
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<File>> {
        let files = sqlx::query_as::<_, File>(
            r#"
            SELECT id, user_id, name, created_at
            FROM files
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Record a file (created by the upload pipeline)
    pub async fn create(&self, owner_id: &str, name: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO files (id, user_id, name, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(owner_id)
        .bind(name)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_ownership_scoping() {
        let pool = test_pool().await;
        let repo = FileRepository::new(&pool);

        let file_id = repo.create("owner", "contract.pdf").await.unwrap();

        assert!(repo
            .get_for_owner(&file_id, "owner")
            .await
            .unwrap()
            .is_some());

        // A different caller gets the same answer as for a missing file
        assert!(repo
            .get_for_owner(&file_id, "intruder")
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .get_for_owner("no-such-file", "owner")
            .await
            .unwrap()
            .is_none());
    }
}
