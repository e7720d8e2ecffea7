// src/db/post_repository.rs
// DOCUMENTATION: Post database operations
// PURPOSE: Persist village posts and read back backlogs

use crate::errors::VillageError;
use crate::models::Post;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostRepository;

impl PostRepository {
    pub async fn create(
        pool: &PgPool,
        author_id: Option<Uuid>,
        student_id: Uuid,
        original_text: &str,
        html_text: &str,
        from_sms: bool,
        to_sms: bool,
    ) -> Result<Post, VillageError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (author_id, student_id, original_text, html_text, from_sms, to_sms)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(author_id)
        .bind(student_id)
        .bind(original_text)
        .bind(html_text)
        .bind(from_sms)
        .bind(to_sms)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            log::error!("Failed to create post in village {}: {}", student_id, e);
            VillageError::DatabaseError(e.to_string())
        })?;

        Ok(post)
    }

    /// Latest `limit` posts of a village, oldest first
    pub async fn backlog(pool: &PgPool, student_id: Uuid, limit: i64) -> Result<Vec<Post>, VillageError> {
        let mut posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT * FROM posts
            WHERE student_id = $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(student_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            log::error!("Failed to fetch posts for village {}: {}", student_id, e);
            VillageError::DatabaseError(e.to_string())
        })?;

        posts.reverse();
        Ok(posts)
    }
}
