//! PostgreSQL implementation of the post repository.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::Post;
use crate::domain::repositories::PostRepository;
use crate::error::AppError;

/// Reads posts from the `posts` table kept in sync by the content system.
pub struct PgPostRepository {
    pool: Arc<PgPool>,
}

impl PgPostRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct PostRow {
    id: i64,
    status: String,
    post_type: String,
    permalink: String,
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, AppError> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, status, post_type, permalink FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| Post::new(r.id, r.status, r.post_type, r.permalink)))
    }
}
