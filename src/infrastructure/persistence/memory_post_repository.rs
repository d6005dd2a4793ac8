//! In-process implementation of the post repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::entities::Post;
use crate::domain::repositories::PostRepository;
use crate::error::AppError;

/// Posts held in memory, seeded by the caller.
#[derive(Default)]
pub struct MemoryPostRepository {
    posts: RwLock<HashMap<i64, Post>>,
}

impl MemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a post.
    pub async fn upsert(&self, post: Post) {
        self.posts.write().await.insert(post.id, post);
    }

    /// Removes a post, returning it if it existed.
    pub async fn remove(&self, id: i64) -> Option<Post> {
        self.posts.write().await.remove(&id)
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, AppError> {
        Ok(self.posts.read().await.get(&id).cloned())
    }
}
