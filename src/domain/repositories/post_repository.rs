//! Repository trait for content-system posts.

use crate::domain::entities::Post;
use crate::error::AppError;
use async_trait::async_trait;

/// Read-only access to the posts redirect rules can target.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgPostRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryPostRepository`] - In-process implementation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Finds a post by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, AppError>;
}
