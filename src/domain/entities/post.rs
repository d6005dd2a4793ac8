//! Post entity owned by the content system.

/// Status of a publicly visible post.
pub const STATUS_PUBLISH: &str = "publish";

/// Post type that is reachable in any status (it inherits its parent's).
pub const TYPE_ATTACHMENT: &str = "attachment";

/// A post that a redirect rule can point at.
///
/// Only the fields the redirector needs are modelled; the content system
/// remains the owner of the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub status: String,
    pub post_type: String,
    /// Current canonical URL of the post.
    pub permalink: String,
}

impl Post {
    /// Creates a new Post instance.
    pub fn new(
        id: i64,
        status: impl Into<String>,
        post_type: impl Into<String>,
        permalink: impl Into<String>,
    ) -> Self {
        Self {
            id,
            status: status.into(),
            post_type: post_type.into(),
            permalink: permalink.into(),
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == STATUS_PUBLISH
    }

    pub fn is_attachment(&self) -> bool {
        self.post_type == TYPE_ATTACHMENT
    }
}
