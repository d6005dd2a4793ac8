//! Structural checks for candidate redirect rules.

use url::Url;

use crate::domain::entities::{Destination, Post};

/// Why a rule's destination cannot be served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("Redirect target host `{0}` is not allowed.")]
    DisallowedHost(String),

    #[error("Redirect target `{0}` is not a valid URL.")]
    InvalidTarget(String),

    #[error("Attempting to redirect to a nonexistent post id.")]
    NonexistentParent,

    #[error("Attempting to redirect to an unpublished post.")]
    UnpublishedTarget,

    #[error("Attempting to redirect to a private post type: {0}")]
    PrivatePostType(String),
}

impl ValidationFailure {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DisallowedHost(_) => "disallowed-host",
            Self::InvalidTarget(_) => "invalid-target",
            Self::NonexistentParent => "no-parent-post",
            Self::UnpublishedTarget => "unpublished-post",
            Self::PrivatePostType(_) => "private-post-type",
        }
    }
}

/// Checks that a destination is allowed and reachable.
///
/// The site's own host is always allowed; other hosts must be listed
/// explicitly. Post destinations must exist, be published (attachments in any
/// status) and have a public post type.
#[derive(Debug, Clone)]
pub struct RuleValidator {
    home_host: Option<String>,
    allowed_hosts: Vec<String>,
    public_post_types: Vec<String>,
}

impl RuleValidator {
    pub fn new(home_url: &str, allowed_hosts: &[String], public_post_types: &[String]) -> Self {
        let home_host = Url::parse(home_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase));

        Self {
            home_host,
            allowed_hosts: allowed_hosts
                .iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            public_post_types: public_post_types.to_vec(),
        }
    }

    /// Validates a destination.
    ///
    /// `post` is the looked-up target for [`Destination::Post`] and is ignored
    /// for URL destinations.
    pub fn validate(
        &self,
        destination: &Destination,
        post: Option<&Post>,
    ) -> Result<(), ValidationFailure> {
        match destination {
            Destination::Url(raw) => self.validate_url(raw),
            Destination::Post(id) => self.validate_post(*id, post),
        }
    }

    fn validate_url(&self, raw: &str) -> Result<(), ValidationFailure> {
        if raw.starts_with('/') && !raw.starts_with("//") {
            return Ok(());
        }

        let url = Url::parse(raw).map_err(|_| ValidationFailure::InvalidTarget(raw.to_string()))?;
        let host = url
            .host_str()
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ValidationFailure::InvalidTarget(raw.to_string()))?;

        if self.is_allowed_host(&host) {
            Ok(())
        } else {
            Err(ValidationFailure::DisallowedHost(host))
        }
    }

    fn validate_post(&self, id: i64, post: Option<&Post>) -> Result<(), ValidationFailure> {
        let post = match post {
            Some(post) if id > 0 && post.id == id => post,
            _ => return Err(ValidationFailure::NonexistentParent),
        };

        if !post.is_published() && !post.is_attachment() {
            return Err(ValidationFailure::UnpublishedTarget);
        }

        if !self.public_post_types.contains(&post.post_type) {
            return Err(ValidationFailure::PrivatePostType(post.post_type.clone()));
        }

        Ok(())
    }

    fn is_allowed_host(&self, host: &str) -> bool {
        self.home_host.as_deref() == Some(host) || self.allowed_hosts.iter().any(|h| h == host)
    }
}
