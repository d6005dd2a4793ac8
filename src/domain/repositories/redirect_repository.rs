//! Repository trait for redirect rule data access.

use std::fmt;
use std::str::FromStr;

use crate::domain::entities::{NewRedirectRule, RedirectRule, RuleId, RuleStatus};
use crate::error::AppError;
use async_trait::async_trait;

/// Row selection for counting and paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Status(RuleStatus),
}

impl StatusFilter {
    /// Returns true if a rule with `status` belongs to this selection.
    pub fn matches(&self, status: RuleStatus) -> bool {
        match self {
            Self::All => true,
            Self::Status(wanted) => *wanted == status,
        }
    }

    /// Status to filter on, `None` for all rows.
    pub fn status(&self) -> Option<RuleStatus> {
        match self {
            Self::All => None,
            Self::Status(status) => Some(*status),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Status(status) => f.write_str(status.as_str()),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            other => other.parse().map(Self::Status),
        }
    }
}

/// Repository interface for redirect rules.
///
/// Rules are keyed by a store-assigned id with a unique secondary index on
/// `from_hash`.
///
/// # Paging order
///
/// [`Self::page`] must return rows in a stable order: by destination post id
/// (URL destinations count as `0`), then by rule id. Callers rely on this to
/// compensate offsets when status updates move rows out of a filter.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgRedirectRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryRedirectRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedirectRepository: Send + Sync {
    /// Stores a new rule with status `unverified`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if a rule with the same `from_hash` exists.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn insert(&self, new_rule: NewRedirectRule) -> Result<RedirectRule, AppError>;

    /// Finds the rule for a normalized-path hash.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn find_by_hash(&self, from_hash: &str) -> Result<Option<RedirectRule>, AppError>;

    /// Finds a rule by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn find_by_id(&self, id: RuleId) -> Result<Option<RedirectRule>, AppError>;

    /// Sets the status of a rule.
    ///
    /// Idempotent: returns `Ok(true)` if the stored status changed and
    /// `Ok(false)` if it already had that value.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the rule does not exist.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn update_status(&self, id: RuleId, status: RuleStatus) -> Result<bool, AppError>;

    /// Counts rules matching a filter.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn count(&self, filter: StatusFilter) -> Result<i64, AppError>;

    /// Returns up to `limit` rules matching `filter`, skipping `offset` rows.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn page(
        &self,
        filter: StatusFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RedirectRule>, AppError>;

    /// Lists absolute (`http…`) URL destinations ordered by rule id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    async fn list_url_destinations(&self, offset: i64, limit: i64)
    -> Result<Vec<String>, AppError>;
}
