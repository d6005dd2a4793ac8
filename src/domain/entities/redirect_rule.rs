//! Redirect rule entity mapping a legacy path to a destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::utils::url_hash::url_hash;
use crate::utils::url_normalizer::UrlNormalizationError;

/// Store-assigned rule identifier.
pub type RuleId = i64;

/// Verification state of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Unverified,
    Verified,
}

impl RuleStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Verified => "verified",
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unverified" => Ok(Self::Unverified),
            "verified" => Ok(Self::Verified),
            other => Err(format!("unknown rule status `{}`", other)),
        }
    }
}

/// Where a rule sends its visitors. Exactly one target kind per rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A post owned by the content system; resolved to its current permalink.
    Post(i64),
    /// A raw URL or site-relative path, used verbatim.
    Url(String),
}

impl Destination {
    /// Interprets a bulk-import target column.
    ///
    /// All-digit input is a post id; anything else must be a site-relative
    /// path or an absolute HTTP(S) URL.
    ///
    /// # Errors
    ///
    /// Returns [`UrlNormalizationError::InvalidUrl`] when the value is neither.
    pub fn parse(raw: &str) -> Result<Self, UrlNormalizationError> {
        let raw = raw.trim();

        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            return raw.parse::<i64>().map(Self::Post).map_err(|_| {
                UrlNormalizationError::InvalidUrl(format!("post id `{}` is out of range", raw))
            });
        }

        if raw.starts_with('/') && !raw.starts_with("//") {
            return Ok(Self::Url(raw.to_string()));
        }

        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
                Ok(Self::Url(raw.to_string()))
            }
            _ => Err(UrlNormalizationError::InvalidUrl(
                "Invalid redirect target; should be a post id or a URL".to_string(),
            )),
        }
    }

    /// Target post id, if any.
    pub fn post_id(&self) -> Option<i64> {
        match self {
            Self::Post(id) => Some(*id),
            Self::Url(_) => None,
        }
    }

    /// Paging sort key: the target post id, `0` for URL destinations.
    pub fn sort_key(&self) -> i64 {
        self.post_id().unwrap_or(0)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post(id) => write!(f, "{}", id),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// A stored redirect rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RedirectRule {
    pub id: RuleId,
    /// Normalized source path and query.
    pub from_path: String,
    /// Digest of `from_path`; unique across rules.
    pub from_hash: String,
    pub destination: Destination,
    pub status: RuleStatus,
    pub created_at: DateTime<Utc>,
}

impl RedirectRule {
    /// Creates a new RedirectRule instance.
    pub fn new(
        id: RuleId,
        from_path: String,
        from_hash: String,
        destination: Destination,
        status: RuleStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            from_path,
            from_hash,
            destination,
            status,
            created_at,
        }
    }
}

/// Input data for creating a new rule. Rules always start unverified.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRedirectRule {
    pub from_path: String,
    pub from_hash: String,
    pub destination: Destination,
}

impl NewRedirectRule {
    /// Builds an insert request for an already-normalized path.
    pub fn new(from_path: String, destination: Destination) -> Self {
        let from_hash = url_hash(&from_path);
        Self {
            from_path,
            from_hash,
            destination,
        }
    }
}
