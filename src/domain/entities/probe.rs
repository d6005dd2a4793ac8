//! Redirect probe requests and results.

use std::time::Duration;

use super::redirect_rule::RuleId;

/// One HEAD probe to issue: the absolute source URL of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub rule_id: RuleId,
    pub url: String,
}

/// What a probe observed after following redirects.
///
/// Every field is optional so that partially captured responses can be
/// reported as incomplete rather than guessed at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    pub resulting_url: Option<String>,
    pub http_status: Option<u16>,
    pub redirect_count: Option<u32>,
}

impl ProbeResult {
    /// Creates a fully populated result.
    pub fn new(resulting_url: impl Into<String>, http_status: u16, redirect_count: u32) -> Self {
        Self {
            resulting_url: Some(resulting_url.into()),
            http_status: Some(http_status),
            redirect_count: Some(redirect_count),
        }
    }
}

/// Failure of a single probe. Never fatal to the batch it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("stopped after {0} redirects")]
    TooManyRedirects(u32),

    #[error("probe aborted: {0}")]
    Aborted(String),
}

/// Probe outcome for one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub rule_id: RuleId,
    pub outcome: Result<ProbeResult, ProbeError>,
}
