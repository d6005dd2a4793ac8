//! Verification of probe results against expected destinations.

use serde::Serialize;
use std::fmt;

use super::probe::ProbeResult;
use super::redirect_rule::RuleId;

/// Why a probed redirect did not land where the rule says it should.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// The probe is missing its final URL, status or hop count.
    Incomplete,
    DidNotRedirect,
    TrailingSlashOnly,
    HttpError(u16),
    TooManyHops(u32),
    Generic(String),
}

impl Mismatch {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::DidNotRedirect => "did-not-redirect",
            Self::TrailingSlashOnly => "trailing-slash-only",
            Self::HttpError(_) => "http-error",
            Self::TooManyHops(_) => "too-many-hops",
            Self::Generic(_) => "redirect-mismatch",
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete => f.write_str("Incomplete probe result."),
            Self::DidNotRedirect => f.write_str("Did not redirect."),
            Self::TrailingSlashOnly => {
                f.write_str("Did not redirect to new page (only to add trailing slash).")
            }
            Self::HttpError(status) => write!(f, "Returned {}.", status),
            Self::TooManyHops(count) => write!(f, "Redirected {} times.", count),
            Self::Generic(url) => write!(f, "Mismatch: redirected to {}", url),
        }
    }
}

/// Result of checking one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Mismatch(Mismatch),
}

/// Absolute URLs a rule is expected to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectExpectation {
    /// URL the probe starts from.
    pub source_url: String,
    /// URL the probe must end on.
    pub expected_url: String,
}

impl RedirectExpectation {
    pub fn new(source_url: impl Into<String>, expected_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            expected_url: expected_url.into(),
        }
    }

    /// Classifies a probe result. The first matching rule wins:
    ///
    /// 1. missing probe field → `Incomplete`
    /// 2. landed on the expected URL → `Verified`
    /// 3. stayed on the source URL → `DidNotRedirect`
    /// 4. only gained a trailing slash → `TrailingSlashOnly`
    /// 5. final status other than 200 → `HttpError`
    /// 6. more than one hop → `TooManyHops`
    /// 7. anything else → `Generic`
    pub fn verify(&self, probe: &ProbeResult) -> VerificationOutcome {
        let (Some(resulting_url), Some(status), Some(hops)) = (
            probe.resulting_url.as_deref(),
            probe.http_status,
            probe.redirect_count,
        ) else {
            return VerificationOutcome::Mismatch(Mismatch::Incomplete);
        };

        let mismatch = if resulting_url == self.expected_url {
            return VerificationOutcome::Verified;
        } else if resulting_url == self.source_url {
            Mismatch::DidNotRedirect
        } else if resulting_url.strip_suffix('/') == Some(self.source_url.as_str()) {
            Mismatch::TrailingSlashOnly
        } else if status != 200 {
            Mismatch::HttpError(status)
        } else if hops > 1 {
            Mismatch::TooManyHops(hops)
        } else {
            Mismatch::Generic(resulting_url.to_string())
        };

        VerificationOutcome::Mismatch(mismatch)
    }
}

/// Diagnostic record produced during verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationNotice {
    pub id: RuleId,
    pub from_url: String,
    pub to_url: String,
    pub message: String,
}
