//! Port for issuing redirect probes.

use async_trait::async_trait;

use crate::domain::entities::{ProbeRequest, ProbeResponse};

/// Issues HEAD probes for a batch of rules.
///
/// # Contract
///
/// - Exactly one response per request, in request order
/// - Individual failures are reported per rule, never as a batch error
/// - The call returns once every probe has completed, failed or timed out
///
/// # Implementations
///
/// - [`crate::infrastructure::http::HttpProber`] - reqwest-based prober
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedirectProber: Send + Sync {
    async fn probe_batch(&self, requests: Vec<ProbeRequest>) -> Vec<ProbeResponse>;
}
