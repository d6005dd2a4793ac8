//! reqwest-based redirect prober.

use async_trait::async_trait;
use reqwest::{Client, header::LOCATION, redirect::Policy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::domain::entities::{ProbeError, ProbeRequest, ProbeResponse, ProbeResult};
use crate::domain::prober::RedirectProber;

/// Limits applied to a probe batch.
#[derive(Debug, Clone)]
pub struct ProberSettings {
    /// Upper bound on in-flight requests.
    pub max_concurrent: usize,
    /// Deadline for one probe, redirects included.
    pub timeout: Duration,
    /// Redirect hops followed before giving up.
    pub max_redirects: u32,
}

impl Default for ProberSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 100,
            timeout: Duration::from_secs(10),
            max_redirects: 10,
        }
    }
}

/// Issues HEAD probes and follows redirects hop by hop.
///
/// Redirects are followed manually so the hop count and the final URL are
/// observed exactly. A semaphore caps concurrent requests; excess probes wait
/// for a permit.
pub struct HttpProber {
    client: Client,
    semaphore: Arc<Semaphore>,
    settings: ProberSettings,
}

impl HttpProber {
    /// Builds a prober with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(settings: ProberSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(settings.timeout)
            .user_agent(concat!("legacy-redirector/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(settings.max_concurrent.max(1))),
            settings,
        })
    }

    async fn probe_one(
        client: Client,
        semaphore: Arc<Semaphore>,
        settings: ProberSettings,
        request: ProbeRequest,
    ) -> ProbeResponse {
        let outcome = match semaphore.acquire_owned().await {
            Ok(_permit) => {
                match tokio::time::timeout(
                    settings.timeout,
                    follow_redirects(&client, &request.url, &settings),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ProbeError::Timeout(settings.timeout)),
                }
            }
            Err(e) => Err(ProbeError::Aborted(e.to_string())),
        };

        metrics::counter!("legacy_redirect_probes_total", "outcome" => outcome_label(&outcome))
            .increment(1);

        if let Err(ref e) = outcome {
            debug!(rule_id = request.rule_id, url = %request.url, "Probe failed: {}", e);
        }

        ProbeResponse {
            rule_id: request.rule_id,
            outcome,
        }
    }
}

#[async_trait]
impl RedirectProber for HttpProber {
    async fn probe_batch(&self, requests: Vec<ProbeRequest>) -> Vec<ProbeResponse> {
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let rule_id = request.rule_id;
                let handle = tokio::spawn(Self::probe_one(
                    self.client.clone(),
                    self.semaphore.clone(),
                    self.settings.clone(),
                    request,
                ));
                (rule_id, handle)
            })
            .collect();

        let mut responses = Vec::with_capacity(handles.len());
        for (rule_id, handle) in handles {
            let response = handle.await.unwrap_or_else(|e| {
                warn!(rule_id, "Probe task failed: {}", e);
                ProbeResponse {
                    rule_id,
                    outcome: Err(ProbeError::Aborted(e.to_string())),
                }
            });
            responses.push(response);
        }

        responses
    }
}

/// Sends HEAD requests from `start` until a non-redirect response.
async fn follow_redirects(
    client: &Client,
    start: &str,
    settings: &ProberSettings,
) -> Result<ProbeResult, ProbeError> {
    let mut current =
        Url::parse(start).map_err(|e| ProbeError::InvalidUrl(format!("{}: {}", start, e)))?;
    let mut hops = 0u32;

    loop {
        let response = client
            .head(current.clone())
            .send()
            .await
            .map_err(|e| classify_error(e, settings.timeout))?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok());

        match location {
            Some(location) if status.is_redirection() => {
                if hops >= settings.max_redirects {
                    return Err(ProbeError::TooManyRedirects(hops));
                }
                current = current
                    .join(location)
                    .map_err(|e| ProbeError::InvalidUrl(format!("{}: {}", location, e)))?;
                hops += 1;
            }
            _ => return Ok(ProbeResult::new(current.to_string(), status.as_u16(), hops)),
        }
    }
}

fn classify_error(e: reqwest::Error, timeout: Duration) -> ProbeError {
    if e.is_timeout() {
        ProbeError::Timeout(timeout)
    } else if e.is_connect() {
        ProbeError::Connect(e.to_string())
    } else {
        ProbeError::Request(e.to_string())
    }
}

fn outcome_label(outcome: &Result<ProbeResult, ProbeError>) -> &'static str {
    match outcome {
        Ok(_) => "completed",
        Err(ProbeError::Timeout(_)) => "timeout",
        Err(ProbeError::Connect(_)) => "connect_error",
        Err(ProbeError::TooManyRedirects(_)) => "too_many_redirects",
        Err(_) => "error",
    }
}
