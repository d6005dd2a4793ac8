//! Batch verification of stored redirect rules against live responses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};
use url::Url;

use crate::application::services::rule_validator::{RuleValidator, ValidationFailure};
use crate::domain::entities::{
    Destination, Mismatch, Post, ProbeRequest, RedirectExpectation, RedirectRule, RuleStatus,
    VerificationNotice, VerificationOutcome,
};
use crate::domain::prober::RedirectProber;
use crate::domain::repositories::{PostRepository, RedirectRepository, StatusFilter};
use crate::error::AppError;
use crate::infrastructure::cache::LookupCache;

const STATUS_UPDATE_ATTEMPTS: usize = 3;

/// How a verification pass builds and reports expectations.
#[derive(Debug, Clone)]
pub struct VerificationSettings {
    /// Public base URL of the site; relative paths are resolved against it.
    pub home_url: String,
    /// Expect `https` everywhere.
    pub force_tls: bool,
    /// Rules read, probed and updated per round.
    pub batch_size: i64,
    /// Also emit a notice for every verified rule.
    pub verbose: bool,
}

/// Result of preparing one rule for probing.
enum Precheck {
    Ready(RedirectExpectation),
    Rejected(ValidationFailure),
    /// The rule could not be checked this time; its status is left alone.
    Skipped(String),
}

/// Accumulated results of one batch, before any status is written.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub verified: usize,
    pub failed: usize,
    pub notices: Vec<VerificationNotice>,
    /// Rules whose stored status differs from the outcome.
    pub transitions: Vec<(RedirectRule, RuleStatus)>,
}

impl BatchOutcome {
    fn pass(&mut self, rule: &RedirectRule, verbose: bool) {
        self.verified += 1;
        if verbose {
            self.notices.push(notice(rule, "Verified"));
        }
        if rule.status != RuleStatus::Verified {
            self.transitions.push((rule.clone(), RuleStatus::Verified));
        }
    }

    fn fail(&mut self, rule: &RedirectRule, message: impl Into<String>) {
        self.failed += 1;
        self.notices.push(notice(rule, message));
        if rule.status != RuleStatus::Unverified {
            self.transitions.push((rule.clone(), RuleStatus::Unverified));
        }
    }
}

/// Summary of a verification pass.
#[derive(Debug, Default, Serialize)]
pub struct VerificationReport {
    /// Rules matching the filter when the pass started.
    pub total: i64,
    pub processed: usize,
    pub verified: usize,
    pub failed: usize,
    /// Rules moved to `verified`.
    pub promoted: usize,
    /// Rules moved back to `unverified`.
    pub demoted: usize,
    pub notices: Vec<VerificationNotice>,
    /// Status writes that failed after retries.
    pub update_failures: Vec<VerificationNotice>,
}

/// Drives validation, probing and status updates over the rule store.
pub struct VerificationService {
    redirects: Arc<dyn RedirectRepository>,
    posts: Arc<dyn PostRepository>,
    cache: Arc<dyn LookupCache>,
    prober: Arc<dyn RedirectProber>,
    validator: RuleValidator,
    settings: VerificationSettings,
}

impl VerificationService {
    pub fn new(
        redirects: Arc<dyn RedirectRepository>,
        posts: Arc<dyn PostRepository>,
        cache: Arc<dyn LookupCache>,
        prober: Arc<dyn RedirectProber>,
        validator: RuleValidator,
        settings: VerificationSettings,
    ) -> Self {
        Self {
            redirects,
            posts,
            cache,
            prober,
            validator,
            settings,
        }
    }

    /// Verifies every rule matching `filter`, one batch at a time.
    ///
    /// Status updates can move rules out of `filter` while the pass is paging
    /// through it; the next page offset is reduced by the number of rows that
    /// left, so each rule of the initial set is visited once.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the store cannot be read. Per-rule
    /// failures, including failed status writes, are collected in the report.
    pub async fn run(&self, filter: StatusFilter) -> Result<VerificationReport, AppError> {
        let batch_size = self.settings.batch_size.max(1);
        let mut report = VerificationReport {
            total: self.redirects.count(filter).await?,
            ..Default::default()
        };

        info!("Verifying {} redirects ({})", report.total, filter);

        let mut offset = 0i64;
        loop {
            let page = self.redirects.page(filter, offset, batch_size).await?;
            if page.is_empty() {
                break;
            }

            let page_len = page.len() as i64;
            let outcome = self.verify_batch(&page).await;
            let removed = self.apply(outcome, filter, &mut report).await;

            report.processed += page.len();
            offset += page_len - removed;

            debug!(
                processed = report.processed,
                total = report.total,
                removed,
                "Verification batch done"
            );

            if page_len < batch_size {
                break;
            }
        }

        info!(
            verified = report.verified,
            failed = report.failed,
            promoted = report.promoted,
            demoted = report.demoted,
            update_failures = report.update_failures.len(),
            "Verification finished"
        );

        Ok(report)
    }

    /// Validates, probes and classifies a batch of rules without writing.
    pub async fn verify_batch(&self, rules: &[RedirectRule]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut pending = Vec::new();

        for rule in rules {
            match self.precheck(rule).await {
                Precheck::Ready(expectation) => pending.push((rule, expectation)),
                Precheck::Rejected(failure) => outcome.fail(rule, failure.to_string()),
                Precheck::Skipped(reason) => outcome.notices.push(notice(rule, reason)),
            }
        }

        let requests = pending
            .iter()
            .map(|(rule, expectation)| ProbeRequest {
                rule_id: rule.id,
                url: expectation.source_url.clone(),
            })
            .collect();

        let mut results: HashMap<_, _> = self
            .prober
            .probe_batch(requests)
            .await
            .into_iter()
            .map(|response| (response.rule_id, response.outcome))
            .collect();

        for (rule, expectation) in pending {
            match results.remove(&rule.id) {
                Some(Ok(probe)) => match expectation.verify(&probe) {
                    VerificationOutcome::Verified => outcome.pass(rule, self.settings.verbose),
                    VerificationOutcome::Mismatch(mismatch) => {
                        outcome.fail(rule, mismatch.to_string())
                    }
                },
                Some(Err(e)) => outcome.fail(rule, format!("Probe failed: {}", e)),
                None => outcome.fail(rule, Mismatch::Incomplete.to_string()),
            }
        }

        outcome
    }

    /// Writes the batch transitions and folds the batch into the report.
    ///
    /// Returns the number of rules that left `filter`.
    async fn apply(
        &self,
        outcome: BatchOutcome,
        filter: StatusFilter,
        report: &mut VerificationReport,
    ) -> i64 {
        report.verified += outcome.verified;
        report.failed += outcome.failed;
        report.notices.extend(outcome.notices);

        let mut removed = 0;
        for (rule, status) in outcome.transitions {
            match self.write_status(&rule, status).await {
                Ok(changed) => {
                    if changed {
                        match status {
                            RuleStatus::Verified => report.promoted += 1,
                            RuleStatus::Unverified => report.demoted += 1,
                        }
                    }
                    if !filter.matches(status) {
                        removed += 1;
                    }
                }
                Err(e) => {
                    warn!("Could not update redirect {} to {}: {}", rule.id, status, e);
                    report.update_failures.push(notice(
                        &rule,
                        format!("Could not update redirect to {}: {}", status, e),
                    ));
                }
            }
        }

        removed
    }

    /// Sets a rule's status with retries, then drops its cache entry.
    async fn write_status(&self, rule: &RedirectRule, status: RuleStatus) -> Result<bool, AppError> {
        let strategy = ExponentialBackoff::from_millis(10)
            .max_delay(Duration::from_secs(1))
            .map(jitter)
            .take(STATUS_UPDATE_ATTEMPTS - 1);

        let changed = RetryIf::spawn(
            strategy,
            || self.redirects.update_status(rule.id, status),
            |e: &AppError| !e.is_not_found(),
        )
        .await?;

        if let Err(e) = self.cache.invalidate(&rule.from_hash).await {
            warn!("Cache invalidation failed for {}: {}", rule.from_hash, e);
        }

        metrics::counter!("legacy_redirect_status_updates_total", "status" => status.as_str())
            .increment(1);

        Ok(changed)
    }

    async fn precheck(&self, rule: &RedirectRule) -> Precheck {
        let post = match rule.destination {
            Destination::Post(id) => match self.posts.find_by_id(id).await {
                Ok(post) => post,
                Err(e) => return Precheck::Skipped(format!("Post lookup failed: {}", e)),
            },
            Destination::Url(_) => None,
        };

        if let Err(failure) = self.validator.validate(&rule.destination, post.as_ref()) {
            return Precheck::Rejected(failure);
        }

        match self.expectation(rule, post.as_ref()) {
            Ok(expectation) => Precheck::Ready(expectation),
            Err(reason) => Precheck::Skipped(reason),
        }
    }

    /// Builds the absolute source and expected URLs for a validated rule.
    fn expectation(
        &self,
        rule: &RedirectRule,
        post: Option<&Post>,
    ) -> Result<RedirectExpectation, String> {
        let home = Url::parse(&self.settings.home_url)
            .map_err(|e| format!("Invalid home URL {}: {}", self.settings.home_url, e))?;

        let source = home
            .join(&rule.from_path)
            .map_err(|e| format!("Invalid source {}: {}", rule.from_path, e))?;

        let expected = match (&rule.destination, post) {
            (Destination::Url(raw), _) if raw.starts_with('/') && !raw.starts_with("//") => {
                home.join(raw)
            }
            (Destination::Url(raw), _) => Url::parse(raw),
            (Destination::Post(_), Some(post)) => Url::parse(&post.permalink),
            (Destination::Post(id), None) => return Err(format!("Post {} not found", id)),
        }
        .map_err(|e| format!("Invalid target {}: {}", rule.destination, e))?;

        Ok(RedirectExpectation::new(
            self.canonical(source),
            self.canonical(expected),
        ))
    }

    fn canonical(&self, mut url: Url) -> String {
        if self.settings.force_tls
            && url.scheme() == "http"
            && url.set_scheme("https").is_err()
        {
            warn!("Could not upgrade {} to https", url);
        }
        url.to_string()
    }
}

fn notice(rule: &RedirectRule, message: impl Into<String>) -> VerificationNotice {
    VerificationNotice {
        id: rule.id,
        from_url: rule.from_path.clone(),
        to_url: rule.destination.to_string(),
        message: message.into(),
    }
}
