//! Redirect resolution, rule creation and bulk import.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::application::services::rule_validator::RuleValidator;
use crate::domain::entities::{Destination, NewRedirectRule, RedirectRule};
use crate::domain::repositories::{PostRepository, RedirectRepository};
use crate::error::AppError;
use crate::infrastructure::cache::{CachedLookup, LookupCache};
use crate::utils::query_args::{append_query_args, extract_preserved_params};
use crate::utils::url_hash::url_hash;
use crate::utils::url_normalizer::normalize_path;

const DOMAIN_SCAN_PAGE_SIZE: i64 = 1000;

/// Resolver behaviour toggles.
#[derive(Debug, Clone, Default)]
pub struct ResolverSettings {
    /// Query parameters carried from the request to the redirect target.
    pub preserved_params: Vec<String>,
    /// Validate post destinations when rules are created.
    pub strict_post_verification: bool,
}

/// Options for [`RedirectService::import`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Silently skip sources that already have a rule.
    pub skip_duplicates: bool,
    /// Normalize and check every row without writing.
    pub dry_run: bool,
}

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    /// 1-based position in the input.
    pub row: usize,
    pub from: String,
    pub to: String,
    pub reason: String,
}

/// Accumulated result of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Rules written, or that would be written on a dry run.
    pub inserted: usize,
    /// Duplicates skipped because of [`ImportOptions::skip_duplicates`].
    pub skipped: usize,
    /// Duplicate rows reported back to the caller.
    pub duplicates: Vec<ImportFailure>,
    pub failures: Vec<ImportFailure>,
}

/// Service behind the live redirect path and rule management.
///
/// Lookups go through the [`LookupCache`] first and fall back to the store;
/// every store write invalidates the affected cache entry before returning.
pub struct RedirectService {
    redirects: Arc<dyn RedirectRepository>,
    posts: Arc<dyn PostRepository>,
    cache: Arc<dyn LookupCache>,
    validator: RuleValidator,
    settings: ResolverSettings,
}

impl RedirectService {
    pub fn new(
        redirects: Arc<dyn RedirectRepository>,
        posts: Arc<dyn PostRepository>,
        cache: Arc<dyn LookupCache>,
        validator: RuleValidator,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            redirects,
            posts,
            cache,
            validator,
            settings,
        }
    }

    /// Resolves a request URL to its redirect target.
    ///
    /// Returns `None` when no rule matches, when the matched rule or its
    /// target post has disappeared, or when the store cannot be reached.
    /// Preserved query parameters are stripped before the lookup and
    /// re-appended to the target.
    pub async fn resolve(&self, raw_url: &str) -> Option<String> {
        let normalized = match normalize_path(raw_url) {
            Ok(path) => path,
            Err(e) => {
                debug!("Not resolving {:?}: {}", raw_url, e);
                return None;
            }
        };

        let (lookup_path, preserved) =
            extract_preserved_params(&normalized, &self.settings.preserved_params);
        let hash = url_hash(&lookup_path);

        let Some(rule) = self.lookup(&hash).await else {
            metrics::counter!("legacy_redirect_lookups_total", "result" => "miss").increment(1);
            return None;
        };

        let target = self.target_for(&rule).await?;
        metrics::counter!("legacy_redirect_lookups_total", "result" => "hit").increment(1);

        Some(append_query_args(&target, &preserved))
    }

    /// Creates a rule from a raw `(from, to)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if either side is invalid.
    /// Returns [`AppError::Conflict`] if a rule for the source already exists.
    pub async fn insert_pair(&self, from: &str, to: &str) -> Result<RedirectRule, AppError> {
        let destination = Destination::parse(to).map_err(|e| {
            AppError::bad_request(e.to_string(), json!({ "to": to }))
        })?;
        self.insert(from, destination).await
    }

    /// Creates a rule with status `unverified`.
    ///
    /// With strict post verification enabled, post destinations must pass the
    /// [`RuleValidator`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `from` does not normalize or the
    /// target post is rejected.
    /// Returns [`AppError::Conflict`] if a rule for the normalized source
    /// already exists; the stored rule is left untouched.
    pub async fn insert(
        &self,
        from: &str,
        destination: Destination,
    ) -> Result<RedirectRule, AppError> {
        let new_rule = self.prepare(from, destination).await?;
        let hash = new_rule.from_hash.clone();

        let rule = self.redirects.insert(new_rule).await?;
        self.invalidate(&hash).await;

        info!(id = rule.id, from = %rule.from_path, to = %rule.destination, "Redirect rule created");
        Ok(rule)
    }

    /// Imports `(from, to)` pairs, reporting per-row outcomes.
    ///
    /// Duplicates, both against the store and within the input, never abort
    /// the import.
    pub async fn import<I>(&self, pairs: I, options: ImportOptions) -> ImportReport
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut report = ImportReport::default();
        let mut seen = HashSet::new();

        for (index, (from, to)) in pairs.into_iter().enumerate() {
            let row = index + 1;
            let failure = |reason: String| ImportFailure {
                row,
                from: from.clone(),
                to: to.clone(),
                reason,
            };

            let prepared = match Destination::parse(&to) {
                Ok(destination) => self.prepare(&from, destination).await,
                Err(e) => Err(AppError::bad_request(e.to_string(), json!({ "to": to }))),
            };

            let outcome = match prepared {
                Ok(new_rule) if !seen.insert(new_rule.from_hash.clone()) => {
                    Err(AppError::duplicate_rule(&new_rule.from_path))
                }
                Ok(_) if options.dry_run => {
                    report.inserted += 1;
                    continue;
                }
                Ok(new_rule) => {
                    let hash = new_rule.from_hash.clone();
                    let inserted = self.redirects.insert(new_rule).await;
                    if inserted.is_ok() {
                        self.invalidate(&hash).await;
                    }
                    inserted.map(|_| ())
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => report.inserted += 1,
                Err(e) if e.is_conflict() && options.skip_duplicates => {
                    debug!("Redirect for {} already exists. Skipping", from);
                    report.skipped += 1;
                }
                Err(e) if e.is_conflict() => report.duplicates.push(failure(e.to_string())),
                Err(e) => {
                    warn!("Couldn't insert {} -> {}: {}", from, to, e);
                    report.failures.push(failure(e.to_string()));
                }
            }
        }

        report
    }

    /// Lists the distinct hosts of absolute URL destinations.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    pub async fn find_domains(&self) -> Result<BTreeSet<String>, AppError> {
        let mut hosts = BTreeSet::new();
        let mut offset = 0;

        loop {
            let urls = self
                .redirects
                .list_url_destinations(offset, DOMAIN_SCAN_PAGE_SIZE)
                .await?;

            hosts.extend(
                urls.iter()
                    .filter_map(|raw| Url::parse(raw).ok())
                    .filter_map(|url| url.host_str().map(str::to_ascii_lowercase)),
            );

            if (urls.len() as i64) < DOMAIN_SCAN_PAGE_SIZE {
                break;
            }
            offset += DOMAIN_SCAN_PAGE_SIZE;
        }

        Ok(hosts)
    }

    /// Normalizes and checks a candidate rule without writing it.
    async fn prepare(
        &self,
        from: &str,
        destination: Destination,
    ) -> Result<NewRedirectRule, AppError> {
        let from_path = normalize_path(from).map_err(|e| {
            AppError::bad_request(e.to_string(), json!({ "from": from }))
        })?;

        if self.settings.strict_post_verification
            && let Destination::Post(id) = destination
        {
            let post = self.posts.find_by_id(id).await?;
            self.validator
                .validate(&destination, post.as_ref())
                .map_err(|f| {
                    AppError::bad_request(f.to_string(), json!({ "code": f.code(), "to": id }))
                })?;
        }

        let new_rule = NewRedirectRule::new(from_path, destination);

        if self
            .redirects
            .find_by_hash(&new_rule.from_hash)
            .await?
            .is_some()
        {
            return Err(AppError::duplicate_rule(&new_rule.from_path));
        }

        Ok(new_rule)
    }

    /// Finds the rule for a hash, consulting the cache first.
    async fn lookup(&self, hash: &str) -> Option<RedirectRule> {
        let cached = self.cache.get(hash).await.unwrap_or_else(|e| {
            warn!("Cache read failed for {}: {}", hash, e);
            None
        });

        match cached {
            Some(CachedLookup::Missing) => None,
            Some(CachedLookup::Rule(id)) => match self.redirects.find_by_id(id).await {
                Ok(Some(rule)) if rule.from_hash == hash => Some(rule),
                Ok(_) => {
                    self.mark_missing(hash).await;
                    None
                }
                Err(e) => {
                    error!("Redirect lookup failed for rule {}: {}", id, e);
                    None
                }
            },
            None => match self.redirects.find_by_hash(hash).await {
                Ok(Some(rule)) => {
                    if let Err(e) = self
                        .cache
                        .put_if_absent(hash, CachedLookup::Rule(rule.id))
                        .await
                    {
                        warn!("Cache write failed for {}: {}", hash, e);
                    }
                    Some(rule)
                }
                Ok(None) => self.cache_missing(hash).await,
                Err(e) => {
                    error!("Redirect lookup failed for {}: {}", hash, e);
                    None
                }
            },
        }
    }

    /// Caches a negative lookup, then re-reads the store.
    ///
    /// An insert landing between the first read and the cache write has
    /// already run its invalidation, so the re-read is what catches it.
    async fn cache_missing(&self, hash: &str) -> Option<RedirectRule> {
        match self.cache.put_if_absent(hash, CachedLookup::Missing).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!("Cache write failed for {}: {}", hash, e);
                return None;
            }
        }

        match self.redirects.find_by_hash(hash).await {
            Ok(Some(rule)) => {
                debug!("Rule {} appeared while caching a miss for {}", rule.id, hash);
                if let Err(e) = self.cache.set(hash, CachedLookup::Rule(rule.id)).await {
                    warn!("Cache write failed for {}: {}", hash, e);
                    self.invalidate(hash).await;
                }
                Some(rule)
            }
            Ok(None) => None,
            Err(e) => {
                error!("Redirect lookup failed for {}: {}", hash, e);
                self.invalidate(hash).await;
                None
            }
        }
    }

    /// Resolves a rule's destination to a URL.
    async fn target_for(&self, rule: &RedirectRule) -> Option<String> {
        match &rule.destination {
            Destination::Url(url) => Some(url.clone()),
            Destination::Post(post_id) => match self.posts.find_by_id(*post_id).await {
                Ok(Some(post)) => Some(post.permalink),
                Ok(None) => {
                    debug!("Rule {} targets missing post {}", rule.id, post_id);
                    self.mark_missing(&rule.from_hash).await;
                    None
                }
                Err(e) => {
                    error!("Post lookup failed for {}: {}", post_id, e);
                    None
                }
            },
        }
    }

    async fn mark_missing(&self, hash: &str) {
        if let Err(e) = self.cache.set(hash, CachedLookup::Missing).await {
            warn!("Cache write failed for {}: {}", hash, e);
        }
    }

    async fn invalidate(&self, hash: &str) {
        if let Err(e) = self.cache.invalidate(hash).await {
            warn!("Cache invalidation failed for {}: {}", hash, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Post, RuleStatus};
    use crate::domain::repositories::{MockPostRepository, MockRedirectRepository};
    use crate::infrastructure::cache::{MemoryCache, MockLookupCache};
    use chrono::Utc;

    fn validator() -> RuleValidator {
        RuleValidator::new(
            "https://example.com",
            &[],
            &["post".to_string(), "page".to_string()],
        )
    }

    fn service(
        redirects: MockRedirectRepository,
        posts: MockPostRepository,
        cache: Arc<dyn LookupCache>,
        settings: ResolverSettings,
    ) -> RedirectService {
        RedirectService::new(
            Arc::new(redirects),
            Arc::new(posts),
            cache,
            validator(),
            settings,
        )
    }

    fn stored_rule(id: i64, path: &str, destination: Destination) -> RedirectRule {
        RedirectRule::new(
            id,
            path.to_string(),
            url_hash(path),
            destination,
            RuleStatus::Unverified,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_resolve_url_destination_and_cache_result() {
        let mut redirects = MockRedirectRepository::new();
        let rule = stored_rule(1, "/old", Destination::Url("https://example.com/new".to_string()));
        redirects
            .expect_find_by_hash()
            .withf(|hash| hash == url_hash("/old"))
            .times(1)
            .returning(move |_| Ok(Some(rule.clone())));

        let cache = Arc::new(MemoryCache::new());
        let service = service(
            redirects,
            MockPostRepository::new(),
            cache.clone(),
            ResolverSettings::default(),
        );

        assert_eq!(
            service.resolve("/old").await.as_deref(),
            Some("https://example.com/new")
        );
        assert_eq!(
            cache.get(&url_hash("/old")).await.unwrap(),
            Some(CachedLookup::Rule(1))
        );
    }

    #[tokio::test]
    async fn test_resolve_caches_negative_result() {
        let mut redirects = MockRedirectRepository::new();
        // One read plus the confirming re-read after the negative entry lands.
        redirects
            .expect_find_by_hash()
            .times(2)
            .returning(|_| Ok(None));

        let cache = Arc::new(MemoryCache::new());
        let service = service(
            redirects,
            MockPostRepository::new(),
            cache.clone(),
            ResolverSettings::default(),
        );

        assert!(service.resolve("/nothing").await.is_none());
        // Second call is answered by the negative entry.
        assert!(service.resolve("/nothing").await.is_none());
        assert_eq!(
            cache.get(&url_hash("/nothing")).await.unwrap(),
            Some(CachedLookup::Missing)
        );
    }

    #[tokio::test]
    async fn test_resolve_rule_inserted_during_miss_is_not_cached_as_missing() {
        // The insert (and its invalidation of an empty slot) commits between
        // the first store read and the negative cache write.
        let rule = stored_rule(9, "/late", Destination::Url("/arrived".to_string()));
        let mut redirects = MockRedirectRepository::new();
        let mut seq = mockall::Sequence::new();
        redirects
            .expect_find_by_hash()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        redirects
            .expect_find_by_hash()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(Some(rule.clone())));

        let cache = Arc::new(MemoryCache::new());
        let service = service(
            redirects,
            MockPostRepository::new(),
            cache.clone(),
            ResolverSettings::default(),
        );

        assert_eq!(service.resolve("/late").await.as_deref(), Some("/arrived"));
        assert_eq!(
            cache.get(&url_hash("/late")).await.unwrap(),
            Some(CachedLookup::Rule(9))
        );
    }

    #[tokio::test]
    async fn test_resolve_post_destination_uses_permalink() {
        let mut redirects = MockRedirectRepository::new();
        let rule = stored_rule(2, "/p", Destination::Post(10));
        redirects
            .expect_find_by_hash()
            .returning(move |_| Ok(Some(rule.clone())));

        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .withf(|id| *id == 10)
            .returning(|_| Ok(Some(Post::new(10, "publish", "post", "https://example.com/hello/"))));

        let service = service(
            redirects,
            posts,
            Arc::new(MemoryCache::new()),
            ResolverSettings::default(),
        );

        assert_eq!(
            service.resolve("/p").await.as_deref(),
            Some("https://example.com/hello/")
        );
    }

    #[tokio::test]
    async fn test_resolve_self_heals_when_post_missing() {
        let mut redirects = MockRedirectRepository::new();
        let rule = stored_rule(3, "/gone", Destination::Post(11));
        redirects
            .expect_find_by_hash()
            .times(1)
            .returning(move |_| Ok(Some(rule.clone())));

        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().times(1).returning(|_| Ok(None));

        let cache = Arc::new(MemoryCache::new());
        let service = service(redirects, posts, cache.clone(), ResolverSettings::default());

        assert!(service.resolve("/gone").await.is_none());
        assert_eq!(
            cache.get(&url_hash("/gone")).await.unwrap(),
            Some(CachedLookup::Missing)
        );
    }

    #[tokio::test]
    async fn test_resolve_self_heals_when_cached_rule_missing() {
        let mut redirects = MockRedirectRepository::new();
        redirects
            .expect_find_by_id()
            .withf(|id| *id == 99)
            .times(1)
            .returning(|_| Ok(None));
        redirects.expect_find_by_hash().times(0);

        let cache = Arc::new(MemoryCache::new());
        cache
            .set(&url_hash("/stale"), CachedLookup::Rule(99))
            .await
            .unwrap();

        let service = service(
            redirects,
            MockPostRepository::new(),
            cache.clone(),
            ResolverSettings::default(),
        );

        assert!(service.resolve("/stale").await.is_none());
        assert_eq!(
            cache.get(&url_hash("/stale")).await.unwrap(),
            Some(CachedLookup::Missing)
        );
    }

    #[tokio::test]
    async fn test_resolve_store_error_degrades_to_none() {
        let mut redirects = MockRedirectRepository::new();
        redirects
            .expect_find_by_hash()
            .returning(|_| Err(AppError::internal("Database error", json!({}))));

        let mut cache = MockLookupCache::new();
        cache.expect_get().returning(|_| Ok(None));
        cache.expect_put_if_absent().times(0);

        let service = service(
            redirects,
            MockPostRepository::new(),
            Arc::new(cache),
            ResolverSettings::default(),
        );

        assert!(service.resolve("/old").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_preserves_configured_params() {
        let mut redirects = MockRedirectRepository::new();
        let rule = stored_rule(4, "/a", Destination::Url("http://example.com".to_string()));
        redirects
            .expect_find_by_hash()
            .withf(|hash| hash == url_hash("/a"))
            .returning(move |_| Ok(Some(rule.clone())));

        let settings = ResolverSettings {
            preserved_params: vec!["utm_source".to_string()],
            strict_post_verification: false,
        };
        let service = service(
            redirects,
            MockPostRepository::new(),
            Arc::new(MemoryCache::new()),
            settings,
        );

        assert_eq!(
            service.resolve("/a?utm_source=XYZ").await.as_deref(),
            Some("http://example.com?utm_source=XYZ")
        );
    }

    #[tokio::test]
    async fn test_resolve_rejects_unnormalizable_input() {
        let service = service(
            MockRedirectRepository::new(),
            MockPostRepository::new(),
            Arc::new(MemoryCache::new()),
            ResolverSettings::default(),
        );

        assert!(service.resolve("http://example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_insert_invalidates_cache() {
        let mut redirects = MockRedirectRepository::new();
        redirects.expect_find_by_hash().returning(|_| Ok(None));
        redirects
            .expect_insert()
            .withf(|new_rule| new_rule.from_path == "/old")
            .times(1)
            .returning(|new_rule| {
                Ok(RedirectRule::new(
                    7,
                    new_rule.from_path,
                    new_rule.from_hash,
                    new_rule.destination,
                    RuleStatus::Unverified,
                    Utc::now(),
                ))
            });

        let cache = Arc::new(MemoryCache::new());
        cache
            .set(&url_hash("/old"), CachedLookup::Missing)
            .await
            .unwrap();

        let service = service(
            redirects,
            MockPostRepository::new(),
            cache.clone(),
            ResolverSettings::default(),
        );

        let rule = service
            .insert("https://example.com/old#x", Destination::Post(5))
            .await
            .unwrap();
        assert_eq!(rule.id, 7);
        assert_eq!(cache.get(&url_hash("/old")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_duplicate_is_conflict() {
        let mut redirects = MockRedirectRepository::new();
        let existing = stored_rule(1, "/old", Destination::Post(5));
        redirects
            .expect_find_by_hash()
            .returning(move |_| Ok(Some(existing.clone())));
        redirects.expect_insert().times(0);

        let service = service(
            redirects,
            MockPostRepository::new(),
            Arc::new(MemoryCache::new()),
            ResolverSettings::default(),
        );

        let err = service
            .insert("/old", Destination::Post(6))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_insert_strict_rejects_unpublished_post() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(|_| Ok(Some(Post::new(5, "draft", "post", "https://example.com/?p=5"))));

        let mut redirects = MockRedirectRepository::new();
        redirects.expect_insert().times(0);

        let settings = ResolverSettings {
            preserved_params: Vec::new(),
            strict_post_verification: true,
        };
        let service = service(redirects, posts, Arc::new(MemoryCache::new()), settings);

        let err = service
            .insert("/old", Destination::Post(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_insert_pair_rejects_invalid_target() {
        let service = service(
            MockRedirectRepository::new(),
            MockPostRepository::new(),
            Arc::new(MemoryCache::new()),
            ResolverSettings::default(),
        );

        let err = service.insert_pair("/old", "not a url").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
