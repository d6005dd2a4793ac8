mod common;

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use common::{TestStores, permalink, rule_validator};
use legacy_redirector::AppError;
use legacy_redirector::application::services::{ImportOptions, RedirectService, ResolverSettings};
use legacy_redirector::domain::entities::{
    Destination, NewRedirectRule, RedirectRule, RuleId, RuleStatus,
};
use legacy_redirector::domain::repositories::{RedirectRepository, StatusFilter};
use legacy_redirector::infrastructure::cache::{CachedLookup, LookupCache};
use legacy_redirector::utils::url_hash::url_hash;

#[tokio::test]
async fn test_simple_redirect() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&[]);

    service
        .insert_pair("/simple-redirect", "http://example.com")
        .await
        .unwrap();

    assert_eq!(
        service.resolve("/simple-redirect").await.as_deref(),
        Some("http://example.com")
    );
    assert_eq!(service.resolve("/simple-redirect/").await, None);
}

#[tokio::test]
async fn test_unicode_path_matches_encoded_request() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&[]);

    let rule = service
        .insert_pair("/JP納豆", "http://example.com/natto")
        .await
        .unwrap();
    assert_eq!(rule.from_path, "/JP%E7%B4%8D%E8%B1%86");

    for request in ["/JP納豆", "/JP%E7%B4%8D%E8%B1%86"] {
        assert_eq!(
            service.resolve(request).await.as_deref(),
            Some("http://example.com/natto"),
            "request {}",
            request
        );
    }
}

#[tokio::test]
async fn test_query_string_is_part_of_the_key() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&[]);

    service
        .insert_pair("/query-redirect?with=query-string", "/target")
        .await
        .unwrap();

    assert_eq!(
        service
            .resolve("/query-redirect?with=query-string")
            .await
            .as_deref(),
        Some("/target")
    );
    assert_eq!(service.resolve("/query-redirect").await, None);
    assert_eq!(service.resolve("/query-redirect?with=other").await, None);
}

#[tokio::test]
async fn test_absolute_source_matches_path() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&[]);

    service
        .insert_pair("https://old.example.org/full-url#top", "/new")
        .await
        .unwrap();

    assert_eq!(service.resolve("/full-url").await.as_deref(), Some("/new"));
    assert_eq!(
        service.resolve("http://anything.test/full-url").await.as_deref(),
        Some("/new")
    );
}

#[tokio::test]
async fn test_preserved_params_carried_to_target() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&["utm_source", "utm_medium"]);

    service
        .insert_pair("/promo", "https://example.com/sale")
        .await
        .unwrap();

    assert_eq!(
        service
            .resolve("/promo?utm_source=news&utm_medium=email")
            .await
            .as_deref(),
        Some("https://example.com/sale?utm_source=news&utm_medium=email")
    );
    assert_eq!(
        service.resolve("/promo?utm_source=").await,
        None,
        "empty preserved values stay in the lookup key"
    );
}

#[tokio::test]
async fn test_post_destination_follows_permalink() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&[]);
    stores.publish_post(7).await;

    service
        .insert("/old-post", Destination::Post(7))
        .await
        .unwrap();

    assert_eq!(
        service.resolve("/old-post").await,
        Some(permalink(7))
    );
}

#[tokio::test]
async fn test_missing_post_is_cached_as_missing() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&[]);
    stores.publish_post(9).await;

    let rule = service.insert("/gone", Destination::Post(9)).await.unwrap();
    assert!(service.resolve("/gone").await.is_some());

    stores.posts.remove(9).await;

    assert_eq!(service.resolve("/gone").await, None);
    assert_eq!(
        stores.cache.get(&rule.from_hash).await.unwrap(),
        Some(CachedLookup::Missing)
    );
}

#[tokio::test]
async fn test_miss_is_cached_and_insert_invalidates() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&[]);
    let hash = url_hash("/later");

    assert_eq!(service.resolve("/later").await, None);
    assert_eq!(
        stores.cache.get(&hash).await.unwrap(),
        Some(CachedLookup::Missing)
    );

    let rule = service.insert_pair("/later", "/now").await.unwrap();

    assert_eq!(stores.cache.get(&hash).await.unwrap(), None);
    assert_eq!(service.resolve("/later").await.as_deref(), Some("/now"));
    assert_eq!(
        stores.cache.get(&hash).await.unwrap(),
        Some(CachedLookup::Rule(rule.id))
    );
}

#[tokio::test]
async fn test_duplicate_insert_keeps_original() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&[]);

    service.insert_pair("/dupe", "/first").await.unwrap();
    let err = service
        .insert_pair("https://example.com/dupe", "/second")
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(service.resolve("/dupe").await.as_deref(), Some("/first"));
}

#[tokio::test]
async fn test_import_reports_per_row() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&[]);
    service.insert_pair("/existing", "/there").await.unwrap();

    let rows = vec![
        ("/one".to_string(), "/uno".to_string()),
        ("/existing".to_string(), "/elsewhere".to_string()),
        ("/two".to_string(), "42".to_string()),
        ("/one".to_string(), "/again".to_string()),
        ("/bad".to_string(), "ftp://files.example".to_string()),
    ];

    let report = service.import(rows, ImportOptions::default()).await;

    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(
        report.duplicates.iter().map(|d| d.row).collect::<Vec<_>>(),
        vec![2, 4]
    );
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].row, 5);
    assert_eq!(
        stores
            .redirects
            .count(legacy_redirector::domain::repositories::StatusFilter::All)
            .await
            .unwrap(),
        3
    );
}

#[tokio::test]
async fn test_import_dry_run_writes_nothing() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&[]);

    let rows = vec![
        ("/a".to_string(), "/b".to_string()),
        ("/c".to_string(), "/d".to_string()),
    ];
    let options = ImportOptions {
        skip_duplicates: true,
        dry_run: true,
    };

    let report = service.import(rows, options).await;

    assert_eq!(report.inserted, 2);
    assert_eq!(service.resolve("/a").await, None);
}

#[tokio::test]
async fn test_find_domains() {
    let stores = TestStores::new();
    let service = stores.redirect_service(&[]);

    service
        .insert_pair("/a", "https://Partner.example/x")
        .await
        .unwrap();
    service
        .insert_pair("/b", "https://partner.example/y")
        .await
        .unwrap();
    service.insert_pair("/c", "http://other.test").await.unwrap();
    service.insert_pair("/d", "/local").await.unwrap();

    let domains: Vec<String> = service.find_domains().await.unwrap().into_iter().collect();
    assert_eq!(domains, vec!["other.test", "partner.example"]);
}

/// Store that lets another writer insert a rule right after the first
/// `find_by_hash` has read, before the caller gets the (now stale) answer.
struct InsertAfterFirstRead {
    inner: Arc<dyn RedirectRepository>,
    writer: RedirectService,
    pending: Mutex<Option<(&'static str, &'static str)>>,
}

#[async_trait]
impl RedirectRepository for InsertAfterFirstRead {
    async fn insert(&self, new_rule: NewRedirectRule) -> Result<RedirectRule, AppError> {
        self.inner.insert(new_rule).await
    }

    async fn find_by_hash(&self, from_hash: &str) -> Result<Option<RedirectRule>, AppError> {
        let found = self.inner.find_by_hash(from_hash).await;
        let pending = self.pending.lock().unwrap().take();
        if let Some((from, to)) = pending {
            self.writer.insert_pair(from, to).await.unwrap();
        }
        found
    }

    async fn find_by_id(&self, id: RuleId) -> Result<Option<RedirectRule>, AppError> {
        self.inner.find_by_id(id).await
    }

    async fn update_status(&self, id: RuleId, status: RuleStatus) -> Result<bool, AppError> {
        self.inner.update_status(id, status).await
    }

    async fn count(&self, filter: StatusFilter) -> Result<i64, AppError> {
        self.inner.count(filter).await
    }

    async fn page(
        &self,
        filter: StatusFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RedirectRule>, AppError> {
        self.inner.page(filter, offset, limit).await
    }

    async fn list_url_destinations(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<String>, AppError> {
        self.inner.list_url_destinations(offset, limit).await
    }
}

#[tokio::test]
async fn test_insert_racing_a_miss_still_resolves() {
    let stores = TestStores::new();
    let racing = InsertAfterFirstRead {
        inner: stores.redirects.clone(),
        writer: stores.redirect_service(&[]),
        pending: Mutex::new(Some(("/racing", "/racing-target"))),
    };
    let reader = RedirectService::new(
        Arc::new(racing),
        stores.posts.clone(),
        stores.cache.clone(),
        rule_validator(),
        ResolverSettings::default(),
    );

    // The first read saw no rule, but the rule exists by the time it returns.
    assert_eq!(
        reader.resolve("/racing").await.as_deref(),
        Some("/racing-target")
    );
    assert!(matches!(
        stores.cache.get(&url_hash("/racing")).await.unwrap(),
        Some(CachedLookup::Rule(_))
    ));
    assert_eq!(
        reader.resolve("/racing").await.as_deref(),
        Some("/racing-target")
    );
}
