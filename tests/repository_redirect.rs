//! PostgreSQL repository tests. Require `DATABASE_URL`; run with
//! `cargo test -- --ignored`.

use sqlx::PgPool;
use std::sync::Arc;

use legacy_redirector::domain::entities::{Destination, NewRedirectRule, RuleStatus};
use legacy_redirector::domain::repositories::{PostRepository, RedirectRepository, StatusFilter};
use legacy_redirector::infrastructure::persistence::{PgPostRepository, PgRedirectRepository};

fn rule(from: &str, destination: Destination) -> NewRedirectRule {
    NewRedirectRule::new(from.to_string(), destination)
}

fn url(raw: &str) -> Destination {
    Destination::Url(raw.to_string())
}

#[sqlx::test]
#[ignore]
async fn test_insert_and_find(pool: PgPool) {
    let repo = PgRedirectRepository::new(Arc::new(pool));

    let created = repo.insert(rule("/old", url("/new"))).await.unwrap();
    assert_eq!(created.status, RuleStatus::Unverified);
    assert_eq!(created.destination, url("/new"));

    let by_hash = repo.find_by_hash(&created.from_hash).await.unwrap().unwrap();
    assert_eq!(by_hash.id, created.id);
    assert_eq!(by_hash.from_hash.len(), 64);

    let by_id = repo.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(by_id.from_path, "/old");

    assert!(repo.find_by_hash("0".repeat(64).as_str()).await.unwrap().is_none());
    assert!(repo.find_by_id(created.id + 1000).await.unwrap().is_none());
}

#[sqlx::test]
#[ignore]
async fn test_duplicate_source_is_conflict(pool: PgPool) {
    let repo = PgRedirectRepository::new(Arc::new(pool));

    repo.insert(rule("/dupe", url("/a"))).await.unwrap();
    let err = repo
        .insert(rule("/dupe", Destination::Post(5)))
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(repo.count(StatusFilter::All).await.unwrap(), 1);
}

#[sqlx::test]
#[ignore]
async fn test_update_status(pool: PgPool) {
    let repo = PgRedirectRepository::new(Arc::new(pool));
    let created = repo.insert(rule("/status", url("/s"))).await.unwrap();

    assert!(repo
        .update_status(created.id, RuleStatus::Verified)
        .await
        .unwrap());
    assert!(!repo
        .update_status(created.id, RuleStatus::Verified)
        .await
        .unwrap());

    let verified = StatusFilter::Status(RuleStatus::Verified);
    assert_eq!(repo.count(verified).await.unwrap(), 1);

    let err = repo
        .update_status(created.id + 1000, RuleStatus::Verified)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[sqlx::test]
#[ignore]
async fn test_page_orders_by_post_then_id(pool: PgPool) {
    let repo = PgRedirectRepository::new(Arc::new(pool));

    let a = repo.insert(rule("/a", Destination::Post(9))).await.unwrap();
    let b = repo.insert(rule("/b", url("/x"))).await.unwrap();
    let c = repo.insert(rule("/c", Destination::Post(2))).await.unwrap();
    let d = repo.insert(rule("/d", url("https://partner.example/"))).await.unwrap();

    let ids = |rules: Vec<legacy_redirector::domain::entities::RedirectRule>| {
        rules.into_iter().map(|r| r.id).collect::<Vec<_>>()
    };

    let all = repo.page(StatusFilter::All, 0, 10).await.unwrap();
    assert_eq!(ids(all), vec![b.id, d.id, c.id, a.id]);

    let second = repo.page(StatusFilter::All, 1, 2).await.unwrap();
    assert_eq!(ids(second), vec![d.id, c.id]);

    repo.update_status(b.id, RuleStatus::Verified).await.unwrap();
    let unverified = repo
        .page(StatusFilter::Status(RuleStatus::Unverified), 0, 10)
        .await
        .unwrap();
    assert_eq!(ids(unverified), vec![d.id, c.id, a.id]);

    let urls = repo.list_url_destinations(0, 10).await.unwrap();
    assert_eq!(urls, vec!["https://partner.example/".to_string()]);
}

#[sqlx::test]
#[ignore]
async fn test_post_lookup(pool: PgPool) {
    sqlx::query("INSERT INTO posts (id, status, post_type, permalink) VALUES ($1, $2, $3, $4)")
        .bind(3_i64)
        .bind("publish")
        .bind("page")
        .bind("https://example.com/about/")
        .execute(&pool)
        .await
        .unwrap();

    let repo = PgPostRepository::new(Arc::new(pool));

    let post = repo.find_by_id(3).await.unwrap().unwrap();
    assert!(post.is_published());
    assert_eq!(post.permalink, "https://example.com/about/");
    assert!(repo.find_by_id(4).await.unwrap().is_none());
}
