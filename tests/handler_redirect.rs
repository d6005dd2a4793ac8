mod common;

use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum_test::TestServer;
use common::{TestStores, permalink};
use legacy_redirector::api::handlers::redirect_handler;
use legacy_redirector::domain::entities::Destination;
use legacy_redirector::routes::app_router;

#[tokio::test]
async fn test_redirect_hit() {
    let stores = TestStores::new();
    stores
        .redirect_service(&[])
        .insert_pair("/old-page", "https://example.com/new-page")
        .await
        .unwrap();

    let server = TestServer::new(app_router(stores.app_state(&[]))).unwrap();

    let response = server.get("/old-page").await;

    assert_eq!(response.status_code(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header("location"), "https://example.com/new-page");
    assert_eq!(response.header("x-legacy-redirect"), "HIT");
}

#[tokio::test]
async fn test_redirect_with_query_and_preserved_params() {
    let stores = TestStores::new();
    stores
        .redirect_service(&[])
        .insert_pair("/search?q=old", "/search-new")
        .await
        .unwrap();

    let server = TestServer::new(app_router(stores.app_state(&["utm_source"]))).unwrap();

    let response = server.get("/search?q=old&utm_source=feed").await;

    assert_eq!(response.status_code(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header("location"), "/search-new?utm_source=feed");
}

#[tokio::test]
async fn test_redirect_to_post_permalink() {
    let stores = TestStores::new();
    stores.publish_post(12).await;
    stores
        .redirect_service(&[])
        .insert("/2012/old-slug", Destination::Post(12))
        .await
        .unwrap();

    let server = TestServer::new(app_router(stores.app_state(&[]))).unwrap();

    let response = server.get("/2012/old-slug").await;

    assert_eq!(response.status_code(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header("location"), permalink(12).as_str());
}

#[tokio::test]
async fn test_redirect_not_found() {
    let stores = TestStores::new();
    let server = TestServer::new(app_router(stores.app_state(&[]))).unwrap();

    let response = server.get("/nothing-here").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(!response.headers().contains_key("x-legacy-redirect"));

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_redirect_trailing_slash_is_distinct() {
    let stores = TestStores::new();
    stores
        .redirect_service(&[])
        .insert_pair("/with-slash/", "/target")
        .await
        .unwrap();

    let server = TestServer::new(app_router(stores.app_state(&[]))).unwrap();

    server
        .get("/with-slash/")
        .await
        .assert_status(StatusCode::MOVED_PERMANENTLY);
    server
        .get("/with-slash")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_redirect_double_slash_path_matches_stored_rule() {
    let stores = TestStores::new();
    stores
        .redirect_service(&[])
        .insert_pair("http://example.com//old//page", "/new-page")
        .await
        .unwrap();

    let response = redirect_handler(
        State(stores.app_state(&[])),
        Uri::from_static("//old//page"),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[header::LOCATION], "/new-page");
}
