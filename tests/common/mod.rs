#![allow(dead_code)]

use axum::http::StatusCode;
use std::sync::Arc;

use legacy_redirector::application::services::{RedirectService, ResolverSettings, RuleValidator};
use legacy_redirector::domain::entities::Post;
use legacy_redirector::domain::repositories::RedirectRepository;
use legacy_redirector::infrastructure::cache::{LookupCache, MemoryCache};
use legacy_redirector::infrastructure::persistence::{
    MemoryPostRepository, MemoryRedirectRepository,
};
use legacy_redirector::state::AppState;

pub const HOME_URL: &str = "https://example.com";

/// In-memory store and cache shared by a test.
pub struct TestStores {
    pub redirects: Arc<MemoryRedirectRepository>,
    pub posts: Arc<MemoryPostRepository>,
    pub cache: Arc<MemoryCache>,
}

impl TestStores {
    pub fn new() -> Self {
        Self {
            redirects: Arc::new(MemoryRedirectRepository::new()),
            posts: Arc::new(MemoryPostRepository::new()),
            cache: Arc::new(MemoryCache::new()),
        }
    }

    pub fn redirect_service(&self, preserved_params: &[&str]) -> RedirectService {
        RedirectService::new(
            self.redirects.clone(),
            self.posts.clone(),
            self.cache.clone(),
            rule_validator(),
            ResolverSettings {
                preserved_params: preserved_params.iter().map(|p| p.to_string()).collect(),
                strict_post_verification: false,
            },
        )
    }

    pub fn app_state(&self, preserved_params: &[&str]) -> AppState {
        let redirects: Arc<dyn RedirectRepository> = self.redirects.clone();
        let cache: Arc<dyn LookupCache> = self.cache.clone();

        AppState::new(
            Arc::new(self.redirect_service(preserved_params)),
            redirects,
            cache,
            StatusCode::MOVED_PERMANENTLY,
        )
    }

    /// Seeds a published post with a permalink under [`HOME_URL`].
    pub async fn publish_post(&self, id: i64) -> Post {
        let post = Post::new(id, "publish", "post", permalink(id));
        self.posts.upsert(post.clone()).await;
        post
    }
}

pub fn permalink(id: i64) -> String {
    format!("{}/?p={}", HOME_URL, id)
}

pub fn rule_validator() -> RuleValidator {
    RuleValidator::new(
        HOME_URL,
        &[],
        &[
            "post".to_string(),
            "page".to_string(),
            "attachment".to_string(),
        ],
    )
}
