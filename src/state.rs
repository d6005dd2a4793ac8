//! Shared state injected into HTTP handlers.

use axum::http::StatusCode;
use std::sync::Arc;

use crate::application::services::RedirectService;
use crate::domain::repositories::RedirectRepository;
use crate::infrastructure::cache::LookupCache;

#[derive(Clone)]
pub struct AppState {
    pub redirect_service: Arc<RedirectService>,
    pub redirects: Arc<dyn RedirectRepository>,
    pub cache: Arc<dyn LookupCache>,
    /// Status code sent with every legacy redirect.
    pub redirect_status: StatusCode,
}

impl AppState {
    pub fn new(
        redirect_service: Arc<RedirectService>,
        redirects: Arc<dyn RedirectRepository>,
        cache: Arc<dyn LookupCache>,
        redirect_status: StatusCode,
    ) -> Self {
        Self {
            redirect_service,
            redirects,
            cache,
            redirect_status,
        }
    }
}
