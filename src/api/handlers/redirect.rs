//! Fallback handler serving legacy redirects.

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, Uri, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Response header marking responses produced by a legacy redirect rule.
pub const LEGACY_REDIRECT_HEADER: &str = "x-legacy-redirect";

/// Redirects a legacy URL to its current destination.
///
/// # Endpoint
///
/// Any path not claimed by another route.
///
/// # Request Flow
///
/// 1. Take the request path and query string
/// 2. Resolve through [`crate::application::services::RedirectService::resolve`]
///    (cache first, store on miss)
/// 3. Respond with the configured redirect status, `Location` and
///    `X-Legacy-Redirect: HIT`
///
/// # Errors
///
/// Returns 404 Not Found if no rule matches or the rule's target is gone.
pub async fn redirect_handler(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Response, AppError> {
    let raw = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    // The request target is always a path; `//old` must not read as a host.
    let request = format!("/{}", raw.trim_start_matches('/'));
    let request = request.as_str();

    let Some(target) = state.redirect_service.resolve(request).await else {
        debug!("No legacy redirect for {}", request);
        return Err(AppError::not_found(
            "No redirect for this URL",
            json!({ "path": request }),
        ));
    };

    let location = HeaderValue::from_str(&target).map_err(|e| {
        warn!("Redirect target {:?} is not a valid header value: {}", target, e);
        AppError::not_found("No redirect for this URL", json!({ "path": request }))
    })?;

    Ok((
        state.redirect_status,
        [
            (header::LOCATION, location),
            (
                HeaderName::from_static(LEGACY_REDIRECT_HEADER),
                HeaderValue::from_static("HIT"),
            ),
        ],
    )
        .into_response())
}
