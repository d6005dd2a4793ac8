//! Request URL normalization.
//!
//! Reduces every spelling of a legacy URL (absolute, scheme-relative or a bare
//! path) to the path and query string that serve as the redirect lookup key.
//! Scheme, host and fragment never take part in matching.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Base used to resolve relative input; only its path and query survive.
static RELATIVE_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://normalizer.invalid/").expect("static base URL is valid"));

static SCHEME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("static regex is valid"));

/// Errors that can occur during URL normalization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlNormalizationError {
    #[error("The URL does not validate: {0}")]
    InvalidUrl(String),

    #[error("The URL could not be parsed: {0}")]
    ParseError(String),
}

/// Normalizes a request URL or path to its lookup key.
///
/// # Normalization Rules
///
/// 1. **Sanitizing**: surrounding whitespace is trimmed; empty input and
///    schemes other than HTTP(S) are rejected
/// 2. **Scheme / host**: removed
/// 3. **Fragment**: removed (e.g. `#section`)
/// 4. **Path**: kept with case sensitivity; non-ASCII characters are
///    percent-encoded as UTF-8, existing escapes are left untouched; a
///    leading run of slashes collapses to one
/// 5. **Query**: kept as-is; an empty query (`/a?`) is dropped
///
/// The result is stable under re-normalization.
///
/// # Errors
///
/// Returns [`UrlNormalizationError::InvalidUrl`] for input that is not a web
/// URL, or that carries neither a path nor a query string.
/// Returns [`UrlNormalizationError::ParseError`] if the input cannot be
/// decomposed into URL components.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_path("https://example.com/old?x=1#top").unwrap(), "/old?x=1");
/// assert_eq!(normalize_path("/JP納豆").unwrap(), "/JP%E7%B4%8D%E8%B1%86");
/// ```
pub fn normalize_path(input: &str) -> Result<String, UrlNormalizationError> {
    let input = input.trim();

    if input.is_empty() || input.starts_with('#') {
        return Err(UrlNormalizationError::InvalidUrl(
            "The URL contains neither a path nor query string".to_string(),
        ));
    }

    let url = if SCHEME_PREFIX.is_match(input) {
        let url =
            Url::parse(input).map_err(|e| UrlNormalizationError::ParseError(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(UrlNormalizationError::InvalidUrl(format!(
                    "Unsupported scheme `{}`",
                    other
                )));
            }
        }

        if !has_path_or_query(input) {
            return Err(UrlNormalizationError::InvalidUrl(
                "The URL contains neither a path nor query string".to_string(),
            ));
        }

        url
    } else {
        if input.starts_with("//") && !has_path_or_query(input) {
            return Err(UrlNormalizationError::InvalidUrl(
                "The URL contains neither a path nor query string".to_string(),
            ));
        }

        RELATIVE_BASE
            .join(input)
            .map_err(|e| UrlNormalizationError::ParseError(e.to_string()))?
    };

    // A path of `//a` would re-parse with `a` as its host.
    let mut normalized = format!("/{}", url.path().trim_start_matches('/'));
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        normalized.push('?');
        normalized.push_str(query);
    }

    Ok(normalized)
}

/// Checks whether an absolute or scheme-relative URL has anything after its authority.
fn has_path_or_query(input: &str) -> bool {
    let rest = match SCHEME_PREFIX.find(input) {
        Some(scheme) => &input[scheme.end()..],
        None => input,
    };

    match rest.strip_prefix("//") {
        Some(authority_and_rest) => authority_and_rest
            .split('#')
            .next()
            .is_some_and(|s| s.contains('/') || s.contains('?')),
        None => !rest.split('#').next().unwrap_or_default().is_empty(),
    }
}
