//! Query string helpers for preserved parameters.
//!
//! Preserved parameters (typically campaign tags such as `utm_source`) are
//! removed from a request before its lookup key is computed and appended to
//! the resolved target afterwards. Untouched segments keep their original
//! encoding so the stripped key matches the stored rule byte for byte.

use url::form_urlencoded;

/// Ordered `(name, value)` pairs lifted from a request.
pub type QueryArgs = Vec<(String, String)>;

/// Removes preserved parameters from a normalized path.
///
/// Only parameters with a non-empty value are extracted. When a parameter is
/// repeated the last value wins. Pairs are returned in the order of
/// `preserved`.
///
/// Returns the path with the remaining query (if any) and the extracted pairs.
pub fn extract_preserved_params(path: &str, preserved: &[String]) -> (String, QueryArgs) {
    let Some((base, query)) = path.split_once('?') else {
        return (path.to_string(), Vec::new());
    };

    if preserved.is_empty() || query.is_empty() {
        return (path.to_string(), Vec::new());
    }

    let mut extracted = QueryArgs::new();
    for name in preserved {
        let value = form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .last();

        if let Some(value) = value.filter(|v| !v.is_empty()) {
            extracted.push((name.clone(), value));
        }
    }

    if extracted.is_empty() {
        return (path.to_string(), extracted);
    }

    let remaining = retain_segments(query, |key| !extracted.iter().any(|(name, _)| name == key));

    (join_query(base, &remaining), extracted)
}

/// Appends query arguments to a target URL.
///
/// Existing occurrences of the same names are replaced; a fragment on the
/// target stays at the end.
pub fn append_query_args(target: &str, args: &[(String, String)]) -> String {
    if args.is_empty() {
        return target.to_string();
    }

    let (without_fragment, fragment) = match target.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (target, None),
    };

    let (base, existing) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));

    let mut segments = retain_segments(existing, |key| !args.iter().any(|(name, _)| name == key));

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in args {
        serializer.append_pair(name, value);
    }
    segments.push(serializer.finish());

    let mut url = join_query(base, &segments);
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }

    url
}

/// Keeps the raw `&`-separated segments whose decoded key passes `keep`.
fn retain_segments(query: &str, keep: impl Fn(&str) -> bool) -> Vec<String> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| {
            let key = form_urlencoded::parse(segment.as_bytes())
                .next()
                .map(|(key, _)| key.into_owned())
                .unwrap_or_default();
            keep(&key)
        })
        .map(str::to_string)
        .collect()
}

fn join_query(base: &str, segments: &[String]) -> String {
    if segments.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, segments.join("&"))
    }
}
