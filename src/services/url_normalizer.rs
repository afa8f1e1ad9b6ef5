//! URL normalization for visit dedup.
//!
//! Two URLs are the same visit target when they agree after dropping the
//! fragment, userinfo, a `timestamp` query parameter and every `utm_*`
//! tracking parameter. Remaining parameters keep their order.

use log::warn;
use url::Url;

/// Query parameters dropped by name.
const IGNORED_PARAMS: &[&str] = &["timestamp"];

/// Query parameters dropped by prefix.
const IGNORED_PARAM_PREFIXES: &[&str] = &["utm_"];

fn is_ignored(key: &str) -> bool {
    IGNORED_PARAMS.contains(&key) || IGNORED_PARAM_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Returns the comparison form of `raw`; unparseable input comes back unchanged.
pub fn normalize_url(raw: &str) -> String {
    let mut parsed = match Url::parse(raw) {
        Ok(u) => u,
        Err(e) => {
            warn!("[normalizer] failed to parse {}: {}", raw, e);
            return raw.to_string();
        }
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_ignored(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    parsed.set_fragment(None);
    // Only fails for cannot-be-a-base URLs, which carry no userinfo anyway.
    let _ = parsed.set_username("");
    let _ = parsed.set_password(None);

    parsed.set_query(None);
    if !kept.is_empty() {
        parsed.query_pairs_mut().extend_pairs(kept);
    }
    parsed.to_string()
}

/// True when both URLs normalize to the same string.
pub fn same_page(a: &str, b: &str) -> bool {
    normalize_url(a) == normalize_url(b)
}
