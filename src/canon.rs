// src/canon.rs
//! URL canonicalization: the stable identity key used for deduplication.

use url::Url;

/// Query parameters whose (lowercased) name starts with this prefix are
/// tracking noise and never part of an item's identity.
const TRACKING_PREFIX: &str = "utm_";

/// Canonicalize a URL: drop `utm_*` query parameters, the fragment, and
/// exactly one trailing slash. Malformed input is returned unchanged; this
/// function never fails out of the pipeline.
pub fn canon_url(raw: &str) -> String {
    let mut url = match Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return raw.to_string(),
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !k.to_lowercase().starts_with(TRACKING_PREFIX))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept.iter());
    }
    url.set_fragment(None);

    let mut s = url.to_string();
    if s.ends_with('/') {
        s.pop();
    }
    s
}
