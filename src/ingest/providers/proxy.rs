// src/ingest/providers/proxy.rs
//! Social timeline via a feed proxy (nitter-style `{base}/{handle}/rss`).
//! Same shape as the feed fetcher, but proxy permalinks are rewritten into
//! canonical platform permalinks before canonicalization.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;

use crate::canon::canon_url;
use crate::ingest::providers::feed::parse_feed_items;
use crate::ingest::{fetch_time, SourceFetcher};
use crate::types::CandidateItem;

/// Platform label attached to every proxied timeline item.
pub const PLATFORM_DOMAIN: &str = "x.com";

pub struct ProxyTimelineFetcher {
    client: reqwest::Client,
    feed_url: String,
    handle: String,
}

impl ProxyTimelineFetcher {
    pub fn new(client: reqwest::Client, base: &str, handle: &str) -> Self {
        Self {
            client,
            feed_url: format!("{}/{}/rss", base.trim_end_matches('/'), handle),
            handle: handle.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl SourceFetcher for ProxyTimelineFetcher {
    async fn fetch(&self) -> Result<Vec<CandidateItem>> {
        tracing::debug!(url = %self.feed_url, "proxy timeline fetch");
        let body = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .with_context(|| format!("proxy GET {}", self.feed_url))?
            .error_for_status()
            .context("proxy status")?
            .text()
            .await
            .context("proxy body")?;
        let items = parse_feed_items(&body, fetch_time())?;
        Ok(items
            .into_iter()
            .map(|it| rebrand_item(it, &self.handle))
            .collect())
    }

    fn name(&self) -> &'static str {
        "timeline-proxy"
    }
}

fn rebrand_item(mut it: CandidateItem, handle: &str) -> CandidateItem {
    it.url = canon_url(&rewrite_permalink(&it.url));
    it.source_name = PLATFORM_DOMAIN.to_string();
    it.author_handle = Some(handle.to_string());
    it
}

/// Rewrite any `<host>/<user>/status/<id>` permalink to the canonical
/// platform form. Non-matching URLs pass through unchanged.
pub fn rewrite_permalink(url: &str) -> String {
    static RE: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        regex::Regex::new(r"^https?://[^/]+/([^/]+)/status/(\d+).*").unwrap()
    });
    re.replace(url, format!("https://{PLATFORM_DOMAIN}/$1/status/$2").as_str())
        .into_owned()
}
