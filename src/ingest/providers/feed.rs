// src/ingest/providers/feed.rs
//! RSS/Atom feed fetcher. One instance per feed URL.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};

use crate::canon::canon_url;
use crate::ingest::{fetch_time, registrable_host, strip_html, SourceFetcher};
use crate::types::CandidateItem;

pub struct FeedFetcher {
    client: reqwest::Client,
    url: String,
}

impl FeedFetcher {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn download(&self) -> Result<String> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("feed GET {}", self.url))?;
        let resp = resp
            .error_for_status()
            .with_context(|| format!("feed status {}", self.url))?;
        resp.text().await.context("feed body")
    }
}

#[async_trait::async_trait]
impl SourceFetcher for FeedFetcher {
    async fn fetch(&self) -> Result<Vec<CandidateItem>> {
        tracing::debug!(url = %self.url, "feed fetch");
        // One retry on transport failure before giving up on the feed.
        let body = match self.download().await {
            Ok(b) => b,
            Err(first) => {
                tracing::debug!(error = ?first, url = %self.url, "feed retry");
                self.download().await?
            }
        };
        parse_feed_items(&body, fetch_time())
    }

    fn name(&self) -> &'static str {
        "feed"
    }
}

/// Parse a feed document into candidate items. Entries without a title or
/// link are dropped here; missing/unreadable timestamps default to `now`.
pub fn parse_feed_items(body: &str, now: DateTime<FixedOffset>) -> Result<Vec<CandidateItem>> {
    let feed = feed_rs::parser::parse(body.as_bytes()).context("parsing feed document")?;
    let zone = crate::types::target_zone();

    let mut out = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();
        let link = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .filter(|href| !href.is_empty())
            .unwrap_or_else(|| entry.id.clone());
        if title.is_empty() || link.is_empty() {
            continue;
        }
        let url = canon_url(&link);

        // First usable of published/updated; feed-rs already parses leniently.
        let published = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&zone))
            .unwrap_or(now);

        let summary = entry
            .summary
            .as_ref()
            .map(|t| strip_html(&t.content))
            .unwrap_or_default();

        let source_name = registrable_host(&url).unwrap_or_else(|| "feed".to_string());

        out.push(CandidateItem {
            title,
            url,
            summary,
            published,
            source_name,
            author_handle: None,
            author_display: None,
        });
    }
    Ok(out)
}
