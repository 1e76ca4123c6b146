// src/ingest/mod.rs
//! Multi-source ingestion: source fetchers plus the staged orchestrator.
//!
//! Feed fetches run through a bounded concurrent pool; the social API, proxy
//! timeline, discovery-service, and sheet stages run afterwards, each gated
//! on the global elapsed-time budget. A failing source contributes zero
//! items and a warning; it never aborts the run.

pub mod providers;

use crate::context::RunContext;
use crate::sources::SourceRegistry;
use crate::types::CandidateItem;
use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::time::Duration;

use providers::feed::FeedFetcher;
use providers::manual::ManualRecordFetcher;
use providers::proxy::ProxyTimelineFetcher;
use providers::sheet::SheetFetcher;
use providers::timeline::TimelineApiFetcher;

/// Width of the feed fetch pool.
const FEED_POOL_SIZE: usize = 10;

/// Browser-like UA; several publishers reject obvious bot agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Common contract for all source fetchers. Implementations keep their own
/// failures internal where partial results are salvageable; whole-fetcher
/// errors are caught and logged by the orchestrator.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<CandidateItem>>;
    fn name(&self) -> &'static str;
}

/// One-time metrics registration (no-op unless the host installs a recorder).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Candidate items emitted by fetchers.");
        describe_counter!("ingest_fetcher_errors_total", "Fetcher fetch/parse errors.");
        describe_counter!(
            "ingest_stages_skipped_total",
            "Fetch stages skipped because the global budget was exhausted."
        );
    });
}

/// Fetch every configured source. Items are enumerated in completion order of
/// the feed pool followed by the sequential stages; later stages are skipped
/// once the budget is exhausted, but collected items are always kept.
pub async fn fetch_all(ctx: &RunContext, registry: &SourceRegistry) -> Vec<CandidateItem> {
    ensure_metrics_described();
    let mut items: Vec<CandidateItem> = Vec::new();
    let client = http_client(feed_timeout(ctx.settings.fast_mode));

    if !ctx.settings.only_sheets {
        if ctx.budget_exceeded() {
            skip_stage("feeds");
        } else {
            items.extend(fetch_feed_pool(&client, &registry.feeds).await);
        }

        if ctx.budget_exceeded() {
            skip_stage("timeline-api");
        } else if !registry.x_accounts.is_empty() {
            let fetcher = TimelineApiFetcher::from_env(registry.x_accounts.clone());
            items.extend(run_one(&fetcher).await);
        }

        if ctx.budget_exceeded() {
            skip_stage("timeline-proxy");
        } else if let Some(base) = &registry.x_rss_base {
            for handle in &registry.x_rss_accounts {
                let fetcher = ProxyTimelineFetcher::new(client.clone(), base, handle);
                items.extend(run_one(&fetcher).await);
            }
        }

        if ctx.budget_exceeded() {
            if !registry.discovery.is_empty() {
                skip_stage("discovery");
            }
        } else {
            for service in &registry.discovery {
                match providers::discovery::discovery_fetcher(service) {
                    Some(fetcher) => items.extend(run_one(fetcher.as_ref()).await),
                    None => tracing::warn!(service, "unknown discovery service, ignoring"),
                }
            }
        }
    }

    if ctx.budget_exceeded() && !registry.sheets.is_empty() {
        skip_stage("sheets");
    } else {
        for sheet in &registry.sheets {
            let fetcher = SheetFetcher::new(sheet.clone());
            items.extend(run_one(&fetcher).await);
        }
    }

    if let Some(path) = &registry.manual_path {
        let fetcher = ManualRecordFetcher::new(path.clone());
        items.extend(run_one(&fetcher).await);
    }

    items
}

async fn run_one(fetcher: &dyn SourceFetcher) -> Vec<CandidateItem> {
    match fetcher.fetch().await {
        Ok(items) => {
            counter!("ingest_items_total").increment(items.len() as u64);
            items
        }
        Err(e) => {
            tracing::warn!(error = ?e, fetcher = fetcher.name(), "fetcher error");
            counter!("ingest_fetcher_errors_total").increment(1);
            Vec::new()
        }
    }
}

fn skip_stage(stage: &str) {
    tracing::info!(stage, "global budget exhausted, skipping fetch stage");
    counter!("ingest_stages_skipped_total").increment(1);
}

/// Fetch all feeds concurrently through a bounded pool; per-feed errors are
/// logged and do not stop sibling fetches.
async fn fetch_feed_pool(client: &reqwest::Client, feeds: &[String]) -> Vec<CandidateItem> {
    tracing::info!(count = feeds.len(), "fetching feeds in parallel");
    let mut pool = FuturesUnordered::new();
    let mut pending = feeds.iter();
    let mut out = Vec::new();

    loop {
        while pool.len() < FEED_POOL_SIZE {
            match pending.next() {
                Some(url) => {
                    let url = url.clone();
                    let client = client.clone();
                    pool.push(async move {
                        let fetcher = FeedFetcher::new(client, url.clone());
                        (fetcher.fetch().await, url)
                    });
                }
                None => break,
            }
        }
        match pool.next().await {
            Some((Ok(items), _)) => {
                counter!("ingest_items_total").increment(items.len() as u64);
                out.extend(items);
            }
            Some((Err(e), url)) => {
                tracing::warn!(error = ?e, url = %url, "feed error");
                counter!("ingest_fetcher_errors_total").increment(1);
            }
            None => break,
        }
    }
    out
}

pub fn feed_timeout(fast_mode: bool) -> Duration {
    if fast_mode {
        Duration::from_secs(8)
    } else {
        Duration::from_secs(15)
    }
}

pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .expect("reqwest client")
}

// --- shared normalization helpers ---------------------------------------

/// Decode HTML entities, strip tags, collapse whitespace.
pub fn strip_html(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let untagged = re_tags.replace_all(&decoded, " ");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&untagged, " ").trim().to_string()
}

/// First line of `text`, truncated to `max` characters. Char-based so CJK
/// titles survive.
pub fn first_line_title(text: &str, max: usize) -> String {
    text.lines()
        .next()
        .unwrap_or("")
        .trim()
        .chars()
        .take(max)
        .collect()
}

/// Host of `url` without a `www.` prefix, lowercased.
pub fn registrable_host(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Lenient timestamp parsing: RFC 3339, RFC 2822, then a handful of common
/// date(-time) layouts interpreted in the target zone. `None` means the
/// caller should default to fetch time.
pub fn parse_datetime_lenient(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let zone = crate::types::target_zone();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&zone));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&zone));
    }
    const DT_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    for f in DT_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, f) {
            return zone.from_local_datetime(&naive).single();
        }
    }
    const D_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    for f in D_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, f) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return zone.from_local_datetime(&naive).single();
        }
    }
    None
}

/// Current time in the target zone; the default `published` for sources that
/// omit a usable timestamp.
pub fn fetch_time() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&crate::types::target_zone())
}
