// src/ingest/providers/discovery.rs
//! Discovery-API fetchers: stories surfaced by third-party launch/discussion
//! services rather than publisher feeds. Three services are supported, each
//! behind the common `SourceFetcher` contract:
//!
//! - Hacker News (Firebase API): a story-id listing followed by per-story
//!   detail fetches through a bounded concurrent pool.
//! - GitHub (search API): recently created repositories matching the beat's
//!   topic query; a token raises the rate limit but is optional.
//! - Product Hunt (GraphQL API): token-gated; without one the fetcher
//!   yields nothing.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, TimeZone, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

use crate::canon::canon_url;
use crate::ingest::{fetch_time, first_line_title, registrable_host, SourceFetcher};
use crate::types::CandidateItem;

pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_PH_TOKEN: &str = "PH_TOKEN";

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(15);
const TITLE_MAX_CHARS: usize = 90;

/// Build the fetcher for a registry-named discovery service.
pub fn discovery_fetcher(service: &str) -> Option<Box<dyn SourceFetcher>> {
    match service {
        "hn" => Some(Box::new(HackerNewsFetcher::new())),
        "github" => Some(Box::new(GitHubTrendingFetcher::from_env())),
        "producthunt" => Some(Box::new(ProductHuntFetcher::from_env())),
        _ => None,
    }
}

// --- Hacker News ---------------------------------------------------------

const HN_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
const HN_MAX_STORIES: usize = 30;
const HN_MIN_SCORE: i64 = 10;
const HN_DETAIL_POOL_SIZE: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct HnStory {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub score: i64,
}

pub struct HackerNewsFetcher {
    client: reqwest::Client,
}

impl HackerNewsFetcher {
    pub fn new() -> Self {
        Self {
            client: crate::ingest::http_client(DISCOVERY_TIMEOUT),
        }
    }

    async fn fetch_story_ids(&self) -> Result<Vec<u64>> {
        let ids: Vec<u64> = self
            .client
            .get(format!("{HN_API_BASE}/showstories.json"))
            .send()
            .await
            .context("story listing GET")?
            .error_for_status()
            .context("story listing status")?
            .json()
            .await
            .context("story listing body")?;
        // Extra ids so the score/url filters still leave a full page.
        Ok(ids.into_iter().take(HN_MAX_STORIES * 2).collect())
    }

    async fn fetch_story(&self, id: u64) -> Option<HnStory> {
        let resp = self
            .client
            .get(format!("{HN_API_BASE}/item/{id}.json"))
            .send()
            .await
            .ok()?;
        resp.json().await.ok()
    }

    /// Detail fetches run through a bounded pool; listing order is restored
    /// afterwards so the service's own ranking is preserved.
    async fn fetch_details(&self, ids: &[u64]) -> HashMap<u64, HnStory> {
        let mut pool = FuturesUnordered::new();
        let mut pending = ids.iter();
        let mut stories = HashMap::new();

        loop {
            while pool.len() < HN_DETAIL_POOL_SIZE {
                match pending.next() {
                    Some(&id) => pool.push(async move { (id, self.fetch_story(id).await) }),
                    None => break,
                }
            }
            match pool.next().await {
                Some((id, Some(story))) => {
                    stories.insert(id, story);
                }
                Some((id, None)) => {
                    tracing::debug!(id, "story detail fetch failed");
                }
                None => break,
            }
        }
        stories
    }
}

impl Default for HackerNewsFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SourceFetcher for HackerNewsFetcher {
    async fn fetch(&self) -> Result<Vec<CandidateItem>> {
        let ids = self.fetch_story_ids().await?;
        let stories = self.fetch_details(&ids).await;

        let now = fetch_time();
        let mut out = Vec::new();
        for id in ids {
            if out.len() >= HN_MAX_STORIES {
                break;
            }
            if let Some(item) = stories.get(&id).and_then(|s| story_to_item(s, now)) {
                out.push(item);
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "discovery-hn"
    }
}

/// Convert one story into a candidate. Text posts (no URL) and low-scoring
/// stories are dropped; the "Show HN:" prefix and a trailing tagline after a
/// common separator are split off the title.
pub fn story_to_item(story: &HnStory, now: DateTime<FixedOffset>) -> Option<CandidateItem> {
    if story.score < HN_MIN_SCORE || story.url.is_empty() {
        return None;
    }
    let mut title = story.title.trim().to_string();
    let has_prefix = title
        .get(..8)
        .is_some_and(|p| p.eq_ignore_ascii_case("show hn:"));
    if has_prefix {
        title = title[8..].trim().to_string();
    }
    let mut summary = String::new();
    for sep in [" – ", " - ", ": ", " — "] {
        if let Some(idx) = title.find(sep) {
            summary = title[idx + sep.len()..].trim().to_string();
            title.truncate(idx);
            break;
        }
    }
    let title = title.trim_end().to_string();
    if title.is_empty() {
        return None;
    }

    let url = canon_url(&story.url);
    let published = if story.time > 0 {
        Utc.timestamp_opt(story.time, 0)
            .single()
            .map(|dt| dt.with_timezone(&crate::types::target_zone()))
            .unwrap_or(now)
    } else {
        now
    };

    Some(CandidateItem {
        title: first_line_title(&title, TITLE_MAX_CHARS),
        url: url.clone(),
        summary,
        published,
        source_name: registrable_host(&url).unwrap_or_else(|| "hn".to_string()),
        author_handle: None,
        author_display: None,
    })
}

// --- GitHub --------------------------------------------------------------

const GITHUB_SEARCH_URL: &str = "https://api.github.com/search/repositories";
const GITHUB_MAX_RESULTS: u32 = 30;
const GITHUB_MIN_STARS: i64 = 10;
const GITHUB_TOPIC_QUERY: &str = "(power OR semiconductor OR electronics OR embedded OR \
                                  sic OR gan OR igbt OR mosfet OR inverter OR ev OR charger)";

#[derive(Debug, Deserialize)]
struct RepoSearch {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

pub struct GitHubTrendingFetcher {
    client: reqwest::Client,
    token: Option<String>,
}

impl GitHubTrendingFetcher {
    pub fn from_env() -> Self {
        Self {
            client: crate::ingest::http_client(DISCOVERY_TIMEOUT),
            token: std::env::var(ENV_GITHUB_TOKEN).ok().filter(|t| !t.is_empty()),
        }
    }

    fn search_query(now: DateTime<FixedOffset>) -> String {
        let since = (now - ChronoDuration::days(1)).format("%Y-%m-%d");
        format!("created:>={since} stars:>={GITHUB_MIN_STARS} is:public {GITHUB_TOPIC_QUERY}")
    }
}

#[async_trait::async_trait]
impl SourceFetcher for GitHubTrendingFetcher {
    async fn fetch(&self) -> Result<Vec<CandidateItem>> {
        let mut req = self
            .client
            .get(GITHUB_SEARCH_URL)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .query(&[
                ("q", Self::search_query(fetch_time())),
                ("sort", "stars".to_string()),
                ("order", "desc".to_string()),
                ("per_page", GITHUB_MAX_RESULTS.to_string()),
            ]);
        if let Some(token) = &self.token {
            req = req.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let resp = req.send().await.context("repo search GET")?;
        if resp.status() == reqwest::StatusCode::FORBIDDEN {
            // Rate-limited; yield nothing rather than failing the stage.
            tracing::warn!("repo search rate limited");
            return Ok(Vec::new());
        }
        let search: RepoSearch = resp
            .error_for_status()
            .context("repo search status")?
            .json()
            .await
            .context("repo search body")?;

        let now = fetch_time();
        Ok(search
            .items
            .iter()
            .filter_map(|r| repo_to_item(r, now))
            .collect())
    }

    fn name(&self) -> &'static str {
        "discovery-github"
    }
}

/// A repository becomes a candidate pointing at its homepage when one is
/// set, else at the repository page itself.
pub fn repo_to_item(repo: &Repo, now: DateTime<FixedOffset>) -> Option<CandidateItem> {
    if repo.stargazers_count < GITHUB_MIN_STARS || repo.name.is_empty() {
        return None;
    }
    let link = repo
        .homepage
        .as_deref()
        .filter(|h| h.starts_with("http"))
        .unwrap_or(&repo.html_url);
    let url = canon_url(link);
    let published = repo
        .created_at
        .as_deref()
        .and_then(crate::ingest::parse_datetime_lenient)
        .unwrap_or(now);

    Some(CandidateItem {
        title: first_line_title(&repo.name, TITLE_MAX_CHARS),
        url: url.clone(),
        summary: repo.description.clone().unwrap_or_default(),
        published,
        source_name: registrable_host(&url).unwrap_or_else(|| "github".to_string()),
        author_handle: None,
        author_display: None,
    })
}

// --- Product Hunt --------------------------------------------------------

const PH_GRAPHQL_URL: &str = "https://api.producthunt.com/v2/api/graphql";
const PH_MAX_POSTS: u32 = 20;

const PH_POSTS_QUERY: &str = r#"
query GetPosts($first: Int!, $postedAfter: DateTime) {
  posts(first: $first, postedAfter: $postedAfter, order: VOTES) {
    edges {
      node {
        name
        tagline
        url
        website
        votesCount
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct PhResponse {
    data: Option<PhData>,
}

#[derive(Debug, Deserialize)]
struct PhData {
    posts: PhPosts,
}

#[derive(Debug, Deserialize)]
struct PhPosts {
    #[serde(default)]
    edges: Vec<PhEdge>,
}

#[derive(Debug, Deserialize)]
struct PhEdge {
    node: PhPost,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhPost {
    pub name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub website: Option<String>,
}

pub struct ProductHuntFetcher {
    client: reqwest::Client,
    token: Option<String>,
}

impl ProductHuntFetcher {
    pub fn from_env() -> Self {
        Self {
            client: crate::ingest::http_client(DISCOVERY_TIMEOUT),
            token: std::env::var(ENV_PH_TOKEN).ok().filter(|t| !t.is_empty()),
        }
    }
}

#[async_trait::async_trait]
impl SourceFetcher for ProductHuntFetcher {
    async fn fetch(&self) -> Result<Vec<CandidateItem>> {
        let token = match &self.token {
            Some(t) => t.clone(),
            None => {
                tracing::debug!("no token configured, skipping launch-site discovery");
                return Ok(Vec::new());
            }
        };
        let posted_after = (Utc::now() - ChronoDuration::days(1)).to_rfc3339();
        let body = json!({
            "query": PH_POSTS_QUERY,
            "variables": { "first": PH_MAX_POSTS, "postedAfter": posted_after },
        });

        let resp: PhResponse = self
            .client
            .post(PH_GRAPHQL_URL)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .context("launch-site POST")?
            .error_for_status()
            .context("launch-site status")?
            .json()
            .await
            .context("launch-site body")?;

        let data = resp
            .data
            .ok_or_else(|| anyhow!("launch-site reply carried no data"))?;

        let now = fetch_time();
        Ok(data
            .posts
            .edges
            .iter()
            .filter_map(|e| post_to_item(&e.node, now))
            .collect())
    }

    fn name(&self) -> &'static str {
        "discovery-producthunt"
    }
}

pub fn post_to_item(post: &PhPost, now: DateTime<FixedOffset>) -> Option<CandidateItem> {
    if post.name.is_empty() {
        return None;
    }
    let link = post
        .website
        .as_deref()
        .filter(|w| w.starts_with("http"))
        .unwrap_or(&post.url);
    if !link.starts_with("http") {
        return None;
    }
    let url = canon_url(link);

    Some(CandidateItem {
        title: first_line_title(&post.name, TITLE_MAX_CHARS),
        url: url.clone(),
        summary: post.tagline.clone(),
        published: now,
        source_name: registrable_host(&url).unwrap_or_else(|| "producthunt".to_string()),
        author_handle: None,
        author_display: None,
    })
}
