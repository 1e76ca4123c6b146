// src/ingest/providers/timeline.rs
//! Social timeline via the platform API: resolve each handle to an account
//! id, then pull its most recent posts. Requires a bearer token; without one
//! the fetcher yields nothing.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::canon::canon_url;
use crate::ingest::providers::proxy::PLATFORM_DOMAIN;
use crate::ingest::{fetch_time, first_line_title, parse_datetime_lenient, SourceFetcher};
use crate::types::CandidateItem;

const ENV_BEARER: &str = "X_BEARER_TOKEN";
const API_BASE: &str = "https://api.x.com/2";
const POSTS_PER_HANDLE: u32 = 10;
const TITLE_MAX_CHARS: usize = 90;

pub struct TimelineApiFetcher {
    client: reqwest::Client,
    bearer: Option<String>,
    handles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UserLookup {
    data: Option<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Timeline {
    #[serde(default)]
    data: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    text: Option<String>,
    created_at: Option<String>,
}

impl TimelineApiFetcher {
    pub fn from_env(handles: Vec<String>) -> Self {
        let bearer = std::env::var(ENV_BEARER).ok().filter(|t| !t.is_empty());
        Self {
            client: crate::ingest::http_client(Duration::from_secs(10)),
            bearer,
            handles,
        }
    }

    async fn fetch_handle(&self, bearer: &str, handle: &str) -> Result<Vec<CandidateItem>> {
        let lookup: UserLookup = self
            .client
            .get(format!("{API_BASE}/users/by/username/{handle}"))
            .bearer_auth(bearer)
            .send()
            .await
            .context("user lookup")?
            .json()
            .await
            .context("user lookup body")?;
        let user = match lookup.data {
            Some(u) => u,
            None => return Ok(Vec::new()),
        };

        let timeline: Timeline = self
            .client
            .get(format!("{API_BASE}/users/{}/tweets", user.id))
            .query(&[
                ("max_results", POSTS_PER_HANDLE.to_string()),
                ("tweet.fields", "created_at".to_string()),
            ])
            .bearer_auth(bearer)
            .send()
            .await
            .context("timeline fetch")?
            .json()
            .await
            .context("timeline body")?;

        let now = fetch_time();
        Ok(timeline
            .data
            .into_iter()
            .filter_map(|post| {
                let text = post.text.unwrap_or_default();
                let title = first_line_title(&text, TITLE_MAX_CHARS);
                if title.is_empty() {
                    return None;
                }
                let url = canon_url(&format!(
                    "https://{PLATFORM_DOMAIN}/{handle}/status/{}",
                    post.id
                ));
                let published = post
                    .created_at
                    .as_deref()
                    .and_then(parse_datetime_lenient)
                    .unwrap_or(now);
                Some(CandidateItem {
                    title,
                    url,
                    summary: text,
                    published,
                    source_name: PLATFORM_DOMAIN.to_string(),
                    author_handle: Some(handle.to_string()),
                    author_display: user.name.clone(),
                })
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl SourceFetcher for TimelineApiFetcher {
    async fn fetch(&self) -> Result<Vec<CandidateItem>> {
        let bearer = match &self.bearer {
            Some(t) => t.clone(),
            None => {
                tracing::debug!("no bearer token, skipping timeline API");
                return Ok(Vec::new());
            }
        };
        let mut out = Vec::new();
        for handle in &self.handles {
            // One handle failing must not take down its siblings.
            match self.fetch_handle(&bearer, handle).await {
                Ok(mut items) => out.append(&mut items),
                Err(e) => tracing::warn!(error = ?e, handle = %handle, "timeline API error"),
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "timeline-api"
    }
}
