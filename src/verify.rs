// src/verify.rs
//! Liveness verification: a lightweight existence check for each surviving
//! candidate URL before it is worth enriching.

use std::time::Duration;

use crate::context::RunContext;
use crate::types::CandidateItem;

/// Hosts that reject unauthenticated probes; items there are assumed live.
const ASSUMED_LIVE_HOSTS: [&str; 3] = ["x.com", "twitter.com", "nitter.net"];

const HEAD_TIMEOUT: Duration = Duration::from_secs(8);
const GET_TIMEOUT: Duration = Duration::from_secs(10);

pub struct LivenessVerifier {
    head_client: reqwest::Client,
    get_client: reqwest::Client,
    fast_mode: bool,
}

impl LivenessVerifier {
    pub fn new(fast_mode: bool) -> Self {
        Self {
            head_client: crate::ingest::http_client(HEAD_TIMEOUT),
            get_client: crate::ingest::http_client(GET_TIMEOUT),
            fast_mode,
        }
    }

    /// Keep only items whose URL answers. Order is preserved.
    pub async fn retain_live(&self, items: Vec<CandidateItem>) -> Vec<CandidateItem> {
        if self.fast_mode {
            return items;
        }
        let mut live = Vec::with_capacity(items.len());
        for it in items {
            if self.is_live(&it.url).await {
                live.push(it);
            } else {
                tracing::debug!(url = %it.url, "dropping dead link");
            }
        }
        live
    }

    /// HEAD with a short timeout; a failure-class status retries once with a
    /// full GET. Any network error counts as not-live.
    pub async fn is_live(&self, url: &str) -> bool {
        if is_assumed_live(url) {
            return true;
        }
        let status = match self.head_client.head(url).send().await {
            Ok(resp) => {
                let s = resp.status();
                if s.as_u16() >= 400 {
                    match self.get_client.get(url).send().await {
                        Ok(resp) => resp.status(),
                        Err(_) => return false,
                    }
                } else {
                    s
                }
            }
            Err(_) => return false,
        };
        (200..400).contains(&status.as_u16())
    }
}

/// True when the URL's host is (or is a subdomain of) a platform we never
/// probe.
pub fn is_assumed_live(url: &str) -> bool {
    let host = match url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) {
        Some(h) => h,
        None => return false,
    };
    ASSUMED_LIVE_HOSTS
        .iter()
        .any(|h| host == *h || host.ends_with(&format!(".{h}")))
}

/// Convenience wiring from the run context.
pub fn verifier_for(ctx: &RunContext) -> LivenessVerifier {
    LivenessVerifier::new(ctx.settings.fast_mode)
}
