// src/enrich/mod.rs
//! Enrichment: turn deduplicated, verified candidates into presentable items
//! with a blurb, category, and star rating. The model chain is consulted
//! first (through the response cache); the rule engine always produces a
//! deterministic verdict to fall back on, so enrichment never fails an item.

pub mod cache;
pub mod model;
pub mod rules;

use once_cell::sync::OnceCell;

use crate::context::RunContext;
use crate::extract::ContentExtractor;
use crate::types::{CandidateItem, Category, EnrichedItem, SnsInfo, SourceRef};
use cache::ResponseCache;
use model::{ModelChain, ModelVerdict};
use rules::RuleEngine;

/// Enriched-item cap in fast mode.
pub const FAST_MODE_ENRICH_CAP: usize = 80;

/// Fallback blurb length in characters.
const BLURB_CHARS: usize = 120;

pub struct Enricher {
    cache: ResponseCache,
    chain: ModelChain,
    rules: RuleEngine,
    extractor: ContentExtractor,
}

impl Enricher {
    pub fn new(
        cache: ResponseCache,
        chain: ModelChain,
        rules: RuleEngine,
        extractor: ContentExtractor,
    ) -> Self {
        Self {
            cache,
            chain,
            rules,
            extractor,
        }
    }

    /// Wiring for a normal run: env-configured model chain, default cache
    /// directory, default lexicons.
    pub fn from_context(ctx: &RunContext) -> Self {
        Self::new(
            ResponseCache::new(ResponseCache::default_dir()),
            ModelChain::from_env(),
            RuleEngine::from_env(),
            ContentExtractor::new(ctx.settings.fast_mode),
        )
    }

    /// Enrich candidates in order, respecting the fast-mode cap and the
    /// global budget. Items are never dropped for quality reasons here; each
    /// input either becomes an enriched item or the loop stops early.
    pub async fn enrich_all(&self, ctx: &RunContext, items: Vec<CandidateItem>) -> Vec<EnrichedItem> {
        let mut out = Vec::with_capacity(items.len());
        for it in items {
            out.push(self.enrich_one(ctx, &it).await);
            if ctx.settings.fast_mode && out.len() >= FAST_MODE_ENRICH_CAP {
                tracing::info!(cap = FAST_MODE_ENRICH_CAP, "fast mode enrichment cap hit");
                break;
            }
            if ctx.budget_exceeded() {
                tracing::warn!("global budget exhausted during enrichment");
                break;
            }
        }
        self.rescore(ctx, &mut out);
        out
    }

    async fn enrich_one(&self, ctx: &RunContext, it: &CandidateItem) -> EnrichedItem {
        let body = self.extractor.extract_text(&it.url).await;
        let text = if body.is_empty() { it.summary.clone() } else { body.clone() };

        let verdict = self.cached_verdict(&it.title, &text, &it.url).await;
        let cats = self.rules.classify(&it.title, &it.summary, &it.source_name);
        let (_, rule_stars) = self.rules.score(
            &it.title,
            &it.summary,
            Some(it.published),
            ctx.now(),
            ctx.settings.recency_window_hours,
        );

        let model_category = verdict
            .as_ref()
            .and_then(|v| v.category.as_deref())
            .and_then(Category::from_label);
        let category = model_category.unwrap_or(cats[0]);

        let blurb = verdict
            .as_ref()
            .and_then(|v| v.blurb.clone())
            .unwrap_or_else(|| fallback_blurb(&body, &it.summary));

        let stars = verdict
            .as_ref()
            .and_then(|v| v.stars)
            .unwrap_or(rule_stars)
            .clamp(1, 5);

        let mut item = EnrichedItem {
            title: it.title.clone(),
            blurb,
            category,
            date: it.published.format("%Y-%m-%d").to_string(),
            stars,
            source: SourceRef {
                name: it.source_name.clone(),
                url: it.url.clone(),
            },
            sns: None,
            published: Some(it.published),
        };

        if category == Category::Sns || it.source_name == "x.com" {
            apply_sns_shape(&mut item, it);
        }
        item
    }

    async fn cached_verdict(&self, title: &str, text: &str, url: &str) -> Option<ModelVerdict> {
        if !self.chain.is_enabled() {
            return None;
        }
        let key = ResponseCache::cache_key(url, title, text);
        if let Some(v) = self.cache.lookup(&key) {
            metrics::counter!("enrich_cache_hits_total").increment(1);
            return Some(v);
        }
        let verdict = self.chain.verdict(title, text).await?;
        if let Err(e) = self.cache.store(&key, &verdict) {
            tracing::warn!(error = ?e, "failed to persist model verdict");
        }
        Some(verdict)
    }

    /// Second scoring pass over the produced title+blurb; stars only move up.
    fn rescore(&self, ctx: &RunContext, items: &mut [EnrichedItem]) {
        let now = ctx.now();
        for it in items {
            let (_, stars) = self.rules.score(
                &it.title,
                &it.blurb,
                it.published,
                now,
                ctx.settings.recency_window_hours,
            );
            it.stars = it.stars.max(stars);
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn fallback_blurb(body: &str, summary: &str) -> String {
    if body.is_empty() {
        truncate_chars(summary, BLURB_CHARS)
    } else {
        format!("{}…", truncate_chars(body, BLURB_CHARS))
    }
}

/// Social items always land in the sns section and carry author metadata;
/// the source label becomes the handle itself.
fn apply_sns_shape(item: &mut EnrichedItem, it: &CandidateItem) {
    static RE_HANDLE: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_HANDLE
        .get_or_init(|| regex::Regex::new(r"^https?://x\.com/([^/]+)/").unwrap());

    let mut handle = it
        .author_handle
        .clone()
        .filter(|h| !h.is_empty())
        .or_else(|| re.captures(&it.url).map(|c| c[1].to_string()))
        .unwrap_or_default();
    if !handle.is_empty() && !handle.starts_with('@') {
        handle = format!("@{handle}");
    }

    item.sns = Some(SnsInfo {
        handle: handle.clone(),
        display_name: it.author_display.clone().unwrap_or_default(),
        posted_at: it.published.to_rfc3339(),
    });
    item.source = SourceRef {
        name: if handle.is_empty() { "X".to_string() } else { handle },
        url: it.url.clone(),
    };
    item.category = Category::Sns;
}
