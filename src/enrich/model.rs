// src/enrich/model.rs
//! Chat-completions model access with a primary/secondary failover chain and
//! a tolerant reply parser. Absence of credentials disables the chain; every
//! failure mode degrades to `None` so rule-based enrichment can take over.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

pub const ENV_PRIMARY_KEY: &str = "OPENAI_API_KEY";
pub const ENV_PRIMARY_BASE: &str = "OPENAI_API_BASE";
pub const ENV_PRIMARY_MODEL: &str = "OPENAI_MODEL";
pub const ENV_FALLBACK_KEY: &str = "NEWS_FALLBACK_API_KEY";
pub const ENV_FALLBACK_BASE: &str = "NEWS_FALLBACK_API_BASE";
pub const ENV_FALLBACK_MODEL: &str = "NEWS_FALLBACK_MODEL";

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// How much article text is quoted into the prompt.
const PROMPT_TEXT_CHARS: usize = 1500;

pub const MIN_STARS: i64 = 1;
pub const MAX_STARS: i64 = 5;

/// What the model contributed for one item. Fields are independent: a reply
/// may carry a usable blurb but an unusable category, and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVerdict {
    pub blurb: Option<String>,
    pub category: Option<String>,
    pub stars: Option<u8>,
}

impl ModelVerdict {
    pub fn is_empty(&self) -> bool {
        self.blurb.is_none() && self.category.is_none() && self.stars.is_none()
    }
}

/// One upstream model endpoint.
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    async fn complete(&self, title: &str, text: &str) -> Result<ModelVerdict>;
    fn name(&self) -> &str;
}

/// OpenAI-compatible chat-completions endpoint.
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    base: String,
    api_key: String,
    model: String,
    label: String,
}

impl ChatCompletionsProvider {
    pub fn new(label: &str, base: String, api_key: String, model: String) -> Self {
        Self {
            client: crate::ingest::http_client(REQUEST_TIMEOUT),
            base: base.trim_end_matches('/').to_string(),
            api_key,
            model,
            label: label.to_string(),
        }
    }

    /// Read one endpoint's settings from the environment. `None` when the
    /// API key variable is unset or blank.
    pub fn from_env(label: &str, key_var: &str, base_var: &str, model_var: &str) -> Option<Self> {
        let api_key = env::var(key_var).ok().filter(|v| !v.trim().is_empty())?;
        let base = env::var(base_var).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let model = env::var(model_var).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Some(Self::new(label, base, api_key, model))
    }
}

#[async_trait::async_trait]
impl ModelProvider for ChatCompletionsProvider {
    async fn complete(&self, title: &str, text: &str) -> Result<ModelVerdict> {
        let url = format!("{}/chat/completions", self.base);
        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [
                { "role": "user", "content": build_prompt(title, text) }
            ],
        });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("model request to {}", self.label))?
            .error_for_status()
            .with_context(|| format!("model status from {}", self.label))?;
        let payload: Value = resp.json().await.context("decoding model response")?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("model response without message content"))?;
        let verdict = parse_verdict(content)
            .ok_or_else(|| anyhow!("model reply carried no usable fields"))?;
        Ok(verdict)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Tries each provider in order and caches nothing itself; callers own the
/// cache so tests can inject replies without touching the network.
pub struct ModelChain {
    providers: Vec<Box<dyn ModelProvider>>,
}

impl ModelChain {
    pub fn new(providers: Vec<Box<dyn ModelProvider>>) -> Self {
        Self { providers }
    }

    /// Primary endpoint from `OPENAI_*`, secondary from `NEWS_FALLBACK_*`.
    /// An empty chain (no keys configured) is valid and always abstains.
    pub fn from_env() -> Self {
        let mut providers: Vec<Box<dyn ModelProvider>> = Vec::new();
        if let Some(p) = ChatCompletionsProvider::from_env(
            "primary",
            ENV_PRIMARY_KEY,
            ENV_PRIMARY_BASE,
            ENV_PRIMARY_MODEL,
        ) {
            providers.push(Box::new(p));
        }
        if let Some(p) = ChatCompletionsProvider::from_env(
            "fallback",
            ENV_FALLBACK_KEY,
            ENV_FALLBACK_BASE,
            ENV_FALLBACK_MODEL,
        ) {
            providers.push(Box::new(p));
        }
        if providers.is_empty() {
            tracing::debug!("no model API keys configured, enrichment is rules-only");
        }
        Self::new(providers)
    }

    pub fn is_enabled(&self) -> bool {
        !self.providers.is_empty()
    }

    /// First provider to answer wins. Every failure is logged and the next
    /// provider tried; exhaustion yields `None`.
    pub async fn verdict(&self, title: &str, text: &str) -> Option<ModelVerdict> {
        for p in &self.providers {
            match p.complete(title, text).await {
                Ok(v) => return Some(v),
                Err(e) => {
                    tracing::warn!(provider = p.name(), error = ?e, "model call failed");
                    metrics::counter!("enrich_model_failures_total").increment(1);
                }
            }
        }
        None
    }
}

fn build_prompt(title: &str, text: &str) -> String {
    let excerpt: String = text.chars().take(PROMPT_TEXT_CHARS).collect();
    format!(
        "あなたはパワー半導体業界の専門編集者です。以下のニュースを読み、JSONのみで回答してください。\n\
         フィールド:\n\
         - \"要約\": 80文字以内の日本語要約\n\
         - \"カテゴリ\": tech / application / vendor / general のいずれか\n\
         - \"重要度\": 1から5の整数(業界インパクトの大きさ)\n\
         \n\
         タイトル: {title}\n\
         本文: {excerpt}\n"
    )
}

/// Parse a model reply into a verdict, tolerating code fences, Japanese or
/// English field names, and stars given as numbers or numeric strings.
/// Returns `None` when nothing usable survives.
pub fn parse_verdict(reply: &str) -> Option<ModelVerdict> {
    let stripped = strip_code_fence(reply);
    let value: Value = serde_json::from_str(stripped.trim()).ok()?;

    let blurb = pick_string(&value, &["要約", "summary", "blurb"]);
    let category = pick_string(&value, &["カテゴリ", "category"]);
    let stars = pick_stars(&value, &["重要度", "stars", "importance"]);

    let verdict = ModelVerdict { blurb, category, stars };
    if verdict.is_empty() {
        None
    } else {
        Some(verdict)
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let without_open = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return trimmed,
    };
    without_open.trim_end().trim_end_matches("```").trim()
}

fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(k))
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn pick_stars(value: &Value, keys: &[&str]) -> Option<u8> {
    let raw = keys.iter().find_map(|k| value.get(k))?;
    let n = match raw {
        Value::Number(n) => n.as_f64()?.round() as i64,
        Value::String(s) => s.trim().parse::<f64>().ok()?.round() as i64,
        _ => return None,
    };
    Some(n.clamp(MIN_STARS, MAX_STARS) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_with_japanese_fields() {
        let v = parse_verdict(r#"{"要約": "SiC量産開始", "カテゴリ": "tech", "重要度": 4}"#)
            .unwrap();
        assert_eq!(v.blurb.as_deref(), Some("SiC量産開始"));
        assert_eq!(v.category.as_deref(), Some("tech"));
        assert_eq!(v.stars, Some(4));
    }

    #[test]
    fn fenced_reply_with_english_fields() {
        let reply = "```json\n{\"summary\": \"GaN fab expansion\", \"category\": \"vendor\", \"stars\": \"5\"}\n```";
        let v = parse_verdict(reply).unwrap();
        assert_eq!(v.blurb.as_deref(), Some("GaN fab expansion"));
        assert_eq!(v.category.as_deref(), Some("vendor"));
        assert_eq!(v.stars, Some(5));
    }

    #[test]
    fn stars_are_clamped_into_range() {
        let v = parse_verdict(r#"{"要約": "x", "重要度": 9}"#).unwrap();
        assert_eq!(v.stars, Some(5));
        let v = parse_verdict(r#"{"要約": "x", "重要度": 0}"#).unwrap();
        assert_eq!(v.stars, Some(1));
    }

    #[test]
    fn unusable_replies_abstain() {
        assert_eq!(parse_verdict("not json at all"), None);
        assert_eq!(parse_verdict(r#"{"irrelevant": true}"#), None);
        assert_eq!(parse_verdict(r#"{"要約": "", "重要度": "many"}"#), None);
    }

    #[test]
    fn empty_chain_abstains() {
        let chain = ModelChain::new(Vec::new());
        assert!(!chain.is_enabled());
        let verdict = futures::executor::block_on(chain.verdict("t", "body"));
        assert_eq!(verdict, None);
    }

    struct FlakyThenGood {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ModelProvider for FlakyThenGood {
        async fn complete(&self, _title: &str, _text: &str) -> Result<ModelVerdict> {
            if self.fail {
                Err(anyhow!("boom"))
            } else {
                Ok(ModelVerdict {
                    blurb: Some("ok".into()),
                    category: None,
                    stars: Some(3),
                })
            }
        }
        fn name(&self) -> &str {
            "test"
        }
    }

    #[tokio::test]
    async fn failover_moves_to_the_next_provider() {
        let chain = ModelChain::new(vec![
            Box::new(FlakyThenGood { fail: true }),
            Box::new(FlakyThenGood { fail: false }),
        ]);
        let v = chain.verdict("t", "body").await.unwrap();
        assert_eq!(v.blurb.as_deref(), Some("ok"));
    }
}
