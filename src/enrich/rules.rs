// src/enrich/rules.rs
//! Deterministic, lexicon-driven classification and scoring. The lexicons
//! are plain data (JSON-loadable) so the same engine serves other beats by
//! swapping the word lists; the built-in defaults target power
//! semiconductors.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::Category;

const DEFAULT_ENGINEER: &str = r"\b(SiC|GaN|IGBT|MOSFET|パワー半導体|power semiconductor|wide bandgap|ワイドバンドギャップ|ゲートドライバ|gate driver)\b";
const DEFAULT_BIZ: &str = r"\b(EV|電気自動車|充電器|インバータ|inverter|converter|コンバータ|電源|power supply)\b";
const DEFAULT_VENDOR: &str = r"\b(Infineon|Wolfspeed|onsemi|ROHM|ローム|STMicroelectronics|三菱電機|富士電機|Renesas|東芝|Texas Instruments|NXP)\b";
const DEFAULT_SURPRISE: &str =
    r"(突破|leak|爆|倍|破る|破竹|unprecedented|重大|障害|停止|重大脆弱性|過去最大|新製品|量産)";

const DEFAULT_VENDOR_NAMES: [&str; 14] = [
    "Infineon",
    "Wolfspeed",
    "onsemi",
    "ROHM",
    "STMicroelectronics",
    "三菱電機",
    "富士電機",
    "Renesas",
    "東芝",
    "Texas Instruments",
    "NXP",
    "Mitsubishi Electric",
    "Fuji Electric",
    "Toshiba",
];

/// Scoring weights; they sum to 1 so `base` stays in `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub recency: f64,
    pub surprise: f64,
    pub vendor: f64,
    pub engineer: f64,
    pub biz: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            recency: 0.4,
            surprise: 0.25,
            vendor: 0.2,
            engineer: 0.1,
            biz: 0.05,
        }
    }
}

/// The raw, serializable word lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lexicons {
    pub engineer_pattern: String,
    pub biz_pattern: String,
    pub vendor_pattern: String,
    pub surprise_pattern: String,
    pub vendor_names: Vec<String>,
    #[serde(default)]
    pub weights: ScoreWeights,
}

impl Default for Lexicons {
    fn default() -> Self {
        Self {
            engineer_pattern: DEFAULT_ENGINEER.to_string(),
            biz_pattern: DEFAULT_BIZ.to_string(),
            vendor_pattern: DEFAULT_VENDOR.to_string(),
            surprise_pattern: DEFAULT_SURPRISE.to_string(),
            vendor_names: DEFAULT_VENDOR_NAMES.iter().map(|s| s.to_string()).collect(),
            weights: ScoreWeights::default(),
        }
    }
}

impl Lexicons {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading lexicons from {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Falls back to the built-in lists when the file is absent; a present
    /// but broken file is an error, not a silent default.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn compile(&self) -> Result<RuleEngine> {
        let ci = |p: &str| Regex::new(&format!("(?i){p}"));
        Ok(RuleEngine {
            engineer: ci(&self.engineer_pattern).context("engineer pattern")?,
            biz: ci(&self.biz_pattern).context("biz pattern")?,
            vendor: ci(&self.vendor_pattern).context("vendor pattern")?,
            surprise: ci(&self.surprise_pattern).context("surprise pattern")?,
            vendor_names_lower: self
                .vendor_names
                .iter()
                .map(|n| n.to_lowercase())
                .collect(),
            weights: self.weights,
        })
    }
}

/// Compiled form actually used during a run.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    engineer: Regex,
    biz: Regex,
    vendor: Regex,
    surprise: Regex,
    vendor_names_lower: Vec<String>,
    weights: ScoreWeights,
}

pub const ENV_LEXICONS_PATH: &str = "NEWS_LEXICONS_PATH";
const DEFAULT_LEXICONS_PATH: &str = "config/lexicons.json";

impl RuleEngine {
    pub fn with_defaults() -> Self {
        // The built-in patterns are compile-tested below.
        Lexicons::default().compile().expect("default lexicons compile")
    }

    /// Engine from `$NEWS_LEXICONS_PATH` or `config/lexicons.json`; a broken
    /// lexicons file degrades to the built-ins with a warning.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_LEXICONS_PATH)
            .unwrap_or_else(|_| DEFAULT_LEXICONS_PATH.to_string());
        match Lexicons::load_or_default(Path::new(&path)).and_then(|l| l.compile()) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::warn!(error = ?e, path, "unusable lexicons file, using built-ins");
                Self::with_defaults()
            }
        }
    }

    fn mentions_vendor_name(&self, text_lower: &str) -> bool {
        self.vendor_names_lower.iter().any(|n| text_lower.contains(n))
    }

    /// Every category the title+summary text matches, in fixed priority
    /// order, with `general` as the fallback when nothing matched.
    pub fn classify(&self, title: &str, summary: &str, source_name: &str) -> Vec<Category> {
        let text = format!("{title} {summary}");
        let text_lower = text.to_lowercase();
        let mut cats = Vec::new();
        if self.engineer.is_match(&text) {
            cats.push(Category::Tech);
        }
        if self.biz.is_match(&text) {
            cats.push(Category::Application);
        }
        if self.mentions_vendor_name(&text_lower) || self.vendor.is_match(&text) {
            cats.push(Category::Vendor);
        }
        if source_name.contains("x.com") || source_name.contains("twitter") {
            cats.push(Category::Sns);
        }
        if cats.is_empty() {
            cats.push(Category::General);
        }
        cats
    }

    /// Weighted base score in `[0, 1]` plus the star rating derived from it.
    ///
    /// Recency decays linearly to zero over `recency_window_hours`; the other
    /// signals are binary lexicon hits. Stars use round-half-up so a base of
    /// exactly 0.375 maps to 3, matching the published ratings.
    pub fn score(
        &self,
        title: &str,
        summary: &str,
        published: Option<DateTime<FixedOffset>>,
        now: DateTime<FixedOffset>,
        recency_window_hours: f64,
    ) -> (f64, u8) {
        let age_h = match published {
            Some(dt) => (now - dt).num_seconds() as f64 / 3600.0,
            None => 0.0,
        };
        let recency = (1.0 - (age_h / recency_window_hours).min(1.0)).max(0.0);

        let text = format!("{title} {summary}");
        let text_lower = text.to_lowercase();
        let engineer = if self.engineer.is_match(&text) { 1.0 } else { 0.0 };
        let biz = if self.biz.is_match(&text) { 1.0 } else { 0.0 };
        let vendor = if self.mentions_vendor_name(&text_lower) { 1.0 } else { 0.0 };
        let surprise = if self.surprise.is_match(&text) { 1.0 } else { 0.0 };

        let w = self.weights;
        let base = w.recency * recency
            + w.surprise * surprise
            + w.vendor * vendor
            + w.engineer * engineer
            + w.biz * biz;
        let stars = (1 + round_half_up(base * 4.0)).clamp(1, 5) as u8;
        (base, stars)
    }
}

fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}
