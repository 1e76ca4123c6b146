// src/sources.rs
//! Source registry: which feeds, timelines, and sheets a run pulls from.
//! Loaded from `config/sources.toml` (override with $NEWS_SOURCES_PATH).

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "NEWS_SOURCES_PATH";
const DEFAULT_PATH: &str = "config/sources.toml";

/// Column mapping for tabular sources: indices of date/handle/text/url cells.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date: usize,
    pub handle: usize,
    pub text: usize,
    pub url: usize,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        // Matches the published-sheet layout: date, handle, .., text, .., url.
        Self {
            date: 0,
            handle: 1,
            text: 3,
            url: 5,
        }
    }
}

impl ColumnMapping {
    /// Layout of the local manual TSV: (date, handle, text, media_url?, post_url).
    pub fn manual_tsv() -> Self {
        Self {
            date: 0,
            handle: 1,
            text: 2,
            url: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetSource {
    pub id: String,
    #[serde(default)]
    pub gid: u64,
    #[serde(default)]
    pub mapping: Option<ColumnMapping>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceRegistry {
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(default)]
    pub x_accounts: Vec<String>,
    #[serde(default)]
    pub x_rss_base: Option<String>,
    #[serde(default)]
    pub x_rss_accounts: Vec<String>,
    #[serde(default)]
    pub sheets: Vec<SheetSource>,
    #[serde(default)]
    pub manual_path: Option<PathBuf>,
    /// Discovery services to poll: any of "hn", "github", "producthunt".
    #[serde(default)]
    pub discovery: Vec<String>,
}

impl SourceRegistry {
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
            && self.x_accounts.is_empty()
            && self.x_rss_accounts.is_empty()
            && self.sheets.is_empty()
            && self.manual_path.is_none()
            && self.discovery.is_empty()
    }
}

pub fn load_registry_from(path: &Path) -> Result<SourceRegistry> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading source registry from {}", path.display()))?;
    parse_registry(&content)
}

/// Load the registry using env var + fallback path. A missing file is not an
/// error: the run proceeds with an empty registry and produces a valid,
/// empty document.
pub fn load_registry_default() -> Result<SourceRegistry> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_registry_from(&pb);
        }
        return Err(anyhow!("{ENV_PATH} points to a non-existent path"));
    }
    let default = PathBuf::from(DEFAULT_PATH);
    if default.exists() {
        return load_registry_from(&default);
    }
    Ok(SourceRegistry::default())
}

/// Registry for the binary: any load failure (bad `$NEWS_SOURCES_PATH`,
/// unreadable or malformed file) is logged and degrades to an empty
/// registry, so a run always proceeds to a valid output document.
pub fn load_registry_or_empty() -> SourceRegistry {
    match load_registry_default() {
        Ok(reg) => reg,
        Err(e) => {
            tracing::warn!(error = ?e, "source registry unavailable, running with none");
            SourceRegistry::default()
        }
    }
}

fn parse_registry(s: &str) -> Result<SourceRegistry> {
    let reg: SourceRegistry = toml::from_str(s).context("parsing sources toml")?;
    Ok(SourceRegistry {
        feeds: clean_list(reg.feeds),
        x_accounts: clean_list(reg.x_accounts),
        x_rss_accounts: clean_list(reg.x_rss_accounts),
        discovery: clean_list(reg.discovery),
        ..reg
    })
}

/// Trim, drop empties, and dedup while preserving first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = BTreeMap::new();
    let mut out = Vec::new();
    for (i, it) in items.into_iter().enumerate() {
        let t = it.trim().to_string();
        if !t.is_empty() && seen.insert(t.clone(), i).is_none() {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_registry() {
        let toml = r#"
feeds = ["https://a.example/rss", " https://a.example/rss ", ""]
x_accounts = ["infineon"]
x_rss_base = "https://nitter.example"
x_rss_accounts = ["rohm_official"]
manual_path = "news/manual_sns.tsv"
discovery = ["hn", "github", "hn", ""]

[[sheets]]
id = "sheet-1"
gid = 3

[[sheets]]
id = "sheet-2"
"#;
        let reg = parse_registry(toml).unwrap();
        assert_eq!(reg.feeds, vec!["https://a.example/rss".to_string()]);
        assert_eq!(reg.x_accounts, vec!["infineon".to_string()]);
        assert_eq!(reg.x_rss_base.as_deref(), Some("https://nitter.example"));
        assert_eq!(reg.sheets.len(), 2);
        assert_eq!(reg.discovery, vec!["hn".to_string(), "github".to_string()]);
        assert_eq!(reg.sheets[0].gid, 3);
        assert_eq!(reg.sheets[1].gid, 0);
        assert!(reg.sheets[1].mapping.is_none());
        assert!(!reg.is_empty());
    }

    #[test]
    fn empty_input_yields_empty_registry() {
        let reg = parse_registry("").unwrap();
        assert!(reg.is_empty());
    }

    #[serial_test::serial]
    #[test]
    fn dangling_sources_path_degrades_to_an_empty_registry() {
        std::env::set_var(ENV_PATH, "/nonexistent/sources.toml");
        let reg = load_registry_or_empty();
        assert!(reg.is_empty());
        std::env::remove_var(ENV_PATH);
    }

    #[serial_test::serial]
    #[test]
    fn malformed_sources_file_degrades_to_an_empty_registry() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sources.toml");
        fs::write(&path, "feeds = [unclosed").unwrap();
        std::env::set_var(ENV_PATH, &path);
        let reg = load_registry_or_empty();
        assert!(reg.is_empty());
        std::env::remove_var(ENV_PATH);
    }

    #[test]
    fn mapping_defaults_match_sheet_layout() {
        let m = ColumnMapping::default();
        assert_eq!((m.date, m.handle, m.text, m.url), (0, 1, 3, 5));
        let t = ColumnMapping::manual_tsv();
        assert_eq!((t.date, t.handle, t.text, t.url), (0, 1, 2, 4));
    }
}
