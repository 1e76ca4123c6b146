// src/types.rs
//! Core data model shared by every pipeline stage.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The pipeline's fixed target time zone (JST). Every published timestamp is
/// normalized into this offset as soon as a fetcher emits the item.
pub fn target_zone() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("valid fixed offset")
}

/// One normalized item as produced by a source fetcher.
///
/// Invariant: `title` and `url` are non-empty; fetchers drop anything else
/// before emitting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateItem {
    pub title: String,
    /// Absolute, already canonicalized URL.
    pub url: String,
    /// Plain text, HTML stripped.
    pub summary: String,
    pub published: DateTime<FixedOffset>,
    /// Registrable domain or platform label (e.g. "x.com").
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_display: Option<String>,
}

/// Closed category vocabulary. Declaration order doubles as section order in
/// the output document (`BTreeMap` keyed by this enum).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tech,
    Application,
    Vendor,
    Sns,
    General,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Tech,
        Category::Application,
        Category::Vendor,
        Category::Sns,
        Category::General,
    ];

    /// Parse a model-provided label; unknown labels map to `None` so the
    /// caller can fall back to the rule-based classifier.
    pub fn from_label(label: &str) -> Option<Category> {
        match label.trim().to_ascii_lowercase().as_str() {
            "tech" => Some(Category::Tech),
            "application" => Some(Category::Application),
            "vendor" => Some(Category::Vendor),
            "sns" => Some(Category::Sns),
            "general" => Some(Category::General),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tech => "tech",
            Category::Application => "application",
            Category::Vendor => "vendor",
            Category::Sns => "sns",
            Category::General => "general",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    pub name: String,
    pub url: String,
}

/// Attached when the item originates from a social timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnsInfo {
    pub handle: String,
    pub display_name: String,
    pub posted_at: String,
}

/// A candidate after enrichment. Invariants: `stars` in [1,5], `category`
/// always a known variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedItem {
    pub title: String,
    pub blurb: String,
    pub category: Category,
    /// YYYY-MM-DD in the target zone; kept for output parity.
    pub date: String,
    pub stars: u8,
    pub source: SourceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sns: Option<SnsInfo>,
    /// Full timestamp used for sorting and freshness; not part of the
    /// published document.
    #[serde(skip)]
    pub published: Option<DateTime<FixedOffset>>,
}

impl EnrichedItem {
    /// Age in hours relative to `now`; unparsable/missing timestamps count
    /// as age 0 (i.e. fresh).
    pub fn age_hours(&self, now: DateTime<FixedOffset>) -> f64 {
        match self.published {
            Some(ts) => ((now - ts).num_seconds() as f64 / 3600.0).max(0.0),
            None => 0.0,
        }
    }
}

/// The single cross-section highlight surfaced above the sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Highlight {
    pub category: String,
    pub stars: u8,
    pub title: String,
    pub summary: String,
    pub sources: Vec<SourceRef>,
}

/// Final sectioned document handed to the persistence sink.
///
/// Invariant: `sections` contains every `Category` key, possibly empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDocument {
    pub generated_at: String,
    pub highlight: Option<Highlight>,
    pub sections: BTreeMap<Category, Vec<EnrichedItem>>,
}

impl OutputDocument {
    /// A valid, possibly-degenerate document with all section keys present.
    pub fn empty(generated_at: String) -> Self {
        let mut sections = BTreeMap::new();
        for cat in Category::ALL {
            sections.insert(cat, Vec::new());
        }
        Self {
            generated_at,
            highlight: None,
            sections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_round_trip() {
        for cat in Category::ALL {
            assert_eq!(Category::from_label(cat.as_str()), Some(cat));
        }
        assert_eq!(Category::from_label("TECH"), Some(Category::Tech));
        assert_eq!(Category::from_label("not-a-category"), None);
    }

    #[test]
    fn empty_document_has_all_sections() {
        let doc = OutputDocument::empty("now".into());
        assert_eq!(doc.sections.len(), Category::ALL.len());
        assert!(doc.sections.values().all(|v| v.is_empty()));
        assert!(doc.highlight.is_none());
    }

    #[test]
    fn sections_serialize_in_declaration_order() {
        let doc = OutputDocument::empty("now".into());
        let json = serde_json::to_string(&doc).unwrap();
        let tech = json.find("\"tech\"").unwrap();
        let general = json.find("\"general\"").unwrap();
        assert!(tech < general);
    }
}
