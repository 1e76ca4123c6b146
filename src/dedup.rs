// src/dedup.rs
//! Two-stage deduplication: exact identity keys, then similarity-based
//! pruning of near-duplicate titles.

use std::collections::HashSet;

use crate::context::RunContext;
use crate::types::CandidateItem;

/// Stage-1 survivor cap in fast mode.
pub const FAST_MODE_EXACT_CAP: usize = 120;

/// Stage 1: drop items whose `(canonical url, lowercased trimmed title)` key
/// was already seen, keeping first occurrences in encounter order. URLs are
/// canonical by the time fetchers emit items, so the key uses them as-is.
pub fn dedup_exact(items: Vec<CandidateItem>, fast_mode: bool) -> Vec<CandidateItem> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut uniq = Vec::new();
    for it in items {
        let key = (it.url.clone(), it.title.trim().to_lowercase());
        if !seen.insert(key) {
            continue;
        }
        uniq.push(it);
        if fast_mode && uniq.len() >= FAST_MODE_EXACT_CAP {
            break;
        }
    }
    uniq
}

/// Stage 2: discard any item whose title is near-identical (case-insensitive
/// normalized edit similarity >= `threshold`) to an already-accepted one.
/// O(n²) over survivors, which is fine at per-run scale (low hundreds).
///
/// `over_budget` is polled after each acceptance; once it reports true the
/// pruning stops and whatever has been accepted so far is returned. The
/// output is deterministic for a fixed input order and cutoff behavior.
pub fn prune_near_duplicates(
    items: Vec<CandidateItem>,
    threshold: f64,
    over_budget: impl Fn() -> bool,
) -> Vec<CandidateItem> {
    let mut accepted: Vec<CandidateItem> = Vec::new();
    let mut accepted_titles: Vec<String> = Vec::new();
    for it in items {
        let title = it.title.to_lowercase();
        let near = accepted_titles
            .iter()
            .any(|prev| strsim::normalized_levenshtein(prev, &title) >= threshold);
        if near {
            continue;
        }
        accepted_titles.push(title);
        accepted.push(it);
        if over_budget() {
            break;
        }
    }
    accepted
}

/// Both stages, honoring fast mode (which skips stage 2 entirely) and the
/// global budget cutoff.
pub fn dedup(ctx: &RunContext, items: Vec<CandidateItem>) -> Vec<CandidateItem> {
    let before = items.len();
    let uniq = dedup_exact(items, ctx.settings.fast_mode);
    let pruned = if ctx.settings.fast_mode {
        uniq
    } else {
        prune_near_duplicates(uniq, ctx.settings.sim_threshold, || ctx.budget_exceeded())
    };
    tracing::info!(before, after = pruned.len(), "dedup complete");
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fetch_time;

    fn item(title: &str, url: &str) -> CandidateItem {
        CandidateItem {
            title: title.to_string(),
            url: url.to_string(),
            summary: String::new(),
            published: fetch_time(),
            source_name: "example.com".to_string(),
            author_handle: None,
            author_display: None,
        }
    }

    #[test]
    fn exact_dedup_keeps_first_occurrence_order() {
        let items = vec![
            item("A story", "https://e.com/1"),
            item("a story ", "https://e.com/1"), // same key after lowering/trim
            item("B story", "https://e.com/2"),
            item("A story", "https://e.com/1"),
        ];
        let out = dedup_exact(items, false);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "A story");
        assert_eq!(out[1].title, "B story");
    }

    #[test]
    fn near_duplicate_titles_are_pruned() {
        let items = vec![
            item("SiC Inverter Breaks Record", "https://e.com/1"),
            item("SiC Inverter Breaks Records", "https://e.com/2"),
            item("GaN charger teardown", "https://e.com/3"),
        ];
        let out = prune_near_duplicates(items, 0.95, || false);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].title, "GaN charger teardown");
    }

    #[test]
    fn pruning_is_deterministic() {
        let items: Vec<_> = (0..20)
            .map(|i| item(&format!("story number {i}"), &format!("https://e.com/{i}")))
            .collect();
        let a = prune_near_duplicates(items.clone(), 0.95, || false);
        let b = prune_near_duplicates(items, 0.95, || false);
        assert_eq!(a, b);
    }

    #[test]
    fn budget_cutoff_stops_early_but_keeps_accepted() {
        let items: Vec<_> = (0..10)
            .map(|i| item(&format!("totally distinct title {i}{i}{i}"), &format!("https://e.com/{i}")))
            .collect();
        let out = prune_near_duplicates(items, 0.95, || true);
        assert_eq!(out.len(), 1);
    }
}
