// src/section.rs
//! Freshness filtering, section assembly, per-section ordering and caps, and
//! highlight selection. Pure functions over enriched items; the only inputs
//! besides the items are the clock and the run settings.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::context::RunContext;
use crate::types::{Category, EnrichedItem, Highlight, OutputDocument};

/// Widened freshness window used when the primary window empties the run.
const WIDENED_MAX_AGE_HOURS: f64 = 48.0;

/// Label attached to the cross-section highlight.
const HIGHLIGHT_LABEL: &str = "注目トピック";

/// Apply the freshness policy: keep items at most `max_age_hours` old, widen
/// once to 48h when that leaves nothing, and fall back to the full input when
/// even the widened window is empty. An empty input stays empty.
pub fn filter_fresh(
    items: &[EnrichedItem],
    now: DateTime<FixedOffset>,
    max_age_hours: f64,
) -> Vec<EnrichedItem> {
    let within = |cutoff: f64| -> Vec<EnrichedItem> {
        items
            .iter()
            .filter(|it| it.age_hours(now) <= cutoff)
            .cloned()
            .collect()
    };
    let fresh = within(max_age_hours);
    if !fresh.is_empty() || items.is_empty() {
        return fresh;
    }
    let widened = within(WIDENED_MAX_AGE_HOURS);
    if widened.is_empty() {
        items.to_vec()
    } else {
        widened
    }
}

/// Group items into the five fixed sections, sort each by descending stars
/// with older items first among equals, and truncate to `max_per_section`.
/// Every section key is present in the result even when empty.
pub fn build_sections(
    items: &[EnrichedItem],
    max_per_section: usize,
) -> BTreeMap<Category, Vec<EnrichedItem>> {
    let mut sections: BTreeMap<Category, Vec<EnrichedItem>> = BTreeMap::new();
    for cat in Category::ALL {
        sections.insert(cat, Vec::new());
    }
    for it in items {
        sections
            .get_mut(&it.category)
            .expect("all categories pre-seeded")
            .push(it.clone());
    }
    for list in sections.values_mut() {
        // sort_by is stable, so equal (stars, date) pairs keep input order.
        list.sort_by(|a, b| {
            b.stars
                .cmp(&a.stars)
                .then_with(|| a.date.cmp(&b.date))
        });
        list.truncate(max_per_section);
    }
    sections
}

/// The single most-starred non-social item, first encountered wins ties.
pub fn pick_highlight(items: &[EnrichedItem]) -> Option<Highlight> {
    let best = items
        .iter()
        .filter(|it| it.category != Category::Sns)
        .max_by(|a, b| {
            // Equal stars compare as Greater so the accumulator (the item
            // seen first) survives; ties go to the first encountered.
            a.stars.cmp(&b.stars).then(std::cmp::Ordering::Greater)
        })?;
    Some(Highlight {
        category: HIGHLIGHT_LABEL.to_string(),
        stars: best.stars,
        title: best.title.clone(),
        summary: best.blurb.clone(),
        sources: vec![best.source.clone()],
    })
}

/// Assemble the final document from enriched items.
pub fn assemble(ctx: &RunContext, items: Vec<EnrichedItem>) -> OutputDocument {
    let now = ctx.now();
    let pool = filter_fresh(&items, now, ctx.settings.max_age_hours);
    let sections = build_sections(&pool, ctx.settings.max_per_section);
    let highlight = pick_highlight(&pool);
    OutputDocument {
        generated_at: now.to_rfc3339(),
        highlight,
        sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::types::{target_zone, SourceRef};
    use chrono::{Duration, Utc};

    fn now() -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&target_zone())
    }

    fn item(title: &str, category: Category, stars: u8, age_hours: i64) -> EnrichedItem {
        let published = now() - Duration::hours(age_hours);
        EnrichedItem {
            title: title.to_string(),
            blurb: format!("{title} blurb"),
            category,
            date: published.format("%Y-%m-%d").to_string(),
            stars,
            source: SourceRef {
                name: "example.com".to_string(),
                url: format!("https://example.com/{title}"),
            },
            sns: None,
            published: Some(published),
        }
    }

    #[test]
    fn fresh_items_pass_the_primary_window() {
        let items = vec![item("a", Category::Tech, 3, 2), item("b", Category::Tech, 3, 100)];
        let out = filter_fresh(&items, now(), 24.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "a");
    }

    #[test]
    fn window_widens_once_when_primary_is_empty() {
        let items = vec![item("old", Category::Tech, 3, 36)];
        let out = filter_fresh(&items, now(), 24.0);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn everything_stale_falls_back_to_the_full_set() {
        let items = vec![item("ancient", Category::Tech, 3, 500)];
        let out = filter_fresh(&items, now(), 24.0);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(filter_fresh(&[], now(), 24.0).is_empty());
    }

    #[test]
    fn sections_sort_by_stars_then_older_date_first() {
        let items = vec![
            item("low", Category::Tech, 2, 1),
            item("high-new", Category::Tech, 5, 1),
            item("high-old", Category::Tech, 5, 30),
        ];
        let sections = build_sections(&items, 30);
        let tech = &sections[&Category::Tech];
        assert_eq!(
            tech.iter().map(|i| i.title.as_str()).collect::<Vec<_>>(),
            vec!["high-old", "high-new", "low"]
        );
    }

    #[test]
    fn sections_are_capped() {
        let items: Vec<_> = (0..40).map(|i| item(&format!("t{i}"), Category::General, 3, 1)).collect();
        let sections = build_sections(&items, 30);
        assert_eq!(sections[&Category::General].len(), 30);
        // Other sections still exist, empty.
        assert!(sections[&Category::Vendor].is_empty());
        assert_eq!(sections.len(), Category::ALL.len());
    }

    #[test]
    fn highlight_skips_social_items_and_prefers_first_on_ties() {
        let items = vec![
            item("tweet", Category::Sns, 5, 1),
            item("first", Category::Vendor, 4, 1),
            item("second", Category::Tech, 4, 1),
        ];
        let hl = pick_highlight(&items).unwrap();
        assert_eq!(hl.title, "first");
        assert_eq!(hl.category, "注目トピック");
        assert_eq!(hl.sources.len(), 1);
    }

    #[test]
    fn highlight_is_absent_when_only_social_items_exist() {
        let items = vec![item("tweet", Category::Sns, 5, 1)];
        assert!(pick_highlight(&items).is_none());
    }

    #[test]
    fn assemble_produces_a_complete_document() {
        let ctx = RunContext::new(Settings::default());
        let doc = assemble(&ctx, vec![item("story", Category::Tech, 4, 1)]);
        assert_eq!(doc.sections.len(), Category::ALL.len());
        assert_eq!(doc.sections[&Category::Tech].len(), 1);
        assert_eq!(doc.highlight.unwrap().title, "story");
    }

    #[test]
    fn assemble_on_empty_input_is_still_valid() {
        let ctx = RunContext::new(Settings::default());
        let doc = assemble(&ctx, Vec::new());
        assert!(doc.highlight.is_none());
        assert_eq!(doc.sections.len(), Category::ALL.len());
    }
}
