// tests/sectioning.rs
use chrono::{Duration, Utc};
use powerfeed::section::{assemble, build_sections, filter_fresh, pick_highlight};
use powerfeed::types::{target_zone, Category, EnrichedItem, SourceRef};
use powerfeed::{RunContext, Settings};

fn now() -> chrono::DateTime<chrono::FixedOffset> {
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
fn stale_only_inputs_widen_to_two_days() {
    let items = vec![item("day-old-plus", Category::Tech, 3, 30)];
    let out = filter_fresh(&items, now(), 24.0);
    assert_eq!(out.len(), 1);
}

#[test]
fn fresh_items_suppress_the_widened_window() {
    let items = vec![
        item("fresh", Category::Tech, 3, 2),
        item("stale", Category::Tech, 3, 30),
    ];
    let out = filter_fresh(&items, now(), 24.0);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title, "fresh");
}

#[test]
fn sections_order_by_stars_desc_then_older_date_first() {
    let items = vec![
        item("three", Category::Vendor, 3, 1),
        item("five-new", Category::Vendor, 5, 1),
        item("five-old", Category::Vendor, 5, 60),
    ];
    let sections = build_sections(&items, 30);
    let titles: Vec<_> = sections[&Category::Vendor]
        .iter()
        .map(|i| i.title.as_str())
        .collect();
    assert_eq!(titles, vec!["five-old", "five-new", "three"]);
}

#[test]
fn per_section_cap_applies_independently() {
    let mut items: Vec<_> = (0..10).map(|i| item(&format!("t{i}"), Category::Tech, 3, 1)).collect();
    items.extend((0..3).map(|i| item(&format!("g{i}"), Category::General, 3, 1)));
    let sections = build_sections(&items, 5);
    assert_eq!(sections[&Category::Tech].len(), 5);
    assert_eq!(sections[&Category::General].len(), 3);
}

#[test]
fn highlight_prefers_stars_and_ignores_social_posts() {
    let items = vec![
        item("post", Category::Sns, 5, 1),
        item("story", Category::Application, 3, 1),
    ];
    let hl = pick_highlight(&items).unwrap();
    assert_eq!(hl.title, "story");
    assert_eq!(hl.category, "注目トピック");
    assert_eq!(hl.summary, "story blurb");
}

#[test]
fn document_always_carries_every_section_key() {
    let ctx = RunContext::new(Settings::default());
    let doc = assemble(&ctx, vec![item("one", Category::Tech, 4, 1)]);
    for cat in Category::ALL {
        assert!(doc.sections.contains_key(&cat));
    }
    let json = serde_json::to_value(&doc).unwrap();
    assert!(json["sections"]["sns"].is_array());
}
