// tests/dedup_pipeline.rs
use powerfeed::dedup::dedup;
use powerfeed::ingest::fetch_time;
use powerfeed::{CandidateItem, RunContext, Settings};

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
fn case_only_title_variants_survive_as_one_item() {
    let ctx = RunContext::new(Settings::default());
    let items = vec![
        item("SiC Wafer Record", "https://example.com/a"),
        item("sic wafer record", "https://example.com/a"),
    ];
    let out = dedup(&ctx, items);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title, "SiC Wafer Record");
}

#[test]
fn near_identical_titles_from_different_urls_are_pruned() {
    let ctx = RunContext::new(Settings::default());
    let items = vec![
        item("Infineon announces 300mm GaN production line", "https://a.com/1"),
        item("Infineon announces 300mm GaN production lines", "https://b.com/2"),
        item("Completely different story about EV chargers", "https://c.com/3"),
    ];
    let out = dedup(&ctx, items);
    assert_eq!(out.len(), 2);
}

#[test]
fn fast_mode_skips_similarity_pruning() {
    let ctx = RunContext::new(Settings {
        fast_mode: true,
        ..Default::default()
    });
    let items = vec![
        item("Infineon announces 300mm GaN production line", "https://a.com/1"),
        item("Infineon announces 300mm GaN production lines", "https://b.com/2"),
    ];
    let out = dedup(&ctx, items);
    assert_eq!(out.len(), 2);
}
