// tests/budget_stages.rs
//! Budget exhaustion must skip the network fetch stages without discarding
//! anything already collected. All offline: the feed URLs below would fail
//! if they were ever contacted, and the manual file needs no network.

use powerfeed::ingest::fetch_all;
use powerfeed::{RunContext, Settings, SourceRegistry};
use std::io::Write;
use std::time::Duration;

fn exhausted_ctx() -> RunContext {
    let ctx = RunContext::new(Settings {
        global_budget: Duration::from_secs(0),
        ..Default::default()
    });
    // Let the zero budget elapse before any stage gate is consulted.
    std::thread::sleep(Duration::from_millis(5));
    assert!(ctx.budget_exceeded());
    ctx
}

#[tokio::test]
async fn exhausted_budget_skips_stages_but_keeps_manual_items() {
    let tmp = tempfile::tempdir().unwrap();
    let tsv_path = tmp.path().join("manual_sns.tsv");
    let mut f = std::fs::File::create(&tsv_path).unwrap();
    writeln!(
        f,
        "2026-08-29\t@rohm\tSiC driver notes\t\thttps://x.com/rohm/status/7"
    )
    .unwrap();

    let registry = SourceRegistry {
        feeds: vec!["https://feed.invalid/rss".to_string()],
        x_rss_base: Some("https://proxy.invalid".to_string()),
        x_rss_accounts: vec!["rohm".to_string()],
        discovery: vec!["hn".to_string()],
        manual_path: Some(tsv_path),
        ..Default::default()
    };

    let items = fetch_all(&exhausted_ctx(), &registry).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].url, "https://x.com/rohm/status/7");
}

#[tokio::test]
async fn exhausted_budget_with_no_local_sources_yields_nothing() {
    let registry = SourceRegistry {
        feeds: vec!["https://feed.invalid/rss".to_string()],
        ..Default::default()
    };
    let items = fetch_all(&exhausted_ctx(), &registry).await;
    assert!(items.is_empty());
}
