// tests/feed_parsing.rs
use powerfeed::ingest::fetch_time;
use powerfeed::ingest::providers::feed::parse_feed_items;
use powerfeed::ingest::providers::proxy::rewrite_permalink;

const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Power News</title>
  <item>
    <title>ROHM launches 4th-gen SiC MOSFETs</title>
    <link>https://www.rohm.com/news/sic4?utm_source=rss</link>
    <description><![CDATA[<p>New <b>1200V</b> parts.</p>]]></description>
    <pubDate>Fri, 28 Aug 2026 09:00:00 GMT</pubDate>
  </item>
  <item>
    <title>Undated entry</title>
    <link>https://example.com/undated</link>
  </item>
</channel></rss>"#;

#[test]
fn rss_items_are_normalized_on_parse() {
    let items = parse_feed_items(RSS, fetch_time()).unwrap();
    assert_eq!(items.len(), 2);

    let first = &items[0];
    assert_eq!(first.title, "ROHM launches 4th-gen SiC MOSFETs");
    assert_eq!(first.url, "https://www.rohm.com/news/sic4");
    assert_eq!(first.summary, "New 1200V parts.");
    assert_eq!(first.source_name, "rohm.com");
    assert_eq!(first.published.format("%Y-%m-%d").to_string(), "2026-08-28");
}

#[test]
fn missing_dates_default_to_fetch_time() {
    let now = fetch_time();
    let items = parse_feed_items(RSS, now).unwrap();
    assert_eq!(items[1].published, now);
}

#[test]
fn non_feed_bodies_are_an_error() {
    assert!(parse_feed_items("<html>not a feed</html>", fetch_time()).is_err());
}

#[test]
fn proxy_permalinks_are_rewritten_to_the_platform() {
    assert_eq!(
        rewrite_permalink("https://nitter.net/rohm_official/status/123456#m"),
        "https://x.com/rohm_official/status/123456"
    );
    // Non-status links stay as they are.
    assert_eq!(
        rewrite_permalink("https://nitter.net/rohm_official/rss"),
        "https://nitter.net/rohm_official/rss"
    );
}
