// tests/canon_urls.rs
use powerfeed::canon_url;

#[test]
fn tracking_params_and_fragments_are_removed() {
    assert_eq!(
        canon_url("https://example.com/story?utm_source=nl&utm_campaign=aug&id=12#top"),
        "https://example.com/story?id=12"
    );
}

#[test]
fn trailing_slash_variants_collapse_to_one_form() {
    assert_eq!(
        canon_url("https://example.com/story/"),
        canon_url("https://example.com/story")
    );
}

#[test]
fn already_canonical_urls_are_stable() {
    let u = "https://example.com/story?id=12";
    assert_eq!(canon_url(&canon_url(u)), canon_url(u));
}

#[test]
fn non_urls_pass_through_untouched() {
    assert_eq!(canon_url("not a url"), "not a url");
}
