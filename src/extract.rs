// src/extract.rs
//! Best-effort article text extraction. Failure of any kind degrades to an
//! empty string; callers substitute the feed-provided summary.

use once_cell::sync::OnceCell;
use std::time::Duration;

const EXTRACT_TIMEOUT: Duration = Duration::from_secs(10);

/// Elements whose entire content is boilerplate, never article text.
const BOILERPLATE_TAGS: [&str; 10] = [
    "script", "style", "nav", "header", "footer", "aside", "form", "table", "figure", "noscript",
];

pub struct ContentExtractor {
    client: reqwest::Client,
    fast_mode: bool,
}

impl ContentExtractor {
    pub fn new(fast_mode: bool) -> Self {
        Self {
            client: crate::ingest::http_client(EXTRACT_TIMEOUT),
            fast_mode,
        }
    }

    /// Fetch the page and reduce it to readable text. Empty string means
    /// "use the original summary instead"; it is never an error.
    pub async fn extract_text(&self, url: &str) -> String {
        if self.fast_mode {
            return String::new();
        }
        let body = match self.fetch_page(url).await {
            Some(b) => b,
            None => return String::new(),
        };
        extract_readable_text(&body)
    }

    async fn fetch_page(&self, url: &str) -> Option<String> {
        let resp = self.client.get(url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        resp.text().await.ok()
    }
}

/// Strip boilerplate blocks (scripts, navigation, comment/table/figure
/// markup) before flattening the remaining markup to text. One pattern per
/// tag name, each matching that tag's literal closing tag.
pub fn extract_readable_text(html: &str) -> String {
    static RE_BLOCKS: OnceCell<Vec<regex::Regex>> = OnceCell::new();
    let re_blocks = RE_BLOCKS.get_or_init(|| {
        BOILERPLATE_TAGS
            .iter()
            .map(|tag| regex::Regex::new(&format!(r"(?is)<{tag}\b.*?</{tag}\s*>")).unwrap())
            .collect()
    });
    static RE_COMMENTS: OnceCell<regex::Regex> = OnceCell::new();
    let re_comments = RE_COMMENTS.get_or_init(|| regex::Regex::new(r"(?s)<!--.*?-->").unwrap());

    let mut text = re_comments.replace_all(html, " ").into_owned();
    for re in re_blocks {
        text = re.replace_all(&text, " ").into_owned();
    }
    crate::ingest::strip_html(&text)
}
