// src/ingest/providers/sheet.rs
//! Published-spreadsheet fetcher: tries several CSV export endpoint variants
//! until one returns rows with at least one URL-looking cell, then maps
//! configured column indices to candidate items.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset};
use std::time::Duration;

use crate::canon::canon_url;
use crate::ingest::{
    fetch_time, first_line_title, parse_datetime_lenient, registrable_host, SourceFetcher,
};
use crate::sources::{ColumnMapping, SheetSource};
use crate::types::CandidateItem;

const SHEET_TIMEOUT: Duration = Duration::from_secs(20);
const TITLE_MAX_CHARS: usize = 90;

pub struct SheetFetcher {
    client: reqwest::Client,
    sheet: SheetSource,
}

impl SheetFetcher {
    pub fn new(sheet: SheetSource) -> Self {
        Self {
            client: crate::ingest::http_client(SHEET_TIMEOUT),
            sheet,
        }
    }

    fn export_urls(&self) -> [String; 3] {
        let (id, gid) = (&self.sheet.id, self.sheet.gid);
        [
            format!("https://docs.google.com/spreadsheets/d/{id}/export?format=csv&gid={gid}"),
            format!(
                "https://docs.google.com/spreadsheets/d/{id}/export?gid={gid}&single=true&output=csv"
            ),
            format!("https://docs.google.com/spreadsheets/d/{id}/gviz/tq?tqx=out:csv&gid={gid}"),
        ]
    }

    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>> {
        let mut last_err = None;
        for url in self.export_urls() {
            tracing::debug!(url = %url, "sheet export attempt");
            match self.try_variant(&url).await {
                Ok(Some(rows)) => return Ok(rows),
                Ok(None) => continue,
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("no export variant yielded url rows")))
    }

    async fn try_variant(&self, url: &str) -> Result<Option<Vec<Vec<String>>>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("sheet GET")?
            .error_for_status()
            .context("sheet status")?;
        let ctype = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        // Login/interstitial pages come back as HTML; not a usable export.
        if ctype.contains("text/html") && !ctype.contains("csv") {
            return Ok(None);
        }
        let text = resp.text().await.context("sheet body")?;
        let rows = parse_csv(&text);
        if has_url_cell(&rows) {
            Ok(Some(rows))
        } else {
            Ok(None)
        }
    }
}

#[async_trait::async_trait]
impl SourceFetcher for SheetFetcher {
    async fn fetch(&self) -> Result<Vec<CandidateItem>> {
        let rows = self.fetch_rows().await?;
        let mapping = self.sheet.mapping.clone().unwrap_or_default();
        Ok(rows_to_items(&rows, &mapping, fetch_time()))
    }

    fn name(&self) -> &'static str {
        "sheet"
    }
}

/// Minimal RFC-4180-style CSV reader: quoted cells may contain commas,
/// doubled quotes, and embedded newlines.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        cell.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => cell.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut cell)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                if row.iter().any(|c| !c.is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => cell.push(c),
        }
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        if row.iter().any(|c| !c.is_empty()) {
            rows.push(row);
        }
    }
    rows
}

fn has_url_cell(rows: &[Vec<String>]) -> bool {
    rows.iter()
        .any(|r| r.iter().any(|c| c.contains("http://") || c.contains("https://")))
}

/// Shared row-to-item conversion for sheet exports and the manual TSV.
/// Rows missing text or URL are skipped; unreadable dates fall back to `now`.
pub fn rows_to_items(
    rows: &[Vec<String>],
    mapping: &ColumnMapping,
    now: DateTime<FixedOffset>,
) -> Vec<CandidateItem> {
    let cell = |row: &[String], idx: usize| -> String {
        row.get(idx).map(|c| c.trim().to_string()).unwrap_or_default()
    };

    let mut out = Vec::new();
    for row in rows {
        let text = cell(row, mapping.text);
        let url = canon_url(&cell(row, mapping.url));
        if text.is_empty() || url.is_empty() || !url.starts_with("http") {
            continue;
        }
        let published = parse_datetime_lenient(&cell(row, mapping.date)).unwrap_or(now);
        let handle = cell(row, mapping.handle);

        let source_name = if url.contains("x.com/") || url.contains("twitter.com/") {
            "x.com".to_string()
        } else {
            registrable_host(&url).unwrap_or_else(|| "sheet".to_string())
        };

        out.push(CandidateItem {
            title: first_line_title(&text, TITLE_MAX_CHARS),
            url,
            summary: text,
            published,
            source_name,
            author_handle: (!handle.is_empty()).then_some(handle),
            author_display: None,
        });
    }
    out
}
