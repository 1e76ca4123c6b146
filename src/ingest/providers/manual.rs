// src/ingest/providers/manual.rs
//! Manual-record fetcher: a local tab-separated file where each line is
//! `(date, handle, text, media_url?, post_url)`. Short rows are padded, then
//! the rows share the sheet row-to-item conversion.

use anyhow::Result;
use std::path::PathBuf;

use crate::ingest::providers::sheet::rows_to_items;
use crate::ingest::{fetch_time, SourceFetcher};
use crate::sources::ColumnMapping;
use crate::types::CandidateItem;

const TSV_COLUMNS: usize = 5;

pub struct ManualRecordFetcher {
    path: PathBuf,
}

impl ManualRecordFetcher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl SourceFetcher for ManualRecordFetcher {
    async fn fetch(&self) -> Result<Vec<CandidateItem>> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no manual record file");
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        let rows = parse_tsv(&text);
        Ok(rows_to_items(&rows, &ColumnMapping::manual_tsv(), fetch_time()))
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}

pub fn parse_tsv(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut cells: Vec<String> = line.split('\t').map(|c| c.to_string()).collect();
            while cells.len() < TSV_COLUMNS {
                cells.push(String::new());
            }
            cells
        })
        .collect()
}
