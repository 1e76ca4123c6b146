// src/pipeline.rs
//! End-to-end pipeline supervisor. Every stage degrades rather than aborts:
//! a stage failure is recorded as a warning and the run continues with
//! whatever the previous stage produced, so the output document is always
//! structurally valid.

use crate::context::RunContext;
use crate::dedup;
use crate::enrich::Enricher;
use crate::ingest;
use crate::section;
use crate::sources::SourceRegistry;
use crate::types::OutputDocument;
use crate::verify;

/// Outcome of one pipeline run. `warnings` collects degradations a caller
/// may want to surface; they never make the document invalid.
#[derive(Debug)]
pub struct RunReport {
    pub doc: OutputDocument,
    pub warnings: Vec<String>,
}

/// Run the whole pipeline: fetch, dedup, verify, enrich, section.
pub async fn run(ctx: &RunContext, registry: &SourceRegistry) -> RunReport {
    let mut warnings = Vec::new();

    if registry.is_empty() {
        warnings.push("source registry is empty".to_string());
    }

    let candidates = ingest::fetch_all(ctx, registry).await;
    tracing::info!(count = candidates.len(), "fetch complete");
    if candidates.is_empty() {
        warnings.push("no candidates fetched from any source".to_string());
    }

    let unique = dedup::dedup(ctx, candidates);

    let live = verify::verifier_for(ctx).retain_live(unique).await;
    tracing::info!(count = live.len(), "liveness verification complete");

    let enricher = Enricher::from_context(ctx);
    let enriched = enricher.enrich_all(ctx, live).await;
    tracing::info!(count = enriched.len(), "enrichment complete");
    if ctx.budget_exceeded() {
        warnings.push("global time budget exhausted; results may be partial".to_string());
    }

    let doc = section::assemble(ctx, enriched);
    RunReport { doc, warnings }
}
