// src/main.rs
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use powerfeed::sources::load_registry_or_empty;
use powerfeed::{run, RunContext, Settings};

const NEWS_DIR: &str = "news";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .compact()
        .init();

    let settings = Settings::from_env();
    tracing::info!(fast_mode = settings.fast_mode, "starting news build");

    let registry = load_registry_or_empty();
    let ctx = RunContext::new(settings);

    let report = run(&ctx, &registry).await;
    for w in &report.warnings {
        tracing::warn!(warning = %w, "pipeline degradation");
    }

    let json = serde_json::to_string_pretty(&report.doc).context("serializing document")?;
    let dir = Path::new(NEWS_DIR);
    fs::create_dir_all(dir).context("creating news dir")?;

    write_atomic(&dir.join("latest.json"), &json)?;
    let dated = format!("{}.json", ctx.now().format("%Y-%m-%d"));
    write_atomic(&dir.join(dated), &json)?;

    let total: usize = report.doc.sections.values().map(Vec::len).sum();
    tracing::info!(items = total, "news build complete");
    Ok(())
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("publishing {}", path.display()))?;
    Ok(())
}
