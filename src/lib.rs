// src/lib.rs
//! News pipeline for the power-semiconductor beat: fetch from feeds,
//! timelines, and sheets; normalize and dedup; verify, enrich, and section
//! into a publishable JSON document.

pub mod canon;
pub mod context;
pub mod dedup;
pub mod enrich;
pub mod extract;
pub mod ingest;
pub mod pipeline;
pub mod section;
pub mod settings;
pub mod sources;
pub mod types;
pub mod verify;

pub use canon::canon_url;
pub use context::RunContext;
pub use pipeline::{run, RunReport};
pub use settings::Settings;
pub use sources::{load_registry_default, SourceRegistry};
pub use types::{CandidateItem, Category, EnrichedItem, OutputDocument};
