// src/context.rs
//! Explicit per-run context: settings plus the global budget clock.
//! Replaces any notion of process-wide singletons; every stage receives the
//! context it needs.

use crate::settings::Settings;
use chrono::{DateTime, FixedOffset, Utc};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct RunContext {
    pub settings: Settings,
    started: Instant,
}

impl RunContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            started: Instant::now(),
        }
    }

    /// True once the process-wide elapsed-time budget is exhausted. Gates
    /// whether later fetch stages are attempted at all; it never preempts an
    /// in-flight call.
    pub fn budget_exceeded(&self) -> bool {
        self.started.elapsed() > self.settings.global_budget
    }

    /// Current wall clock in the pipeline's fixed target zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&crate::types::target_zone())
    }
}
