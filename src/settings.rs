// src/settings.rs
//! Environment-style tunables, read once per run (never re-read mid-run).

use std::time::Duration;

const ENV_FAST_MODE: &str = "NEWS_FAST_MODE";
const ENV_GLOBAL_TIMEOUT: &str = "NEWS_GLOBAL_TIMEOUT_SEC";
const ENV_MAX_AGE_HOURS: &str = "NEWS_MAX_AGE_HOURS";
const ENV_RECENCY_WINDOW: &str = "NEWS_RECENCY_WINDOW_HOURS";
const ENV_MAX_PER_SECTION: &str = "NEWS_MAX_PER_SECTION";
const ENV_ONLY_SHEETS: &str = "NEWS_ONLY_SHEETS";
const ENV_SIM_THRESHOLD: &str = "NEWS_SIM_THRESHOLD";

/// Run-wide knobs. Fast mode trades completeness for bounded latency: it
/// skips near-duplicate pruning, liveness checks, and article extraction, and
/// truncates result counts.
#[derive(Debug, Clone)]
pub struct Settings {
    pub fast_mode: bool,
    pub global_budget: Duration,
    pub max_age_hours: f64,
    pub recency_window_hours: f64,
    pub max_per_section: usize,
    pub only_sheets: bool,
    pub sim_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fast_mode: false,
            global_budget: Duration::from_secs(60),
            max_age_hours: 24.0,
            recency_window_hours: 96.0,
            max_per_section: 30,
            only_sheets: false,
            sim_threshold: 0.95,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let d = Settings::default();
        Self {
            fast_mode: env_flag(ENV_FAST_MODE),
            global_budget: Duration::from_secs(env_parse(
                ENV_GLOBAL_TIMEOUT,
                d.global_budget.as_secs(),
            )),
            max_age_hours: env_parse(ENV_MAX_AGE_HOURS, d.max_age_hours),
            recency_window_hours: env_parse(ENV_RECENCY_WINDOW, d.recency_window_hours),
            max_per_section: env_parse(ENV_MAX_PER_SECTION, d.max_per_section),
            only_sheets: env_flag(ENV_ONLY_SHEETS),
            sim_threshold: env_parse(ENV_SIM_THRESHOLD, d.sim_threshold),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
