use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    pub debounce_ms: u64,
    pub min_query_chars: usize,
    pub suggestions_stagger_ms: u64,
    pub backfill_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_query_chars: 2,
            suggestions_stagger_ms: 100,
            backfill_delay_ms: 100,
        }
    }
}

impl TimingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn suggestions_stagger(&self) -> Duration {
        Duration::from_millis(self.suggestions_stagger_ms)
    }

    pub fn backfill_delay(&self) -> Duration {
        Duration::from_millis(self.backfill_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_id: String,
    pub timing: TimingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            user_id: String::new(),
            timing: TimingConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let user_id = std::env::var("MEALMIND_USER_ID")?;
        let defaults = TimingConfig::default();
        let timing = TimingConfig {
            debounce_ms: env_or("TYPEAHEAD_DEBOUNCE_MS", defaults.debounce_ms),
            min_query_chars: env_or("TYPEAHEAD_MIN_CHARS", defaults.min_query_chars),
            suggestions_stagger_ms: env_or("SUGGESTIONS_STAGGER_MS", defaults.suggestions_stagger_ms),
            backfill_delay_ms: env_or("SUGGESTIONS_BACKFILL_MS", defaults.backfill_delay_ms),
        };
        Ok(Self {
            base_url: std::env::var("NUTRITION_API_URL")
                .unwrap_or_else(|_| "http://localhost:5000".into()),
            user_id,
            timing,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
