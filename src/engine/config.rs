//! Engine runtime configuration.

use crate::utils::id_generator::IdGenerator;

/// Default run deadline applied when neither the definition nor the
/// environment provides one.
pub const DEFAULT_MAX_EXECUTION_SECONDS: u64 = 300;

/// Runtime configuration for an [`ExecutionEngine`](super::ExecutionEngine).
///
/// The definition's own `max_execution_time_seconds` takes precedence over
/// the configured default.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Run id used as the persistence key for summaries.
    pub run_id: String,
    /// Deadline fallback for definitions that do not set one.
    pub max_execution_time_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            run_id: IdGenerator::new().generate_run_id(),
            max_execution_time_seconds: DEFAULT_MAX_EXECUTION_SECONDS,
        }
    }
}

impl EngineConfig {
    /// Configuration resolved from the environment.
    ///
    /// Reads `WEFTRUN_MAX_EXECUTION_SECONDS` (via dotenv when present),
    /// falling back to the built-in default.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let max_execution_time_seconds = std::env::var("WEFTRUN_MAX_EXECUTION_SECONDS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_MAX_EXECUTION_SECONDS);
        Self {
            run_id: IdGenerator::new().generate_run_id(),
            max_execution_time_seconds,
        }
    }

    #[must_use]
    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }

    #[must_use]
    pub fn with_max_execution_seconds(mut self, seconds: u64) -> Self {
        self.max_execution_time_seconds = seconds;
        self
    }
}
