//! Generation of run and execution identifiers.
//!
//! Identifiers are UUID-backed with a short human-readable prefix so they
//! are recognizable in logs and persisted summaries.

use uuid::Uuid;

/// Generates prefixed, globally unique identifiers.
///
/// # Examples
///
/// ```
/// use weftrun::utils::id_generator::IdGenerator;
///
/// let ids = IdGenerator::new();
/// let run_id = ids.generate_run_id();
/// assert!(run_id.starts_with("run-"));
///
/// let exec_id = ids.generate_execution_id();
/// assert!(exec_id.starts_with("exec-"));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Identifier for a whole run, used as the persistence key.
    #[must_use]
    pub fn generate_run_id(&self) -> String {
        format!("run-{}", Uuid::new_v4())
    }

    /// Identifier for one execution context (root or sub-agent).
    #[must_use]
    pub fn generate_execution_id(&self) -> String {
        format!("exec-{}", Uuid::new_v4().simple())
    }
}
