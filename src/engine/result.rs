//! Run results and step traces.

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;

use crate::types::{NodeStatus, RunStatus};

/// One executed node within the step trace.
#[derive(Clone, Debug, Serialize)]
pub struct StepTrace {
    /// Step number, starting at 1.
    pub step: u64,
    pub node_id: String,
    pub status: NodeStatus,
    pub duration_ms: u64,
}

/// Result of one workflow run.
///
/// Always carries the final (possibly partial) state and the step trace up
/// to the terminal point, whatever the status: failed and stopped runs stay
/// fully inspectable.
#[derive(Clone, Debug, Serialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub final_state: FxHashMap<String, Value>,
    pub execution_time_ms: u64,
    pub step_trace: Vec<StepTrace>,
    /// Failure or stop reason, when the run did not complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Node whose executor failed, for `RunStatus::Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_node: Option<String>,
}

impl RunResult {
    /// True only when the run completed normally.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success()
    }
}
