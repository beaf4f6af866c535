//! Core types for the Weftrun workflow execution system.
//!
//! This module defines the fundamental identifiers and status values used
//! throughout the system: node references (including the virtual `START` and
//! `END` sentinels that edges may point at) and the terminal statuses of
//! nodes and runs.
//!
//! # Key Types
//!
//! - [`NodeRef`]: A resolved edge endpoint - a real node id or a sentinel
//! - [`NodeStatus`]: Outcome of a single node execution
//! - [`RunStatus`]: Outcome of a whole run, distinguishing failure from the
//!   stopped-not-failed terminal conditions (timeout, iteration limit)
//!
//! # Examples
//!
//! ```rust
//! use weftrun::types::NodeRef;
//!
//! let start = NodeRef::parse("START");
//! assert!(start.is_start());
//!
//! let node = NodeRef::parse("summarize");
//! assert_eq!(node.encode(), "summarize");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel string marking the virtual entry endpoint in edge definitions.
pub const START: &str = "START";
/// Sentinel string marking the virtual exit endpoint in edge definitions.
pub const END: &str = "END";

/// A resolved edge endpoint within a workflow graph.
///
/// Edges in a [`GraphDefinition`](crate::definition::GraphDefinition) carry
/// plain strings; `NodeRef` is their parsed form. The `Start` and `End`
/// variants are virtual: they are never executed and exist only to describe
/// topology.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    /// Virtual entry endpoint. No incoming edges; never executed.
    Start,
    /// Virtual exit endpoint. No outgoing edges; reaching it terminates the
    /// branch.
    End,
    /// A real node, identified by its id within the graph.
    Node(String),
}

impl NodeRef {
    /// Parse an edge endpoint string into a `NodeRef`.
    ///
    /// Anything that is not the literal `START`/`END` sentinel is treated as
    /// a node id.
    pub fn parse(s: &str) -> Self {
        match s {
            START => NodeRef::Start,
            END => NodeRef::End,
            other => NodeRef::Node(other.to_string()),
        }
    }

    /// Encode back into the persisted string form.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeRef::Start => START.to_string(),
            NodeRef::End => END.to_string(),
            NodeRef::Node(id) => id.clone(),
        }
    }

    /// Returns `true` for the virtual `Start` endpoint.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` for the virtual `End` endpoint.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns the node id for real nodes, `None` for sentinels.
    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        match self {
            NodeRef::Node(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "{START}"),
            Self::End => write!(f, "{END}"),
            Self::Node(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for NodeRef {
    fn from(s: &str) -> Self {
        NodeRef::parse(s)
    }
}

/// Outcome of a single node execution, as recorded on `node_end` events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeStatus {
    /// The executor returned an output and state was updated.
    Completed,
    /// The executor returned an error; the run fails.
    Failed,
    /// The executor did not return before the run deadline.
    #[serde(rename = "timeout")]
    TimedOut,
}

impl NodeStatus {
    /// Wire form used in event envelopes and timeline entries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Completed => "completed",
            NodeStatus::Failed => "failed",
            NodeStatus::TimedOut => "timeout",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run stopped without completing or failing.
///
/// Stopped is a normal, non-exceptional terminal condition: the partial
/// state and the timeline up to the stop point remain fully inspectable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// The run-level deadline elapsed; nothing new was started after it.
    Timeout,
    /// A node exceeded its per-node iteration cap.
    IterationLimit,
}

impl StopReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Timeout => "timeout",
            StopReason::IterationLimit => "iteration-limit",
        }
    }
}

/// Terminal status of a whole run.
///
/// `Failed` is reserved for executor failures; deadline and iteration-limit
/// termination use `Stopped`, which callers must handle distinctly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// The frontier drained normally (reached `END`).
    Completed,
    /// An executor failed; the result carries the failing node id.
    Failed,
    /// The run was stopped by a deadline or iteration cap.
    Stopped(StopReason),
}

impl RunStatus {
    /// Returns `true` only for [`RunStatus::Completed`].
    #[must_use]
    pub fn success(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }

    /// Wire form used in event envelopes and timeline entries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Stopped(reason) => reason.as_str(),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noderef_parse_round_trip() {
        assert_eq!(NodeRef::parse("START"), NodeRef::Start);
        assert_eq!(NodeRef::parse("END"), NodeRef::End);
        assert_eq!(
            NodeRef::parse("worker"),
            NodeRef::Node("worker".to_string())
        );
        assert_eq!(NodeRef::parse("worker").encode(), "worker");
        assert_eq!(NodeRef::Start.encode(), "START");
    }

    #[test]
    fn test_noderef_sentinels_are_case_sensitive() {
        // Lowercase forms are ordinary node ids, not sentinels.
        assert_eq!(NodeRef::parse("start"), NodeRef::Node("start".to_string()));
        assert_eq!(NodeRef::parse("end"), NodeRef::Node("end".to_string()));
    }

    #[test]
    fn test_run_status_success() {
        assert!(RunStatus::Completed.success());
        assert!(!RunStatus::Failed.success());
        assert!(!RunStatus::Stopped(StopReason::Timeout).success());
        assert!(!RunStatus::Stopped(StopReason::IterationLimit).success());
    }

    #[test]
    fn test_status_wire_forms() {
        assert_eq!(RunStatus::Completed.as_str(), "completed");
        assert_eq!(RunStatus::Stopped(StopReason::Timeout).as_str(), "timeout");
        assert_eq!(
            RunStatus::Stopped(StopReason::IterationLimit).as_str(),
            "iteration-limit"
        );
        assert_eq!(NodeStatus::TimedOut.as_str(), "timeout");
    }
}
