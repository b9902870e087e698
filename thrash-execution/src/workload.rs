//! Workload description shared between orchestrator and workers

use serde::{Deserialize, Serialize};
use thrash_client::Scope;

use crate::error::{ExecutionError, ExecutionResult};

/// The operation every task repeats against its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Long-lived watch streams
    Watch { scope: WatchScope },
    /// Repeated long list polls
    List,
    /// Object-creation bursts
    Create,
}

/// Scope selector for watch operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchScope {
    /// One broadcast stream across every target
    All,
    /// One stream per task, scoped to the task's target
    Namespace,
}

impl Operation {
    /// Resolve the request scope for a task assigned to `target`
    pub fn scope_for(&self, target: &str) -> Scope {
        match self {
            Operation::Watch { scope: WatchScope::All } => Scope::Cluster,
            Operation::Watch {
                scope: WatchScope::Namespace,
            }
            | Operation::List
            | Operation::Create => Scope::Namespaced(target.to_string()),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Watch { scope: WatchScope::All } => write!(f, "watch(all)"),
            Operation::Watch {
                scope: WatchScope::Namespace,
            } => write!(f, "watch(namespace)"),
            Operation::List => write!(f, "list"),
            Operation::Create => write!(f, "create"),
        }
    }
}

/// The requested workload, immutable once constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    /// Total number of logical tasks across all worker processes
    pub total_units: u64,
    /// Target namespaces, cycled per process and per task
    pub targets: Vec<String>,
    /// The operation each task repeats
    pub operation: Operation,
    /// Per-process linear ramp delay in seconds
    pub ramp_time: u64,
}

impl WorkloadSpec {
    pub fn new(
        total_units: u64,
        targets: Vec<String>,
        operation: Operation,
        ramp_time: u64,
    ) -> ExecutionResult<Self> {
        if targets.is_empty() {
            return Err(ExecutionError::InvalidWorkload(
                "target list must not be empty".to_string(),
            ));
        }
        Ok(Self {
            total_units,
            targets,
            operation,
            ramp_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_targets_rejected() {
        let err = WorkloadSpec::new(10, vec![], Operation::List, 30).unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidWorkload(_)));
    }

    #[test]
    fn broadcast_watch_ignores_target() {
        let op = Operation::Watch {
            scope: WatchScope::All,
        };
        assert_eq!(op.scope_for("burn"), Scope::Cluster);
    }

    #[test]
    fn scoped_operations_use_target() {
        assert_eq!(
            Operation::List.scope_for("burn"),
            Scope::Namespaced("burn".into())
        );
        assert_eq!(
            Operation::Create.scope_for("burn"),
            Scope::Namespaced("burn".into())
        );
        let op = Operation::Watch {
            scope: WatchScope::Namespace,
        };
        assert_eq!(op.scope_for("burn"), Scope::Namespaced("burn".into()));
    }

    #[test]
    fn operation_serde_roundtrip() {
        let op = Operation::Watch {
            scope: WatchScope::All,
        };
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(serde_json::from_str::<Operation>(&json).unwrap(), op);
    }
}
