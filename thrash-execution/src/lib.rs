//! Fan-out and lifecycle coordination engine
//!
//! Two nested concurrency levels: OS-level worker processes spawned by the
//! orchestrator (one per unit of the CPU budget), and cooperative tasks
//! fanned out inside each worker. The only cross-process state is the
//! shutdown flag, relayed from the orchestrator to each child over its
//! stdin IPC channel.

pub mod budget;
pub mod error;
pub mod ipc;
pub mod orchestrator;
pub mod partition;
pub mod ramp;
pub mod shutdown;
pub mod worker;
pub mod workload;

pub use error::{ExecutionError, ExecutionResult};
pub use orchestrator::{plan, run_inline, run_process_pool};
pub use partition::{distribute_targets, partition, ProcessAssignment, TargetCycle};
pub use shutdown::{install_signal_handlers, ShutdownHandle};
pub use workload::{Operation, WatchScope, WorkloadSpec};
