//! Process orchestration
//!
//! The normal path spawns one worker child per budget unit by re-invoking
//! the current executable with the hidden `worker` subcommand, dispatches
//! each child its assignment over stdin, relays shutdown the same way, and
//! joins every child before surfacing the first fatal error. A synchronous
//! in-process executor stands in for the pool under `--debug`; it makes
//! the exact same partitioning and targeting decisions.

use futures::future::join_all;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use thrash_client::ApiClient;
use thrash_config::LoadConfig;

use crate::error::{ExecutionError, ExecutionResult};
use crate::ipc::{self, IpcError, WorkerMessage, WorkerResult};
use crate::partition::{distribute_targets, partition, ProcessAssignment};
use crate::ramp;
use crate::shutdown::ShutdownHandle;
use crate::worker;
use crate::workload::WorkloadSpec;

/// Compute every process's share of the workload. Both executors go
/// through this, so executor choice never changes data-flow outcomes.
pub fn plan(spec: &WorkloadSpec, budget: u64) -> Vec<ProcessAssignment> {
    let units = partition(spec.total_units, budget);
    let groups = distribute_targets(&spec.targets, budget);
    units
        .into_iter()
        .zip(groups)
        .enumerate()
        .map(|(process_index, (units, targets))| ProcessAssignment {
            process_index,
            units,
            targets,
        })
        .collect()
}

/// Run the workload on a pool of worker processes.
///
/// `config_path` is forwarded to the children so file-based configuration
/// behaves the same in every process.
pub async fn run_process_pool(
    spec: &WorkloadSpec,
    budget: u64,
    load: &LoadConfig,
    shutdown: &ShutdownHandle,
    config_path: Option<&PathBuf>,
) -> ExecutionResult<()> {
    let assignments = plan(spec, budget);
    let assigned: u64 = assignments.iter().map(|a| a.units).sum();
    if assigned < spec.total_units {
        warn!(
            dropped = spec.total_units - assigned,
            "unit count does not divide evenly across the budget; remainder units are not assigned"
        );
    }

    let exe = std::env::current_exe()?;
    info!(
        budget,
        total_units = spec.total_units,
        operation = %spec.operation,
        "spawning worker pool"
    );

    let mut supervisors = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let mut command = Command::new(&exe);
        if let Some(path) = config_path {
            command.arg("--config").arg(path);
        }
        let child = command
            .arg("worker")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let message = WorkerMessage::Run {
            assignment: assignment.clone(),
            operation: spec.operation.clone(),
            load: load.clone(),
        };
        supervisors.push(tokio::spawn(supervise_child(
            assignment.process_index,
            child,
            message,
            shutdown.clone(),
        )));
    }

    // Join ALL workers before surfacing anything; siblings are never
    // abandoned because one of them failed.
    let mut first_error = None;
    for joined in join_all(supervisors).await {
        let result = joined.unwrap_or_else(|e| Err(ExecutionError::Join(e.to_string())));
        if let Err(e) = result {
            error!(error = %e, "worker failed");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            info!("all workers drained");
            Ok(())
        }
    }
}

/// Own one child for its whole life: dispatch its assignment, relay the
/// shutdown flag, collect its terminal result, and wait for full (never
/// forced) termination.
async fn supervise_child(
    process_index: usize,
    mut child: Child,
    message: WorkerMessage,
    shutdown: ShutdownHandle,
) -> ExecutionResult<()> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| std::io::Error::other("worker stdin not piped"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("worker stdout not piped"))?;
    let mut reader = BufReader::new(stdout);

    ipc::write_envelope(&mut stdin, &message).await?;
    debug!(process_index, pid = ?child.id(), "worker dispatched");

    let mut relayed = false;
    let mut failure: Option<String> = None;
    loop {
        tokio::select! {
            received = ipc::read_envelope::<WorkerResult, _>(&mut reader) => {
                match received {
                    Ok(envelope) => match envelope.message {
                        WorkerResult::Completed { .. } => break,
                        WorkerResult::Failed { error, .. } => {
                            failure = Some(error);
                            break;
                        }
                    },
                    // Child exited without a result line; exit status decides.
                    Err(IpcError::ConnectionClosed) => break,
                    Err(e) => {
                        failure = Some(e.to_string());
                        break;
                    }
                }
            }
            _ = shutdown.cancelled(), if !relayed => {
                relayed = true;
                debug!(process_index, "relaying shutdown to worker");
                if let Err(e) = ipc::write_envelope(&mut stdin, &WorkerMessage::Shutdown).await {
                    warn!(process_index, error = %e, "failed to relay shutdown");
                }
            }
        }
    }

    let status = child.wait().await?;
    if let Some(error) = failure {
        return Err(ExecutionError::WorkerFailed {
            process_index,
            error,
        });
    }
    if !status.success() {
        return Err(ExecutionError::WorkerExited {
            process_index,
            status,
        });
    }
    debug!(process_index, "worker joined cleanly");
    Ok(())
}

/// Synchronous single-process stand-in for the pool. Each submitted chunk
/// runs to completion immediately and its error is captured into the
/// result set instead of raised inline, so the call contract matches the
/// real pool and the rest of the code stays executor-agnostic.
pub async fn run_inline(
    spec: &WorkloadSpec,
    budget: u64,
    load: &LoadConfig,
    shutdown: &ShutdownHandle,
    client: Arc<dyn ApiClient>,
) -> ExecutionResult<()> {
    let assignments = plan(spec, budget);

    let mut first_error = None;
    for assignment in assignments {
        if ramp::ramp_delay(assignment.process_index, load.ramp_time, shutdown).await {
            info!(
                process_index = assignment.process_index,
                "shutdown during ramp, starting zero tasks"
            );
            continue;
        }

        let result =
            worker::run_process(&assignment, &spec.operation, load, shutdown, client.clone()).await;
        if let Err(e) = result {
            error!(
                process_index = assignment.process_index,
                error = %e,
                "chunk failed on inline executor"
            );
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::Operation;

    fn spec(total_units: u64, targets: &[&str]) -> WorkloadSpec {
        WorkloadSpec::new(
            total_units,
            targets.iter().map(|s| s.to_string()).collect(),
            Operation::List,
            30,
        )
        .unwrap()
    }

    #[test]
    fn plan_assigns_floor_share_to_every_process() {
        let assignments = plan(&spec(10, &["a", "b", "c"]), 3);
        assert_eq!(assignments.len(), 3);
        for (i, assignment) in assignments.iter().enumerate() {
            assert_eq!(assignment.process_index, i);
            assert_eq!(assignment.units, 3);
        }
        // One unit of the ten is deliberately unassigned.
        assert_eq!(assignments.iter().map(|a| a.units).sum::<u64>(), 9);
    }

    #[test]
    fn plan_covers_every_target() {
        let assignments = plan(&spec(12, &["a", "b", "c", "d", "e"]), 4);
        for target in ["a", "b", "c", "d", "e"] {
            assert!(assignments
                .iter()
                .any(|a| a.targets.iter().any(|t| t == target)));
        }
    }

    #[test]
    fn plan_is_deterministic() {
        let workload = spec(9, &["a", "b"]);
        assert_eq!(plan(&workload, 3), plan(&workload, 3));
    }
}
