//! In-process task fan-out runtime
//!
//! One worker process fans its unit count out into logical tasks that
//! interleave cooperatively on the current-thread runtime. Each task
//! repeats its operation against its target until the shutdown flag is
//! observed; transient connectivity failures are swallowed and retried
//! immediately, everything else fails the task and with it the process.

use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{debug, info, warn};

use thrash_client::{payload, ApiClient, ClientError, HttpApiClient, Scope};
use thrash_config::{LoadConfig, ThrashConfig};

use crate::error::ExecutionResult;
use crate::ipc::{self, WorkerMessage, WorkerResult};
use crate::partition::{ProcessAssignment, TargetCycle};
use crate::ramp;
use crate::shutdown::{install_signal_handlers, ShutdownHandle};
use crate::workload::Operation;

/// Watch events are counted and logged per task only up to this cap;
/// beyond it the stream is drained silently.
const EVENT_LOG_CAP: u64 = 1000;

/// Entry point for a worker child: read the Run envelope from stdin, fan
/// out, and report a single terminal result line on stdout.
pub async fn worker_main(config: &ThrashConfig) -> ExecutionResult<()> {
    let mut reader = BufReader::new(tokio::io::stdin());
    let envelope = ipc::read_envelope::<WorkerMessage, _>(&mut reader).await?;
    let (assignment, operation, load) = match envelope.message {
        WorkerMessage::Run {
            assignment,
            operation,
            load,
        } => (assignment, operation, load),
        // Shut down before we even started; nothing to report.
        WorkerMessage::Shutdown => return Ok(()),
    };

    let shutdown = ShutdownHandle::new();
    install_signal_handlers(&shutdown)?;
    spawn_shutdown_pump(reader, shutdown.clone());

    let process_index = assignment.process_index;
    let result = run_assignment(&assignment, &operation, &load, &shutdown, config).await;

    let mut stdout = tokio::io::stdout();
    match result {
        Ok(()) => {
            ipc::write_envelope(&mut stdout, WorkerResult::Completed { process_index }).await?;
            Ok(())
        }
        Err(e) => {
            ipc::write_envelope(
                &mut stdout,
                WorkerResult::Failed {
                    process_index,
                    error: e.to_string(),
                },
            )
            .await?;
            Err(e)
        }
    }
}

/// Keep draining stdin for the orchestrator's shutdown relay. A broken
/// channel means the orchestrator is gone, which is also a shutdown.
fn spawn_shutdown_pump(
    mut reader: BufReader<tokio::io::Stdin>,
    handle: ShutdownHandle,
) {
    tokio::spawn(async move {
        loop {
            match ipc::read_envelope::<WorkerMessage, _>(&mut reader).await {
                Ok(envelope) => {
                    if matches!(envelope.message, WorkerMessage::Shutdown) {
                        debug!("shutdown relayed from orchestrator");
                        handle.set();
                        break;
                    }
                }
                Err(_) => {
                    handle.set();
                    break;
                }
            }
        }
    });
}

async fn run_assignment(
    assignment: &ProcessAssignment,
    operation: &Operation,
    load: &LoadConfig,
    shutdown: &ShutdownHandle,
    config: &ThrashConfig,
) -> ExecutionResult<()> {
    if ramp::ramp_delay(assignment.process_index, load.ramp_time, shutdown).await {
        info!(
            process_index = assignment.process_index,
            "shutdown during ramp, starting zero tasks"
        );
        return Ok(());
    }

    info!(
        process_index = assignment.process_index,
        units = assignment.units,
        "worker starting"
    );

    let client: Arc<dyn ApiClient> = Arc::new(HttpApiClient::connect(
        &config.client,
        Duration::from_secs(load.watch_timeout),
    )?);

    run_process(assignment, operation, load, shutdown, client).await
}

/// Fan one process's unit count out into concurrent tasks and wait for
/// every loop to exit. All tasks start together; the first fatal error
/// wins and cancels the rest.
pub async fn run_process(
    assignment: &ProcessAssignment,
    operation: &Operation,
    load: &LoadConfig,
    shutdown: &ShutdownHandle,
    client: Arc<dyn ApiClient>,
) -> ExecutionResult<()> {
    let cycle = TargetCycle::new(assignment.targets.clone())?;

    let mut tasks = Vec::with_capacity(assignment.units as usize);
    for k in 0..assignment.units {
        let target = cycle.get(k as usize).to_string();
        tasks.push(run_task(
            k,
            target,
            operation.clone(),
            load.clone(),
            shutdown.clone(),
            client.clone(),
        ));
    }

    try_join_all(tasks).await?;
    info!(
        process_index = assignment.process_index,
        "all tasks drained"
    );
    Ok(())
}

async fn run_task(
    index: u64,
    target: String,
    operation: Operation,
    load: LoadConfig,
    shutdown: ShutdownHandle,
    client: Arc<dyn ApiClient>,
) -> ExecutionResult<()> {
    debug!(index, %target, "task waiting out startup jitter");
    if ramp::task_jitter(load.jitter_max, &shutdown).await {
        return Ok(());
    }

    let scope = operation.scope_for(&target);
    let watch_timeout = Duration::from_secs(load.watch_timeout);
    let mut logged_events = 0u64;

    loop {
        if shutdown.is_set() {
            break;
        }

        let outcome = match &operation {
            Operation::List => client.list(&scope).await.map(|_| ()),
            Operation::Watch { .. } => {
                watch_once(
                    client.as_ref(),
                    &scope,
                    watch_timeout,
                    &shutdown,
                    index,
                    &mut logged_events,
                )
                .await
            }
            Operation::Create => client.create(&target, payload::secret(&target)).await,
        };

        match outcome {
            // Normal completion: reconnect and go again immediately. No
            // backoff between retries; the purpose is sustained saturation.
            Ok(()) => continue,
            Err(e) if e.is_transient() => {
                debug!(index, error = %e, "transient failure, retrying immediately");
                continue;
            }
            Err(e) => {
                warn!(index, %target, error = %e, "task failed");
                return Err(e.into());
            }
        }
    }

    debug!(index, "task observed shutdown, exiting");
    Ok(())
}

/// Drive one watch stream to completion, bailing out (and closing the
/// stream) as soon as shutdown is observed mid-stream.
async fn watch_once(
    client: &dyn ApiClient,
    scope: &Scope,
    timeout: Duration,
    shutdown: &ShutdownHandle,
    index: u64,
    logged: &mut u64,
) -> Result<(), ClientError> {
    let mut stream = client.watch(scope, timeout).await?;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                stream.close();
                return Ok(());
            }
            event = stream.next_event() => match event? {
                Some(event) => {
                    if *logged < EVENT_LOG_CAP {
                        *logged += 1;
                        debug!(index, kind = %event.kind, seen = *logged, "watch event");
                    }
                }
                // Server closed the stream cleanly; caller reconnects.
                None => return Ok(()),
            },
        }
    }
}
