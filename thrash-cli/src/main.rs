//! The `thrash` binary
//!
//! One executable serves two roles: the user-facing harness that sizes,
//! plans, and spawns the worker pool, and the hidden `worker` subcommand
//! that the harness re-invokes for each child process. Logs go to stderr
//! in both roles; worker stdout is reserved for the IPC result channel.

mod cli;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use thrash_client::HttpApiClient;
use thrash_config::{ConfigLoader, ThrashConfig};
use thrash_execution::{
    budget, install_signal_handlers, run_inline, run_process_pool, worker, Operation,
    ShutdownHandle, WorkloadSpec,
};

use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::new()
        .load(cli.config.as_ref())
        .context("failed to load configuration")?;
    apply_cli_overrides(&mut config, &cli);
    init_tracing(&config, cli.log_level.as_deref())?;

    match cli.command {
        Commands::Worker => {
            // Workers interleave their tasks cooperatively on one thread;
            // parallelism comes from the process pool, not from threads.
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            if let Err(e) = runtime.block_on(worker::worker_main(&config)) {
                error!(error = %e, "worker exiting with failure");
                std::process::exit(1);
            }
            Ok(())
        }
        ref command => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_harness(&cli, command, &config))
        }
    }
}

fn apply_cli_overrides(config: &mut ThrashConfig, cli: &Cli) {
    if let Some(args) = cli.command.load_args() {
        if let Some(ramp) = args.ramp_time {
            config.load.ramp_time = ramp.max(0) as u64;
        }
        if args.use_in_cluster_config {
            config.client.use_in_cluster_config = true;
        }
    }
}

/// Logs go to stderr so that worker stdout stays a clean result channel.
fn init_tracing(config: &ThrashConfig, override_level: Option<&str>) -> anyhow::Result<()> {
    let filter = match override_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_filter())),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run_harness(cli: &Cli, command: &Commands, config: &ThrashConfig) -> anyhow::Result<()> {
    let operation = match command {
        Commands::Watch { watch_type, .. } => Operation::Watch {
            scope: (*watch_type).into(),
        },
        Commands::List { .. } => Operation::List,
        Commands::Create { .. } => Operation::Create,
        Commands::Worker => unreachable!("worker handled before the harness runtime"),
    };
    let args = match command.load_args() {
        Some(args) => args,
        None => unreachable!("every load subcommand carries load arguments"),
    };

    let targets = parse_targets(&args.namespace)?;
    let spec = WorkloadSpec::new(args.count, targets, operation, config.load.ramp_time)?;

    if spec.total_units == 0 {
        info!("nothing to do: count is zero");
        return Ok(());
    }

    // Debug mode runs everything in one process, so the whole workload
    // collapses into a single chunk.
    let budget = if args.debug {
        1
    } else {
        budget::resolve(budget::detect_budget(), spec.total_units)
    };

    let shutdown = ShutdownHandle::new();
    install_signal_handlers(&shutdown)?;

    info!(
        operation = %spec.operation,
        count = spec.total_units,
        budget,
        debug = args.debug,
        "starting load run"
    );

    if args.debug {
        let client = Arc::new(HttpApiClient::connect(
            &config.client,
            Duration::from_secs(config.load.watch_timeout),
        )?);
        run_inline(&spec, budget, &config.load, &shutdown, client).await?;
    } else {
        run_process_pool(&spec, budget, &config.load, &shutdown, cli.config.as_ref()).await?;
    }

    info!("load run finished");
    Ok(())
}

fn parse_targets(namespace: &str) -> anyhow::Result<Vec<String>> {
    let targets: Vec<String> = namespace
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if targets.is_empty() {
        anyhow::bail!("--namespace must name at least one namespace");
    }
    Ok(targets)
}
