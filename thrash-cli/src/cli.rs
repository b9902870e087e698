//! Command-line argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use thrash_execution::WatchScope;

#[derive(Parser)]
#[command(
    name = "thrash",
    about = "Control-plane load harness: saturates an API server with watches, lists, and creates",
    version
)]
pub struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Hold open long-lived watch streams
    Watch {
        #[command(flatten)]
        common: LoadArgs,

        /// Watch one broadcast stream per task, or one stream per namespace
        #[arg(long, value_enum, default_value_t = WatchType::All)]
        watch_type: WatchType,
    },

    /// Repeat long list polls
    List {
        #[command(flatten)]
        common: LoadArgs,
    },

    /// Push object-creation bursts
    Create {
        #[command(flatten)]
        common: LoadArgs,
    },

    /// Internal entry point for spawned worker processes
    #[command(hide = true)]
    Worker,
}

impl Commands {
    pub fn load_args(&self) -> Option<&LoadArgs> {
        match self {
            Commands::Watch { common, .. }
            | Commands::List { common }
            | Commands::Create { common } => Some(common),
            Commands::Worker => None,
        }
    }
}

/// Arguments shared by every load-generating subcommand
#[derive(Args)]
pub struct LoadArgs {
    /// Total number of concurrent load loops across all worker processes
    pub count: u64,

    /// Target namespace, or a comma-separated list cycled across processes
    #[arg(short, long, default_value = "default")]
    pub namespace: String,

    /// Seconds of ramp delay between worker process starts; negative
    /// values are treated as zero
    #[arg(short, long, allow_negative_numbers = true)]
    pub ramp_time: Option<i64>,

    /// Run every loop inside this process instead of spawning workers
    #[arg(long)]
    pub debug: bool,

    /// Authenticate with the in-cluster service account instead of a
    /// kubeconfig file
    #[arg(long)]
    pub use_in_cluster_config: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum WatchType {
    /// One cluster-wide stream per task
    All,
    /// One stream per task, scoped to the task's namespace
    Namespace,
}

impl From<WatchType> for WatchScope {
    fn from(value: WatchType) -> Self {
        match value {
            WatchType::All => WatchScope::All,
            WatchType::Namespace => WatchScope::Namespace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_defaults() {
        let cli = Cli::parse_from(["thrash", "watch", "200"]);
        match cli.command {
            Commands::Watch { common, watch_type } => {
                assert_eq!(common.count, 200);
                assert_eq!(common.namespace, "default");
                assert_eq!(common.ramp_time, None);
                assert!(!common.debug);
                assert_eq!(watch_type, WatchType::All);
            }
            _ => panic!("expected watch subcommand"),
        }
    }

    #[test]
    fn create_with_namespaces_and_ramp() {
        let cli = Cli::parse_from([
            "thrash", "create", "50", "-n", "a,b,c", "-r", "5", "--debug",
        ]);
        let common = cli.command.load_args().unwrap();
        assert_eq!(common.count, 50);
        assert_eq!(common.namespace, "a,b,c");
        assert_eq!(common.ramp_time, Some(5));
        assert!(common.debug);
    }

    #[test]
    fn worker_subcommand_takes_global_config() {
        let cli = Cli::parse_from(["thrash", "--config", "/etc/thrash.yaml", "worker"]);
        assert!(matches!(cli.command, Commands::Worker));
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/etc/thrash.yaml")));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
