use crate::driver::Phase;
use authsweep_config::{ConfigError, SweepConfig};
use authsweep_core::Permission;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "authsweep")]
#[command(about = "Check a query server's privilege enforcement against every grant combination")]
pub struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the server and run the sweeps
    Run(RunArgs),
    /// Print the expected outcomes as JSON without starting anything
    Plan(PlanArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON config file; flags below override its values
    #[arg(long, env = "AUTHSWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server source tree whose build/ or build_debug/ holds the binaries
    #[arg(long, env = "AUTHSWEEP_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    /// Server binary
    #[arg(long, alias = "memgraph", env = "AUTHSWEEP_SERVER")]
    pub server: Option<PathBuf>,

    /// Tester binary
    #[arg(long, env = "AUTHSWEEP_TESTER")]
    pub tester: Option<PathBuf>,

    /// Checker binary
    #[arg(long, env = "AUTHSWEEP_CHECKER")]
    pub checker: Option<PathBuf>,

    /// Host the server listens on
    #[arg(long)]
    pub host: Option<String>,

    /// Port the server listens on
    #[arg(long)]
    pub port: Option<u16>,

    /// Give up waiting for the server port after this many milliseconds
    #[arg(long)]
    pub ready_timeout_ms: Option<u64>,

    /// Extra argument for the server (repeatable)
    #[arg(long = "server-arg", allow_hyphen_values = true)]
    pub server_args: Vec<String>,

    /// Which sweeps to run
    #[arg(long, value_enum, default_value_t = Phase::All)]
    pub phase: Phase,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    /// Load the config file if one was given, then apply flag overrides.
    pub fn to_config(&self) -> Result<SweepConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SweepConfig::load_from(path)?,
            None => SweepConfig::default(),
        };

        if let Some(dir) = &self.project_dir {
            config.project_dir = Some(dir.clone());
        }
        if let Some(server) = &self.server {
            config.server_binary = Some(server.clone());
        }
        if let Some(tester) = &self.tester {
            config.tester_binary = Some(tester.clone());
        }
        if let Some(checker) = &self.checker {
            config.checker_binary = Some(checker.clone());
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(timeout) = self.ready_timeout_ms {
            config.ready_timeout_ms = timeout;
        }
        if !self.server_args.is_empty() {
            config.server_args = self.server_args.clone();
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Include the authorized/unauthorized split for every subset
    #[arg(long)]
    pub subsets: bool,

    /// Only print the split for this grant, e.g. `--grant MATCH,CREATE`
    #[arg(long, value_delimiter = ',', conflicts_with = "subsets")]
    pub grant: Vec<Permission>,
}
