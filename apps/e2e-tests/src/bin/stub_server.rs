//! Stand-in for the database server. It accepts and drops connections on
//! the given port until SIGTERM, and can be told to misbehave.

use authsweep_e2e_tests::ServerState;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::net::TcpListener;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Listen, exit 0 on SIGTERM
    #[value(name = "ok")]
    Healthy,
    /// Exit with status 3 right away
    Die,
    /// Never open the port
    Silent,
    /// Listen, exit 1 on SIGTERM
    Dirty,
    /// Listen, ignore SIGTERM
    Stubborn,
}

#[derive(Parser, Debug)]
#[command(name = "stub-server")]
struct Args {
    #[arg(long)]
    durability_directory: PathBuf,

    #[arg(long, default_value_t = 7687)]
    port: u16,

    #[arg(long, value_enum, default_value_t = Mode::Healthy)]
    mode: Mode,

    /// Write pid and durability directory here as JSON
    #[arg(long)]
    state_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if !args.durability_directory.is_dir() {
        eprintln!(
            "stub-server: durability directory {} does not exist",
            args.durability_directory.display()
        );
        return ExitCode::from(2);
    }
    if let Some(path) = &args.state_file {
        let state = ServerState {
            pid: std::process::id(),
            durability_dir: args.durability_directory.display().to_string(),
        };
        let written = serde_json::to_string(&state)
            .map_err(std::io::Error::from)
            .and_then(|json| std::fs::write(path, json));
        if let Err(e) = written {
            eprintln!("stub-server: cannot write state file: {e}");
            return ExitCode::from(2);
        }
    }

    if let Mode::Die = args.mode {
        return ExitCode::from(3);
    }

    if !matches!(args.mode, Mode::Silent) {
        let listener = match TcpListener::bind(("127.0.0.1", args.port)).await {
            Ok(listener) => listener,
            Err(e) => {
                eprintln!("stub-server: cannot bind port {}: {e}", args.port);
                return ExitCode::from(2);
            }
        };
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                drop(stream);
            }
        });
    }

    wait_for_sigterm(args.mode).await;

    match args.mode {
        Mode::Dirty => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

#[cfg(unix)]
async fn wait_for_sigterm(mode: Mode) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            eprintln!("stub-server: cannot install SIGTERM handler: {e}");
            return;
        }
    };
    loop {
        sigterm.recv().await;
        if !matches!(mode, Mode::Stubborn) {
            return;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm(_mode: Mode) {
    std::future::pending::<()>().await;
}
