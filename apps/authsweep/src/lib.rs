//! Authorization sweep against a live query server.
//!
//! [`run`] resolves the external programs, starts the server under a
//! [`server::ServerGuard`] and drives the subset and precedence sweeps
//! through a [`probe::ProcessProbe`]. The server is stopped on every exit
//! path, including interruption.

pub mod cli;
pub mod driver;
pub mod logging;
pub mod plan;
pub mod probe;
pub mod report;
pub mod server;

use authsweep_config::SweepConfig;
use authsweep_core::CATALOG;
use driver::{DriverSettings, Phase, Sweep, SweepError};
use probe::ProcessProbe;
use report::SweepReport;
use server::{ServerGuard, ServerSpec};
use tracing::{info, warn};

/// Run the selected sweeps against a freshly started server.
pub async fn run(config: &SweepConfig, phase: Phase) -> Result<SweepReport, SweepError> {
    config.validate()?;
    let binaries = config.resolve_binaries()?;
    info!(
        server = %binaries.server.display(),
        tester = %binaries.tester.display(),
        checker = %binaries.checker.display(),
        "resolved binaries"
    );

    let settings = DriverSettings::from_config(config, phase);
    let probe = ProcessProbe::new(binaries.tester, binaries.checker);
    // Refuse an oversized universe before anything is started.
    let sweep = Sweep::new(&probe, CATALOG, &settings)?;

    let server = ServerGuard::launch(&ServerSpec::from_config(config, binaries.server)).await?;
    let report = sweep.run().await?;
    server.shutdown()?;
    Ok(report)
}

/// [`run`], abandoned on SIGINT or SIGTERM. Abandoning drops the server
/// guard, which stops the server and removes its durability directory.
pub async fn run_until_interrupted(
    config: &SweepConfig,
    phase: Phase,
) -> Result<SweepReport, SweepError> {
    tokio::select! {
        result = run(config, phase) => result,
        _ = shutdown_signal() => {
            warn!("interrupted, stopping server");
            Err(SweepError::Interrupted)
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("failed to install signal handlers: {e}");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigint.recv() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    }
}
