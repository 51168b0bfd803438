//! Server lifecycle failures: the run reports them and never leaves the
//! server process or its durability directory behind.

#![cfg(unix)]

mod common;

use authsweep::driver::{Phase, SweepError};
use authsweep::server::ServerError;
use authsweep::{run, run_until_interrupted};
use common::{assert_server_cleaned_up, tester_calls, Sandbox, ServerMode};
use std::time::Duration;

#[tokio::test]
async fn server_that_exits_at_startup() -> Result<(), Box<dyn std::error::Error>> {
    let sandbox = Sandbox::new()?;
    let config = sandbox.config(ServerMode::Die)?;

    let err = run(&config, Phase::All).await.unwrap_err();
    match &err {
        SweepError::Server(ServerError::Died { status }) => assert_eq!(status.code(), Some(3)),
        other => panic!("unexpected error: {other}"),
    }
    assert!(tester_calls(&sandbox.invocations()).is_empty());
    assert_server_cleaned_up(&sandbox.server_state());
    Ok(())
}

#[tokio::test]
async fn server_that_never_listens() -> Result<(), Box<dyn std::error::Error>> {
    let sandbox = Sandbox::new()?;
    let mut config = sandbox.config(ServerMode::Silent)?;
    config.ready_timeout_ms = 500;

    let err = run(&config, Phase::All).await.unwrap_err();
    assert!(
        matches!(err, SweepError::Server(ServerError::NotReady { .. })),
        "{err}"
    );
    assert!(tester_calls(&sandbox.invocations()).is_empty());
    assert_server_cleaned_up(&sandbox.server_state());
    Ok(())
}

#[tokio::test]
async fn unclean_exit_fails_a_passing_sweep() -> Result<(), Box<dyn std::error::Error>> {
    let sandbox = Sandbox::new()?;
    let config = sandbox.config(ServerMode::Dirty)?;

    let err = run(&config, Phase::Precedence).await.unwrap_err();
    match &err {
        SweepError::Server(ServerError::UncleanExit { status }) => {
            assert_eq!(status.code(), Some(1))
        }
        other => panic!("unexpected error: {other}"),
    }
    // The sweep itself ran to completion before shutdown.
    assert_eq!(tester_calls(&sandbox.invocations()).len(), 1 + 1 + 18 * 2);
    assert_server_cleaned_up(&sandbox.server_state());
    Ok(())
}

#[tokio::test]
async fn server_ignoring_sigterm_is_killed() -> Result<(), Box<dyn std::error::Error>> {
    let sandbox = Sandbox::new()?;
    let mut config = sandbox.config(ServerMode::Stubborn)?;
    config.shutdown_timeout_ms = 300;

    let err = run(&config, Phase::Precedence).await.unwrap_err();
    assert!(
        matches!(err, SweepError::Server(ServerError::ShutdownTimeout(_))),
        "{err}"
    );
    assert_server_cleaned_up(&sandbox.server_state());
    Ok(())
}

#[tokio::test]
async fn abandoned_run_stops_the_server() -> Result<(), Box<dyn std::error::Error>> {
    let sandbox = Sandbox::new()?;
    let config = sandbox.config(ServerMode::Silent)?;

    // Readiness polling would go on for the full ten seconds.
    let outcome = tokio::time::timeout(
        Duration::from_millis(800),
        run_until_interrupted(&config, Phase::All),
    )
    .await;
    assert!(outcome.is_err(), "run should still have been waiting");

    assert_server_cleaned_up(&sandbox.server_state());
    Ok(())
}
