//! Running queries and grant checks against the live server.
//!
//! The driver only talks to the server through [`Probe`]. [`ProcessProbe`]
//! is the real implementation: it runs the external tester and checker
//! binaries one at a time and turns a non-zero exit into an error.

use async_trait::async_trait;
use authsweep_config::Identity;
use authsweep_core::Expectation;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run {}: {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("tester reported a mismatch for {count} queries run as {username} ({status})")]
    Tester {
        username: String,
        count: usize,
        status: String,
    },
    #[error("checker disagreed with expected grants {expected:?} ({status})")]
    Checker {
        expected: Vec<String>,
        status: String,
    },
}

/// Observes the server's behaviour on behalf of the driver.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Run `queries` as `identity`; succeeds when every outcome matches
    /// `expectation`.
    async fn run_queries(
        &self,
        identity: &Identity,
        queries: &[String],
        expectation: &Expectation,
    ) -> Result<(), ProbeError>;

    /// Compare the server's grant report for the test user with `expected`.
    /// An empty slice means no privilege line is expected.
    async fn check_grants(&self, expected: &[String]) -> Result<(), ProbeError>;
}

/// [`Probe`] backed by the tester and checker executables.
#[derive(Debug, Clone)]
pub struct ProcessProbe {
    tester: PathBuf,
    checker: PathBuf,
}

impl ProcessProbe {
    pub fn new(tester: PathBuf, checker: PathBuf) -> Self {
        Self { tester, checker }
    }
}

/// Build the tester command line: credentials, expectation flags, then the
/// queries as trailing positional arguments.
pub fn tester_args(
    identity: &Identity,
    queries: &[String],
    expectation: &Expectation,
) -> Vec<String> {
    let mut args = vec![
        "--username".to_string(),
        identity.username.clone(),
        "--password".to_string(),
        identity.password.clone(),
    ];
    args.extend(expectation.to_args());
    args.extend(queries.iter().cloned());
    args
}

async fn run(binary: &Path, args: &[String]) -> Result<ExitStatus, ProbeError> {
    debug!(binary = %binary.display(), args = args.len(), "running");
    Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|source| ProbeError::Spawn {
            binary: binary.to_path_buf(),
            source,
        })
}

#[async_trait]
impl Probe for ProcessProbe {
    async fn run_queries(
        &self,
        identity: &Identity,
        queries: &[String],
        expectation: &Expectation,
    ) -> Result<(), ProbeError> {
        let args = tester_args(identity, queries, expectation);
        let status = run(&self.tester, &args).await?;
        if status.success() {
            Ok(())
        } else {
            Err(ProbeError::Tester {
                username: identity.username.clone(),
                count: queries.len(),
                status: status.to_string(),
            })
        }
    }

    async fn check_grants(&self, expected: &[String]) -> Result<(), ProbeError> {
        let status = run(&self.checker, expected).await?;
        if status.success() {
            Ok(())
        } else {
            Err(ProbeError::Checker {
                expected: expected.to_vec(),
                status: status.to_string(),
            })
        }
    }
}
