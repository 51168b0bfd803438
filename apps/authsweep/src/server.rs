//! Lifecycle of the server under test.
//!
//! [`ServerGuard::launch`] spawns the server against a fresh durability
//! directory and returns only once the service port accepts connections.
//! The guard owns the process: [`ServerGuard::shutdown`] stops it and
//! requires a zero exit code, and dropping the guard on any other path
//! (error, panic, interrupted future) still stops and reaps it.

use authsweep_config::SweepConfig;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info};

/// Upper bound for a single connection attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
/// How often a terminating server is checked for exit.
const EXIT_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to create durability directory: {0}")]
    DurabilityDir(#[source] io::Error),
    #[error("failed to start server {}: {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("server process died prematurely ({status})")]
    Died { status: ExitStatus },
    #[error("server failed to start: {addr} not reachable after {waited:?}")]
    NotReady { addr: String, waited: Duration },
    #[error("server process didn't exit cleanly ({status})")]
    UncleanExit { status: ExitStatus },
    #[error("server ignored SIGTERM for {0:?} and was killed")]
    ShutdownTimeout(Duration),
    #[error("failed to signal or reap server: {0}")]
    Io(#[from] io::Error),
}

/// How to start the server and how long to wait for it.
#[derive(Debug, Clone)]
pub struct ServerSpec {
    pub binary: PathBuf,
    pub durability_flag: String,
    pub args: Vec<String>,
    /// `host:port` probed for readiness
    pub addr: String,
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    /// Time after spawn before checking the process is still alive
    pub launch_grace: Duration,
    pub shutdown_timeout: Duration,
}

impl ServerSpec {
    pub fn from_config(config: &SweepConfig, binary: PathBuf) -> Self {
        Self {
            binary,
            durability_flag: config.durability_flag.clone(),
            args: config.server_args.clone(),
            addr: config.address(),
            ready_timeout: config.ready_timeout(),
            poll_interval: config.poll_interval(),
            settle_delay: config.settle_delay(),
            launch_grace: config.launch_grace(),
            shutdown_timeout: config.shutdown_timeout(),
        }
    }
}

/// Exclusive owner of the running server and its durability directory.
pub struct ServerGuard {
    child: Option<Child>,
    // Dropped after the child is reaped in `Drop::drop`.
    durability_dir: TempDir,
    shutdown_timeout: Duration,
}

impl ServerGuard {
    /// Start the server and wait until it accepts connections.
    pub async fn launch(spec: &ServerSpec) -> Result<Self, ServerError> {
        let durability_dir = tempfile::Builder::new()
            .prefix("authsweep-durability-")
            .tempdir()
            .map_err(ServerError::DurabilityDir)?;

        let mut cmd = Command::new(&spec.binary);
        cmd.arg(&spec.durability_flag)
            .arg(durability_dir.path())
            .args(&spec.args)
            .stdin(Stdio::null());

        debug!(
            binary = %spec.binary.display(),
            durability_dir = %durability_dir.path().display(),
            "spawning server"
        );
        let child = cmd.spawn().map_err(|source| ServerError::Spawn {
            binary: spec.binary.clone(),
            source,
        })?;

        let mut guard = Self {
            child: Some(child),
            durability_dir,
            shutdown_timeout: spec.shutdown_timeout,
        };

        sleep(spec.launch_grace).await;
        if let Some(status) = guard.reap_if_exited()? {
            return Err(ServerError::Died { status });
        }

        guard.wait_ready(spec).await?;
        info!(pid = guard.pid(), addr = %spec.addr, "server ready");
        Ok(guard)
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub fn durability_dir(&self) -> &Path {
        self.durability_dir.path()
    }

    /// Stop the server and require a clean exit.
    pub fn shutdown(mut self) -> Result<(), ServerError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let pid = child.id();
        match terminate(&mut child, self.shutdown_timeout)? {
            Termination::Exited(status) if status.success() => {
                info!(pid, "server stopped");
                Ok(())
            }
            Termination::Exited(status) => Err(ServerError::UncleanExit { status }),
            Termination::Killed => Err(ServerError::ShutdownTimeout(self.shutdown_timeout)),
        }
    }

    /// Poll the service port until it connects, the deadline passes or the
    /// process exits.
    async fn wait_ready(&mut self, spec: &ServerSpec) -> Result<(), ServerError> {
        let started = Instant::now();
        let deadline = started + spec.ready_timeout;
        loop {
            if let Some(status) = self.reap_if_exited()? {
                return Err(ServerError::Died { status });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ServerError::NotReady {
                    addr: spec.addr.clone(),
                    waited: started.elapsed(),
                });
            }

            let attempt = remaining.min(CONNECT_TIMEOUT);
            if let Ok(Ok(_stream)) = timeout(attempt, TcpStream::connect(&spec.addr)).await {
                debug!(waited = ?started.elapsed(), "server port is open");
                sleep(spec.settle_delay).await;
                return Ok(());
            }
            sleep(spec.poll_interval.min(remaining)).await;
        }
    }

    /// Returns the exit status if the server is gone, releasing the handle.
    fn reap_if_exited(&mut self) -> io::Result<Option<ExitStatus>> {
        let Some(child) = self.child.as_mut() else {
            return Ok(None);
        };
        let status = child.try_wait()?;
        if status.is_some() {
            self.child = None;
        }
        Ok(status)
    }
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();
        match terminate(&mut child, self.shutdown_timeout) {
            Ok(Termination::Exited(status)) if status.success() => {
                debug!(pid, "server stopped during cleanup");
            }
            Ok(Termination::Exited(status)) => {
                error!(pid, %status, "server didn't exit cleanly during cleanup");
            }
            Ok(Termination::Killed) => {
                error!(pid, "server ignored SIGTERM during cleanup and was killed");
            }
            Err(e) => {
                error!(pid, error = %e, "failed to stop server during cleanup");
            }
        }
    }
}

#[derive(Debug)]
enum Termination {
    Exited(ExitStatus),
    /// Still running after the grace period; SIGKILLed and reaped.
    Killed,
}

/// SIGTERM the child, wait up to `grace`, then SIGKILL. Always reaps.
fn terminate(child: &mut Child, grace: Duration) -> io::Result<Termination> {
    if let Some(status) = child.try_wait()? {
        return Ok(Termination::Exited(status));
    }
    send_sigterm(child)?;

    let deadline = Instant::now() + grace;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Termination::Exited(status));
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(EXIT_POLL);
    }

    child.kill()?;
    child.wait()?;
    Ok(Termination::Killed)
}

#[cfg(unix)]
fn send_sigterm(child: &Child) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM) {
        // Exited between try_wait and kill; the next try_wait reaps it.
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child) -> io::Result<()> {
    child.kill()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn spec(binary: &str) -> ServerSpec {
        ServerSpec {
            binary: PathBuf::from(binary),
            durability_flag: "--durability-directory".to_string(),
            args: Vec::new(),
            addr: "127.0.0.1:1".to_string(),
            ready_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
            settle_delay: Duration::ZERO,
            launch_grace: Duration::from_millis(100),
            shutdown_timeout: Duration::from_secs(2),
        }
    }

    fn guard_for(child: Child) -> ServerGuard {
        ServerGuard {
            child: Some(child),
            durability_dir: TempDir::new().unwrap(),
            shutdown_timeout: Duration::from_secs(2),
        }
    }

    fn is_alive(pid: u32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let err = ServerGuard::launch(&spec("/nonexistent/authsweep-server"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServerError::Spawn { .. }), "{err}");
    }

    #[tokio::test]
    async fn immediate_exit_is_reported_as_died() {
        // `false` ignores its arguments and exits 1.
        let err = ServerGuard::launch(&spec("false")).await.err().unwrap();
        match err {
            ServerError::Died { status } => assert_eq!(status.code(), Some(1)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn shutdown_of_sigterm_killed_process_is_unclean() {
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let guard = guard_for(child);
        let pid = guard.pid().unwrap();

        // `sleep` has no SIGTERM handler, so it dies by signal without an exit code.
        let err = guard.shutdown().unwrap_err();
        assert!(matches!(err, ServerError::UncleanExit { .. }), "{err}");
        assert!(!is_alive(pid));
    }

    #[test]
    fn drop_reaps_running_process_and_removes_directory() {
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let guard = guard_for(child);
        let pid = guard.pid().unwrap();
        let dir = guard.durability_dir().to_path_buf();
        assert!(dir.exists());

        drop(guard);
        assert!(!is_alive(pid));
        assert!(!dir.exists());
    }

    #[test]
    fn terminate_kills_process_that_ignores_sigterm() {
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; exec sleep 30"])
            .spawn()
            .unwrap();
        std::thread::sleep(Duration::from_millis(100));
        let outcome = terminate(&mut child, Duration::from_millis(200)).unwrap();
        assert!(matches!(outcome, Termination::Killed));
    }
}
