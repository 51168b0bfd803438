//! Sandbox for running authsweep against the stub programs.
//!
//! Every test gets its own temp directory holding the invocation log, the
//! stub server's state file and small wrapper scripts that hand the stub
//! tester and checker their environment. Nothing touches the test
//! process's own environment.

#![allow(dead_code)]

use authsweep_config::SweepConfig;
use authsweep_e2e_tests::{read_log, Invocation, ServerState, FAIL_ENV, LOG_ENV};
use std::fs;
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const STUB_SERVER: &str = env!("CARGO_BIN_EXE_stub-server");
pub const STUB_TESTER: &str = env!("CARGO_BIN_EXE_stub-tester");
pub const STUB_CHECKER: &str = env!("CARGO_BIN_EXE_stub-checker");

/// Find an available port for a test server.
pub fn find_available_port() -> Result<u16, Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

/// How the stub server should behave, passed through `--mode`.
#[derive(Debug, Clone, Copy)]
pub enum ServerMode {
    Ok,
    Die,
    Silent,
    Dirty,
    Stubborn,
}

impl ServerMode {
    fn as_arg(self) -> &'static str {
        match self {
            ServerMode::Ok => "ok",
            ServerMode::Die => "die",
            ServerMode::Silent => "silent",
            ServerMode::Dirty => "dirty",
            ServerMode::Stubborn => "stubborn",
        }
    }
}

pub struct Sandbox {
    dir: TempDir,
    pub port: u16,
}

impl Sandbox {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            dir: TempDir::new()?,
            port: find_available_port()?,
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("invocations.jsonl")
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("server-state.json")
    }

    /// Config that runs the stub server in `mode` with stub tester and
    /// checker that always pass.
    pub fn config(&self, mode: ServerMode) -> Result<SweepConfig, Box<dyn std::error::Error>> {
        self.config_failing_on(mode, None, None)
    }

    /// Like [`Sandbox::config`], but the tester or checker exits non-zero
    /// when one of its arguments equals the given value.
    pub fn config_failing_on(
        &self,
        mode: ServerMode,
        tester_fail_on: Option<&str>,
        checker_fail_on: Option<&str>,
    ) -> Result<SweepConfig, Box<dyn std::error::Error>> {
        let tester = self.wrapper("tester", STUB_TESTER, tester_fail_on)?;
        let checker = self.wrapper("checker", STUB_CHECKER, checker_fail_on)?;
        Ok(SweepConfig {
            server_binary: Some(PathBuf::from(STUB_SERVER)),
            tester_binary: Some(tester),
            checker_binary: Some(checker),
            port: self.port,
            server_args: vec![
                "--port".to_string(),
                self.port.to_string(),
                "--mode".to_string(),
                mode.as_arg().to_string(),
                "--state-file".to_string(),
                self.state_path().display().to_string(),
            ],
            ready_timeout_ms: 10_000,
            shutdown_timeout_ms: 5_000,
            ..SweepConfig::default()
        })
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        read_log(&self.log_path()).expect("invocation log should be readable")
    }

    pub fn server_state(&self) -> ServerState {
        let json = fs::read_to_string(self.state_path()).expect("stub server should have started");
        serde_json::from_str(&json).expect("state file should be valid JSON")
    }

    fn wrapper(
        &self,
        name: &str,
        binary: &str,
        fail_on: Option<&str>,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let mut script = format!(
            "#!/bin/sh\nexport {LOG_ENV}='{}'\n",
            self.log_path().display()
        );
        if let Some(value) = fail_on {
            script.push_str(&format!("export {FAIL_ENV}='{value}'\n"));
        }
        script.push_str(&format!("exec '{binary}' \"$@\"\n"));

        let path = self.dir.path().join(name);
        fs::write(&path, script)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }
}

/// The server process has been reaped and its durability directory is gone.
pub fn assert_server_cleaned_up(state: &ServerState) {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    assert_eq!(
        kill(Pid::from_raw(state.pid as i32), None),
        Err(Errno::ESRCH),
        "server pid {} still exists",
        state.pid
    );
    assert!(
        !Path::new(&state.durability_dir).exists(),
        "durability directory {} was left behind",
        state.durability_dir
    );
}

pub fn tester_calls(invocations: &[Invocation]) -> Vec<&Invocation> {
    invocations.iter().filter(|i| i.is("tester")).collect()
}

pub fn checker_calls(invocations: &[Invocation]) -> Vec<&Invocation> {
    invocations.iter().filter(|i| i.is("checker")).collect()
}
