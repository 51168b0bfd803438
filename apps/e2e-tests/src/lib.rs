//! Shared pieces of the stand-in programs used by the end-to-end tests.
//!
//! The stub tester and checker append one JSON line per invocation to the
//! file named by [`LOG_ENV`] so tests can assert on exactly what authsweep
//! asked for. Neither knows anything about privileges: they only fail when
//! told to through [`FAIL_ENV`].

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::ExitCode;

/// Invocation log path.
pub const LOG_ENV: &str = "AUTHSWEEP_STUB_LOG";
/// Exit non-zero when any argument equals this value.
pub const FAIL_ENV: &str = "AUTHSWEEP_STUB_FAIL_ON";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn is(&self, program: &str) -> bool {
        self.program == program
    }
}

/// Where the stub server records itself once it is up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerState {
    pub pid: u32,
    pub durability_dir: String,
}

pub fn append(log: &Path, invocation: &Invocation) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(log)?;
    let line = serde_json::to_string(invocation)?;
    writeln!(file, "{line}")
}

pub fn read_log(log: &Path) -> io::Result<Vec<Invocation>> {
    let file = match std::fs::File::open(log) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    BufReader::new(file)
        .lines()
        .map(|line| -> io::Result<Invocation> { Ok(serde_json::from_str(&line?)?) })
        .collect()
}

/// Body of the stub tester and checker: record the call, then succeed
/// unless an argument matches [`FAIL_ENV`]. `validate` rejects argument
/// lists that break the program's calling convention.
pub fn stub_main(program: &str, validate: fn(&[String]) -> Result<(), String>) -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if let Some(log) = std::env::var_os(LOG_ENV) {
        let invocation = Invocation {
            program: program.to_string(),
            args: args.clone(),
        };
        if let Err(e) = append(Path::new(&log), &invocation) {
            eprintln!("{program}: cannot write log: {e}");
            return ExitCode::from(3);
        }
    }

    if let Err(reason) = validate(&args) {
        eprintln!("{program}: {reason}");
        return ExitCode::from(2);
    }

    if let Ok(needle) = std::env::var(FAIL_ENV) {
        if args.iter().any(|arg| *arg == needle) {
            eprintln!("{program}: failing on {needle:?}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

/// Tester convention: credentials first, then expectation flags, then the
/// queries.
pub fn validate_tester_args(args: &[String]) -> Result<(), String> {
    match args {
        [u, _, p, _, ..] if u == "--username" && p == "--password" => {}
        _ => return Err("expected --username <name> --password <password> first".to_string()),
    }
    let mut i = 4;
    while let Some(arg) = args.get(i) {
        match arg.as_str() {
            "--should-fail" | "--check-failure" => i += 1,
            "--failure-message" if i + 1 < args.len() => i += 2,
            "--failure-message" => return Err("--failure-message needs a value".to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}")),
            _ => break,
        }
    }
    Ok(())
}

/// Checker convention: nothing, or `<permission> <GRANT|DENY> <detail>`.
pub fn validate_checker_args(args: &[String]) -> Result<(), String> {
    match args {
        [] => Ok(()),
        [_, outcome, _] if outcome == "GRANT" || outcome == "DENY" => Ok(()),
        _ => Err(format!("unexpected arguments {args:?}")),
    }
}
