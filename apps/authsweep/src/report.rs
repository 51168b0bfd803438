//! Summary of a finished sweep.

use serde::Serialize;
use std::path::Path;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Size of the permission universe derived from the catalog.
    pub permissions: usize,
    pub operations: usize,
    pub subsets_checked: u64,
    pub precedence_cases_checked: usize,
    pub tester_invocations: usize,
    pub checker_invocations: usize,
    pub elapsed_ms: u64,
}

impl SweepReport {
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}
