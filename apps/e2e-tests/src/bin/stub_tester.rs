//! Stand-in for the query tester: records its arguments and exits 0.

use authsweep_e2e_tests::{stub_main, validate_tester_args};
use std::process::ExitCode;

fn main() -> ExitCode {
    stub_main("tester", validate_tester_args)
}
