//! Stand-in for the grant checker: records its arguments and exits 0.

use authsweep_e2e_tests::{stub_main, validate_checker_args};
use std::process::ExitCode;

fn main() -> ExitCode {
    stub_main("checker", validate_checker_args)
}
