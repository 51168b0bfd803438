//! What the tester is told to expect from a batch of queries.

use serde::Serialize;

/// Tester flags describing the expected outcome of every query in a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Expectation {
    /// Every query must fail.
    pub should_fail: bool,
    /// Message a failure is compared against.
    pub failure_message: Option<String>,
    /// Treat a failure message mismatch as an error.
    pub check_failure: bool,
}

impl Expectation {
    /// Administrative statements: all must succeed.
    pub fn succeed() -> Self {
        Self {
            should_fail: false,
            failure_message: None,
            check_failure: true,
        }
    }

    /// Authorized queries. They may fail for unrelated reasons (a missing
    /// role, a stream that does not exist) but never with `message`.
    pub fn not_rejected(message: &str) -> Self {
        Self {
            should_fail: false,
            failure_message: Some(message.to_string()),
            check_failure: false,
        }
    }

    /// Unauthorized queries: every one must fail with exactly `message`.
    pub fn rejected(message: &str) -> Self {
        Self {
            should_fail: true,
            failure_message: Some(message.to_string()),
            check_failure: true,
        }
    }

    /// Tester flags, in the order the tester's CLI documents them.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.should_fail {
            args.push("--should-fail".to_string());
        }
        if let Some(message) = self.failure_message.as_deref().filter(|m| !m.is_empty()) {
            args.push("--failure-message".to_string());
            args.push(message.to_string());
        }
        if self.check_failure {
            args.push("--check-failure".to_string());
        }
        args
    }
}
