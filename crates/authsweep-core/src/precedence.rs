//! How user-level and role-level bindings combine.
//!
//! A role binding only counts while the user is mapped to the role. Among
//! the bindings that count, DENY beats GRANT, and REVOKE contributes
//! nothing. When neither GRANT nor DENY remains the privilege is simply
//! absent and the checker prints no line for it.

use crate::permission::Permission;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege scope the precedence sweep binds at user and role level.
pub const PRECEDENCE_SCOPE: Permission = Permission::Match;

/// An explicit directive attached to a privilege. `Revoke` also stands for
/// "no binding".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Binding {
    Grant,
    Deny,
    Revoke,
}

impl Binding {
    pub const ALL: [Binding; 3] = [Binding::Grant, Binding::Deny, Binding::Revoke];

    pub fn keyword(&self) -> &'static str {
        match self {
            Binding::Grant => "GRANT",
            Binding::Deny => "DENY",
            Binding::Revoke => "REVOKE",
        }
    }

    /// Preposition that precedes the grantee in the statement.
    pub fn preposition(&self) -> &'static str {
        match self {
            Binding::Revoke => "FROM",
            Binding::Grant | Binding::Deny => "TO",
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Effective state of the privilege after resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Grant,
    Deny,
    /// No GRANT or DENY is in effect.
    Absent,
}

impl Outcome {
    /// Token the checker prints, `None` when no line is printed.
    pub fn token(&self) -> Option<&'static str> {
        match self {
            Outcome::Grant => Some("GRANT"),
            Outcome::Deny => Some("DENY"),
            Outcome::Absent => None,
        }
    }
}

/// One point of the precedence sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrecedenceCase {
    pub user: Binding,
    pub role: Binding,
    pub mapped: bool,
}

impl PrecedenceCase {
    pub fn new(user: Binding, role: Binding, mapped: bool) -> Self {
        Self { user, role, mapped }
    }

    /// All 18 cases, user binding outermost and `mapped = true` first.
    pub fn all() -> Vec<PrecedenceCase> {
        let mut cases = Vec::with_capacity(18);
        for user in Binding::ALL {
            for role in Binding::ALL {
                for mapped in [true, false] {
                    cases.push(PrecedenceCase::new(user, role, mapped));
                }
            }
        }
        cases
    }

    /// Bindings that take part in resolution.
    fn effective_bindings(&self) -> Vec<Binding> {
        if self.mapped {
            vec![self.user, self.role]
        } else {
            vec![self.user]
        }
    }

    pub fn outcome(&self) -> Outcome {
        let bindings = self.effective_bindings();
        if bindings.contains(&Binding::Deny) {
            Outcome::Deny
        } else if bindings.contains(&Binding::Grant) {
            Outcome::Grant
        } else {
            Outcome::Absent
        }
    }

    /// Which bindings produced the outcome, user first.
    pub fn detail(&self) -> String {
        let mut details = Vec::new();
        match self.user {
            Binding::Grant => details.push("GRANTED TO USER"),
            Binding::Deny => details.push("DENIED TO USER"),
            Binding::Revoke => {}
        }
        if self.mapped {
            match self.role {
                Binding::Grant => details.push("GRANTED TO ROLE"),
                Binding::Deny => details.push("DENIED TO ROLE"),
                Binding::Revoke => {}
            }
        }
        details.join(", ")
    }

    /// Arguments for the checker: empty when the privilege is absent,
    /// otherwise `[scope, outcome, detail]`.
    pub fn expected_report(&self) -> Vec<String> {
        match self.outcome().token() {
            Some(token) => vec![
                PRECEDENCE_SCOPE.as_str().to_string(),
                token.to_string(),
                self.detail(),
            ],
            None => Vec::new(),
        }
    }
}

impl fmt::Display for PrecedenceCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user {}, role {}, mapped {}",
            self.user, self.role, self.mapped
        )
    }
}
