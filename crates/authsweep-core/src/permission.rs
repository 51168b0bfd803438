//! Privilege tokens understood by the server.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A privilege that guards one family of queries.
///
/// Variants are declared in token order so that `Ord` agrees with sorting
/// by [`Permission::as_str`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Auth,
    Create,
    Delete,
    Index,
    Match,
    Merge,
    Remove,
    Set,
    Stream,
}

/// Error type for parsing Permission from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePermissionError(pub String);

impl fmt::Display for ParsePermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid permission: {}", self.0)
    }
}

impl std::error::Error for ParsePermissionError {}

impl FromStr for Permission {
    type Err = ParsePermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTH" => Ok(Permission::Auth),
            "CREATE" => Ok(Permission::Create),
            "DELETE" => Ok(Permission::Delete),
            "INDEX" => Ok(Permission::Index),
            "MATCH" => Ok(Permission::Match),
            "MERGE" => Ok(Permission::Merge),
            "REMOVE" => Ok(Permission::Remove),
            "SET" => Ok(Permission::Set),
            "STREAM" => Ok(Permission::Stream),
            _ => Err(ParsePermissionError(s.to_string())),
        }
    }
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Auth => "AUTH",
            Permission::Create => "CREATE",
            Permission::Delete => "DELETE",
            Permission::Index => "INDEX",
            Permission::Match => "MATCH",
            Permission::Merge => "MERGE",
            Permission::Remove => "REMOVE",
            Permission::Set => "SET",
            Permission::Stream => "STREAM",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join permissions the way the server's GRANT statement lists them.
pub fn join(permissions: &[Permission]) -> String {
    permissions
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
