//! Oracle model for authsweep.
//!
//! This crate holds everything that can be computed without a live server:
//! - the operation catalog and the permissions each operation requires
//! - the permission universe and exhaustive subset enumeration
//! - user/role grant precedence and the report the checker should print
//! - administrative command text and tester expectations

pub mod catalog;
pub mod commands;
pub mod expectation;
pub mod permission;
pub mod precedence;
pub mod subset;

pub use catalog::{classify, Classification, Operation, CATALOG};
pub use expectation::Expectation;
pub use permission::{ParsePermissionError, Permission};
pub use precedence::{Binding, Outcome, PrecedenceCase, PRECEDENCE_SCOPE};
pub use subset::{PermissionSubset, PermissionUniverse, Subsets};

/// Message the server returns when a query is rejected for missing privileges.
pub const UNAUTHORIZED_MESSAGE: &str =
    "You are not authorized to execute this query! Please contact your database administrator.";
