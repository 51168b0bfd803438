//! Administrative statements issued through the tester as the admin identity.

use crate::permission::{self, Permission};
use crate::precedence::Binding;

pub fn create_user(username: &str, password: &str) -> String {
    format!("CREATE USER {username} IDENTIFIED BY '{password}'")
}

pub fn grant_all(grantee: &str) -> String {
    format!("GRANT ALL PRIVILEGES TO {grantee}")
}

pub fn revoke_all(grantee: &str) -> String {
    format!("REVOKE ALL PRIVILEGES FROM {grantee}")
}

pub fn grant(permissions: &[Permission], grantee: &str) -> String {
    format!("GRANT {} TO {grantee}", permission::join(permissions))
}

pub fn create_role(role: &str) -> String {
    format!("CREATE ROLE {role}")
}

/// Add `user` to `role`, or remove it when `mapped` is false.
pub fn set_role_membership(role: &str, user: &str, mapped: bool) -> String {
    if mapped {
        format!("GRANT ROLE {role} TO {user}")
    } else {
        format!("REVOKE ROLE {role} FROM {user}")
    }
}

/// `GRANT MATCH TO x`, `DENY MATCH TO x` or `REVOKE MATCH FROM x`.
pub fn bind(binding: Binding, permission: Permission, grantee: &str) -> String {
    format!(
        "{} {} {} {grantee}",
        binding.keyword(),
        permission,
        binding.preposition()
    )
}

/// Statements that leave `user` holding exactly `permissions`.
///
/// Everything is revoked first so the result does not depend on what the
/// previous iteration granted.
pub fn reset_to(user: &str, permissions: &[Permission]) -> Vec<String> {
    let mut statements = vec![revoke_all(user)];
    if !permissions.is_empty() {
        statements.push(grant(permissions, user));
    }
    statements
}
