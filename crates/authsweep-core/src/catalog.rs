//! Catalog of protected queries.
//!
//! Adding a new privilege only needs a new entry here: the permission
//! universe is derived from the catalog, so every query is automatically
//! checked against every combination that includes the new privilege.

use crate::permission::Permission;
use crate::permission::Permission::*;
use std::collections::BTreeSet;

/// A query together with the privileges required to run it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operation {
    pub query: &'static str,
    pub requires: &'static [Permission],
}

impl Operation {
    const fn new(query: &'static str, requires: &'static [Permission]) -> Self {
        Self { query, requires }
    }

    /// Required privileges, deduplicated.
    pub fn required(&self) -> BTreeSet<Permission> {
        self.requires.iter().copied().collect()
    }

    /// True when every required privilege is in `granted`.
    pub fn is_authorized(&self, granted: &BTreeSet<Permission>) -> bool {
        self.requires.iter().all(|p| granted.contains(p))
    }
}

pub static CATALOG: &[Operation] = &[
    // CREATE
    Operation::new("CREATE (n)", &[Create]),
    Operation::new("MATCH (n), (m) CREATE (n)-[:e]->(m)", &[Create, Match]),
    // DELETE
    Operation::new("MATCH (n) DELETE n", &[Delete, Match]),
    Operation::new("MATCH (n) DETACH DELETE n", &[Delete, Match]),
    // MATCH
    Operation::new("MATCH (n) RETURN n", &[Match]),
    Operation::new("MATCH (n), (m) RETURN count(n), count(m)", &[Match]),
    // MERGE
    Operation::new(
        "MERGE (n) ON CREATE SET n.created = timestamp() \
         ON MATCH SET n.lastSeen = timestamp() \
         RETURN n.name, n.created, n.lastSeen",
        &[Merge],
    ),
    // SET
    Operation::new("MATCH (n) SET n.value = 0 RETURN n", &[Set, Match]),
    Operation::new("MATCH (n), (m) SET n.value = m.value", &[Set, Match]),
    // REMOVE
    Operation::new("MATCH (n) REMOVE n.value", &[Remove, Match]),
    Operation::new("MATCH (n), (m) REMOVE n.value, m.value", &[Remove, Match]),
    // INDEX
    Operation::new("CREATE INDEX ON :User (id)", &[Index]),
    // AUTH
    Operation::new("CREATE ROLE test_role", &[Auth]),
    Operation::new("DROP ROLE test_role", &[Auth]),
    Operation::new("SHOW ROLES", &[Auth]),
    Operation::new("CREATE USER test_user", &[Auth]),
    Operation::new("SET PASSWORD FOR test_user TO '1234'", &[Auth]),
    Operation::new("DROP USER test_user", &[Auth]),
    Operation::new("SHOW USERS", &[Auth]),
    Operation::new("GRANT ROLE test_role TO test_user", &[Auth]),
    Operation::new("REVOKE ROLE test_role FROM test_user", &[Auth]),
    Operation::new("GRANT ALL PRIVILEGES TO test_user", &[Auth]),
    Operation::new("DENY ALL PRIVILEGES TO test_user", &[Auth]),
    Operation::new("REVOKE ALL PRIVILEGES FROM test_user", &[Auth]),
    Operation::new("SHOW GRANTS FOR test_user", &[Auth]),
    Operation::new("SHOW ROLE FOR USER test_user", &[Auth]),
    Operation::new("SHOW USERS FOR ROLE test_role", &[Auth]),
    // STREAM
    Operation::new(
        "CREATE STREAM strim AS LOAD DATA KAFKA '127.0.0.1:9092' WITH TOPIC \
         'test' WITH TRANSFORM 'http://127.0.0.1/transform.py'",
        &[Stream],
    ),
    Operation::new("DROP STREAM strim", &[Stream]),
    Operation::new("SHOW STREAMS", &[Stream]),
    Operation::new("START STREAM strim", &[Stream]),
    Operation::new("STOP STREAM strim", &[Stream]),
    Operation::new("START ALL STREAMS", &[Stream]),
    Operation::new("STOP ALL STREAMS", &[Stream]),
    Operation::new("TEST STREAM strim", &[Stream]),
];

/// Queries split by whether a given grant set should allow them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Classification {
    pub authorized: Vec<&'static str>,
    pub unauthorized: Vec<&'static str>,
}

/// Split `catalog` into authorized and unauthorized queries, preserving
/// catalog order within each half.
pub fn classify(catalog: &[Operation], granted: &BTreeSet<Permission>) -> Classification {
    let mut classification = Classification::default();
    for operation in catalog {
        if operation.is_authorized(granted) {
            classification.authorized.push(operation.query);
        } else {
            classification.unauthorized.push(operation.query);
        }
    }
    classification
}
