//! Offline view of the oracle: what the sweeps will issue and expect,
//! without starting any process.

use authsweep_core::{
    classify, Binding, Operation, Outcome, Permission, PermissionSubset, PermissionUniverse,
    PrecedenceCase,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("{0} is not required by any query in the catalog")]
    OutsideUniverse(Permission),
}

#[derive(Debug, Serialize)]
pub struct Plan {
    pub universe: Vec<Permission>,
    pub operations: usize,
    pub subset_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsets: Option<Vec<SubsetPlan>>,
    pub precedence: Vec<PrecedencePlan>,
}

#[derive(Debug, Serialize)]
pub struct SubsetPlan {
    pub mask: u64,
    pub granted: Vec<Permission>,
    pub authorized: Vec<&'static str>,
    pub unauthorized: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct PrecedencePlan {
    pub user: Binding,
    pub role: Binding,
    pub mapped: bool,
    pub outcome: Outcome,
    pub report: Vec<String>,
}

/// Build the plan for `catalog`. The per-subset split is only included
/// when `with_subsets` is set since it lists every query 2^n times.
pub fn build(catalog: &'static [Operation], with_subsets: bool) -> Plan {
    let universe = PermissionUniverse::derive(catalog);
    let subsets = with_subsets.then(|| {
        universe
            .subsets()
            .map(|subset| subset_plan(catalog, &universe, subset))
            .collect()
    });
    let precedence = PrecedenceCase::all()
        .into_iter()
        .map(|case| PrecedencePlan {
            user: case.user,
            role: case.role,
            mapped: case.mapped,
            outcome: case.outcome(),
            report: case.expected_report(),
        })
        .collect();

    Plan {
        universe: universe.as_slice().to_vec(),
        operations: catalog.len(),
        subset_count: universe.subset_count(),
        subsets,
        precedence,
    }
}

/// Expected split for the single subset holding exactly `granted`.
pub fn for_grant(
    catalog: &'static [Operation],
    granted: &[Permission],
) -> Result<SubsetPlan, PlanError> {
    let universe = PermissionUniverse::derive(catalog);
    let mut mask = 0;
    for permission in granted {
        let single = universe
            .subset_of(std::slice::from_ref(permission))
            .ok_or(PlanError::OutsideUniverse(*permission))?;
        mask |= single.mask();
    }
    let subset = PermissionSubset::from_mask(mask);
    Ok(subset_plan(catalog, &universe, subset))
}

fn subset_plan(
    catalog: &'static [Operation],
    universe: &PermissionUniverse,
    subset: PermissionSubset,
) -> SubsetPlan {
    let split = classify(catalog, &universe.permission_set(subset));
    SubsetPlan {
        mask: subset.mask(),
        granted: universe.permissions(subset),
        authorized: split.authorized,
        unauthorized: split.unauthorized,
    }
}
