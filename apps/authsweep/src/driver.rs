//! The two sweeps.
//!
//! The subset sweep grants the test user every subset of the permission
//! universe in turn and checks that exactly the queries covered by the
//! subset get through. The precedence sweep binds MATCH at user and role
//! level in every combination and checks the grant report.
//!
//! Both sweeps mutate the one live server in a fixed order and stop at the
//! first mismatch.

use crate::probe::{Probe, ProbeError};
use crate::report::SweepReport;
use crate::server::ServerError;
use authsweep_config::{ConfigError, Identity, SweepConfig};
use authsweep_core::permission;
use authsweep_core::{
    classify, commands, Expectation, Operation, PermissionSubset, PermissionUniverse,
    PrecedenceCase, PRECEDENCE_SCOPE,
};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("permission universe has {size} permissions, above the limit of {max}")]
    UniverseTooLarge { size: usize, max: usize },
    #[error("failed to provision identities: {0}")]
    Bootstrap(#[source] ProbeError),
    #[error("privileges [{permissions}] (mask {mask:#b}): {source}")]
    Subset {
        mask: u64,
        permissions: String,
        #[source]
        source: ProbeError,
    },
    #[error("failed to prepare precedence sweep: {0}")]
    PrecedenceSetup(#[source] ProbeError),
    #[error("precedence case ({case}): {source}")]
    Precedence {
        case: PrecedenceCase,
        #[source]
        source: ProbeError,
    },
    #[error("interrupted")]
    Interrupted,
}

/// Which sweeps to run. Identity provisioning always runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    All,
    Subsets,
    Precedence,
}

impl Phase {
    fn runs_subsets(self) -> bool {
        matches!(self, Phase::All | Phase::Subsets)
    }

    fn runs_precedence(self) -> bool {
        matches!(self, Phase::All | Phase::Precedence)
    }
}

/// Identities and limits the driver works with.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub admin: Identity,
    pub user: Identity,
    pub role: String,
    pub unauthorized_message: String,
    pub max_permissions: usize,
    pub phase: Phase,
}

impl DriverSettings {
    pub fn from_config(config: &SweepConfig, phase: Phase) -> Self {
        Self {
            admin: config.admin.clone(),
            user: config.user.clone(),
            role: config.role_name.clone(),
            unauthorized_message: config.unauthorized_message.clone(),
            max_permissions: config.max_permissions,
            phase,
        }
    }
}

pub struct Sweep<'a, P: Probe> {
    probe: &'a P,
    catalog: &'a [Operation],
    settings: &'a DriverSettings,
    universe: PermissionUniverse,
    report: SweepReport,
}

impl<'a, P: Probe> Sweep<'a, P> {
    /// Derive the permission universe and refuse catalogs whose subset
    /// sweep would exceed `max_permissions`.
    pub fn new(
        probe: &'a P,
        catalog: &'a [Operation],
        settings: &'a DriverSettings,
    ) -> Result<Self, SweepError> {
        let universe = PermissionUniverse::derive(catalog);
        if settings.phase.runs_subsets() && universe.len() > settings.max_permissions {
            return Err(SweepError::UniverseTooLarge {
                size: universe.len(),
                max: settings.max_permissions,
            });
        }
        let report = SweepReport {
            permissions: universe.len(),
            operations: catalog.len(),
            ..SweepReport::default()
        };
        Ok(Self {
            probe,
            catalog,
            settings,
            universe,
            report,
        })
    }

    pub fn universe(&self) -> &PermissionUniverse {
        &self.universe
    }

    pub async fn run(mut self) -> Result<SweepReport, SweepError> {
        let started = Instant::now();

        self.bootstrap().await.map_err(SweepError::Bootstrap)?;
        if self.settings.phase.runs_subsets() {
            self.run_subsets().await?;
        }
        if self.settings.phase.runs_precedence() {
            self.run_precedence().await?;
        }

        self.report.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(self.report)
    }

    async fn bootstrap(&mut self) -> Result<(), ProbeError> {
        let settings = self.settings;
        let (admin, user) = (&settings.admin, &settings.user);
        let statements = vec![
            commands::create_user(&admin.username, &admin.password),
            commands::grant_all(&admin.username),
            commands::create_user(&user.username, &user.password),
        ];
        self.admin(statements).await
    }

    async fn run_subsets(&mut self) -> Result<(), SweepError> {
        info!(
            permissions = %permission::join(self.universe.as_slice()),
            subsets = self.universe.subset_count(),
            "starting query test"
        );
        for subset in self.universe.subsets() {
            let granted = self.universe.permissions(subset);
            info!(
                mask = subset.mask(),
                privileges = %permission::join(&granted),
                "checking queries"
            );
            self.check_subset(subset)
                .await
                .map_err(|source| SweepError::Subset {
                    mask: subset.mask(),
                    permissions: permission::join(&granted),
                    source,
                })?;
            self.report.subsets_checked += 1;
        }
        info!(checked = self.report.subsets_checked, "finished query test");
        Ok(())
    }

    async fn check_subset(&mut self, subset: PermissionSubset) -> Result<(), ProbeError> {
        let settings = self.settings;
        let granted = self.universe.permissions(subset);
        self.admin(commands::reset_to(&settings.user.username, &granted))
            .await?;

        let split = classify(self.catalog, &self.universe.permission_set(subset));
        let message = &settings.unauthorized_message;
        self.as_user(split.authorized, Expectation::not_rejected(message))
            .await?;
        self.as_user(split.unauthorized, Expectation::rejected(message))
            .await
    }

    async fn run_precedence(&mut self) -> Result<(), SweepError> {
        info!("starting permissions test");
        let settings = self.settings;
        let setup = vec![
            commands::create_role(&settings.role),
            commands::revoke_all(&settings.user.username),
        ];
        self.admin(setup)
            .await
            .map_err(SweepError::PrecedenceSetup)?;
        self.check(Vec::new())
            .await
            .map_err(SweepError::PrecedenceSetup)?;

        for case in PrecedenceCase::all() {
            info!(
                user = %case.user,
                role = %case.role,
                mapped = case.mapped,
                "checking permissions"
            );
            self.check_case(case)
                .await
                .map_err(|source| SweepError::Precedence { case, source })?;
            self.report.precedence_cases_checked += 1;
        }
        info!(
            checked = self.report.precedence_cases_checked,
            "finished permissions test"
        );
        Ok(())
    }

    async fn check_case(&mut self, case: PrecedenceCase) -> Result<(), ProbeError> {
        let settings = self.settings;
        let (user, role) = (&settings.user.username, &settings.role);

        self.admin(vec![commands::set_role_membership(role, user, case.mapped)])
            .await?;
        self.admin(vec![
            commands::bind(case.user, PRECEDENCE_SCOPE, user),
            commands::bind(case.role, PRECEDENCE_SCOPE, role),
        ])
        .await?;
        self.check(case.expected_report()).await
    }

    async fn admin(&mut self, statements: Vec<String>) -> Result<(), ProbeError> {
        self.report.tester_invocations += 1;
        self.probe
            .run_queries(&self.settings.admin, &statements, &Expectation::succeed())
            .await
    }

    async fn as_user(
        &mut self,
        queries: Vec<&str>,
        expectation: Expectation,
    ) -> Result<(), ProbeError> {
        let queries: Vec<String> = queries.into_iter().map(str::to_string).collect();
        self.report.tester_invocations += 1;
        self.probe
            .run_queries(&self.settings.user, &queries, &expectation)
            .await
    }

    async fn check(&mut self, expected: Vec<String>) -> Result<(), ProbeError> {
        self.report.checker_invocations += 1;
        self.probe.check_grants(&expected).await
    }
}
