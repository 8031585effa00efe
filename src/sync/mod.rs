//! Tenant-to-tenant configuration sync
//!
//! Every resource goes through the same pipeline: fetch both collections,
//! map them to [`MappedEntity`] values, match by key, then plan and apply
//! through a [`Reconciler`]. Resource-specific work (reference remapping,
//! follow-up calls) lives in [`tasks`].

use std::path::PathBuf;

use clap::ValueEnum;
use log::{error, info};

use crate::client::TenantApi;
use crate::error::{Result, SyncError};

pub mod mapped;
pub mod matcher;
pub mod reconcile;
pub mod tasks;

pub use mapped::MappedEntity;
pub use matcher::DuplicateKeys;
pub use reconcile::{
    AssumeYes, BulkWriter, Confirm, EntityWriter, Outcome, OutcomeStatus, Plan, Reconciler,
    ResourceRules, RestWriter, SyncReport,
};

/// Resources that can be reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Resource {
    /// Every resource in dependency order
    All,
    SecurityClassifications,
    TrustZones,
    BusinessUnits,
    Assets,
    CustomFields,
    /// Roles with their project, global and custom field permissions
    Roles,
    Workflows,
    ComponentCategories,
    Components,
    Libraries,
}

impl Resource {
    /// Dependency order used by `all`
    pub const ORDERED: [Resource; 10] = [
        Resource::SecurityClassifications,
        Resource::TrustZones,
        Resource::BusinessUnits,
        Resource::Assets,
        Resource::CustomFields,
        Resource::Roles,
        Resource::Workflows,
        Resource::ComponentCategories,
        Resource::Components,
        Resource::Libraries,
    ];

    /// Resources this target expands to.
    pub fn expand(self) -> Vec<Resource> {
        match self {
            Resource::All => Self::ORDERED.to_vec(),
            other => vec![other],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Resource::All => "all",
            Resource::SecurityClassifications => "security classifications",
            Resource::TrustZones => "trust zones",
            Resource::BusinessUnits => "business units",
            Resource::Assets => "assets",
            Resource::Roles => "roles",
            Resource::Workflows => "workflows",
            Resource::CustomFields => "custom fields",
            Resource::ComponentCategories => "component categories",
            Resource::Components => "components",
            Resource::Libraries => "libraries",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Settings shared by every task in a run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub page_size: usize,
    pub duplicate_keys: DuplicateKeys,
    pub dry_run: bool,
    /// Library XML exports are written under `<export_dir>/exports/`
    pub export_dir: PathBuf,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: crate::client::DEFAULT_PAGE_SIZE,
            duplicate_keys: DuplicateKeys::Fail,
            dry_run: false,
            export_dir: PathBuf::from("."),
        }
    }
}

/// Both tenants plus run settings
pub struct SyncContext<'a> {
    pub source: &'a dyn TenantApi,
    pub destination: &'a dyn TenantApi,
    pub options: SyncOptions,
    pub confirm: &'a dyn Confirm,
}

impl<'a> SyncContext<'a> {
    pub fn new(
        source: &'a dyn TenantApi,
        destination: &'a dyn TenantApi,
        options: SyncOptions,
        confirm: &'a dyn Confirm,
    ) -> Self {
        Self {
            source,
            destination,
            options,
            confirm,
        }
    }

    pub fn reconciler(&self, rules: ResourceRules) -> Reconciler {
        Reconciler::new(rules, self.options.duplicate_keys)
    }

    /// Apply a plan with plain REST writes on the destination.
    pub async fn apply(&self, reconciler: &Reconciler, plan: &Plan) -> Result<SyncReport> {
        self.apply_with(reconciler, plan, &RestWriter::new(self.destination))
            .await
    }

    pub async fn apply_with(
        &self,
        reconciler: &Reconciler,
        plan: &Plan,
        writer: &dyn EntityWriter,
    ) -> Result<SyncReport> {
        reconciler
            .apply(plan, writer, self.confirm, self.options.dry_run)
            .await
    }

    /// Apply a plan through a writer that sends every mutation at once.
    pub async fn apply_bulk(
        &self,
        reconciler: &Reconciler,
        plan: &Plan,
        writer: &dyn BulkWriter,
    ) -> Result<SyncReport> {
        reconciler
            .apply_bulk(plan, writer, self.confirm, self.options.dry_run)
            .await
    }

    /// Plan and apply one collection whose entities need no remapping.
    pub async fn reconcile(
        &self,
        rules: ResourceRules,
        source: &[MappedEntity],
        destination: &[MappedEntity],
    ) -> Result<SyncReport> {
        let reconciler = self.reconciler(rules);
        let plan = reconciler.plan(source, destination)?;
        self.apply(&reconciler, &plan).await
    }
}

/// Reports from a run, plus resources that failed outright
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<SyncReport>,
    pub failures: Vec<(Resource, String)>,
}

impl RunSummary {
    pub fn failed_items(&self) -> usize {
        self.reports.iter().map(|r| r.failed).sum()
    }

    pub fn total_items(&self) -> usize {
        self.reports.iter().map(SyncReport::total).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.failed_items() == 0
    }
}

/// Run one resource task, pushing each report as its stage finishes.
///
/// Multi-stage tasks write to the destination before later stages run, so
/// reports already pushed stay in `reports` when a later stage fails.
async fn run_resource(
    resource: Resource,
    ctx: &SyncContext<'_>,
    reports: &mut Vec<SyncReport>,
) -> Result<()> {
    info!("Syncing {}", resource);
    match resource {
        // expanded by `run`
        Resource::All => {}
        Resource::SecurityClassifications => {
            reports.push(tasks::simple::security_classifications(ctx).await?)
        }
        Resource::TrustZones => reports.push(tasks::simple::trust_zones(ctx).await?),
        Resource::BusinessUnits => reports.push(tasks::simple::business_units(ctx).await?),
        Resource::Assets => reports.push(tasks::assets::sync(ctx).await?),
        Resource::CustomFields => tasks::custom_fields::sync(ctx, reports).await?,
        Resource::Roles => tasks::roles::sync(ctx, reports).await?,
        Resource::Workflows => reports.push(tasks::workflows::sync(ctx).await?),
        Resource::ComponentCategories => {
            reports.push(tasks::components::sync_categories(ctx).await?)
        }
        Resource::Components => tasks::components::sync_components(ctx, reports).await?,
        Resource::Libraries => reports.push(tasks::libraries::sync(ctx).await?),
    }
    Ok(())
}

/// Run a target, continuing past resource-level failures.
///
/// A fatal error (invalid token, local I/O) stops the run and is returned.
/// Any other failure is recorded in the summary next to the reports of the
/// stages that completed, and the next resource runs.
pub async fn run(target: Resource, ctx: &SyncContext<'_>) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for resource in target.expand() {
        match run_resource(resource, ctx, &mut summary.reports).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Failed to sync {}: {}", resource, e);
                summary.failures.push((resource, e.to_string()));
            }
        }
    }
    Ok(summary)
}

/// Turn an unclean summary into the error `main` reports.
pub fn check_summary(summary: &RunSummary) -> Result<()> {
    if !summary.failures.is_empty() {
        let names: Vec<String> = summary.failures.iter().map(|(r, _)| r.to_string()).collect();
        return Err(SyncError::ResourcesFailed(names.join(", ")).into());
    }
    let failed = summary.failed_items();
    if failed > 0 {
        return Err(SyncError::ItemsFailed {
            resource: "sync".to_string(),
            failed,
            total: summary.total_items(),
        }
        .into());
    }
    Ok(())
}
