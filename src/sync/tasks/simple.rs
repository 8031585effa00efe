//! Resources reconciled without reference remapping

use crate::client::models::{BusinessUnit, SecurityClassification, TrustZone};
use crate::client::{VendorEntity, list};
use crate::error::Result;
use crate::sync::mapped::{Mappable, map_all};
use crate::sync::{ResourceRules, SyncContext, SyncReport};

pub const BUSINESS_UNITS: ResourceRules =
    ResourceRules::new("business units", BusinessUnit::COLLECTION, "referenceId")
        .strip_key_on_update();

pub const TRUST_ZONES: ResourceRules =
    ResourceRules::new("trust zones", TrustZone::COLLECTION, "referenceId");

pub const SECURITY_CLASSIFICATIONS: ResourceRules = ResourceRules::new(
    "security classifications",
    SecurityClassification::COLLECTION,
    "referenceId",
)
.strip_key_on_update();

/// Fetch both sides of a collection and reconcile them as-is.
pub async fn sync_collection<T>(ctx: &SyncContext<'_>, rules: ResourceRules) -> Result<SyncReport>
where
    T: VendorEntity + Mappable,
{
    let source: Vec<T> = list(ctx.source, ctx.options.page_size).await?;
    let destination: Vec<T> = list(ctx.destination, ctx.options.page_size).await?;
    ctx.reconcile(rules, &map_all(&source), &map_all(&destination))
        .await
}

pub async fn business_units(ctx: &SyncContext<'_>) -> Result<SyncReport> {
    sync_collection::<BusinessUnit>(ctx, BUSINESS_UNITS).await
}

pub async fn trust_zones(ctx: &SyncContext<'_>) -> Result<SyncReport> {
    sync_collection::<TrustZone>(ctx, TRUST_ZONES).await
}

pub async fn security_classifications(ctx: &SyncContext<'_>) -> Result<SyncReport> {
    sync_collection::<SecurityClassification>(ctx, SECURITY_CLASSIFICATIONS).await
}
