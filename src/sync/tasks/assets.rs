//! Assets, with security classifications remapped by name

use log::warn;

use crate::client::models::{Asset, SecurityClassification};
use crate::client::{VendorEntity, list};
use crate::error::Result;
use crate::sync::mapped::{MappedEntity, map_asset};
use crate::sync::matcher::translate_ids;
use crate::sync::{Plan, ResourceRules, SyncContext, SyncReport};

pub const ASSETS: ResourceRules = ResourceRules::new("assets", Asset::COLLECTION, "name");

fn classifications_by_name(items: &[SecurityClassification]) -> Vec<MappedEntity> {
    items
        .iter()
        .map(|sc| MappedEntity::reference(&sc.id, &sc.name))
        .collect()
}

pub async fn sync(ctx: &SyncContext<'_>) -> Result<SyncReport> {
    let page_size = ctx.options.page_size;
    let source_assets: Vec<Asset> = list(ctx.source, page_size).await?;
    let dest_assets: Vec<Asset> = list(ctx.destination, page_size).await?;
    let source_sc: Vec<SecurityClassification> = list(ctx.source, page_size).await?;
    let dest_sc: Vec<SecurityClassification> = list(ctx.destination, page_size).await?;

    let classification_ids = translate_ids(
        &classifications_by_name(&source_sc),
        &classifications_by_name(&dest_sc),
    );

    let mut mapped = Vec::new();
    let mut unresolved = Vec::new();
    for asset in &source_assets {
        match &asset.security_classification {
            None => mapped.push(map_asset(asset, None)),
            Some(sc) => match classification_ids.get(&sc.id) {
                Some(dest_id) => mapped.push(map_asset(asset, Some(dest_id))),
                None => {
                    warn!(
                        "Skipping asset '{}': security classification '{}' not found in destination",
                        asset.name, sc.name
                    );
                    unresolved.push((map_asset(asset, None), sc.name.clone()));
                }
            },
        }
    }

    let destination: Vec<MappedEntity> = dest_assets
        .iter()
        .map(|a| map_asset(a, a.security_classification.as_ref().map(|sc| sc.id.as_str())))
        .collect();

    let reconciler = ctx.reconciler(ASSETS);
    let mut plan: Plan = reconciler.plan(&mapped, &destination)?;
    for (entity, classification) in &unresolved {
        plan.skip(
            entity,
            format!("security classification '{}' not in destination", classification),
        );
    }
    ctx.apply(&reconciler, &plan).await
}
