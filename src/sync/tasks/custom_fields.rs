//! Custom fields with their types, type values and groups
//!
//! Types and groups are matched by name and only ever created. Their ids are
//! then carried into the field payloads as `typeId` and `groupId`.

use std::collections::HashMap;

use log::warn;

use crate::client::models::{CustomField, CustomFieldGroup, CustomFieldType, CustomFieldTypeValue};
use crate::client::{VendorEntity, list, list_at};
use crate::error::Result;
use crate::sync::mapped::{MappedEntity, map_all, map_custom_field};
use crate::sync::matcher::translate_ids;
use crate::sync::{Plan, ResourceRules, SyncContext, SyncReport};

pub const TYPES: ResourceRules =
    ResourceRules::new("custom field types", CustomFieldType::COLLECTION, "name").create_only();

pub const TYPE_VALUES: ResourceRules =
    ResourceRules::new("custom field values", CustomFieldType::COLLECTION, "value").create_only();

pub const GROUPS: ResourceRules =
    ResourceRules::new("custom field groups", CustomFieldGroup::COLLECTION, "name").create_only();

pub const FIELDS: ResourceRules =
    ResourceRules::new("custom fields", CustomField::COLLECTION, "referenceId")
        .strip_key_on_update()
        .update_requires("editable");

/// Reconcile one name-keyed collection and return the report with a
/// source-to-destination id map covering matched and created entities.
async fn reconcile_by_name(
    ctx: &SyncContext<'_>,
    rules: ResourceRules,
    source: &[MappedEntity],
    destination: &[MappedEntity],
) -> Result<(SyncReport, HashMap<String, String>)> {
    let report = ctx.reconcile(rules, source, destination).await?;
    let mut ids = translate_ids(source, destination);
    ids.extend(report.created_ids());
    Ok((report, ids))
}

/// Reconcile types, values, groups and fields, pushing each stage's report
/// as it completes.
pub async fn sync(ctx: &SyncContext<'_>, reports: &mut Vec<SyncReport>) -> Result<()> {
    let page_size = ctx.options.page_size;

    let source_types: Vec<CustomFieldType> = list(ctx.source, page_size).await?;
    let dest_types: Vec<CustomFieldType> = list(ctx.destination, page_size).await?;
    let (report, type_ids) =
        reconcile_by_name(ctx, TYPES, &map_all(&source_types), &map_all(&dest_types)).await?;
    reports.push(report);

    reports.push(sync_type_values(ctx, &source_types, &type_ids).await?);

    let source_groups: Vec<CustomFieldGroup> = list(ctx.source, page_size).await?;
    let dest_groups: Vec<CustomFieldGroup> = list(ctx.destination, page_size).await?;
    let (report, group_ids) =
        reconcile_by_name(ctx, GROUPS, &map_all(&source_groups), &map_all(&dest_groups)).await?;
    reports.push(report);

    let source_fields: Vec<CustomField> = list(ctx.source, page_size).await?;
    let dest_fields: Vec<CustomField> = list(ctx.destination, page_size).await?;

    let mut mapped = Vec::new();
    let mut unresolved = Vec::new();
    for field in &source_fields {
        match resolve_references(field, &type_ids, &group_ids) {
            Ok((type_id, group_id)) => mapped.push(map_custom_field(field, type_id, group_id)),
            Err(reason) => {
                warn!("Skipping custom field '{}': {}", field.name, reason);
                unresolved.push((field, reason));
            }
        }
    }

    let destination: Vec<MappedEntity> = dest_fields
        .iter()
        .map(|f| {
            map_custom_field(
                f,
                f.field_type.as_ref().map(|t| t.id.as_str()),
                f.group.as_ref().map(|g| g.id.as_str()),
            )
        })
        .collect();

    let reconciler = ctx.reconciler(FIELDS);
    let mut plan = reconciler.plan(&mapped, &destination)?;
    for (field, reason) in unresolved {
        plan.skip(&map_custom_field(field, None, None), reason);
    }
    reports.push(ctx.apply(&reconciler, &plan).await?);

    Ok(())
}

/// Destination type and group ids of a field, or why one is missing.
fn resolve_references<'a>(
    field: &CustomField,
    type_ids: &'a HashMap<String, String>,
    group_ids: &'a HashMap<String, String>,
) -> std::result::Result<(Option<&'a str>, Option<&'a str>), String> {
    let type_id = match &field.field_type {
        Some(t) => Some(
            type_ids
                .get(&t.id)
                .ok_or_else(|| format!("type '{}' not in destination", t.name))?
                .as_str(),
        ),
        None => None,
    };
    let group_id = match &field.group {
        Some(g) => Some(
            group_ids
                .get(&g.id)
                .ok_or_else(|| format!("group '{}' not in destination", g.name))?
                .as_str(),
        ),
        None => None,
    };
    Ok((type_id, group_id))
}

/// Copy values missing from each matched or created destination type.
async fn sync_type_values(
    ctx: &SyncContext<'_>,
    source_types: &[CustomFieldType],
    type_ids: &HashMap<String, String>,
) -> Result<SyncReport> {
    let page_size = ctx.options.page_size;
    let reconciler = ctx.reconciler(TYPE_VALUES);
    let mut plan = Plan::new(TYPE_VALUES.name);

    for source_type in source_types {
        let Some(dest_type_id) = type_ids.get(&source_type.id) else {
            continue;
        };
        let source_values: Vec<CustomFieldTypeValue> = list_at(
            ctx.source,
            &CustomFieldType::values_path(&source_type.id),
            page_size,
        )
        .await?;
        let dest_path = CustomFieldType::values_path(dest_type_id);
        let dest_values: Vec<CustomFieldTypeValue> =
            list_at(ctx.destination, &dest_path, page_size).await?;

        plan.extend(reconciler.plan_at(&dest_path, &map_all(&source_values), &map_all(&dest_values))?);
    }

    ctx.apply(&reconciler, &plan).await
}
