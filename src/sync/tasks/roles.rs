//! Roles and the permissions they grant
//!
//! Roles are matched by name. Once a role exists in the destination, its
//! project and global permissions and its custom field access are carried
//! over by permission and field name, since ids differ between tenants.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use log::warn;
use serde_json::{Map, Value, json};

use crate::client::models::{CustomField, CustomFieldPermission, Permission, PermissionKind, Role};
use crate::client::{TenantApi, VendorEntity, list, list_at};
use crate::error::Result;
use crate::sync::mapped::{MappedEntity, map_all};
use crate::sync::reconcile::Decision;
use crate::sync::{EntityWriter, OutcomeStatus, Plan, ResourceRules, SyncContext, SyncReport};

pub const ROLES: ResourceRules = ResourceRules::new("roles", Role::COLLECTION, "name");

pub const PERMISSIONS: ResourceRules =
    ResourceRules::new("role permissions", Role::COLLECTION, "permissions").create_only();

pub const FIELD_PERMISSIONS: ResourceRules = ResourceRules::new(
    "role custom field permissions",
    Role::COLLECTION,
    "permissions",
)
.create_only();

/// A source role and where it lives in the destination
struct RoleTarget {
    source_id: String,
    name: String,
    /// `None` when the role is planned but not created (dry run)
    destination_id: Option<String>,
}

/// Roles present in the destination after the role step, or about to be.
fn role_targets(report: &SyncReport) -> Vec<RoleTarget> {
    report
        .outcomes
        .iter()
        .filter(|o| {
            matches!(
                o.status,
                OutcomeStatus::Created | OutcomeStatus::Updated | OutcomeStatus::Unchanged
            )
        })
        .map(|o| RoleTarget {
            source_id: o.source_id.clone(),
            name: o.label.clone(),
            destination_id: o.destination_id.clone(),
        })
        .collect()
}

fn permission_entity(role: &RoleTarget, suffix: &str, permissions: Value) -> MappedEntity {
    MappedEntity::new(
        &role.source_id,
        format!("{}/{}", role.name, suffix),
        Map::from_iter([("permissions".to_string(), permissions)]),
    )
}

pub async fn sync(ctx: &SyncContext<'_>, reports: &mut Vec<SyncReport>) -> Result<()> {
    let page_size = ctx.options.page_size;
    let source: Vec<Role> = list(ctx.source, page_size).await?;
    let destination: Vec<Role> = list(ctx.destination, page_size).await?;

    let report = ctx
        .reconcile(ROLES, &map_all(&source), &map_all(&destination))
        .await?;
    let targets = role_targets(&report);
    reports.push(report);

    reports.push(sync_permissions(ctx, &targets).await?);
    reports.push(sync_field_permissions(ctx, &targets).await?);
    Ok(())
}

/// Grant each role the project and global permissions it holds in the source.
async fn sync_permissions(ctx: &SyncContext<'_>, roles: &[RoleTarget]) -> Result<SyncReport> {
    let page_size = ctx.options.page_size;
    let reconciler = ctx.reconciler(PERMISSIONS);
    let mut plan = Plan::new(PERMISSIONS.name);

    if !roles.is_empty() {
        for kind in PermissionKind::ALL {
            let catalog: Vec<Permission> =
                list_at(ctx.destination, &kind.catalog_path(), page_size).await?;
            let by_name: HashMap<&str, &str> = catalog
                .iter()
                .map(|p| (p.name.as_str(), p.id.as_str()))
                .collect();

            for role in roles {
                let granted: Vec<Permission> =
                    list_at(ctx.source, &kind.assigned_path(&role.source_id), page_size).await?;
                if granted.is_empty() {
                    continue;
                }

                let mut ids: Vec<String> = Vec::new();
                let mut missing: Vec<&str> = Vec::new();
                for permission in &granted {
                    match by_name.get(permission.name.as_str()) {
                        Some(id) => ids.push(id.to_string()),
                        None => missing.push(&permission.name),
                    }
                }
                ids.sort();
                ids.dedup();
                let entity = permission_entity(role, kind.segment(), json!(ids));

                let Some(destination_id) = &role.destination_id else {
                    plan.skip(&entity, "role not in destination");
                    continue;
                };
                if !missing.is_empty() {
                    warn!(
                        "Skipping {} for role '{}': not in destination: {}",
                        kind.segment(),
                        role.name,
                        missing.join(", ")
                    );
                    plan.skip(
                        &entity,
                        format!("permissions not in destination: {}", missing.join(", ")),
                    );
                    continue;
                }

                let current: Vec<Permission> =
                    list_at(ctx.destination, &kind.assigned_path(destination_id), page_size).await?;
                let current: HashSet<&str> = current.iter().map(|p| p.id.as_str()).collect();
                if ids.iter().all(|id| current.contains(id.as_str())) {
                    plan.unchanged(&entity, destination_id);
                } else {
                    plan.extend(reconciler.plan_at(&kind.bulk_path(destination_id), &[entity], &[])?);
                }
            }
        }
    }

    ctx.apply(&reconciler, &plan).await
}

/// Sends a role's custom field access as the bare array the bulk endpoint takes
struct FieldPermissionWriter<'a> {
    api: &'a dyn TenantApi,
}

#[async_trait]
impl EntityWriter for FieldPermissionWriter<'_> {
    async fn create(&self, decision: &Decision) -> Result<Value> {
        let body = decision
            .payload
            .get("permissions")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        self.api.put_bulk(&decision.collection, &body).await
    }

    async fn update(&self, _destination_id: &str, decision: &Decision) -> Result<Value> {
        self.create(decision).await
    }
}

/// Give each role the custom field access levels it has in the source.
async fn sync_field_permissions(ctx: &SyncContext<'_>, roles: &[RoleTarget]) -> Result<SyncReport> {
    let page_size = ctx.options.page_size;
    let reconciler = ctx.reconciler(FIELD_PERMISSIONS);
    let mut plan = Plan::new(FIELD_PERMISSIONS.name);

    if !roles.is_empty() {
        let fields: Vec<CustomField> = list(ctx.destination, page_size).await?;
        let mut field_ids: HashMap<&str, &str> = HashMap::new();
        for field in &fields {
            field_ids.entry(field.name.as_str()).or_insert(field.id.as_str());
        }

        for role in roles {
            let granted: Vec<CustomFieldPermission> = list_at(
                ctx.source,
                &CustomFieldPermission::assigned_path(&role.source_id),
                page_size,
            )
            .await?;
            if granted.is_empty() {
                continue;
            }

            let mut entries: Vec<(String, String)> = Vec::new();
            let mut missing: Vec<&str> = Vec::new();
            for permission in &granted {
                match field_ids.get(permission.custom_field.name.as_str()) {
                    Some(id) => entries.push((id.to_string(), permission.access_level.clone())),
                    None => missing.push(&permission.custom_field.name),
                }
            }
            entries.sort();
            entries.dedup();
            let payload: Vec<Value> = entries
                .iter()
                .map(|(id, level)| json!({"customFieldId": id, "accessLevel": level}))
                .collect();
            let entity = permission_entity(role, "custom-field-permissions", json!(payload));

            let Some(destination_id) = &role.destination_id else {
                plan.skip(&entity, "role not in destination");
                continue;
            };
            if !missing.is_empty() {
                warn!(
                    "Skipping custom field access for role '{}': fields not in destination: {}",
                    role.name,
                    missing.join(", ")
                );
                plan.skip(
                    &entity,
                    format!("custom fields not in destination: {}", missing.join(", ")),
                );
                continue;
            }

            let current: Vec<CustomFieldPermission> = list_at(
                ctx.destination,
                &CustomFieldPermission::assigned_path(destination_id),
                page_size,
            )
            .await?;
            let current: HashSet<(&str, &str)> = current
                .iter()
                .map(|p| (p.custom_field.id.as_str(), p.access_level.as_str()))
                .collect();
            if entries
                .iter()
                .all(|(id, level)| current.contains(&(id.as_str(), level.as_str())))
            {
                plan.unchanged(&entity, destination_id);
            } else {
                plan.extend(reconciler.plan_at(
                    &CustomFieldPermission::bulk_path(destination_id),
                    &[entity],
                    &[],
                )?);
            }
        }
    }

    let writer = FieldPermissionWriter {
        api: ctx.destination,
    };
    ctx.apply_with(&reconciler, &plan, &writer).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTenant;
    use crate::sync::{AssumeYes, SyncOptions};

    async fn run(ctx: &SyncContext<'_>) -> Vec<SyncReport> {
        let mut reports = Vec::new();
        sync(ctx, &mut reports).await.unwrap();
        reports
    }

    async fn source() -> MockTenant {
        MockTenant::new()
            .with_collection(
                "roles",
                vec![
                    json!({"id": "s1", "name": "Auditor", "description": "read only"}),
                    json!({"id": "s2", "name": "Architect", "description": ""}),
                ],
            )
            .await
            .with_collection(
                "roles/s1/project-permissions",
                vec![json!({"id": "sp1", "name": "PROJECT_VIEW"})],
            )
            .await
            .with_collection(
                "roles/s2/project-permissions",
                vec![
                    json!({"id": "sp1", "name": "PROJECT_VIEW"}),
                    json!({"id": "sp2", "name": "PROJECT_EDIT"}),
                ],
            )
            .await
            .with_collection(
                "roles/s2/global-permissions",
                vec![json!({"id": "sg1", "name": "LIBRARIES_EDIT"})],
            )
            .await
            .with_collection(
                "roles/s1/custom-field-permissions",
                vec![json!({"customField": {"id": "scf1", "name": "Owner"}, "accessLevel": "READ"})],
            )
            .await
    }

    async fn destination() -> MockTenant {
        MockTenant::new()
            .with_collection(
                "roles",
                vec![json!({"id": "d1", "name": "Auditor", "description": "read only"})],
            )
            .await
            .with_collection(
                "roles/project-permissions",
                vec![
                    json!({"id": "dp1", "name": "PROJECT_VIEW"}),
                    json!({"id": "dp2", "name": "PROJECT_EDIT"}),
                ],
            )
            .await
            .with_collection(
                "roles/global-permissions",
                vec![json!({"id": "dg1", "name": "LIBRARIES_EDIT"})],
            )
            .await
            .with_collection(
                "custom-fields",
                vec![json!({"id": "dcf1", "referenceId": "cf-owner", "name": "Owner"})],
            )
            .await
    }

    #[tokio::test]
    async fn test_roles_match_by_name() {
        let source = source().await;
        let dest = destination().await;
        let ctx = SyncContext::new(&source, &dest, SyncOptions::default(), &AssumeYes);

        let reports = run(&ctx).await;
        assert_eq!(reports[0].unchanged, 1);
        assert_eq!(reports[0].created, 1);
        assert_eq!(dest.collection("roles").await.len(), 2);
    }

    #[tokio::test]
    async fn test_permissions_are_granted_by_name() {
        let source = source().await;
        let dest = destination().await;
        let ctx = SyncContext::new(&source, &dest, SyncOptions::default(), &AssumeYes);

        let reports = run(&ctx).await;
        assert_eq!(reports[1].created, 3);
        assert_eq!(reports[2].created, 1);

        let mutations = dest.mutations().await;
        let matched = mutations
            .iter()
            .find(|m| m.path == "roles/d1/project-permissions/bulk")
            .unwrap();
        assert_eq!(matched.method, "POST");
        assert_eq!(matched.body, Some(json!({"permissions": ["dp1"]})));

        // the created role takes the next mock id
        let created = mutations
            .iter()
            .find(|m| m.path == "roles/new-1/project-permissions/bulk")
            .unwrap();
        assert_eq!(created.body, Some(json!({"permissions": ["dp1", "dp2"]})));
        assert!(mutations.iter().any(|m| m.path == "roles/new-1/global-permissions/bulk"));

        let fields = mutations
            .iter()
            .find(|m| m.path == "roles/d1/custom-field-permissions/bulk")
            .unwrap();
        assert_eq!(fields.method, "PUT");
        assert_eq!(
            fields.body,
            Some(json!([{"customFieldId": "dcf1", "accessLevel": "READ"}]))
        );
    }

    #[tokio::test]
    async fn test_held_permissions_are_left_alone() {
        let source = source().await;
        let dest = destination()
            .await
            .with_collection(
                "roles/d1/project-permissions",
                vec![json!({"id": "dp1", "name": "PROJECT_VIEW"})],
            )
            .await
            .with_collection(
                "roles/d1/custom-field-permissions",
                vec![json!({"customField": {"id": "dcf1", "name": "Owner"}, "accessLevel": "READ"})],
            )
            .await;
        let ctx = SyncContext::new(&source, &dest, SyncOptions::default(), &AssumeYes);

        let reports = run(&ctx).await;
        assert_eq!(reports[1].unchanged, 1);
        assert_eq!(reports[2].unchanged, 1);
        assert!(
            dest.mutations()
                .await
                .iter()
                .all(|m| !m.path.starts_with("roles/d1/"))
        );
    }

    #[tokio::test]
    async fn test_unknown_permission_skips_the_role() {
        let source = source().await;
        let dest = MockTenant::new()
            .with_collection(
                "roles",
                vec![json!({"id": "d1", "name": "Auditor", "description": "read only"})],
            )
            .await
            .with_collection(
                "roles/project-permissions",
                vec![json!({"id": "dp1", "name": "PROJECT_VIEW"})],
            )
            .await;
        let ctx = SyncContext::new(&source, &dest, SyncOptions::default(), &AssumeYes);

        let reports = run(&ctx).await;
        let skipped: Vec<&str> = reports[1]
            .outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Skipped)
            .filter_map(|o| o.detail.as_deref())
            .collect();
        assert!(skipped.contains(&"permissions not in destination: PROJECT_EDIT"));
        assert!(skipped.contains(&"permissions not in destination: LIBRARIES_EDIT"));
        assert!(skipped.iter().all(|d| !d.contains("PROJECT_VIEW")));
        assert_eq!(reports[2].skipped, 1);
    }

    #[tokio::test]
    async fn test_dry_run_skips_permissions_of_new_roles() {
        let source = source().await;
        let dest = destination().await;
        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };
        let ctx = SyncContext::new(&source, &dest, options, &AssumeYes);

        let reports = run(&ctx).await;
        assert!(dest.mutations().await.is_empty());
        assert_eq!(reports[0].created, 1);
        // Architect: project and global skipped; Auditor: project planned
        assert_eq!(reports[1].skipped, 2);
        assert_eq!(reports[1].created, 1);
    }
}
