//! Project workflow states
//!
//! States are matched by referenceId. Their permission exceptions name roles,
//! project permissions and custom fields by id, so each reference is carried
//! into the destination by name before comparison. The API takes changed and
//! new states together in a single PUT.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use log::warn;
use serde_json::{Value, json};

use crate::client::models::{CustomField, Permission, PermissionKind, Role, Workflow};
use crate::client::{TenantApi, VendorEntity, list, list_at};
use crate::error::Result;
use crate::sync::mapped::{MappedEntity, map_workflow};
use crate::sync::matcher::translate_ids;
use crate::sync::reconcile::{Action, Decision};
use crate::sync::{BulkWriter, ResourceRules, SyncContext, SyncReport};

pub const WORKFLOWS: ResourceRules =
    ResourceRules::new("workflows", Workflow::COLLECTION, "referenceId");

fn exception_payload(role_id: &str, permissions: Vec<String>, fields: Vec<Value>) -> Value {
    let mut permissions = permissions;
    permissions.sort();
    let mut fields = fields;
    fields.sort_by(|a, b| a["customFieldId"].as_str().cmp(&b["customFieldId"].as_str()));
    json!({
        "roleId": role_id,
        "projectPermissions": permissions,
        "customFieldPermissions": fields,
    })
}

/// Exceptions of a destination state, in payload form with its own ids.
fn current_exceptions(workflow: &Workflow) -> Vec<Value> {
    workflow
        .permission_exceptions
        .iter()
        .map(|e| {
            let fields = e
                .custom_field_permissions
                .iter()
                .map(|p| json!({"customFieldId": p.custom_field.id, "accessLevel": p.access_level}))
                .collect();
            exception_payload(&e.role.id, e.project_permissions.clone(), fields)
        })
        .collect()
}

fn by_name<'a>(items: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<MappedEntity> {
    items.map(|(id, name)| MappedEntity::reference(id, name)).collect()
}

/// Source-to-destination lookups for permission exception references
#[derive(Default)]
struct ExceptionRefs {
    roles: HashMap<String, String>,
    role_names: HashMap<String, String>,
    permissions: HashMap<String, String>,
    permission_names: HashMap<String, String>,
    /// Destination custom fields as (name, id), in listing order
    custom_fields: Vec<(String, String)>,
}

impl ExceptionRefs {
    async fn load(ctx: &SyncContext<'_>) -> Result<Self> {
        let page_size = ctx.options.page_size;
        let source_roles: Vec<Role> = list(ctx.source, page_size).await?;
        let dest_roles: Vec<Role> = list(ctx.destination, page_size).await?;
        let catalog = PermissionKind::Project.catalog_path();
        let source_permissions: Vec<Permission> = list_at(ctx.source, &catalog, page_size).await?;
        let dest_permissions: Vec<Permission> = list_at(ctx.destination, &catalog, page_size).await?;
        let fields: Vec<CustomField> = list(ctx.destination, page_size).await?;

        Ok(Self {
            roles: translate_ids(
                &by_name(source_roles.iter().map(|r| (r.id.as_str(), r.name.as_str()))),
                &by_name(dest_roles.iter().map(|r| (r.id.as_str(), r.name.as_str()))),
            ),
            role_names: source_roles
                .iter()
                .map(|r| (r.id.clone(), r.name.clone()))
                .collect(),
            permissions: translate_ids(
                &by_name(source_permissions.iter().map(|p| (p.id.as_str(), p.name.as_str()))),
                &by_name(dest_permissions.iter().map(|p| (p.id.as_str(), p.name.as_str()))),
            ),
            permission_names: source_permissions
                .iter()
                .map(|p| (p.id.clone(), p.name.clone()))
                .collect(),
            custom_fields: fields.into_iter().map(|f| (f.name, f.id)).collect(),
        })
    }

    /// Exceptions of a source state with every reference translated, or the
    /// first reference the destination lacks.
    fn translate(&self, workflow: &Workflow) -> std::result::Result<Vec<Value>, String> {
        let mut exceptions = Vec::new();
        for exception in &workflow.permission_exceptions {
            let role_id = self.roles.get(&exception.role.id).ok_or_else(|| {
                let name = self
                    .role_names
                    .get(&exception.role.id)
                    .unwrap_or(&exception.role.name);
                format!("role '{}' not in destination", name)
            })?;

            let mut permissions = Vec::new();
            for id in &exception.project_permissions {
                let dest = self.permissions.get(id).ok_or_else(|| {
                    let name = self.permission_names.get(id).unwrap_or(id);
                    format!("project permission '{}' not in destination", name)
                })?;
                permissions.push(dest.clone());
            }

            // repeated field names map onto distinct destination fields
            let mut used: HashSet<&str> = HashSet::new();
            let mut fields = Vec::new();
            for permission in &exception.custom_field_permissions {
                let name = &permission.custom_field.name;
                let (_, id) = self
                    .custom_fields
                    .iter()
                    .find(|(field, id)| field == name && !used.contains(id.as_str()))
                    .ok_or_else(|| format!("custom field '{}' not in destination", name))?;
                used.insert(id);
                fields.push(json!({"customFieldId": id, "accessLevel": permission.access_level}));
            }

            exceptions.push(exception_payload(role_id, permissions, fields));
        }
        Ok(exceptions)
    }
}

/// Writes every changed or new state in one PUT of the workflow collection
struct WorkflowWriter<'a> {
    api: &'a dyn TenantApi,
}

#[async_trait]
impl BulkWriter for WorkflowWriter<'_> {
    async fn write_all(&self, decisions: &[&Decision]) -> Result<Value> {
        let states: Vec<Value> = decisions
            .iter()
            .map(|decision| {
                let mut state = decision.payload.clone();
                if let (Action::Update { destination_id, .. }, Some(fields)) =
                    (&decision.action, state.as_object_mut())
                {
                    fields.insert("id".to_string(), Value::String(destination_id.clone()));
                }
                state
            })
            .collect();
        let body = json!({"workflow": states, "deleteReplacements": []});
        self.api.put_bulk(Workflow::COLLECTION, &body).await
    }
}

pub async fn sync(ctx: &SyncContext<'_>) -> Result<SyncReport> {
    let page_size = ctx.options.page_size;
    let source: Vec<Workflow> = list(ctx.source, page_size).await?;
    let destination: Vec<Workflow> = list(ctx.destination, page_size).await?;

    let refs = if source.iter().any(|w| !w.permission_exceptions.is_empty()) {
        ExceptionRefs::load(ctx).await?
    } else {
        ExceptionRefs::default()
    };

    let mut mapped = Vec::new();
    let mut unresolved = Vec::new();
    for workflow in &source {
        match refs.translate(workflow) {
            Ok(exceptions) => mapped.push(map_workflow(workflow, exceptions)),
            Err(reason) => {
                warn!("Skipping workflow '{}': {}", workflow.name, reason);
                unresolved.push((map_workflow(workflow, Vec::new()), reason));
            }
        }
    }
    let dest_mapped: Vec<MappedEntity> = destination
        .iter()
        .map(|w| map_workflow(w, current_exceptions(w)))
        .collect();

    let reconciler = ctx.reconciler(WORKFLOWS);
    let mut plan = reconciler.plan(&mapped, &dest_mapped)?;
    for (entity, reason) in unresolved {
        plan.skip(&entity, reason);
    }
    ctx.apply_bulk(&reconciler, &plan, &WorkflowWriter { api: ctx.destination })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTenant;
    use crate::sync::{AssumeYes, OutcomeStatus, SyncOptions};

    fn state(id: &str, reference_id: &str, name: &str, exceptions: Value) -> Value {
        json!({
            "id": id,
            "referenceId": reference_id,
            "name": name,
            "description": "",
            "lockThreatModel": false,
            "reports": {
                "residualRisk": {"watermark": "", "visible": true},
                "technicalThreatReport": {"watermark": "", "visible": true},
                "technicalCountermeasureReport": {"watermark": "", "visible": true},
                "complianceReport": {"watermark": "", "visible": true}
            },
            "permissionExceptions": exceptions
        })
    }

    async fn source() -> MockTenant {
        MockTenant::new()
            .with_collection(
                "projects/workflow-states",
                vec![
                    state("sw1", "draft", "Draft", json!([])),
                    state(
                        "sw2",
                        "review",
                        "Review",
                        json!([{
                            "role": {"id": "sr1"},
                            "projectPermissions": ["sp1"],
                            "customFieldPermissions": [
                                {"customField": {"id": "scf1", "name": "Owner"}, "accessLevel": "READ"}
                            ]
                        }]),
                    ),
                ],
            )
            .await
            .with_collection(
                "roles",
                vec![json!({"id": "sr1", "name": "Auditor", "description": ""})],
            )
            .await
            .with_collection(
                "roles/project-permissions",
                vec![json!({"id": "sp1", "name": "PROJECT_VIEW"})],
            )
            .await
    }

    async fn destination(states: Vec<Value>) -> MockTenant {
        MockTenant::new()
            .with_collection("projects/workflow-states", states)
            .await
            .with_collection(
                "roles",
                vec![json!({"id": "dr1", "name": "Auditor", "description": ""})],
            )
            .await
            .with_collection(
                "roles/project-permissions",
                vec![json!({"id": "dp1", "name": "PROJECT_VIEW"})],
            )
            .await
            .with_collection(
                "custom-fields",
                vec![json!({"id": "dcf1", "referenceId": "cf-owner", "name": "Owner"})],
            )
            .await
    }

    #[tokio::test]
    async fn test_states_are_written_in_one_put_with_remapped_exceptions() {
        let source = source().await;
        let dest = destination(vec![state("dw1", "draft", "Draft (old)", json!([]))]).await;
        let ctx = SyncContext::new(&source, &dest, SyncOptions::default(), &AssumeYes);

        let report = sync(&ctx).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 1);

        let mutations = dest.mutations().await;
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].method, "PUT");
        assert_eq!(mutations[0].path, "projects/workflow-states");

        let body = mutations[0].body.as_ref().unwrap();
        assert_eq!(body["deleteReplacements"], json!([]));
        let states = body["workflow"].as_array().unwrap();
        assert_eq!(states[0]["id"], "dw1");
        assert_eq!(states[0]["name"], "Draft");
        assert!(states[1].get("id").is_none());
        assert_eq!(
            states[1]["permissionExceptions"],
            json!([{
                "roleId": "dr1",
                "projectPermissions": ["dp1"],
                "customFieldPermissions": [{"customFieldId": "dcf1", "accessLevel": "READ"}]
            }])
        );
    }

    #[tokio::test]
    async fn test_matching_states_send_nothing() {
        let source = source().await;
        let dest = destination(vec![
            state("dw1", "draft", "Draft", json!([])),
            state(
                "dw2",
                "review",
                "Review",
                json!([{
                    "role": {"id": "dr1"},
                    "projectPermissions": ["dp1"],
                    "customFieldPermissions": [
                        {"customField": {"id": "dcf1", "name": "Owner"}, "accessLevel": "READ"}
                    ]
                }]),
            ),
        ])
        .await;
        let ctx = SyncContext::new(&source, &dest, SyncOptions::default(), &AssumeYes);

        let report = sync(&ctx).await.unwrap();
        assert_eq!(report.unchanged, 2);
        assert!(dest.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_role_skips_the_state() {
        let source = source().await;
        let dest = MockTenant::new()
            .with_collection(
                "roles/project-permissions",
                vec![json!({"id": "dp1", "name": "PROJECT_VIEW"})],
            )
            .await;
        let ctx = SyncContext::new(&source, &dest, SyncOptions::default(), &AssumeYes);

        let report = sync(&ctx).await.unwrap();
        assert_eq!(report.created, 1);
        let skipped = report
            .outcomes
            .iter()
            .find(|o| o.status == OutcomeStatus::Skipped)
            .unwrap();
        assert_eq!(skipped.key, "review");
        assert_eq!(skipped.detail.as_deref(), Some("role 'Auditor' not in destination"));

        let body = dest.mutations().await[0].body.clone().unwrap();
        assert_eq!(body["workflow"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_put_fails_every_state() {
        let source = source().await;
        let dest = destination(vec![])
            .await
            .fail_on("PUT", "projects/workflow-states", 400)
            .await;
        let ctx = SyncContext::new(&source, &dest, SyncOptions::default(), &AssumeYes);

        let report = sync(&ctx).await.unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(report.created, 0);
    }

    #[tokio::test]
    async fn test_states_without_exceptions_need_no_lookups() {
        let source = MockTenant::new()
            .with_collection(
                "projects/workflow-states",
                vec![state("sw1", "draft", "Draft", json!([]))],
            )
            .await;
        let dest = MockTenant::new();
        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };
        let ctx = SyncContext::new(&source, &dest, options, &AssumeYes);

        let report = sync(&ctx).await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(source.page_requests("roles").await, 0);
        assert!(dest.mutations().await.is_empty());
    }
}
