//! Component categories, components and their risk pattern links

use std::collections::{HashMap, HashSet};

use log::warn;
use serde_json::{Map, json};

use crate::client::models::{Component, ComponentCategory, Library, RiskPattern};
use crate::client::{TenantApi, VendorEntity, list, list_at, parse_item};
use crate::error::Result;
use crate::sync::mapped::{MappedEntity, map_all, map_component};
use crate::sync::matcher::translate_ids;
use crate::sync::{Plan, ResourceRules, SyncContext, SyncReport};

/// Only `sharedWithAllUsers` is writable once a category exists
pub const CATEGORIES: ResourceRules =
    ResourceRules::new("component categories", ComponentCategory::COLLECTION, "referenceId")
        .update_fields(&["sharedWithAllUsers"])
        .create_fields(&["name", "referenceId"]);

pub const COMPONENTS: ResourceRules =
    ResourceRules::new("components", Component::COLLECTION, "referenceId").strip_key_on_update();

pub const RISK_PATTERN_LINKS: ResourceRules =
    ResourceRules::new("component risk patterns", Component::COLLECTION, "riskPattern").create_only();

async fn category_detail(api: &dyn TenantApi, id: &str) -> Result<ComponentCategory> {
    let path = format!("{}/{}", ComponentCategory::COLLECTION, id);
    parse_item(&path, api.get(&path).await?)
}

/// Replace summaries whose key is in `keys` with their detail record.
async fn with_details(
    api: &dyn TenantApi,
    summaries: Vec<ComponentCategory>,
    keys: &HashSet<String>,
) -> Result<Vec<ComponentCategory>> {
    let mut categories = Vec::with_capacity(summaries.len());
    for summary in summaries {
        if keys.contains(&summary.reference_id) {
            categories.push(category_detail(api, &summary.id).await?);
        } else {
            categories.push(summary);
        }
    }
    Ok(categories)
}

/// Reconcile categories.
///
/// The summary listing lacks `sharedWithAllUsers`, so categories present on
/// both sides are re-read individually before comparison.
pub async fn sync_categories(ctx: &SyncContext<'_>) -> Result<SyncReport> {
    let page_size = ctx.options.page_size;
    let source: Vec<ComponentCategory> =
        list_at(ctx.source, ComponentCategory::SUMMARY_COLLECTION, page_size).await?;
    let destination: Vec<ComponentCategory> =
        list_at(ctx.destination, ComponentCategory::SUMMARY_COLLECTION, page_size).await?;

    let source_keys: HashSet<String> = source.iter().map(|c| c.reference_id.clone()).collect();
    let dest_keys: HashSet<String> = destination.iter().map(|c| c.reference_id.clone()).collect();
    let shared: HashSet<String> = source_keys.intersection(&dest_keys).cloned().collect();

    let source = with_details(ctx.source, source, &shared).await?;
    let destination = with_details(ctx.destination, destination, &shared).await?;

    ctx.reconcile(CATEGORIES, &map_all(&source), &map_all(&destination))
        .await
}

fn categories_by_name(items: &[ComponentCategory]) -> Vec<MappedEntity> {
    items
        .iter()
        .map(|c| MappedEntity::reference(&c.id, &c.name))
        .collect()
}

/// Reconcile components, then link risk patterns to the ones created.
///
/// The component report is pushed before linking starts, so it survives a
/// failed risk pattern lookup.
pub async fn sync_components(ctx: &SyncContext<'_>, reports: &mut Vec<SyncReport>) -> Result<()> {
    let page_size = ctx.options.page_size;
    let source: Vec<Component> = list(ctx.source, page_size).await?;
    let destination: Vec<Component> = list(ctx.destination, page_size).await?;
    let source_categories: Vec<ComponentCategory> =
        list_at(ctx.source, ComponentCategory::SUMMARY_COLLECTION, page_size).await?;
    let dest_categories: Vec<ComponentCategory> =
        list_at(ctx.destination, ComponentCategory::SUMMARY_COLLECTION, page_size).await?;

    let category_ids = translate_ids(
        &categories_by_name(&source_categories),
        &categories_by_name(&dest_categories),
    );

    let mut mapped = Vec::new();
    let mut unresolved = Vec::new();
    for component in &source {
        match &component.category {
            None => mapped.push(map_component(component, None)),
            Some(category) => match category_ids.get(&category.id) {
                Some(id) => mapped.push(map_component(component, Some(id))),
                None => {
                    warn!(
                        "Skipping component '{}': category '{}' not found in destination",
                        component.name, category.name
                    );
                    unresolved.push((map_component(component, None), category.name.clone()));
                }
            },
        }
    }

    let dest_mapped: Vec<MappedEntity> = destination
        .iter()
        .map(|c| map_component(c, c.category.as_ref().map(|cat| cat.id.as_str())))
        .collect();

    let reconciler = ctx.reconciler(COMPONENTS);
    let mut plan = reconciler.plan(&mapped, &dest_mapped)?;
    for (entity, category) in &unresolved {
        plan.skip(entity, format!("category '{}' not in destination", category));
    }
    let report = ctx.apply(&reconciler, &plan).await?;
    let created = report.created_ids();
    reports.push(report);

    reports.push(link_risk_patterns(ctx, &created).await?);
    Ok(())
}

/// Destination risk pattern ids keyed by (library name, risk pattern name).
async fn destination_risk_patterns(ctx: &SyncContext<'_>) -> Result<HashMap<(String, String), String>> {
    let page_size = ctx.options.page_size;
    let libraries: Vec<Library> = list(ctx.destination, page_size).await?;
    let mut index = HashMap::new();
    for library in &libraries {
        let patterns: Vec<RiskPattern> =
            list_at(ctx.destination, &Library::risk_patterns_path(&library.id), page_size).await?;
        for pattern in patterns {
            index.insert((library.name.clone(), pattern.name), pattern.id);
        }
    }
    Ok(index)
}

async fn link_risk_patterns(
    ctx: &SyncContext<'_>,
    created: &HashMap<String, String>,
) -> Result<SyncReport> {
    let reconciler = ctx.reconciler(RISK_PATTERN_LINKS);
    let mut plan = Plan::new(RISK_PATTERN_LINKS.name);

    if !created.is_empty() {
        let index = destination_risk_patterns(ctx).await?;
        let mut components: Vec<(&String, &String)> = created.iter().collect();
        components.sort();

        for (source_id, dest_id) in components {
            let patterns: Vec<RiskPattern> = list_at(
                ctx.source,
                &Component::risk_patterns_path(source_id),
                ctx.options.page_size,
            )
            .await?;

            let mut links = Vec::new();
            for pattern in &patterns {
                let library = pattern
                    .library
                    .as_ref()
                    .map(|l| l.name.clone())
                    .unwrap_or_default();
                let key = format!("{}/{}", library, pattern.name);
                match index.get(&(library, pattern.name.clone())) {
                    Some(id) => links.push(MappedEntity::new(
                        &pattern.id,
                        key,
                        Map::from_iter([("riskPattern".to_string(), json!({ "id": id }))]),
                    )),
                    None => {
                        warn!("No destination risk pattern for {}", key);
                        plan.skip(
                            &MappedEntity::reference(&pattern.id, key),
                            "risk pattern not found in destination",
                        );
                    }
                }
            }

            plan.extend(reconciler.plan_at(&Component::risk_patterns_path(dest_id), &links, &[])?);
        }
    }

    ctx.apply(&reconciler, &plan).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTenant;
    use crate::sync::{AssumeYes, SyncOptions};
    use serde_json::Value;

    async fn run(ctx: &SyncContext<'_>) -> Vec<SyncReport> {
        let mut reports = Vec::new();
        sync_components(ctx, &mut reports).await.unwrap();
        reports
    }

    fn category(id: &str, reference_id: &str, name: &str, shared: Option<bool>) -> Value {
        let mut value = json!({"id": id, "referenceId": reference_id, "name": name});
        if let Some(shared) = shared {
            value["sharedWithAllUsers"] = json!(shared);
        }
        value
    }

    #[tokio::test]
    async fn test_category_update_sends_only_shared_flag() {
        let source = MockTenant::new()
            .with_collection(
                "components/categories/summary",
                vec![
                    category("s1", "client", "Client", None),
                    category("s2", "cloud", "Cloud", None),
                ],
            )
            .await
            .with_collection(
                "components/categories",
                vec![category("s1", "client", "Client side", Some(true))],
            )
            .await;
        let dest = MockTenant::new()
            .with_collection(
                "components/categories/summary",
                vec![category("d1", "client", "Client", None)],
            )
            .await
            .with_collection(
                "components/categories",
                vec![category("d1", "client", "Client", Some(false))],
            )
            .await;
        let ctx = SyncContext::new(&source, &dest, SyncOptions::default(), &AssumeYes);

        let report = sync_categories(&ctx).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 1);

        let mutations = dest.mutations().await;
        assert_eq!(mutations[0].path, "components/categories/d1");
        assert_eq!(mutations[0].body, Some(json!({"sharedWithAllUsers": true})));
        assert_eq!(mutations[1].path, "components/categories");
        assert_eq!(
            mutations[1].body,
            Some(json!({"referenceId": "cloud", "name": "Cloud"}))
        );
    }

    async fn component_tenants() -> (MockTenant, MockTenant) {
        let source = MockTenant::new()
            .with_collection(
                "components/categories/summary",
                vec![
                    category("sc1", "client", "Client", None),
                    category("sc2", "iot", "IoT", None),
                ],
            )
            .await
            .with_collection(
                "components",
                vec![
                    json!({"id": "c1", "referenceId": "CD-WEB", "name": "Web app",
                           "category": {"id": "sc1", "name": "Client"}}),
                    json!({"id": "c2", "referenceId": "CD-BULB", "name": "Bulb",
                           "category": {"id": "sc2", "name": "IoT"}}),
                ],
            )
            .await
            .with_collection(
                "components/c1/risk-patterns",
                vec![
                    json!({"id": "srp1", "name": "Web RP", "library": {"id": "sl1", "name": "Web"}}),
                    json!({"id": "srp2", "name": "Gone", "library": {"id": "sl1", "name": "Web"}}),
                ],
            )
            .await;
        let dest = MockTenant::new()
            .with_collection(
                "components/categories/summary",
                vec![category("dc1", "client-2", "Client", None)],
            )
            .await
            .with_collection(
                "libraries",
                vec![json!({"id": "dl1", "referenceId": "web", "name": "Web", "type": "system"})],
            )
            .await
            .with_collection(
                "libraries/dl1/risk-patterns",
                vec![json!({"id": "drp1", "name": "Web RP"})],
            )
            .await;
        (source, dest)
    }

    #[tokio::test]
    async fn test_created_component_gets_category_and_risk_patterns() {
        let (source, dest) = component_tenants().await;
        let ctx = SyncContext::new(&source, &dest, SyncOptions::default(), &AssumeYes);

        let reports = run(&ctx).await;
        assert_eq!(reports[0].created, 1);
        assert_eq!(reports[0].skipped, 1);
        assert_eq!(reports[1].created, 1);
        assert_eq!(reports[1].skipped, 1);

        let created = &dest.collection("components").await[0];
        assert_eq!(created["category"]["id"], "dc1");
        assert_eq!(created["visible"], true);

        let links = dest.collection("components/new-1/risk-patterns").await;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0]["riskPattern"]["id"], "drp1");
    }

    #[tokio::test]
    async fn test_component_report_survives_failed_linking() {
        let (source, dest) = component_tenants().await;
        let dest = dest.fail_on("GET", "libraries", 503).await;
        let ctx = SyncContext::new(&source, &dest, SyncOptions::default(), &AssumeYes);

        let mut reports = Vec::new();
        let result = sync_components(&ctx, &mut reports).await;

        assert!(result.is_err());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].created, 1);
        assert_eq!(dest.collection("components").await.len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_plans_no_links() {
        let (source, dest) = component_tenants().await;
        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };
        let ctx = SyncContext::new(&source, &dest, options, &AssumeYes);

        let reports = run(&ctx).await;
        assert_eq!(reports[0].created, 1);
        assert_eq!(reports[1].total(), 0);
        assert!(dest.mutations().await.is_empty());
    }
}
