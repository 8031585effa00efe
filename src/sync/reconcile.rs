//! Plan and apply create/update decisions for one resource
//!
//! Planning is pure: each source entity is checked against the match table
//! and becomes a create, an update, a no-op or a skip. Applying walks the
//! plan in order, writing through an [`EntityWriter`] after the injected
//! [`Confirm`] agrees.

use std::collections::HashMap;

use async_trait::async_trait;
use log::{error, info};
use serde::Serialize;
use serde_json::{Map, Value};

use super::mapped::MappedEntity;
use super::matcher::{DuplicateKeys, check_unique_keys, find_matches, index_by_key};
use crate::client::TenantApi;
use crate::error::Result;

/// Per-resource write rules
#[derive(Debug, Clone, Copy)]
pub struct ResourceRules {
    /// Plural label used in logs and reports
    pub name: &'static str,
    /// Collection path on the destination
    pub collection: &'static str,
    /// Payload field holding the match key
    pub key_field: &'static str,
    /// Drop the key field from update payloads
    pub strip_key_on_update: bool,
    /// Restrict update payloads to these fields
    pub update_fields: Option<&'static [&'static str]>,
    /// Restrict create payloads to these fields
    pub create_fields: Option<&'static [&'static str]>,
    /// Matched entities with differences are updated; otherwise left alone
    pub allow_update: bool,
    /// Destination field that must be `true` for an update to proceed
    pub update_requires: Option<&'static str>,
}

impl ResourceRules {
    pub const fn new(name: &'static str, collection: &'static str, key_field: &'static str) -> Self {
        Self {
            name,
            collection,
            key_field,
            strip_key_on_update: false,
            update_fields: None,
            create_fields: None,
            allow_update: true,
            update_requires: None,
        }
    }

    pub const fn strip_key_on_update(mut self) -> Self {
        self.strip_key_on_update = true;
        self
    }

    pub const fn update_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.update_fields = Some(fields);
        self
    }

    pub const fn create_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.create_fields = Some(fields);
        self
    }

    pub const fn create_only(mut self) -> Self {
        self.allow_update = false;
        self
    }

    pub const fn update_requires(mut self, field: &'static str) -> Self {
        self.update_requires = Some(field);
        self
    }

    fn create_payload(&self, fields: &Map<String, Value>) -> Value {
        Value::Object(select(fields, self.create_fields))
    }

    fn update_payload(&self, fields: &Map<String, Value>) -> Value {
        let mut payload = select(fields, self.update_fields);
        if self.strip_key_on_update {
            payload.remove(self.key_field);
        }
        Value::Object(payload)
    }
}

fn select(fields: &Map<String, Value>, allowed: Option<&[&str]>) -> Map<String, Value> {
    match allowed {
        Some(names) => fields
            .iter()
            .filter(|(name, _)| names.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        None => fields.clone(),
    }
}

/// What to do with one source entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Create,
    Update {
        destination_id: String,
        changed: Vec<String>,
    },
    Unchanged {
        destination_id: String,
    },
    Skip {
        reason: String,
    },
}

impl Action {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Action::Create | Action::Update { .. })
    }
}

/// Planned action for one source entity
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub key: String,
    pub label: String,
    pub source_id: String,
    /// Destination collection the write targets
    pub collection: String,
    #[serde(flatten)]
    pub action: Action,
    /// Body for the create or update
    #[serde(skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

/// Ordered decisions for a resource
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub resource: String,
    pub decisions: Vec<Decision>,
}

impl Plan {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            decisions: Vec::new(),
        }
    }

    /// Record an entity that cannot be reconciled.
    pub fn skip(&mut self, entity: &MappedEntity, reason: impl Into<String>) {
        self.decisions.push(Decision {
            key: entity.key.clone(),
            label: entity.label().to_string(),
            source_id: entity.id.clone(),
            collection: String::new(),
            action: Action::Skip {
                reason: reason.into(),
            },
            payload: Value::Null,
        });
    }

    /// Record an entity already in the wanted state.
    pub fn unchanged(&mut self, entity: &MappedEntity, destination_id: impl Into<String>) {
        self.decisions.push(Decision {
            key: entity.key.clone(),
            label: entity.label().to_string(),
            source_id: entity.id.clone(),
            collection: String::new(),
            action: Action::Unchanged {
                destination_id: destination_id.into(),
            },
            payload: Value::Null,
        });
    }

    /// Append another plan's decisions.
    pub fn extend(&mut self, other: Plan) {
        self.decisions.extend(other.decisions);
    }

    pub fn creates(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| d.action == Action::Create)
            .count()
    }

    pub fn updates(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d.action, Action::Update { .. }))
            .count()
    }

    pub fn mutation_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| d.action.is_mutation())
            .count()
    }
}

/// Final state of one entity after applying a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Created,
    Updated,
    Unchanged,
    Skipped,
    Failed,
}

/// Result for one entity
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub key: String,
    pub label: String,
    pub source_id: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Response body of a create, for follow-up steps
    #[serde(skip)]
    pub response: Option<Value>,
}

impl Outcome {
    fn from_decision(decision: &Decision, status: OutcomeStatus) -> Self {
        Self {
            key: decision.key.clone(),
            label: decision.label.clone(),
            source_id: decision.source_id.clone(),
            status,
            destination_id: None,
            detail: None,
            response: None,
        }
    }

    fn destination(mut self, id: Option<String>) -> Self {
        self.destination_id = id;
        self
    }

    fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Counts and outcomes for one resource
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub resource: String,
    pub dry_run: bool,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<Outcome>,
}

impl SyncReport {
    pub fn new(resource: impl Into<String>, dry_run: bool) -> Self {
        Self {
            resource: resource.into(),
            dry_run,
            created: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            failed: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome.status {
            OutcomeStatus::Created => self.created += 1,
            OutcomeStatus::Updated => self.updated += 1,
            OutcomeStatus::Unchanged => self.unchanged += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Source id to new destination id for every entity created.
    pub fn created_ids(&self) -> HashMap<String, String> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Created)
            .filter_map(|o| {
                o.destination_id
                    .as_ref()
                    .map(|id| (o.source_id.clone(), id.clone()))
            })
            .collect()
    }
}

/// Asks the operator before a plan mutates the destination
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Approves every plan (`--yes`)
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Performs the writes a plan calls for
#[async_trait]
pub trait EntityWriter: Send + Sync {
    async fn create(&self, decision: &Decision) -> Result<Value>;

    async fn update(&self, destination_id: &str, decision: &Decision) -> Result<Value>;
}

/// Writes through plain POST and PUT on the decision's collection
pub struct RestWriter<'a> {
    api: &'a dyn TenantApi,
}

impl<'a> RestWriter<'a> {
    pub fn new(api: &'a dyn TenantApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl EntityWriter for RestWriter<'_> {
    async fn create(&self, decision: &Decision) -> Result<Value> {
        self.api.post(&decision.collection, &decision.payload).await
    }

    async fn update(&self, destination_id: &str, decision: &Decision) -> Result<Value> {
        self.api
            .put(&decision.collection, destination_id, &decision.payload)
            .await
    }
}

/// Sends every create and update of a plan in one request
#[async_trait]
pub trait BulkWriter: Send + Sync {
    async fn write_all(&self, decisions: &[&Decision]) -> Result<Value>;
}

/// Plans and applies one resource
pub struct Reconciler {
    rules: ResourceRules,
    duplicate_keys: DuplicateKeys,
}

impl Reconciler {
    pub fn new(rules: ResourceRules, duplicate_keys: DuplicateKeys) -> Self {
        Self {
            rules,
            duplicate_keys,
        }
    }

    /// Plan against the resource's own collection.
    pub fn plan(&self, source: &[MappedEntity], destination: &[MappedEntity]) -> Result<Plan> {
        self.plan_at(self.rules.collection, source, destination)
    }

    /// Plan against an explicit destination collection path.
    pub fn plan_at(
        &self,
        collection: &str,
        source: &[MappedEntity],
        destination: &[MappedEntity],
    ) -> Result<Plan> {
        check_unique_keys(self.rules.name, "source", source, self.duplicate_keys)?;
        check_unique_keys(self.rules.name, "destination", destination, self.duplicate_keys)?;

        let matches = find_matches(source, destination);
        let by_key = index_by_key(destination);
        let mut plan = Plan::new(self.rules.name);

        for entity in source {
            let action = match (matches.get(&entity.key), by_key.get(entity.key.as_str())) {
                (Some(destination_id), Some(existing)) => self.check(entity, existing, destination_id),
                _ => Action::Create,
            };
            let payload = match &action {
                Action::Create => self.rules.create_payload(&entity.fields),
                Action::Update { .. } => self.rules.update_payload(&entity.fields),
                _ => Value::Null,
            };
            plan.decisions.push(Decision {
                key: entity.key.clone(),
                label: entity.label().to_string(),
                source_id: entity.id.clone(),
                collection: collection.to_string(),
                action,
                payload,
            });
        }

        Ok(plan)
    }

    fn check(&self, source: &MappedEntity, existing: &MappedEntity, destination_id: &str) -> Action {
        let destination_id = destination_id.to_string();
        if source.same_fields(existing) || !self.rules.allow_update {
            return Action::Unchanged { destination_id };
        }

        // differences outside the writable fields cannot be fixed by a PUT
        let changed: Vec<String> = match self.rules.update_fields {
            Some(allowed) => source
                .changed_fields(existing)
                .into_iter()
                .filter(|f| allowed.contains(&f.as_str()))
                .collect(),
            None => source.changed_fields(existing),
        };
        if changed.is_empty() {
            return Action::Unchanged { destination_id };
        }

        if let Some(flag) = self.rules.update_requires {
            if existing.fields.get(flag) != Some(&Value::Bool(true)) {
                return Action::Skip {
                    reason: format!("'{}' is false in the destination", flag),
                };
            }
        }

        Action::Update {
            destination_id,
            changed,
        }
    }

    /// Apply a plan.
    ///
    /// With `dry_run` nothing is written and creates and updates are
    /// reported as planned. Otherwise `confirm` is asked once when the plan
    /// has mutations; a refusal skips them. Per-entity write failures are
    /// recorded and processing continues, except for fatal errors such as an
    /// invalid token, which abort immediately.
    pub async fn apply(
        &self,
        plan: &Plan,
        writer: &dyn EntityWriter,
        confirm: &dyn Confirm,
        dry_run: bool,
    ) -> Result<SyncReport> {
        let mut report = SyncReport::new(&plan.resource, dry_run);
        let approved = approve(plan, confirm, dry_run)?;

        for decision in &plan.decisions {
            let outcome = match &decision.action {
                Action::Unchanged { destination_id } => {
                    Outcome::from_decision(decision, OutcomeStatus::Unchanged)
                        .destination(Some(destination_id.clone()))
                }
                Action::Skip { reason } => {
                    Outcome::from_decision(decision, OutcomeStatus::Skipped).detail(reason.clone())
                }
                _ if !approved => Outcome::from_decision(decision, OutcomeStatus::Skipped)
                    .detail("declined"),
                Action::Create if dry_run => Outcome::from_decision(decision, OutcomeStatus::Created),
                Action::Update { destination_id, changed } if dry_run => {
                    Outcome::from_decision(decision, OutcomeStatus::Updated)
                        .destination(Some(destination_id.clone()))
                        .detail(changed.join(", "))
                }
                Action::Create => match writer.create(decision).await {
                    Ok(response) => {
                        let id = response
                            .get("id")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        info!("Created {} '{}'", plan.resource, decision.label);
                        let mut outcome = Outcome::from_decision(decision, OutcomeStatus::Created)
                            .destination(id);
                        outcome.response = Some(response);
                        outcome
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        error!("Failed to create {} '{}': {}", plan.resource, decision.label, e);
                        Outcome::from_decision(decision, OutcomeStatus::Failed).detail(e.to_string())
                    }
                },
                Action::Update { destination_id, changed } => {
                    match writer.update(destination_id, decision).await {
                        Ok(_) => {
                            info!("Updated {} '{}'", plan.resource, decision.label);
                            Outcome::from_decision(decision, OutcomeStatus::Updated)
                                .destination(Some(destination_id.clone()))
                                .detail(changed.join(", "))
                        }
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            error!("Failed to update {} '{}': {}", plan.resource, decision.label, e);
                            Outcome::from_decision(decision, OutcomeStatus::Failed)
                                .destination(Some(destination_id.clone()))
                                .detail(e.to_string())
                        }
                    }
                }
            };
            report.record(outcome);
        }

        log_counts(&report);
        Ok(report)
    }

    /// Apply a plan whose mutations the API only accepts together.
    ///
    /// Confirmation and dry-run handling match [`Reconciler::apply`]. The
    /// single write either succeeds for every mutation or fails for all of
    /// them; created entities get no destination id.
    pub async fn apply_bulk(
        &self,
        plan: &Plan,
        writer: &dyn BulkWriter,
        confirm: &dyn Confirm,
        dry_run: bool,
    ) -> Result<SyncReport> {
        let mut report = SyncReport::new(&plan.resource, dry_run);
        let approved = approve(plan, confirm, dry_run)?;

        let mutations: Vec<&Decision> = plan
            .decisions
            .iter()
            .filter(|d| d.action.is_mutation())
            .collect();
        let failure = if approved && !dry_run && !mutations.is_empty() {
            match writer.write_all(&mutations).await {
                Ok(_) => {
                    info!("Wrote {} {} in one request", mutations.len(), plan.resource);
                    None
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("Failed to write {}: {}", plan.resource, e);
                    Some(e.to_string())
                }
            }
        } else {
            None
        };

        for decision in &plan.decisions {
            let outcome = match &decision.action {
                Action::Unchanged { destination_id } => {
                    Outcome::from_decision(decision, OutcomeStatus::Unchanged)
                        .destination(Some(destination_id.clone()))
                }
                Action::Skip { reason } => {
                    Outcome::from_decision(decision, OutcomeStatus::Skipped).detail(reason.clone())
                }
                _ if !approved => Outcome::from_decision(decision, OutcomeStatus::Skipped)
                    .detail("declined"),
                Action::Create => match &failure {
                    Some(e) => Outcome::from_decision(decision, OutcomeStatus::Failed).detail(e.clone()),
                    None => Outcome::from_decision(decision, OutcomeStatus::Created),
                },
                Action::Update { destination_id, changed } => {
                    let outcome = match &failure {
                        Some(e) => Outcome::from_decision(decision, OutcomeStatus::Failed).detail(e.clone()),
                        None => Outcome::from_decision(decision, OutcomeStatus::Updated)
                            .detail(changed.join(", ")),
                    };
                    outcome.destination(Some(destination_id.clone()))
                }
            };
            report.record(outcome);
        }

        log_counts(&report);
        Ok(report)
    }
}

/// Ask once before a plan with mutations writes anything.
fn approve(plan: &Plan, confirm: &dyn Confirm, dry_run: bool) -> Result<bool> {
    if dry_run || plan.mutation_count() == 0 {
        return Ok(true);
    }
    let approved = confirm.confirm(&format!(
        "Apply {} create(s) and {} update(s) to {}?",
        plan.creates(),
        plan.updates(),
        plan.resource
    ))?;
    if !approved {
        info!("{}: changes declined", plan.resource);
    }
    Ok(approved)
}

fn log_counts(report: &SyncReport) {
    info!(
        "{}: {} created, {} updated, {} unchanged, {} skipped, {} failed",
        report.resource,
        report.created,
        report.updated,
        report.unchanged,
        report.skipped,
        report.failed
    );
}
