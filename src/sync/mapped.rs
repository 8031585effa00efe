//! Projection of vendor entities into comparable form
//!
//! A [`MappedEntity`] carries the destination-relevant fields of an entity in
//! a fixed order. The opaque id is kept apart from `fields`, so two entities
//! compare equal when their fields do, regardless of which tenant they came
//! from.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::client::models::{
    Asset, BusinessUnit, Component, ComponentCategory, CustomField, CustomFieldGroup,
    CustomFieldType, CustomFieldTypeValue, Library, Role, SecurityClassification, TrustZone,
    Workflow,
};

/// Entity reduced to its key and comparable fields
#[derive(Debug, Clone, Serialize)]
pub struct MappedEntity {
    /// Opaque id in the tenant it was read from
    pub id: String,
    /// Reference key used for matching across tenants
    pub key: String,
    /// Comparison and payload fields, never containing `id`
    pub fields: Map<String, Value>,
}

impl MappedEntity {
    pub fn new(id: impl Into<String>, key: impl Into<String>, fields: Map<String, Value>) -> Self {
        let mut fields = fields;
        fields.remove("id");
        Self {
            id: id.into(),
            key: key.into(),
            fields,
        }
    }

    /// Entity with no fields, for lookups by key alone.
    pub fn reference(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(id, key, Map::new())
    }

    /// Field-level equality; the opaque id is ignored.
    pub fn same_fields(&self, other: &MappedEntity) -> bool {
        self.fields == other.fields
    }

    /// Names of fields whose values differ from `other`, in this entity's order.
    pub fn changed_fields(&self, other: &MappedEntity) -> Vec<String> {
        let mut changed: Vec<String> = self
            .fields
            .iter()
            .filter(|(name, value)| other.fields.get(*name) != Some(*value))
            .map(|(name, _)| name.clone())
            .collect();
        for name in other.fields.keys() {
            if !self.fields.contains_key(name) {
                changed.push(name.clone());
            }
        }
        changed
    }

    /// Human-readable label: the `name` field when present, else the key.
    pub fn label(&self) -> &str {
        self.fields
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.key)
    }
}

/// Types with a fixed projection that needs no cross-tenant lookups
pub trait Mappable {
    fn to_mapped(&self) -> MappedEntity;
}

/// Map a slice of entities.
pub fn map_all<T: Mappable>(items: &[T]) -> Vec<MappedEntity> {
    items.iter().map(Mappable::to_mapped).collect()
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl Mappable for BusinessUnit {
    fn to_mapped(&self) -> MappedEntity {
        MappedEntity::new(
            &self.id,
            &self.reference_id,
            object(json!({
                "referenceId": self.reference_id,
                "name": self.name,
                "description": self.description,
            })),
        )
    }
}

impl Mappable for TrustZone {
    fn to_mapped(&self) -> MappedEntity {
        MappedEntity::new(
            &self.id,
            &self.reference_id,
            object(json!({
                "referenceId": self.reference_id,
                "name": self.name,
                "description": self.description,
                "trustRating": self.trust_rating,
                "sharedWithAllUsers": self.default_trust_zone,
            })),
        )
    }
}

impl Mappable for SecurityClassification {
    fn to_mapped(&self) -> MappedEntity {
        MappedEntity::new(
            &self.id,
            &self.reference_id,
            object(json!({
                "referenceId": self.reference_id,
                "name": self.name,
                "description": self.description,
                "confidentiality": self.confidentiality,
                "integrity": self.integrity,
                "availability": self.availability,
            })),
        )
    }
}

impl Mappable for Role {
    fn to_mapped(&self) -> MappedEntity {
        MappedEntity::new(
            &self.id,
            &self.name,
            object(json!({
                "name": self.name,
                "description": self.description,
            })),
        )
    }
}

impl Mappable for Library {
    fn to_mapped(&self) -> MappedEntity {
        MappedEntity::new(
            &self.id,
            &self.reference_id,
            object(json!({
                "referenceId": self.reference_id,
                "name": self.name,
                "description": self.description,
            })),
        )
    }
}

impl Mappable for CustomFieldType {
    fn to_mapped(&self) -> MappedEntity {
        MappedEntity::new(
            &self.id,
            &self.name,
            object(json!({
                "name": self.name,
                "description": self.description,
                "multiSelectable": self.multi_selectable,
            })),
        )
    }
}

impl Mappable for CustomFieldGroup {
    fn to_mapped(&self) -> MappedEntity {
        MappedEntity::new(
            &self.id,
            &self.name,
            object(json!({
                "name": self.name,
                "entity": self.entity,
            })),
        )
    }
}

impl Mappable for CustomFieldTypeValue {
    fn to_mapped(&self) -> MappedEntity {
        MappedEntity::new(
            self.id.clone().unwrap_or_default(),
            &self.value,
            object(json!({
                "value": self.value,
                "after": "",
            })),
        )
    }
}

impl Mappable for ComponentCategory {
    fn to_mapped(&self) -> MappedEntity {
        MappedEntity::new(
            &self.id,
            &self.reference_id,
            object(json!({
                "referenceId": self.reference_id,
                "name": self.name,
                "sharedWithAllUsers": self.shared_with_all_users,
            })),
        )
    }
}

/// Map an asset with its classification id already resolved for the
/// destination tenant.
pub fn map_asset(asset: &Asset, classification_id: Option<&str>) -> MappedEntity {
    let classification = match classification_id {
        Some(id) => json!({ "id": id }),
        None => Value::Null,
    };
    MappedEntity::new(
        &asset.id,
        &asset.name,
        object(json!({
            "name": asset.name,
            "description": asset.description,
            "securityClassification": classification,
        })),
    )
}

/// Map a custom field with type and group ids resolved for the destination.
pub fn map_custom_field(
    field: &CustomField,
    type_id: Option<&str>,
    group_id: Option<&str>,
) -> MappedEntity {
    MappedEntity::new(
        &field.id,
        &field.reference_id,
        object(json!({
            "referenceId": field.reference_id,
            "name": field.name,
            "description": field.description,
            "entity": field.entity,
            "required": field.required,
            "visible": field.visible,
            "editable": field.editable,
            "exportable": field.exportable,
            "defaultValue": field.default_value,
            "maxSize": field.max_size,
            "regexValidator": field.regex_validator,
            "typeId": type_id,
            "groupId": group_id,
        })),
    )
}

/// Map a component with its category id resolved for the destination.
pub fn map_component(component: &Component, category_id: Option<&str>) -> MappedEntity {
    let category = match category_id {
        Some(id) => json!({ "id": id }),
        None => Value::Null,
    };
    MappedEntity::new(
        &component.id,
        &component.reference_id,
        object(json!({
            "referenceId": component.reference_id,
            "name": component.name,
            "description": component.description,
            "category": category,
            "visible": component.visible,
        })),
    )
}

/// Map a workflow state with its permission exceptions already in payload
/// form for the destination. Exceptions are ordered by role id.
pub fn map_workflow(workflow: &Workflow, exceptions: Vec<Value>) -> MappedEntity {
    let mut exceptions = exceptions;
    exceptions.sort_by(|a, b| a["roleId"].as_str().cmp(&b["roleId"].as_str()));
    MappedEntity::new(
        &workflow.id,
        &workflow.reference_id,
        object(json!({
            "referenceId": workflow.reference_id,
            "name": workflow.name,
            "description": workflow.description,
            "lockThreatModel": workflow.lock_threat_model,
            "reports": workflow.reports,
            "permissionExceptions": exceptions,
        })),
    )
}
