//! Custom fields and their supporting types and groups

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{EntityRef, VendorEntity, null_to_default};

/// Custom field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub id: String,

    pub reference_id: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub description: String,

    /// Entity the field attaches to (project, threat, ...)
    #[serde(default, deserialize_with = "null_to_default")]
    pub entity: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub required: bool,

    #[serde(default, deserialize_with = "null_to_default")]
    pub visible: bool,

    #[serde(default, deserialize_with = "null_to_default")]
    pub editable: bool,

    #[serde(default, deserialize_with = "null_to_default")]
    pub exportable: bool,

    #[serde(default)]
    pub default_value: Value,

    #[serde(default)]
    pub max_size: Value,

    #[serde(default)]
    pub regex_validator: Value,

    #[serde(rename = "type", default)]
    pub field_type: Option<EntityRef>,

    #[serde(default)]
    pub group: Option<CustomFieldGroup>,
}

impl VendorEntity for CustomField {
    const COLLECTION: &'static str = "custom-fields";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Custom field type (the value domain of a field)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldType {
    pub id: String,

    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub description: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub multi_selectable: bool,
}

impl VendorEntity for CustomFieldType {
    const COLLECTION: &'static str = "custom-fields/types";

    fn id(&self) -> &str {
        &self.id
    }
}

impl CustomFieldType {
    /// Path of this type's value list
    pub fn values_path(type_id: &str) -> String {
        format!("{}/{}/values", Self::COLLECTION, type_id)
    }
}

/// One selectable value of a custom field type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldTypeValue {
    #[serde(default)]
    pub id: Option<String>,

    pub value: String,
}

/// Custom field group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldGroup {
    pub id: String,

    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub entity: String,
}

impl VendorEntity for CustomFieldGroup {
    const COLLECTION: &'static str = "custom-fields/groups";

    fn id(&self) -> &str {
        &self.id
    }
}
