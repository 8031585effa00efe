//! IriusRisk API data models
//!
//! One serde struct per vendor resource. Optional vendor fields default when
//! missing or null; a missing `id` or key field fails deserialization, which
//! the client reports as an invalid response.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

mod component;
mod custom_field;
mod library;
mod permission;
mod tenant;
mod workflow;

pub use component::{Component, ComponentCategory, RiskPattern};
pub use custom_field::{CustomField, CustomFieldGroup, CustomFieldType, CustomFieldTypeValue};
pub use library::Library;
pub use permission::{CustomFieldPermission, Permission, PermissionKind};
pub use tenant::{Asset, BusinessUnit, Role, SecurityClassification, TrustZone};
pub use workflow::Workflow;

/// A vendor resource listed from a fixed collection path
pub trait VendorEntity: DeserializeOwned + Send {
    /// Collection path under `/api/v2/`
    const COLLECTION: &'static str;

    /// Server-assigned opaque id
    fn id(&self) -> &str;
}

/// Reference to another entity embedded in a response (`{"id", "name"}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,
}

/// Deserialize `null` as the type's default value.
pub(crate) fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn default_true() -> bool {
    true
}
