//! Components, component categories and risk patterns

use serde::{Deserialize, Serialize};

use super::{EntityRef, VendorEntity, default_true, null_to_default};

/// Component category. The summary listing omits `sharedWithAllUsers`, so it
/// is only meaningful on a detail fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentCategory {
    pub id: String,

    pub reference_id: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub shared_with_all_users: bool,
}

impl VendorEntity for ComponentCategory {
    const COLLECTION: &'static str = "components/categories";

    fn id(&self) -> &str {
        &self.id
    }
}

impl ComponentCategory {
    /// Lightweight listing of all categories
    pub const SUMMARY_COLLECTION: &'static str = "components/categories/summary";
}

/// Component definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,

    pub reference_id: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub description: String,

    #[serde(default)]
    pub category: Option<EntityRef>,

    #[serde(default = "default_true")]
    pub visible: bool,
}

impl VendorEntity for Component {
    const COLLECTION: &'static str = "components";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Component {
    /// Risk patterns associated with a component
    pub fn risk_patterns_path(component_id: &str) -> String {
        format!("{}/{}/risk-patterns", Self::COLLECTION, component_id)
    }
}

/// Risk pattern as listed under a component or a library
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskPattern {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub library: Option<EntityRef>,
}
