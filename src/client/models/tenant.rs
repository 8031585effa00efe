//! Tenant-level configuration entities

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{EntityRef, VendorEntity, null_to_default};

/// Business unit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessUnit {
    pub id: String,

    pub reference_id: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub description: String,
}

impl VendorEntity for BusinessUnit {
    const COLLECTION: &'static str = "business-units";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Trust zone
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustZone {
    pub id: String,

    pub reference_id: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub description: String,

    /// Numeric rating, kept as sent
    #[serde(default)]
    pub trust_rating: Value,

    /// Sent back as `sharedWithAllUsers` on write
    #[serde(default, deserialize_with = "null_to_default")]
    pub default_trust_zone: bool,
}

impl VendorEntity for TrustZone {
    const COLLECTION: &'static str = "trust-zones";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Security classification (CIA triad levels)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityClassification {
    pub id: String,

    pub reference_id: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub description: String,

    #[serde(default)]
    pub confidentiality: Value,

    #[serde(default)]
    pub integrity: Value,

    #[serde(default)]
    pub availability: Value,
}

impl VendorEntity for SecurityClassification {
    const COLLECTION: &'static str = "security-classifications";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Asset, keyed by name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,

    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub description: String,

    #[serde(default)]
    pub security_classification: Option<EntityRef>,
}

impl VendorEntity for Asset {
    const COLLECTION: &'static str = "assets";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Role, keyed by name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,

    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub description: String,
}

impl VendorEntity for Role {
    const COLLECTION: &'static str = "roles";

    fn id(&self) -> &str {
        &self.id
    }
}
