//! Libraries

use serde::{Deserialize, Serialize};

use super::{VendorEntity, null_to_default};

/// Library. Only `custom` libraries are ever reconciled; system libraries are
/// managed by the vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    pub id: String,

    pub reference_id: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub description: String,

    #[serde(rename = "type", default, deserialize_with = "null_to_default")]
    pub library_type: String,
}

impl VendorEntity for Library {
    const COLLECTION: &'static str = "libraries";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Library {
    pub fn is_custom(&self) -> bool {
        self.library_type.eq_ignore_ascii_case("custom")
    }

    pub fn export_path(library_id: &str) -> String {
        format!("{}/{}/export", Self::COLLECTION, library_id)
    }

    pub fn risk_patterns_path(library_id: &str) -> String {
        format!("{}/{}/risk-patterns", Self::COLLECTION, library_id)
    }

    pub const IMPORT_PATH: &'static str = "libraries/import";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_custom_ignores_case() {
        let lib: Library = serde_json::from_value(json!({
            "id": "l1", "referenceId": "my-lib", "name": "Mine", "type": "CUSTOM"
        }))
        .unwrap();
        assert!(lib.is_custom());

        let lib: Library = serde_json::from_value(json!({
            "id": "l2", "referenceId": "cwe", "name": "CWE", "type": "system"
        }))
        .unwrap();
        assert!(!lib.is_custom());
    }

    #[test]
    fn test_paths() {
        assert_eq!(Library::export_path("l1"), "libraries/l1/export");
        assert_eq!(Library::risk_patterns_path("l1"), "libraries/l1/risk-patterns");
    }
}
