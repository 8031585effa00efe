//! Role permission catalogs and assignments

use serde::{Deserialize, Serialize};

use super::{EntityRef, Role, VendorEntity, null_to_default};

/// Permissions granted to a role by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKind {
    Project,
    Global,
}

impl PermissionKind {
    pub const ALL: [PermissionKind; 2] = [PermissionKind::Project, PermissionKind::Global];

    pub fn segment(self) -> &'static str {
        match self {
            PermissionKind::Project => "project-permissions",
            PermissionKind::Global => "global-permissions",
        }
    }

    /// Every permission of this kind the tenant offers
    pub fn catalog_path(self) -> String {
        format!("{}/{}", Role::COLLECTION, self.segment())
    }

    /// Permissions of this kind held by one role
    pub fn assigned_path(self, role_id: &str) -> String {
        format!("{}/{}/{}", Role::COLLECTION, role_id, self.segment())
    }

    /// Grants a list of permission ids to one role
    pub fn bulk_path(self, role_id: &str) -> String {
        format!("{}/bulk", self.assigned_path(role_id))
    }
}

/// Named permission, matched across tenants by name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,
}

/// Access a role has to one custom field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldPermission {
    pub custom_field: EntityRef,

    #[serde(default, deserialize_with = "null_to_default")]
    pub access_level: String,
}

impl CustomFieldPermission {
    pub fn assigned_path(role_id: &str) -> String {
        format!("{}/{}/custom-field-permissions", Role::COLLECTION, role_id)
    }

    /// Replaces a role's custom field access in one PUT
    pub fn bulk_path(role_id: &str) -> String {
        format!("{}/bulk", Self::assigned_path(role_id))
    }
}
