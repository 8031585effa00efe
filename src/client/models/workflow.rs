//! Project workflow states

use serde::{Deserialize, Serialize};

use super::{CustomFieldPermission, EntityRef, VendorEntity, null_to_default};

/// One state of the project workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,

    pub reference_id: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub description: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub lock_threat_model: bool,

    #[serde(default, deserialize_with = "null_to_default")]
    pub reports: WorkflowReports,

    /// Roles whose permissions differ while a project is in this state
    #[serde(default, deserialize_with = "null_to_default")]
    pub permission_exceptions: Vec<PermissionException>,
}

impl VendorEntity for Workflow {
    const COLLECTION: &'static str = "projects/workflow-states";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Report availability in one workflow state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowReports {
    #[serde(default, deserialize_with = "null_to_default")]
    pub residual_risk: ReportSettings,

    #[serde(default, deserialize_with = "null_to_default")]
    pub technical_threat_report: ReportSettings,

    #[serde(default, deserialize_with = "null_to_default")]
    pub technical_countermeasure_report: ReportSettings,

    #[serde(default, deserialize_with = "null_to_default")]
    pub compliance_report: ReportSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default, deserialize_with = "null_to_default")]
    pub watermark: String,

    #[serde(default, deserialize_with = "null_to_default")]
    pub visible: bool,
}

/// Permission overrides for one role
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionException {
    pub role: EntityRef,

    /// Project permission ids
    #[serde(default, deserialize_with = "null_to_default")]
    pub project_permissions: Vec<String>,

    #[serde(default, deserialize_with = "null_to_default")]
    pub custom_field_permissions: Vec<CustomFieldPermission>,
}
