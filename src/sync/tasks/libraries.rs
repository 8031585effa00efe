//! Custom libraries
//!
//! Matched libraries get metadata updates. A library missing from the
//! destination is exported from the source as XML, kept on disk, and
//! imported into the destination.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;

use crate::client::models::Library;
use crate::client::{FileUpload, TenantApi, VendorEntity, list};
use crate::error::Result;
use crate::sync::mapped::map_all;
use crate::sync::reconcile::Decision;
use crate::sync::{EntityWriter, ResourceRules, SyncContext, SyncReport};

pub const LIBRARIES: ResourceRules =
    ResourceRules::new("libraries", Library::COLLECTION, "referenceId").strip_key_on_update();

/// Creates libraries by XML export and import
pub struct LibraryWriter<'a> {
    source: &'a dyn TenantApi,
    destination: &'a dyn TenantApi,
    export_dir: PathBuf,
}

impl<'a> LibraryWriter<'a> {
    pub fn new(source: &'a dyn TenantApi, destination: &'a dyn TenantApi, output_dir: &Path) -> Self {
        Self {
            source,
            destination,
            export_dir: output_dir.join("exports"),
        }
    }

    fn export_path(&self, library_id: &str) -> PathBuf {
        self.export_dir.join(format!("{}.xml", library_id))
    }
}

fn payload_text(decision: &Decision, field: &str) -> String {
    decision
        .payload
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl EntityWriter for LibraryWriter<'_> {
    async fn create(&self, decision: &Decision) -> Result<Value> {
        let xml = self
            .source
            .get_bytes(&Library::export_path(&decision.source_id))
            .await?;

        std::fs::create_dir_all(&self.export_dir)?;
        let path = self.export_path(&decision.source_id);
        std::fs::write(&path, &xml)?;
        info!("Exported library '{}' to {}", decision.label, path.display());

        let upload = FileUpload {
            field: "file".to_string(),
            file_name: format!("{}.xml", decision.source_id),
            mime_type: "application/xml".to_string(),
            bytes: xml,
            fields: vec![
                ("referenceId".to_string(), payload_text(decision, "referenceId")),
                ("name".to_string(), payload_text(decision, "name")),
            ],
        };
        debug!("Importing {} bytes into {}", upload.bytes.len(), Library::IMPORT_PATH);
        self.destination
            .post_multipart(Library::IMPORT_PATH, upload)
            .await
    }

    async fn update(&self, destination_id: &str, decision: &Decision) -> Result<Value> {
        self.destination
            .put(&decision.collection, destination_id, &decision.payload)
            .await
    }
}

pub async fn sync(ctx: &SyncContext<'_>) -> Result<SyncReport> {
    let page_size = ctx.options.page_size;
    let source: Vec<Library> = list(ctx.source, page_size).await?;
    let destination: Vec<Library> = list(ctx.destination, page_size).await?;

    let source: Vec<Library> = source.into_iter().filter(Library::is_custom).collect();
    let destination: Vec<Library> = destination.into_iter().filter(Library::is_custom).collect();

    let reconciler = ctx.reconciler(LIBRARIES);
    let plan = reconciler.plan(&map_all(&source), &map_all(&destination))?;
    let writer = LibraryWriter::new(ctx.source, ctx.destination, &ctx.options.export_dir);
    ctx.apply_with(&reconciler, &plan, &writer).await
}
