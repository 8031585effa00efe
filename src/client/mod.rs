//! IriusRisk API client
//!
//! [`TenantApi`] is the seam between reconciliation logic and HTTP. The
//! production implementation is [`IriusClient`]; tests use the in-memory
//! `MockTenant`.

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, Result};

pub mod irius;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod pagination;
pub mod rate_limit;
pub mod retry;

pub use irius::IriusClient;
#[cfg(test)]
pub use mock::MockTenant;
pub use models::VendorEntity;
pub use pagination::{DEFAULT_PAGE_SIZE, Page, PageMeta, PageParams};

/// A file sent as `multipart/form-data` alongside plain text fields
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Form field carrying the file
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    /// Additional text fields
    pub fields: Vec<(String, String)>,
}

/// Operations against one tenant's REST API.
///
/// Paths are relative to `/api/v2/`, e.g. `business-units` or
/// `libraries/{id}/export`.
#[async_trait]
pub trait TenantApi: Send + Sync {
    /// Base URL of the tenant, for display
    fn base_url(&self) -> &str;

    /// Fetch a single page of a collection.
    async fn get_page(&self, collection: &str, params: &PageParams) -> Result<Page>;

    /// GET a single resource.
    async fn get(&self, path: &str) -> Result<Value>;

    /// GET a resource as raw bytes.
    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>>;

    /// POST a JSON body, returning the parsed response.
    async fn post(&self, path: &str, body: &Value) -> Result<Value>;

    /// PUT a JSON body to `path/id`.
    async fn put(&self, path: &str, id: &str, body: &Value) -> Result<Value>;

    /// PUT a JSON body to a collection-level endpoint such as a `bulk` path.
    async fn put_bulk(&self, path: &str, body: &Value) -> Result<Value>;

    /// DELETE `path/id`.
    async fn delete(&self, path: &str, id: &str) -> Result<()>;

    /// POST a multipart form with one file.
    async fn post_multipart(&self, path: &str, upload: FileUpload) -> Result<Value>;

    /// Fetch every item of a collection, following pages from 0 until the
    /// reported page count is reached.
    async fn get_all_filtered(&self, collection: &str, params: PageParams) -> Result<Vec<Value>> {
        let mut params = params;
        let mut items = Vec::new();
        loop {
            let page = self.get_page(collection, &params).await?;
            let more = page.has_next_page();
            items.extend(page.into_items());
            if !more {
                break;
            }
            params = params.next();
        }
        debug!("Fetched {} items from {}", items.len(), collection);
        Ok(items)
    }

    /// Fetch every item of a collection.
    async fn get_all(&self, collection: &str, page_size: usize) -> Result<Vec<Value>> {
        self.get_all_filtered(collection, PageParams::new(page_size))
            .await
    }
}

/// Parse raw items into a typed model, failing on the first malformed item.
pub fn parse_items<T: DeserializeOwned>(collection: &str, items: Vec<Value>) -> Result<Vec<T>> {
    items
        .into_iter()
        .map(|item| parse_item(collection, item))
        .collect()
}

/// Parse one response body into a typed model.
pub fn parse_item<T: DeserializeOwned>(context: &str, item: Value) -> Result<T> {
    serde_json::from_value(item).map_err(|e| {
        ApiError::InvalidResponse(format!("Unexpected {} item: {}", context, e)).into()
    })
}

/// List a whole collection as typed entities.
pub async fn list<T: VendorEntity>(api: &dyn TenantApi, page_size: usize) -> Result<Vec<T>> {
    let items = api.get_all(T::COLLECTION, page_size).await?;
    parse_items(T::COLLECTION, items)
}

/// List a nested collection (e.g. a library's risk patterns) as typed items.
pub async fn list_at<T: DeserializeOwned>(
    api: &dyn TenantApi,
    path: &str,
    page_size: usize,
) -> Result<Vec<T>> {
    let items = api.get_all(path, page_size).await?;
    parse_items(path, items)
}

/// Read the `id` of a created entity from a POST response.
pub fn created_id(response: &Value) -> Result<String> {
    response
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::InvalidResponse("Created entity has no 'id' field".to_string()).into()
        })
}
