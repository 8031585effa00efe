//! In-memory tenant for testing
//!
//! Holds collections keyed by path and behaves like a small REST store:
//! POST appends with a generated id, PUT merges into the stored entity, and
//! GET of `collection/id` returns the stored item. Every call is captured.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{FileUpload, Page, PageMeta, PageParams, TenantApi};
use crate::error::{ApiError, Result};

/// Mock tenant for testing.
///
/// # Example
/// ```ignore
/// let mock = MockTenant::new()
///     .with_collection("business-units", vec![json!({"id": "d1", "referenceId": "bu-1"})])
///     .await;
///
/// let items = mock.get_all("business-units", 2000).await?;
/// assert_eq!(items.len(), 1);
/// ```
pub struct MockTenant {
    base_url: String,
    /// Items per collection path
    collections: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    /// Raw bodies returned by get_bytes
    bytes: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    /// Persistent failures keyed by (method, path)
    failures: Arc<Mutex<HashMap<(String, String), u16>>>,
    /// Error to return (if any) - consumed on first use
    error: Arc<Mutex<Option<ApiError>>>,
    /// Page requests per collection
    page_requests: Arc<Mutex<HashMap<String, usize>>>,
    /// Captured requests for test assertions
    captured_requests: Arc<Mutex<Vec<CapturedRequest>>>,
    next_id: Arc<Mutex<usize>>,
}

impl Default for MockTenant {
    fn default() -> Self {
        Self {
            base_url: "https://mock.iriusrisk.com".to_string(),
            collections: Arc::new(Mutex::new(HashMap::new())),
            bytes: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            error: Arc::new(Mutex::new(None)),
            page_requests: Arc::new(Mutex::new(HashMap::new())),
            captured_requests: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(0)),
        }
    }
}

/// A captured API request for test assertions.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// HTTP method
    pub method: String,
    /// Path relative to `/api/v2/`, including the id for PUT and DELETE
    pub path: String,
    /// JSON body, or the text fields of a multipart upload
    pub body: Option<Value>,
    /// Page number for collection reads
    pub page: Option<usize>,
    /// Filter expression for collection reads
    pub filter: Option<String>,
}

impl CapturedRequest {
    pub fn is_mutation(&self) -> bool {
        self.method != "GET"
    }
}

impl MockTenant {
    /// Create a new, empty mock tenant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the items of a collection.
    pub async fn with_collection(self, path: &str, items: Vec<Value>) -> Self {
        self.collections
            .lock()
            .await
            .insert(path.to_string(), items);
        self
    }

    /// Configure a raw body for get_bytes.
    pub async fn with_bytes(self, path: &str, bytes: &[u8]) -> Self {
        self.bytes
            .lock()
            .await
            .insert(path.to_string(), bytes.to_vec());
        self
    }

    /// Make every `method` request to `path` fail with `status`.
    pub async fn fail_on(self, method: &str, path: &str, status: u16) -> Self {
        self.failures
            .lock()
            .await
            .insert((method.to_string(), path.to_string()), status);
        self
    }

    /// Configure an error to return on the next API call.
    /// The error is consumed after one use.
    pub async fn with_error(self, error: ApiError) -> Self {
        *self.error.lock().await = Some(error);
        self
    }

    /// Snapshot of a collection.
    pub async fn collection(&self, path: &str) -> Vec<Value> {
        self.collections
            .lock()
            .await
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of page requests made against a collection.
    pub async fn page_requests(&self, path: &str) -> usize {
        self.page_requests
            .lock()
            .await
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Get all captured requests for test assertions.
    pub async fn captured_requests(&self) -> Vec<CapturedRequest> {
        self.captured_requests.lock().await.clone()
    }

    /// Captured POST, PUT and DELETE requests.
    pub async fn mutations(&self) -> Vec<CapturedRequest> {
        self.captured_requests
            .lock()
            .await
            .iter()
            .filter(|r| r.is_mutation())
            .cloned()
            .collect()
    }

    async fn capture(&self, method: &str, path: &str, body: Option<Value>) {
        self.captured_requests.lock().await.push(CapturedRequest {
            method: method.to_string(),
            path: path.to_string(),
            body,
            page: None,
            filter: None,
        });
    }

    /// Consume a pending one-shot error, then check configured failures.
    async fn check_error(&self, method: &str, path: &str) -> Result<()> {
        if let Some(e) = self.error.lock().await.take() {
            return Err(e.into());
        }

        let failures = self.failures.lock().await;
        if let Some(status) = failures.get(&(method.to_string(), path.to_string())) {
            return Err(ApiError::Http {
                status: *status,
                body: format!("mock failure for {} {}", method, path),
            }
            .into());
        }

        Ok(())
    }

    async fn generate_id(&self) -> String {
        let mut next = self.next_id.lock().await;
        *next += 1;
        format!("new-{}", next)
    }

    fn not_found(path: &str) -> crate::error::Error {
        ApiError::Http {
            status: 404,
            body: format!("{} not found", path),
        }
        .into()
    }

    /// Store a new entity built from `fields` under `collection`.
    async fn create(&self, collection: &str, fields: Map<String, Value>) -> Value {
        let mut entity = fields;
        entity.insert("id".to_string(), Value::String(self.generate_id().await));
        let entity = Value::Object(entity);

        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(entity.clone());
        entity
    }
}

fn has_id(item: &Value, id: &str) -> bool {
    item.get("id").and_then(Value::as_str) == Some(id)
}

#[async_trait]
impl TenantApi for MockTenant {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_page(&self, collection: &str, params: &PageParams) -> Result<Page> {
        self.captured_requests.lock().await.push(CapturedRequest {
            method: "GET".to_string(),
            path: collection.to_string(),
            body: None,
            page: Some(params.page),
            filter: params.filter.clone(),
        });
        *self
            .page_requests
            .lock()
            .await
            .entry(collection.to_string())
            .or_default() += 1;
        self.check_error("GET", collection).await?;

        let items = self.collection(collection).await;
        let total = items.len();
        let total_pages = total.div_ceil(params.size);
        let page_items = items
            .into_iter()
            .skip(params.page * params.size)
            .take(params.size)
            .collect();

        Ok(Page::new(
            page_items,
            Some(PageMeta {
                number: params.page,
                size: params.size,
                total_pages,
                total_elements: total,
            }),
        ))
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.capture("GET", path, None).await;
        self.check_error("GET", path).await?;

        let (collection, id) = path.rsplit_once('/').ok_or_else(|| Self::not_found(path))?;
        self.collection(collection)
            .await
            .into_iter()
            .find(|item| has_id(item, id))
            .ok_or_else(|| Self::not_found(path))
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.capture("GET", path, None).await;
        self.check_error("GET", path).await?;

        self.bytes
            .lock()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.capture("POST", path, Some(body.clone())).await;
        self.check_error("POST", path).await?;

        let fields = body.as_object().cloned().unwrap_or_default();
        Ok(self.create(path, fields).await)
    }

    async fn put(&self, path: &str, id: &str, body: &Value) -> Result<Value> {
        let full_path = format!("{}/{}", path, id);
        self.capture("PUT", &full_path, Some(body.clone())).await;
        self.check_error("PUT", &full_path).await?;

        let mut collections = self.collections.lock().await;
        let item = collections
            .get_mut(path)
            .and_then(|items| items.iter_mut().find(|item| has_id(item, id)))
            .ok_or_else(|| Self::not_found(&full_path))?;

        if let (Some(target), Some(update)) = (item.as_object_mut(), body.as_object()) {
            for (key, value) in update {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(item.clone())
    }

    /// Bulk writes replace the collection at `path` when the body is an
    /// array; other bodies are only captured.
    async fn put_bulk(&self, path: &str, body: &Value) -> Result<Value> {
        self.capture("PUT", path, Some(body.clone())).await;
        self.check_error("PUT", path).await?;

        if let Value::Array(items) = body {
            self.collections
                .lock()
                .await
                .insert(path.to_string(), items.clone());
        }
        Ok(body.clone())
    }

    async fn delete(&self, path: &str, id: &str) -> Result<()> {
        let full_path = format!("{}/{}", path, id);
        self.capture("DELETE", &full_path, None).await;
        self.check_error("DELETE", &full_path).await?;

        let mut collections = self.collections.lock().await;
        let items = collections
            .get_mut(path)
            .ok_or_else(|| Self::not_found(&full_path))?;
        let before = items.len();
        items.retain(|item| !has_id(item, id));
        if items.len() == before {
            return Err(Self::not_found(&full_path));
        }
        Ok(())
    }

    /// Imports land in the parent collection (`libraries/import` creates a
    /// `libraries` item) with the text fields as attributes.
    async fn post_multipart(&self, path: &str, upload: FileUpload) -> Result<Value> {
        let mut fields = Map::new();
        fields.insert(upload.field.clone(), Value::String(upload.file_name.clone()));
        for (name, value) in &upload.fields {
            fields.insert(name.clone(), Value::String(value.clone()));
        }
        self.capture("POST", path, Some(Value::Object(fields.clone())))
            .await;
        self.check_error("POST", path).await?;

        fields.remove(&upload.field);
        let collection = path.strip_suffix("/import").unwrap_or(path);
        Ok(self.create(collection, fields).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_post_then_get_round_trips() {
        let mock = MockTenant::new();
        let created = mock
            .post("roles", &json!({"name": "Auditor"}))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let fetched = mock.get(&format!("roles/{}", id)).await.unwrap();
        assert_eq!(fetched["name"], "Auditor");
        assert_eq!(mock.collection("roles").await.len(), 1);
    }

    #[tokio::test]
    async fn test_put_merges_fields() {
        let mock = MockTenant::new()
            .with_collection(
                "roles",
                vec![json!({"id": "r1", "name": "Auditor", "description": "old"})],
            )
            .await;

        mock.put("roles", "r1", &json!({"description": "new"}))
            .await
            .unwrap();

        let item = &mock.collection("roles").await[0];
        assert_eq!(item["name"], "Auditor");
        assert_eq!(item["description"], "new");
    }

    #[tokio::test]
    async fn test_put_bulk_replaces_array_collections() {
        let mock = MockTenant::new();
        mock.put_bulk("roles/r1/custom-field-permissions/bulk", &json!([{"accessLevel": "READ"}]))
            .await
            .unwrap();
        mock.put_bulk("projects/workflow-states", &json!({"workflow": []}))
            .await
            .unwrap();

        let stored = mock.collection("roles/r1/custom-field-permissions/bulk").await;
        assert_eq!(stored.len(), 1);
        assert!(mock.collection("projects/workflow-states").await.is_empty());
        assert_eq!(mock.mutations().await.len(), 2);
    }

    #[tokio::test]
    async fn test_one_shot_error_is_consumed() {
        let mock = MockTenant::new()
            .with_error(ApiError::Unauthorized)
            .await;

        assert!(mock.get_all("roles", 10).await.is_err());
        assert!(mock.get_all("roles", 10).await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_on_is_persistent() {
        let mock = MockTenant::new().fail_on("POST", "roles", 409).await;

        for _ in 0..2 {
            let err = mock.post("roles", &json!({})).await.unwrap_err();
            assert!(matches!(
                err,
                crate::error::Error::Api(ApiError::Http { status: 409, .. })
            ));
        }
        assert_eq!(mock.mutations().await.len(), 2);
    }

    #[tokio::test]
    async fn test_multipart_creates_in_parent_collection() {
        let mock = MockTenant::new();
        let upload = FileUpload {
            field: "file".to_string(),
            file_name: "l1.xml".to_string(),
            mime_type: "application/xml".to_string(),
            bytes: vec![],
            fields: vec![("referenceId".to_string(), "my-lib".to_string())],
        };
        mock.post_multipart("libraries/import", upload).await.unwrap();

        let libs = mock.collection("libraries").await;
        assert_eq!(libs[0]["referenceId"], "my-lib");
        assert!(libs[0].get("file").is_none());
    }
}
