//! IriusRisk REST client implementation

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use serde_json::Value;

use super::rate_limit::RequestPacer;
use super::retry::{RetryPolicy, parse_retry_after};
use super::{FileUpload, Page, PageParams, TenantApi};
use crate::config::{Preferences, Tenant};
use crate::error::{ApiError, Result};

/// Header carrying the API token
const API_TOKEN_HEADER: &str = "api-token";

/// Accept header for collection and entity reads
const HAL_JSON: &str = "application/hal+json";

/// API path prefix
const API_PREFIX: &str = "api/v2";

/// IriusRisk API client for one tenant
pub struct IriusClient {
    http: HttpClient,
    base_url: String,
    api_token: String,
    pacer: RequestPacer,
    retry: RetryPolicy,
}

impl IriusClient {
    /// Create a client for a resolved tenant
    pub fn new(tenant: &Tenant, prefs: &Preferences) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(prefs.timeout())
            .user_agent(concat!("irsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: tenant.base_url.clone(),
            api_token: tenant.api_token.clone(),
            pacer: RequestPacer::from_millis(prefs.request_delay_ms),
            retry: RetryPolicy::from_preferences(prefs),
        })
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            API_PREFIX,
            path.trim_start_matches('/')
        )
    }

    /// GET with retries on throttling, gateway errors and transport failures.
    async fn get_with_retry(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let url = self.url(path);
        let mut attempt = 1;

        loop {
            self.pacer.wait().await;
            debug!("GET {} (attempt {})", url, attempt);

            let result = self
                .http
                .get(&url)
                .header(API_TOKEN_HEADER, &self.api_token)
                .header(ACCEPT, HAL_JSON)
                .query(query)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    debug!("GET {} -> {}", url, status);

                    if self.retry.is_retryable(status.as_u16()) && self.retry.can_retry(attempt) {
                        let delay = self
                            .retry
                            .delay(attempt, retry_after(response.headers()));
                        warn!(
                            "GET {} returned {}, retrying in {:?} ({}/{})",
                            url, status, delay, attempt, self.retry.max_attempts
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    return check_status(response).await;
                }
                Err(err) if is_transient(&err) && self.retry.can_retry(attempt) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "GET {} failed ({}), retrying in {:?} ({}/{})",
                        url, err, delay, attempt, self.retry.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(ApiError::from(err).into()),
            }
        }
    }

    /// Send a mutation once. Mutations are never retried.
    async fn send_once(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        self.pacer.wait().await;
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(API_TOKEN_HEADER, &self.api_token)
            .header(ACCEPT, HAL_JSON);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ApiError::from)?;
        debug!("{} {} -> {}", method, url, response.status());
        let response = check_status(response).await?;
        parse_body(response).await
    }
}

/// Connection-level failures worth another attempt.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn retry_after(headers: &HeaderMap) -> Option<std::time::Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after)
}

/// Map the final response status onto the error model.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized.into());
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<unreadable body>"));
    Err(ApiError::Http {
        status: status.as_u16(),
        body,
    }
    .into())
}

/// Parse a JSON body; an empty body is `null`.
async fn parse_body(response: Response) -> Result<Value> {
    let text = response.text().await.map_err(ApiError::from)?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| {
        ApiError::InvalidResponse(format!("Failed to parse response: {}", e)).into()
    })
}

#[async_trait]
impl TenantApi for IriusClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_page(&self, collection: &str, params: &PageParams) -> Result<Page> {
        let response = self
            .get_with_retry(collection, &params.to_query_params())
            .await?;
        let body = parse_body(response).await?;
        if body.is_null() {
            return Ok(Page::default());
        }
        serde_json::from_value(body).map_err(|e| {
            ApiError::InvalidResponse(format!("Unexpected {} page: {}", collection, e)).into()
        })
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let response = self.get_with_retry(path, &[]).await?;
        parse_body(response).await
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let response = self.get_with_retry(path, &[]).await?;
        let bytes = response.bytes().await.map_err(ApiError::from)?;
        Ok(bytes.to_vec())
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.send_once(Method::POST, path, Some(body)).await
    }

    async fn put(&self, path: &str, id: &str, body: &Value) -> Result<Value> {
        let path = format!("{}/{}", path.trim_end_matches('/'), id);
        self.send_once(Method::PUT, &path, Some(body)).await
    }

    async fn put_bulk(&self, path: &str, body: &Value) -> Result<Value> {
        self.send_once(Method::PUT, path, Some(body)).await
    }

    async fn delete(&self, path: &str, id: &str) -> Result<()> {
        let path = format!("{}/{}", path.trim_end_matches('/'), id);
        self.send_once(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn post_multipart(&self, path: &str, upload: FileUpload) -> Result<Value> {
        self.pacer.wait().await;
        let url = self.url(path);
        debug!("POST {} (multipart {})", url, upload.file_name);

        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)
            .map_err(ApiError::from)?;
        let mut form = Form::new().part(upload.field, part);
        for (name, value) in upload.fields {
            form = form.text(name, value);
        }

        let response = self
            .http
            .post(&url)
            .header(API_TOKEN_HEADER, &self.api_token)
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::from)?;
        debug!("POST {} -> {}", url, response.status());
        let response = check_status(response).await?;
        parse_body(response).await
    }
}
