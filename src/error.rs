//! Error types for the irsync CLI

use thiserror::Error;

/// Result type alias for irsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Output(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Output(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Error::Output(err.to_string())
    }
}

impl Error {
    /// True for errors that invalidate the rest of the run.
    ///
    /// A 401 means the token is bad for every remaining call, so batch loops
    /// stop instead of logging the same failure for each item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Api(ApiError::Unauthorized) | Error::Io(_))
    }
}

/// API-related errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(
        "Authentication failed. Check that the API token is valid, the API is enabled in settings, and the user has the required permissions."
    )]
    Unauthorized,

    #[error("Request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration and credential errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(
        "API token for the {0} tenant is not configured. Use --{0}-token, the config file, .env or ~/ir/.ir_user_token."
    )]
    MissingToken(String),

    #[error(
        "Domain for the {0} tenant is not configured. Use --{0}-domain, the config file, .env or ~/ir/ir_instance_domain."
    )]
    MissingDomain(String),

    #[error("Failed to read credential file {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Reconciliation errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Duplicate key '{key}' in {side} {resource}; refusing to reconcile (use --allow-duplicate-keys to continue)")]
    DuplicateKey {
        resource: String,
        side: String,
        key: String,
    },

    #[error("{failed} of {total} {resource} operations failed")]
    ItemsFailed {
        resource: String,
        failed: usize,
        total: usize,
    },

    #[error("Failed to sync {0}")]
    ResourcesFailed(String),
}
