//! Configuration management for irsync
//!
//! Settings are layered, highest precedence first: command-line flags and
//! `IRSYNC_*` variables, the YAML config file, a `.env` file in the working
//! directory, then the legacy `~/ir` credential files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

pub mod credentials;

pub use credentials::resolve_base_url;

/// Which side of a reconciliation a tenant plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantRole {
    Source,
    Destination,
}

impl TenantRole {
    /// Short name used in flags and messages
    pub fn flag_name(&self) -> &'static str {
        match self {
            TenantRole::Source => "source",
            TenantRole::Destination => "dest",
        }
    }
}

impl fmt::Display for TenantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantRole::Source => write!(f, "source"),
            TenantRole::Destination => write!(f, "destination"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tenant that configuration is read from
    #[serde(default)]
    pub source: TenantConfig,

    /// Tenant that configuration is written to
    #[serde(default)]
    pub destination: TenantConfig,

    /// User preferences
    #[serde(default)]
    pub preferences: Preferences,
}

/// Connection settings for one tenant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Subdomain (`acme`) or full base URL (`https://acme.iriusrisk.com`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// API token sent in the `api-token` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl TenantConfig {
    /// Fill unset fields from a lower-precedence layer.
    pub fn fill_from(&mut self, lower: TenantConfig) {
        if self.domain.is_none() {
            self.domain = lower.domain;
        }
        if self.api_token.is_none() {
            self.api_token = lower.api_token;
        }
    }

    /// Replace fields with values from a higher-precedence layer.
    pub fn override_with(&mut self, higher: TenantConfig) {
        if higher.domain.is_some() {
            self.domain = higher.domain;
        }
        if higher.api_token.is_some() {
            self.api_token = higher.api_token;
        }
    }
}

/// Fully resolved tenant connection
#[derive(Debug, Clone)]
pub struct Tenant {
    pub role: TenantRole,
    pub base_url: String,
    pub api_token: String,
}

/// User preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Page size for collection reads
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Directory for exported files (defaults to the home directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Minimum spacing between requests, in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,

    /// Per-request timeout, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts for an idempotent GET, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first GET retry, doubled on each further retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_page_size() -> usize {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            output_dir: None,
            request_delay_ms: 0,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

impl Preferences {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".irsync").join("config.yaml"))
    }

    /// Resolve the config path from an optional override.
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from an explicit path or the default location.
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicitly requested file is an error.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let resolved = Self::resolve_path(path)?;
        if !resolved.exists() {
            if path.is_some() {
                return Err(ConfigError::NotFound(resolved.display().to_string()).into());
            }
            return Ok(Self::default());
        }
        Self::load_from(&resolved)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, contents)?;

        // The file holds API tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Fill unset tenant fields from `.env` variables.
    pub fn apply_env_vars(&mut self, vars: &credentials::EnvVars) {
        self.source.fill_from(vars.tenant(TenantRole::Source));
        self.destination
            .fill_from(vars.tenant(TenantRole::Destination));
    }

    /// Fill unset source fields from the legacy token and domain files.
    pub fn apply_legacy_files(&mut self, home: &Path) -> Result<()> {
        let legacy = credentials::read_legacy_files(home)?;
        self.source.fill_from(legacy);
        Ok(())
    }

    /// Get the settings block for a tenant
    pub fn tenant_config(&self, role: TenantRole) -> &TenantConfig {
        match role {
            TenantRole::Source => &self.source,
            TenantRole::Destination => &self.destination,
        }
    }

    /// Mutable settings block for a tenant
    pub fn tenant_config_mut(&mut self, role: TenantRole) -> &mut TenantConfig {
        match role {
            TenantRole::Source => &mut self.source,
            TenantRole::Destination => &mut self.destination,
        }
    }

    /// Resolve a tenant into a base URL and token, failing on missing values.
    pub fn tenant(&self, role: TenantRole) -> Result<Tenant> {
        let settings = self.tenant_config(role);

        let domain = settings
            .domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ConfigError::MissingDomain(role.flag_name().to_string()))?;
        let api_token = settings
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingToken(role.flag_name().to_string()))?;

        Ok(Tenant {
            role,
            base_url: resolve_base_url(domain),
            api_token: api_token.to_string(),
        })
    }

    /// Directory for exported files
    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.preferences.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir().ok_or_else(|| {
                ConfigError::Invalid("Could not determine home directory".to_string()).into()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.source.domain.is_none());
        assert!(config.destination.api_token.is_none());
        assert_eq!(config.preferences.page_size, 2000);
        assert_eq!(config.preferences.max_attempts, 5);
        assert_eq!(config.preferences.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_yaml_with_partial_preferences() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "source:\n  domain: acme\n  api_token: src-token\npreferences:\n  page_size: 500\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.source.domain.as_deref(), Some("acme"));
        assert!(config.destination.domain.is_none());
        assert_eq!(config.preferences.page_size, 500);
        assert_eq!(config.preferences.initial_backoff_ms, 1000);
    }

    #[test]
    fn test_load_at_missing_explicit_path_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let result = Config::load_at(Some(missing.to_str().unwrap()));
        assert!(matches!(
            result,
            Err(crate::error::Error::Config(ConfigError::NotFound(_)))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.destination.domain = Some("acme-prod".to_string());
        config.destination.api_token = Some("secret".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.destination, config.destination);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_fill_from_keeps_existing_values() {
        let mut tenant = TenantConfig {
            domain: Some("file-domain".to_string()),
            api_token: None,
        };
        tenant.fill_from(TenantConfig {
            domain: Some("env-domain".to_string()),
            api_token: Some("env-token".to_string()),
        });

        assert_eq!(tenant.domain.as_deref(), Some("file-domain"));
        assert_eq!(tenant.api_token.as_deref(), Some("env-token"));
    }

    #[test]
    fn test_override_with_replaces_values() {
        let mut tenant = TenantConfig {
            domain: Some("file-domain".to_string()),
            api_token: Some("file-token".to_string()),
        };
        tenant.override_with(TenantConfig {
            domain: None,
            api_token: Some("flag-token".to_string()),
        });

        assert_eq!(tenant.domain.as_deref(), Some("file-domain"));
        assert_eq!(tenant.api_token.as_deref(), Some("flag-token"));
    }

    #[test]
    fn test_tenant_resolution() {
        let mut config = Config::default();
        config.source.domain = Some("acme".to_string());
        config.source.api_token = Some(" token \n".to_string());

        let tenant = config.tenant(TenantRole::Source).unwrap();
        assert_eq!(tenant.base_url, "https://acme.iriusrisk.com");
        assert_eq!(tenant.api_token, "token");
    }

    #[test]
    fn test_tenant_missing_token() {
        let mut config = Config::default();
        config.destination.domain = Some("acme".to_string());

        let err = config.tenant(TenantRole::Destination).unwrap_err();
        assert!(err.to_string().contains("--dest-token"));
    }

    #[test]
    fn test_tenant_blank_domain_is_missing() {
        let mut config = Config::default();
        config.source.domain = Some("   ".to_string());
        config.source.api_token = Some("t".to_string());

        assert!(matches!(
            config.tenant(TenantRole::Source),
            Err(crate::error::Error::Config(ConfigError::MissingDomain(_)))
        ));
    }
}
