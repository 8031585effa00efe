//! Credential sources outside the YAML config file

use std::collections::HashMap;
use std::path::Path;

use super::{TenantConfig, TenantRole};
use crate::error::{ConfigError, Result};

/// Token file used by the standalone report scripts
pub const LEGACY_TOKEN_FILE: &str = "ir/.ir_user_token";

/// Domain file used by the standalone report scripts
pub const LEGACY_DOMAIN_FILE: &str = "ir/ir_instance_domain";

/// Host suffix appended to bare subdomains
const VENDOR_HOST_SUFFIX: &str = "iriusrisk.com";

/// Turn a configured domain into a base URL.
///
/// `acme` becomes `https://acme.iriusrisk.com`; anything with a scheme is used
/// as given, minus trailing slashes.
pub fn resolve_base_url(domain: &str) -> String {
    let domain = domain.trim();
    if domain.contains("://") {
        return domain.trim_end_matches('/').to_string();
    }
    let host = domain.trim_end_matches('/');
    if host.ends_with(VENDOR_HOST_SUFFIX) {
        format!("https://{}", host)
    } else {
        format!("https://{}.{}", host, VENDOR_HOST_SUFFIX)
    }
}

/// Variables read from a `.env` file
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    /// Read `path` if it exists; a missing file yields no variables.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let iter = dotenvy::from_path_iter(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| ConfigError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            vars.insert(key, value);
        }

        Ok(Self { vars })
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            vars: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.vars.get(*k))
            .find(|v| !v.trim().is_empty())
            .cloned()
    }

    /// Tenant settings carried by the file.
    ///
    /// The source tenant uses `API_TOKEN` with `SUBDOMAIN` or
    /// `IRIUSRISK_DOMAIN`; the destination uses the `DEST_` variants.
    pub fn tenant(&self, role: TenantRole) -> TenantConfig {
        match role {
            TenantRole::Source => TenantConfig {
                domain: self.first(&["SUBDOMAIN", "IRIUSRISK_DOMAIN"]),
                api_token: self.first(&["API_TOKEN"]),
            },
            TenantRole::Destination => TenantConfig {
                domain: self.first(&["DEST_SUBDOMAIN", "DEST_IRIUSRISK_DOMAIN"]),
                api_token: self.first(&["DEST_API_TOKEN"]),
            },
        }
    }
}

/// Read the legacy token and domain files under `home`.
///
/// Missing files are skipped. A file that exists but cannot be read is an
/// error, since silently ignoring it would fall through to a confusing
/// "not configured" message.
pub fn read_legacy_files(home: &Path) -> Result<TenantConfig> {
    Ok(TenantConfig {
        domain: read_trimmed(&home.join(LEGACY_DOMAIN_FILE))?,
        api_token: read_trimmed(&home.join(LEGACY_TOKEN_FILE))?,
    })
}

fn read_trimmed(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let trimmed = contents.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}
