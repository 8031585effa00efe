//! Tenant status display model

use serde::Serialize;
use tabled::Tabled;

use crate::config::{Config, TenantRole, resolve_base_url};

/// Resolved settings for one tenant; the token itself is never shown.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct TenantDisplay {
    #[tabled(rename = "TENANT")]
    pub tenant: String,

    #[tabled(rename = "URL")]
    pub url: String,

    #[tabled(rename = "TOKEN")]
    pub token: String,
}

impl TenantDisplay {
    pub fn new(config: &Config, role: TenantRole) -> Self {
        let tenant = config.tenant_config(role);
        let url = tenant
            .domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(resolve_base_url)
            .unwrap_or_else(|| "--".to_string());
        let token = match tenant.api_token.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => "configured",
            _ => "missing",
        };
        Self {
            tenant: role.to_string(),
            url,
            token: token.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_display_hides_token() {
        let mut config = Config::default();
        config.source.domain = Some("acme".to_string());
        config.source.api_token = Some("secret-token".to_string());

        let display = TenantDisplay::new(&config, TenantRole::Source);
        assert_eq!(display.tenant, "source");
        assert_eq!(display.url, "https://acme.iriusrisk.com");
        assert_eq!(display.token, "configured");
        assert!(!format!("{:?}", display).contains("secret-token"));
    }

    #[test]
    fn test_tenant_display_missing_values() {
        let display = TenantDisplay::new(&Config::default(), TenantRole::Destination);
        assert_eq!(display.tenant, "destination");
        assert_eq!(display.url, "--");
        assert_eq!(display.token, "missing");
    }
}
