//! Command execution context
//!
//! Loads and layers configuration once per command and builds tenant clients
//! on demand, so handlers never repeat the config plumbing.

use std::path::{Path, PathBuf};

use log::debug;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::{IriusClient, TenantApi};
use crate::config::credentials::EnvVars;
use crate::config::{Config, TenantRole};
use crate::error::Result;
use crate::sync::{DuplicateKeys, SyncOptions};

/// `.env` file read from the working directory
const DOTENV_FILE: &str = ".env";

/// Context for command execution containing the layered config and runtime
/// options.
pub struct CommandContext {
    /// Configuration with every layer applied
    pub config: Config,
    /// Console output format
    pub format: OutputFormat,
}

impl CommandContext {
    /// Load configuration with every layer applied.
    ///
    /// Flags and `IRSYNC_*` variables win over the config file, which wins
    /// over `.env` in the working directory, which wins over the legacy
    /// `~/ir` credential files.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = Config::load_at(opts.config_ref())?;
        let env = EnvVars::from_path(Path::new(DOTENV_FILE))?;
        let home = dirs::home_dir();
        let config = layer(config, opts, &env, home.as_deref())?;

        Ok(Self {
            config,
            format: opts.format,
        })
    }

    /// Build a client for one tenant.
    ///
    /// # Errors
    /// Returns `MissingDomain`/`MissingToken` naming the tenant when its
    /// credentials are not configured in any layer.
    pub fn client(&self, role: TenantRole) -> Result<IriusClient> {
        let tenant = self.config.tenant(role)?;
        let client = IriusClient::new(&tenant, &self.config.preferences)?;
        debug!("Using {} tenant at {}", role, client.base_url());
        Ok(client)
    }

    /// Directory for exports and reports
    pub fn output_dir(&self) -> Result<PathBuf> {
        self.config.output_dir()
    }

    pub fn page_size(&self) -> usize {
        self.config.preferences.page_size
    }

    /// Settings for a sync or diff run
    pub fn sync_options(&self, dry_run: bool, allow_duplicate_keys: bool) -> Result<SyncOptions> {
        Ok(SyncOptions {
            page_size: self.page_size(),
            duplicate_keys: if allow_duplicate_keys {
                DuplicateKeys::Warn
            } else {
                DuplicateKeys::Fail
            },
            dry_run,
            export_dir: self.output_dir()?,
        })
    }
}

/// Apply flag, `.env` and legacy-file layers on top of a loaded config file.
fn layer(
    mut config: Config,
    opts: &GlobalOptions,
    env: &EnvVars,
    home: Option<&Path>,
) -> Result<Config> {
    for role in [TenantRole::Source, TenantRole::Destination] {
        config
            .tenant_config_mut(role)
            .override_with(opts.tenant(role).clone());
    }
    config.apply_env_vars(env);
    if let Some(home) = home {
        config.apply_legacy_files(home)?;
    }

    if let Some(page_size) = opts.page_size {
        config.preferences.page_size = page_size;
    }
    if let Some(dir) = &opts.output_dir {
        config.preferences.output_dir = Some(dir.clone());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TenantConfig;
    use crate::config::credentials::{LEGACY_DOMAIN_FILE, LEGACY_TOKEN_FILE};
    use tempfile::tempdir;

    fn tenant(domain: Option<&str>, token: Option<&str>) -> TenantConfig {
        TenantConfig {
            domain: domain.map(String::from),
            api_token: token.map(String::from),
        }
    }

    fn write_legacy(home: &Path, domain: &str, token: &str) {
        std::fs::create_dir_all(home.join("ir")).unwrap();
        std::fs::write(home.join(LEGACY_DOMAIN_FILE), domain).unwrap();
        std::fs::write(home.join(LEGACY_TOKEN_FILE), token).unwrap();
    }

    #[test]
    fn test_flags_beat_file_beat_env_beat_legacy() {
        let home = tempdir().unwrap();
        write_legacy(home.path(), "legacy-domain", "legacy-token\n");

        let mut file = Config::default();
        file.source = tenant(Some("file-domain"), None);
        file.destination = tenant(None, Some("file-dest-token"));

        let opts = GlobalOptions {
            destination: tenant(None, Some("flag-dest-token")),
            ..GlobalOptions::default()
        };
        let env = EnvVars::from_pairs(&[
            ("API_TOKEN", "env-token"),
            ("SUBDOMAIN", "env-domain"),
            ("DEST_SUBDOMAIN", "env-dest"),
        ]);

        let config = layer(file, &opts, &env, Some(home.path())).unwrap();
        assert_eq!(config.source.domain.as_deref(), Some("file-domain"));
        assert_eq!(config.source.api_token.as_deref(), Some("env-token"));
        assert_eq!(config.destination.domain.as_deref(), Some("env-dest"));
        assert_eq!(
            config.destination.api_token.as_deref(),
            Some("flag-dest-token")
        );
    }

    #[test]
    fn test_legacy_files_only_fill_source() {
        let home = tempdir().unwrap();
        write_legacy(home.path(), "acme", "legacy-token");

        let config = layer(
            Config::default(),
            &GlobalOptions::default(),
            &EnvVars::default(),
            Some(home.path()),
        )
        .unwrap();

        let source = config.tenant(TenantRole::Source).unwrap();
        assert_eq!(source.base_url, "https://acme.iriusrisk.com");
        assert_eq!(source.api_token, "legacy-token");
        assert!(config.tenant(TenantRole::Destination).is_err());
    }

    #[test]
    fn test_preference_overrides() {
        let opts = GlobalOptions {
            page_size: Some(100),
            output_dir: Some(PathBuf::from("/tmp/reports")),
            ..GlobalOptions::default()
        };
        let config = layer(Config::default(), &opts, &EnvVars::default(), None).unwrap();
        assert_eq!(config.preferences.page_size, 100);
        assert_eq!(config.output_dir().unwrap(), PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_sync_options_duplicate_policy() {
        let ctx = CommandContext {
            config: layer(
                Config::default(),
                &GlobalOptions {
                    output_dir: Some(PathBuf::from("out")),
                    ..GlobalOptions::default()
                },
                &EnvVars::default(),
                None,
            )
            .unwrap(),
            format: OutputFormat::Table,
        };

        let options = ctx.sync_options(true, true).unwrap();
        assert!(options.dry_run);
        assert_eq!(options.duplicate_keys, DuplicateKeys::Warn);
        assert_eq!(options.export_dir, PathBuf::from("out"));
        assert_eq!(options.page_size, 2000);

        let strict = ctx.sync_options(false, false).unwrap();
        assert_eq!(strict.duplicate_keys, DuplicateKeys::Fail);
    }

    #[test]
    fn test_client_requires_credentials() {
        let ctx = CommandContext {
            config: Config::default(),
            format: OutputFormat::Table,
        };
        let err = ctx.client(TenantRole::Source).err().unwrap();
        assert!(err.to_string().contains("--source-domain"));
    }
}
