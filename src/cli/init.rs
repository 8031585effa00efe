//! Init command implementation

use colored::Colorize;
use dialoguer::{Input, Password, theme::ColorfulTheme};

use crate::cli::args::GlobalOptions;
use crate::config::{Config, TenantConfig, TenantRole};
use crate::error::Result;

/// Prompt for one tenant, keeping current values when the answer is blank.
fn prompt_tenant(theme: &ColorfulTheme, role: TenantRole, current: &TenantConfig) -> Result<TenantConfig> {
    let mut domain = Input::<String>::with_theme(theme)
        .with_prompt(format!("{} tenant subdomain or URL", role))
        .allow_empty(true);
    if let Some(existing) = &current.domain {
        domain = domain.default(existing.clone());
    }
    let domain = domain.interact_text()?;

    let token_prompt = if current.api_token.is_some() {
        format!("{} API token (blank keeps the current one)", role)
    } else {
        format!("{} API token", role)
    };
    let token = Password::with_theme(theme)
        .with_prompt(token_prompt)
        .allow_empty_password(true)
        .interact()?;

    Ok(merge_answers(current, &domain, &token))
}

/// New tenant settings from prompt answers; blank answers keep `current`.
fn merge_answers(current: &TenantConfig, domain: &str, token: &str) -> TenantConfig {
    let mut tenant = current.clone();
    tenant.override_with(TenantConfig {
        domain: Some(domain.trim().to_string()).filter(|d| !d.is_empty()),
        api_token: Some(token.trim().to_string()).filter(|t| !t.is_empty()),
    });
    tenant
}

/// Run the init command
pub fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}", "Welcome to irsync!".bold().green());
    println!("Let's set up your source and destination tenants.\n");

    let path = Config::resolve_path(opts.config_ref())?;
    let mut config = if path.exists() {
        Config::load_from(&path)?
    } else {
        Config::default()
    };

    let theme = ColorfulTheme::default();
    for role in [TenantRole::Source, TenantRole::Destination] {
        let tenant = prompt_tenant(&theme, role, config.tenant_config(role))?;
        *config.tenant_config_mut(role) = tenant;
        println!();
    }

    config.save_to(&path)?;
    println!("{} Configuration saved to: {}", "✓".green(), path.display());

    for role in [TenantRole::Source, TenantRole::Destination] {
        if let Err(e) = config.tenant(role) {
            println!("{} {}", "⚠".yellow(), e);
        }
    }

    println!("\n{}", "You're all set! Try running:".bold());
    println!("  {} - Show configuration status", "irsync status".cyan());
    println!("  {} - Preview changes", "irsync diff all".cyan());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_answers_keep_current_values() {
        let current = TenantConfig {
            domain: Some("acme".to_string()),
            api_token: Some("old".to_string()),
        };
        assert_eq!(merge_answers(&current, "  ", ""), current);
    }

    #[test]
    fn test_answers_replace_values() {
        let current = TenantConfig {
            domain: Some("acme".to_string()),
            api_token: Some("old".to_string()),
        };
        let merged = merge_answers(&current, "acme-prod ", "new\n");
        assert_eq!(merged.domain.as_deref(), Some("acme-prod"));
        assert_eq!(merged.api_token.as_deref(), Some("new"));
    }
}
