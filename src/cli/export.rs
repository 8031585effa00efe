//! Export command implementation

use std::path::{Path, PathBuf};

use colored::Colorize;
use log::info;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, progress};
use crate::client::TenantApi;
use crate::config::TenantRole;
use crate::error::Result;
use crate::output::files::{FileFormat, Sheet, write_sheets};

/// Default file name for a collection path (`custom-fields/types` ->
/// `custom-fields_types`)
fn default_stem(collection: &str) -> String {
    collection.trim_matches('/').replace('/', "_")
}

/// Fetch a whole collection and write it under `dir`.
pub async fn export_collection(
    api: &dyn TenantApi,
    collection: &str,
    page_size: usize,
    dir: &Path,
    stem: &str,
    format: FileFormat,
) -> Result<Vec<PathBuf>> {
    let collection = collection.trim_matches('/');
    let items = api.get_all(collection, page_size).await?;
    info!("Fetched {} item(s) from {}", items.len(), collection);
    write_sheets(dir, stem, format, &[Sheet::new(collection, items)])
}

/// Run the export command
pub async fn run(
    opts: &GlobalOptions,
    collection: &str,
    role: TenantRole,
    format: FileFormat,
    output: Option<&str>,
) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let client = ctx.client(role)?;
    let dir = ctx.output_dir()?;
    let stem = output.map(String::from).unwrap_or_else(|| default_stem(collection));

    let spinner = progress::spinner(format!("Exporting {} from {}", collection, role), false);
    let result = export_collection(&client, collection, ctx.page_size(), &dir, &stem, format).await;
    spinner.finish_and_clear();

    for path in result? {
        println!("{} Wrote {}", "✓".green(), path.display().to_string().cyan());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTenant;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_default_stem() {
        assert_eq!(default_stem("users"), "users");
        assert_eq!(default_stem("/custom-fields/types/"), "custom-fields_types");
    }

    #[tokio::test]
    async fn test_export_writes_flattened_csv() {
        let dir = TempDir::new().unwrap();
        let mock = MockTenant::new()
            .with_collection(
                "users",
                vec![
                    json!({"id": "u1", "username": "ann", "role": {"id": "r1", "name": "Admin"}}),
                    json!({"id": "u2", "username": "bob", "teams": ["a", "b"]}),
                ],
            )
            .await;

        let paths = export_collection(&mock, "users", 2000, dir.path(), "users", FileFormat::Csv)
            .await
            .unwrap();
        let text = std::fs::read_to_string(&paths[0]).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "id,username,role.id,role.name,teams");
        assert_eq!(lines[1], "u1,ann,r1,Admin,");
        assert_eq!(lines[2], "u2,bob,,,\"[\"\"a\"\",\"\"b\"\"]\"");
    }

    #[tokio::test]
    async fn test_export_fetch_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mock = MockTenant::new().fail_on("GET", "users", 500).await;

        let result =
            export_collection(&mock, "users", 2000, dir.path(), "users", FileFormat::Xlsx).await;
        assert!(result.is_err());
        assert!(!dir.path().join("users.xlsx").exists());
    }
}
