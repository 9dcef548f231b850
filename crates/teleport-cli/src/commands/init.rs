//! Initialize a new Teleport project

use anyhow::Result;
use std::fs;
use std::path::Path;
use teleport_core::config::{APIS_DIR, DATABASES_DIR, PROJECT_FILE};

/// Run the init command
pub async fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    // Get absolute path for deriving name
    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    // Check if already initialized
    if project_dir.join(PROJECT_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            PROJECT_FILE
        );
    }

    tracing::info!("Creating new Teleport project: {}", project_name);

    fs::create_dir_all(project_dir.join(DATABASES_DIR))?;
    fs::create_dir_all(project_dir.join(APIS_DIR))?;

    let config = format!(
        r#"# Teleport Project Configuration
name: {project_name}
version: "0.1.0"

# Intermediate CSV files (defaults to the system temp directory)
work_dir: tmp

# Rows per table extracted with --preview
preview_limit: 100
"#
    );
    fs::write(project_dir.join(PROJECT_FILE), config)?;

    // Example source: a local SQLite file
    let example_database = r#"# Connection URL; $VAR and ${VAR} are expanded from the environment
url: "sqlite://example.db"

tables:
  widgets:
    load_strategy:
      strategy: full
    transforms:
      name: ["value | trim"]
"#;
    fs::write(
        project_dir.join(DATABASES_DIR).join("example.yaml"),
        example_database,
    )?;

    let gitignore = r#"# Teleport intermediate files
tmp/

# Local databases
*.db
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!("✓ Project created at {}", project_dir.display());
    println!("\nNext steps:");
    println!("  1. Add databases under {}/", DATABASES_DIR);
    println!("  2. Run: teleport --config {} validate", project_dir.display());

    Ok(())
}
