//! Table commands: list, drop, create, describe, metadata

use anyhow::{Context, Result};
use std::path::Path;
use teleport_core::config::load_table_definition;
use teleport_core::inspect::{inspect, table_exists, table_names};
use teleport_core::{Error, Table, pipeline};

use super::Project;

/// Print every table name, one per line
pub async fn list(config_path: &str, from: &str) -> Result<()> {
    let mut project = Project::load(config_path, false)?;
    let (_, db) = project.connect(from).await?;

    for name in table_names(db.as_ref()).await? {
        println!("{name}");
    }
    Ok(())
}

/// Drop a table after checking it exists
pub async fn drop_table(config_path: &str, from: &str, table: &str) -> Result<()> {
    let mut project = Project::load(config_path, false)?;
    let (source, db) = project.connect(from).await?;

    if !table_exists(db.as_ref(), table).await? {
        return Err(Error::TableNotFound {
            table: table.to_string(),
            source_name: source,
        }
        .into());
    }

    tracing::info!("Dropping table {} in {}", table, source);
    db.execute(&format!("DROP TABLE {}", db.dialect().quote_ident(table)))
        .await
        .with_context(|| format!("Failed to drop '{table}'"))?;
    Ok(())
}

/// Create `<source>_<table>` in the destination from a live source table
pub async fn create_destination(config_path: &str, from: &str, to: &str, table: &str) -> Result<()> {
    let mut project = Project::load(config_path, false)?;
    let source = project.source(from)?;
    let destination = project.source(to)?;

    let created = pipeline::create_destination_table(&mut project.session, &source, &destination, table)
        .await
        .with_context(|| format!("Failed to create destination table for '{table}'"))?;

    println!("{}", created.name);
    Ok(())
}

/// Create `<source>_<name>` in the destination from a table descriptor file
pub async fn create_from_file(config_path: &str, to: &str, file: &Path) -> Result<()> {
    let mut project = Project::load(config_path, false)?;
    let destination = project.source(to)?;
    let table = load_table_definition(file)
        .with_context(|| format!("Failed to read table descriptor {}", file.display()))?;

    let created = pipeline::create_destination_table_from(&mut project.session, &destination, &table)
        .await
        .with_context(|| format!("Failed to create destination table for '{}'", table.name))?;

    println!("{}", created.name);
    Ok(())
}

/// Print the source, table name and one line per column
pub async fn describe(config_path: &str, from: &str, table: &str) -> Result<()> {
    let mut project = Project::load(config_path, false)?;
    let (_, db) = project.connect(from).await?;
    let table = inspect(db.as_ref(), table).await?;

    print!("{}", describe_text(&table));
    Ok(())
}

/// Print the inspected table as YAML
pub async fn metadata(config_path: &str, from: &str, table: &str) -> Result<()> {
    let mut project = Project::load(config_path, false)?;
    let (_, db) = project.connect(from).await?;
    let table = inspect(db.as_ref(), table).await?;

    print!("{}", serde_yaml::to_string(&table)?);
    Ok(())
}

fn describe_text(table: &Table) -> String {
    let mut out = format!(
        "Source: {}\nTable: {}\n\nColumns:\n========\n",
        table.source, table.name
    );
    for column in &table.columns {
        out.push_str(&format!("{} | {}", column.name, column.data_type));
        if !column.options.is_empty() {
            let options: Vec<String> = column
                .options
                .iter()
                .map(|(option, value)| format!("{option}: {value}"))
                .collect();
            out.push_str(&format!(" ( {} )", options.join(", ")));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use teleport_core::{Column, ColumnOption, DataType};

    #[test]
    fn test_describe_text() {
        let table = Table::new(
            "shop",
            "widgets",
            vec![
                Column::new("id", DataType::Integer)
                    .with_option(ColumnOption::Bytes, 8)
                    .with_option(ColumnOption::Nullable, 0),
                Column::new("name", DataType::Text),
            ],
        );
        assert_eq!(
            describe_text(&table),
            "Source: shop\nTable: widgets\n\nColumns:\n========\n\
             id | INTEGER ( BYTES: 8, NULLABLE: 0 )\n\
             name | TEXT\n"
        );
    }
}
