//! Teleport CLI
//!
//! Moves tables between SQL databases: extract to CSV, load under a
//! strategy, and inspect or create tables along the way.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Teleport - extract and load tables between databases
#[derive(Parser)]
#[command(name = "teleport")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory or teleport.yaml path
    #[arg(short, long, default_value = ".")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Extract at most the project's preview_limit rows per table
    #[arg(long)]
    preview: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Teleport project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Validate configuration without connecting
    Validate,

    /// Extract a table into a CSV file
    Extract {
        /// Source name or path to a database file
        #[arg(long)]
        from: String,

        /// Table to extract
        #[arg(long)]
        table: String,
    },

    /// Extract a table and load it into <source>_<table> in the destination
    ExtractLoad {
        /// Source name or path to a database file
        #[arg(long)]
        from: String,

        /// Destination name or path to a database file
        #[arg(long)]
        to: String,

        /// Table to extract
        #[arg(long)]
        table: String,
    },

    /// Load an existing CSV file into a destination table
    LoadCsv {
        /// Destination name or path to a database file
        #[arg(long)]
        to: String,

        /// Destination table
        #[arg(long)]
        table: String,

        /// CSV file with a header row
        #[arg(long)]
        file: PathBuf,

        /// full or incremental
        #[arg(long, default_value = "full")]
        strategy: String,

        /// Primary key for incremental loads
        #[arg(long)]
        primary_key: Option<String>,
    },

    /// List the tables of a database
    ListTables {
        /// Database name or path to a database file
        #[arg(long)]
        from: String,
    },

    /// Drop a table
    DropTable {
        /// Database name or path to a database file
        #[arg(long)]
        from: String,

        /// Table to drop
        #[arg(long)]
        table: String,
    },

    /// Create <source>_<table> in the destination
    CreateDestinationTable {
        /// Source name or path to a database file
        #[arg(long, required_unless_present = "file")]
        from: Option<String>,

        /// Destination name or path to a database file
        #[arg(long)]
        to: String,

        /// Source table to copy the schema of
        #[arg(long, required_unless_present = "file")]
        table: Option<String>,

        /// Table descriptor YAML to create from instead of a live table
        #[arg(long, conflicts_with_all = ["from", "table"])]
        file: Option<PathBuf>,
    },

    /// Print a table's columns
    DescribeTable {
        /// Database name or path to a database file
        #[arg(long)]
        from: String,

        /// Table to describe
        #[arg(long)]
        table: String,
    },

    /// Print a table's descriptor as YAML
    TableMetadata {
        /// Database name or path to a database file
        #[arg(long)]
        from: String,

        /// Table to inspect
        #[arg(long)]
        table: String,
    },

    /// Print a database's name and type
    AboutDb {
        /// Database name or path to a database file
        #[arg(long)]
        from: String,
    },

    /// Open the database's interactive shell
    DbTerminal {
        /// Database name or path to a database file
        #[arg(long)]
        from: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref()).await?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config).await?;
        }
        Commands::Extract { from, table } => {
            commands::extract::extract(&cli.config, cli.preview, &from, &table).await?;
        }
        Commands::ExtractLoad { from, to, table } => {
            commands::extract::extract_load(&cli.config, cli.preview, &from, &to, &table).await?;
        }
        Commands::LoadCsv {
            to,
            table,
            file,
            strategy,
            primary_key,
        } => {
            commands::extract::load_csv(
                &cli.config,
                &to,
                &table,
                &file,
                &strategy,
                primary_key.as_deref(),
            )
            .await?;
        }
        Commands::ListTables { from } => {
            commands::table::list(&cli.config, &from).await?;
        }
        Commands::DropTable { from, table } => {
            commands::table::drop_table(&cli.config, &from, &table).await?;
        }
        Commands::CreateDestinationTable {
            from,
            to,
            table,
            file,
        } => match (file, from, table) {
            (Some(file), _, _) => {
                commands::table::create_from_file(&cli.config, &to, &file).await?;
            }
            (None, Some(from), Some(table)) => {
                commands::table::create_destination(&cli.config, &from, &to, &table).await?;
            }
            _ => anyhow::bail!("create-destination-table needs --file or both --from and --table"),
        },
        Commands::DescribeTable { from, table } => {
            commands::table::describe(&cli.config, &from, &table).await?;
        }
        Commands::TableMetadata { from, table } => {
            commands::table::metadata(&cli.config, &from, &table).await?;
        }
        Commands::AboutDb { from } => {
            commands::database::about(&cli.config, &from)?;
        }
        Commands::DbTerminal { from } => {
            commands::database::terminal(&cli.config, &from)?;
        }
    }

    Ok(())
}
