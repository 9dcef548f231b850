//! Extract and extract-load workflows
//!
//! Each invocation builds a [`Workflow`] over a [`Job`] whose fields are
//! filled in step by step:
//!
//! ```text
//! read configuration ─▶ connect source ─▶ connect destination ─▶ inspect source
//!        ─▶ create destination table ─▶ extract to CSV ─▶ load CSV
//! ```
//!
//! `extract` runs the same steps minus the destination ones.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::connections::Connections;
use crate::database::Database;
use crate::error::{Error, Result};
use crate::extractor::{ExtractOptions, Extractor};
use crate::inspect::{inspect, inspect_with_computed};
use crate::loader::{create_table_if_not_exists, csv_columns, load};
use crate::schema::{Table, destination_table_name};
use crate::script::ScriptEngine;
use crate::strategy::LoadOptions;
use crate::table_extract::TableExtract;
use crate::workflow::{RowCounter, Step, Workflow};

/// Everything one invocation shares between workflows
#[derive(Debug)]
pub struct Session {
    /// Connection cache
    pub connections: Connections,
    /// Expression engine for transforms and computed columns
    pub engine: ScriptEngine,
    /// Where CSV files go and how many rows to take
    pub extract_options: ExtractOptions,
}

impl Session {
    /// A session over an explicit connection cache
    pub fn new(connections: Connections, extract_options: ExtractOptions) -> Self {
        Self {
            connections,
            engine: ScriptEngine::new(),
            extract_options,
        }
    }

    /// A session over every database of a project
    ///
    /// With `preview` on, extraction stops after the project's preview limit.
    pub fn from_config(config: &Config, preview: bool) -> Result<Self> {
        let work_dir = config.work_dir();
        std::fs::create_dir_all(&work_dir)?;
        Ok(Self::new(
            Connections::new(config.load_databases()?),
            ExtractOptions {
                work_dir,
                preview_limit: preview.then_some(config.project.preview_limit),
            },
        ))
    }
}

/// State threaded through the steps of one workflow
pub struct Job<'s> {
    session: &'s mut Session,
    source: String,
    table: String,
    destination: Option<String>,
    extract: Option<TableExtract>,
    source_db: Option<Arc<dyn Database>>,
    destination_db: Option<Arc<dyn Database>>,
    source_table: Option<Table>,
    destination_table: Option<Table>,
    csv: Option<PathBuf>,
}

impl<'s> Job<'s> {
    fn new(session: &'s mut Session, source: &str, table: &str, destination: Option<&str>) -> Self {
        Self {
            session,
            source: source.to_string(),
            table: table.to_string(),
            destination: destination.map(str::to_string),
            extract: None,
            source_db: None,
            destination_db: None,
            source_table: None,
            destination_table: None,
            csv: None,
        }
    }

    /// Name of the destination table, `<source>_<table>`
    pub fn destination_table_name(&self) -> String {
        destination_table_name(&self.source, &self.table)
    }
}

/// The steps of the extract and extract-load workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStep {
    /// Look up and validate the table's extract policy
    ReadConfiguration,
    /// Open the source connection
    ConnectSource,
    /// Open the destination connection
    ConnectDestination,
    /// Inspect the source table and append computed columns
    InspectSource,
    /// Create `<source>_<table>` in the destination if absent
    CreateDestination,
    /// Stream the source table into a CSV file
    Extract,
    /// Apply the CSV file to the destination table
    Load,
}

impl JobStep {
    fn label(self) -> &'static str {
        match self {
            Self::ReadConfiguration => "read configuration",
            Self::ConnectSource => "connect source",
            Self::ConnectDestination => "connect destination",
            Self::InspectSource => "inspect source table",
            Self::CreateDestination => "create destination table",
            Self::Extract => "extract",
            Self::Load => "load",
        }
    }

    fn missing(self, missing: &'static str) -> Error {
        Error::MissingStepInput {
            step: self.label(),
            missing,
        }
    }
}

fn required<T>(value: Option<T>, step: JobStep, missing: &'static str) -> Result<T> {
    value.ok_or_else(|| step.missing(missing))
}

#[async_trait]
impl<'s> Step<Job<'s>> for JobStep {
    fn name(&self) -> &str {
        self.label()
    }

    async fn run(&self, job: &mut Job<'s>, rows: &RowCounter) -> Result<()> {
        let step = *self;
        match step {
            JobStep::ReadConfiguration => {
                let extract = job
                    .session
                    .connections
                    .config(&job.source)?
                    .table_extract(&job.table);
                extract.validate(&job.session.engine)?;
                job.extract = Some(extract);
            }
            JobStep::ConnectSource => {
                job.source_db = Some(job.session.connections.connect(&job.source).await?);
            }
            JobStep::ConnectDestination => {
                let destination = required(job.destination.clone(), step, "destination")?;
                job.destination_db = Some(job.session.connections.connect(&destination).await?);
            }
            JobStep::InspectSource => {
                let db = required(job.source_db.as_deref(), step, "source connection")?;
                let extract = required(job.extract.as_ref(), step, "table configuration")?;
                job.source_table =
                    Some(inspect_with_computed(db, &job.table, &extract.computed_columns).await?);
            }
            JobStep::CreateDestination => {
                let name = job.destination_table_name();
                let db = required(job.destination_db.as_deref(), step, "destination connection")?;
                let source = required(job.source_table.as_ref(), step, "source table")?;
                job.destination_table = Some(create_table_if_not_exists(db, &name, source).await?);
            }
            JobStep::Extract => {
                let db = required(job.source_db.as_deref(), step, "source connection")?;
                let extract = required(job.extract.as_ref(), step, "table configuration")?;
                let table = required(job.source_table.as_ref(), step, "source table")?;
                let extractor = Extractor::new(
                    db,
                    &job.session.engine,
                    rows,
                    &job.session.extract_options,
                );
                let csv = extractor
                    .extract_source(table, job.destination_table.as_ref(), extract)
                    .await?;
                job.csv = Some(csv);
            }
            JobStep::Load => {
                let db = required(job.destination_db.as_deref(), step, "destination connection")?;
                let extract = required(job.extract.as_ref(), step, "table configuration")?;
                let destination = required(job.destination_table.as_ref(), step, "destination table")?;
                let csv = required(job.csv.as_deref(), step, "CSV file")?;
                let columns = csv_columns(csv, destination)?;
                load(db, destination, &columns, csv, &extract.load_options).await?;
            }
        }
        Ok(())
    }
}

/// Extract `table` from `source` and load it into `<source>_<table>` in
/// `destination`, returning the number of extracted rows
pub async fn extract_load(
    session: &mut Session,
    source: &str,
    destination: &str,
    table: &str,
) -> Result<u64> {
    tracing::info!(from = source, to = destination, table, "Starting extract-load");
    let mut workflow = Workflow::new()
        .step(JobStep::ReadConfiguration)
        .step(JobStep::ConnectSource)
        .step(JobStep::ConnectDestination)
        .step(JobStep::InspectSource)
        .step(JobStep::CreateDestination)
        .step(JobStep::Extract)
        .step(JobStep::Load);

    let mut job = Job::new(session, source, table, Some(destination));
    workflow
        .run(&mut job, |rows| {
            tracing::info!(from = source, to = destination, table, rows, "Completed extract-load");
        })
        .await
}

/// Extract `table` from `source` into a CSV file, returning its path and
/// the number of extracted rows
pub async fn extract(session: &mut Session, source: &str, table: &str) -> Result<(PathBuf, u64)> {
    tracing::info!(from = source, table, "Starting extract");
    let mut workflow = Workflow::new()
        .step(JobStep::ReadConfiguration)
        .step(JobStep::ConnectSource)
        .step(JobStep::InspectSource)
        .step(JobStep::Extract);

    let mut job = Job::new(session, source, table, None);
    let rows = workflow.run(&mut job, |_| {}).await?;
    let path = required(job.csv.take(), JobStep::Extract, "CSV file")?;
    tracing::info!(from = source, table, file = %path.display(), rows, "Completed extract");
    Ok((path, rows))
}

/// Load an existing CSV file into `table` of `destination`
pub async fn load_csv(
    session: &mut Session,
    destination: &str,
    table: &str,
    csv: &Path,
    options: &LoadOptions,
) -> Result<u64> {
    options.validate()?;
    let db = session.connections.connect(destination).await?;
    let target = inspect(db.as_ref(), table).await?;
    let columns = csv_columns(csv, &target)?;
    load(db.as_ref(), &target, &columns, csv, options).await
}

/// Inspect `table` in `source` and create `<source>_<table>` in
/// `destination` unless it exists
pub async fn create_destination_table(
    session: &mut Session,
    source: &str,
    destination: &str,
    table: &str,
) -> Result<Table> {
    let extract = session.connections.config(source)?.table_extract(table);
    extract.validate(&session.engine)?;
    let source_db = session.connections.connect(source).await?;
    let destination_db = session.connections.connect(destination).await?;
    let inspected = inspect_with_computed(source_db.as_ref(), table, &extract.computed_columns).await?;
    create_table_if_not_exists(
        destination_db.as_ref(),
        &destination_table_name(source, table),
        &inspected,
    )
    .await
}

/// Create `<table.source>_<table.name>` in `destination` from a descriptor
pub async fn create_destination_table_from(
    session: &mut Session,
    destination: &str,
    table: &Table,
) -> Result<Table> {
    table.validate()?;
    let db = session.connections.connect(destination).await?;
    create_table_if_not_exists(
        db.as_ref(),
        &destination_table_name(&table.source, &table.name),
        table,
    )
    .await
}
