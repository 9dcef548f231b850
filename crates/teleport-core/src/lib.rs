//! Teleport Core Library
//!
//! This crate provides the core functionality for Teleport:
//! - Schema translation between generic column types and SQL dialects
//! - Table inspection and destination DDL generation
//! - Streaming extraction through transforms into CSV
//! - Strategy-aware loading (full, incremental, modified-only)
//! - Sequential workflows with a shared row counter
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌──────────┐   ┌─────────────┐
//! │  source  │──▶│ Inspector │──▶│ Extractor │──▶│   CSV    │──▶│   Loader    │
//! │ database │   │ (dialect) │   │ transforms│   │   file   │   │ destination │
//! └──────────┘   └───────────┘   └───────────┘   └──────────┘   └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use teleport_core::{Config, Session, pipeline};
//!
//! let config = Config::load("./my-project")?;
//! let mut session = Session::from_config(&config, false)?;
//! let rows = pipeline::extract_load(&mut session, "shop", "warehouse", "widgets").await?;
//! println!("Loaded {rows} rows");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod connections;
pub mod csv_codec;
pub mod database;
pub mod dialect;
pub mod endpoint;
pub mod error;
pub mod extractor;
pub mod inspect;
pub mod loader;
pub mod pipeline;
pub mod schema;
pub mod script;
pub mod strategy;
pub mod table_extract;
pub mod transform;
pub mod value;
pub mod workflow;

pub use config::{Config, DatabaseConfig, ProjectConfig};
pub use connections::Connections;
pub use database::{Database, SqlDatabase};
pub use dialect::{Dialect, DialectKind};
pub use error::{Error, Result};
pub use pipeline::Session;
pub use schema::{Column, ColumnOption, DataType, Table};
pub use strategy::{LoadOptions, LoadStrategy};
pub use table_extract::TableExtract;
pub use value::Value;
pub use workflow::{RowCounter, Workflow};
