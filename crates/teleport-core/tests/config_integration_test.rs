//! Integration tests for project configuration loading
//!
//! Tests use temporary directories with real file fixtures to verify:
//! - Project config defaults
//! - Database files with per-table extract policies
//! - Environment expansion in URLs and endpoint headers
//! - Endpoint error handling policies
//! - Validation errors surfacing before any I/O

use tempfile::TempDir;
use teleport_core::endpoint::{ErrorClass, ExitPolicy, HttpMethod};
use teleport_core::script::ScriptEngine;
use teleport_core::{Config, DataType, DialectKind, Error, LoadStrategy};

/// Helper to create a temporary project directory with standard structure.
///
/// Returns a `TempDir` that automatically cleans up when dropped.
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("databases")).unwrap();
    std::fs::create_dir_all(dir.path().join("apis")).unwrap();
    std::fs::write(dir.path().join("teleport.yaml"), "name: integration-test\n").unwrap();
    dir
}

// =============================================================================
// Project Tests
// =============================================================================

#[test]
fn test_project_defaults() {
    let dir = setup_project();
    let config = Config::load(dir.path()).unwrap();

    assert_eq!(config.project.name, "integration-test");
    assert_eq!(config.project.version, "0.1.0");
    assert_eq!(config.project.preview_limit, 100);
    assert_eq!(config.work_dir(), std::env::temp_dir());
}

#[test]
fn test_load_from_file_path() {
    let dir = setup_project();
    let config = Config::load(dir.path().join("teleport.yaml")).unwrap();
    assert_eq!(config.base_path, dir.path());
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    let result = Config::load(dir.path());
    assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
}

// =============================================================================
// Database Tests
// =============================================================================

#[test]
fn test_database_with_table_policies() {
    let dir = setup_project();
    std::fs::write(
        dir.path().join("databases/crm.yaml"),
        r#"
url: "postgres://${TELEPORT_TEST_UNSET_USER}@db.internal/crm"
tables:
  people:
    load_strategy:
      strategy: modified_only
      primary_key: id
      modified_at_column: updated_at
      go_back_hours: 36
    transforms:
      email: ["value | lower", "value | trim"]
    computed_columns:
      - name: email_hash
        data_type: STRING
        options: { LENGTH: 64 }
        function: "email | sha256"
"#,
    )
    .unwrap();

    let config = Config::load(dir.path()).unwrap();
    let (source, crm) = config.resolve_source("crm").unwrap();

    assert_eq!(source, "crm");
    assert_eq!(crm.url, "postgres://@db.internal/crm");
    assert_eq!(crm.dialect_kind().unwrap(), DialectKind::Postgres);

    let people = crm.table_extract("people");
    assert_eq!(people.load_options.strategy, LoadStrategy::ModifiedOnly);
    assert_eq!(people.load_options.go_back_hours, Some(36));
    assert_eq!(people.column_transforms["email"].len(), 2);
    assert_eq!(people.computed_columns[0].data_type, DataType::String);

    let report = config.validate(&ScriptEngine::new()).unwrap();
    assert_eq!(report.databases, vec!["crm"]);
    assert_eq!(report.tables, 1);
}

#[test]
fn test_explicit_dialect_overrides_scheme() {
    let dir = setup_project();
    std::fs::write(
        dir.path().join("databases/events.yaml"),
        "url: postgres://cluster.example.com:5439/events\ndialect: redshift\n",
    )
    .unwrap();

    let config = Config::load(dir.path()).unwrap();
    let events = config.load_database("events").unwrap();
    assert_eq!(events.dialect_kind().unwrap(), DialectKind::Redshift);
}

#[test]
fn test_unsupported_scheme_is_rejected_at_load() {
    let dir = setup_project();
    std::fs::write(dir.path().join("databases/legacy.yaml"), "url: oracle://db/x\n").unwrap();

    let config = Config::load(dir.path()).unwrap();
    let err = config.load_databases().unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_uncompilable_transform_fails_validation() {
    let dir = setup_project();
    std::fs::write(
        dir.path().join("databases/shop.yaml"),
        "url: sqlite://shop.db\ntables:\n  widgets:\n    transforms:\n      name: [\"value |\"]\n",
    )
    .unwrap();

    let config = Config::load(dir.path()).unwrap();
    let err = config.validate(&ScriptEngine::new()).unwrap_err();
    assert!(err.to_string().contains("name[0]"), "{err}");
}

#[test]
fn test_unknown_policy_field_is_a_parse_error() {
    let dir = setup_project();
    std::fs::write(
        dir.path().join("databases/shop.yaml"),
        "url: sqlite://shop.db\ntables:\n  widgets:\n    strategy: full\n",
    )
    .unwrap();

    let config = Config::load(dir.path()).unwrap();
    assert!(matches!(config.load_database("shop"), Err(Error::ConfigParse(_))));
}

// =============================================================================
// Endpoint Tests
// =============================================================================

#[test]
fn test_endpoint_error_handling() {
    let dir = setup_project();
    std::fs::write(
        dir.path().join("apis/orders.yaml"),
        r#"
url: https://api.example.com/orders
method: post
response_type: csv
headers:
  X-Trace: "${TELEPORT_TEST_UNSET_TRACE}static"
error_handling:
  NetworkError: retry
  Http5XXError: retry(5)
  Http4XXError: fail
"#,
    )
    .unwrap();

    let config = Config::load(dir.path()).unwrap();
    let orders = config.load_endpoint("orders").unwrap();

    assert_eq!(orders.method, HttpMethod::Post);
    assert_eq!(orders.headers["X-Trace"], "static");
    assert_eq!(
        orders.error_handling.policy_for(Some(ErrorClass::NetworkError)),
        ExitPolicy::Retry { max_attempts: 3 }
    );
    assert_eq!(
        orders.error_handling.policy_for(Some(ErrorClass::Http5XXError)),
        ExitPolicy::Retry { max_attempts: 5 }
    );
    assert_eq!(
        orders.error_handling.policy_for(Some(ErrorClass::InvalidBodyError)),
        ExitPolicy::Fail
    );
}

#[test]
fn test_endpoint_unknown_error_class_fails_fast() {
    let dir = setup_project();
    std::fs::write(
        dir.path().join("apis/orders.yaml"),
        "url: https://api.example.com/orders\nerror_handling:\n  TimeoutError: retry\n",
    )
    .unwrap();

    let config = Config::load(dir.path()).unwrap();
    assert!(config.load_endpoint("orders").is_err());
}

#[test]
fn test_endpoint_rejects_non_http_url() {
    let dir = setup_project();
    std::fs::write(dir.path().join("apis/feed.yaml"), "url: ftp://feeds.example.com\n").unwrap();

    let config = Config::load(dir.path()).unwrap();
    assert!(config.load_endpoint("feed").unwrap_err().is_configuration());
}
