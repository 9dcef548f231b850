use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::path::Path;

/// Project with a `shop` source and a `warehouse` destination, both SQLite
fn setup_project(dir: &Path) {
    cargo_bin_cmd!("teleport")
        .args(["init", dir.to_str().unwrap(), "--name", "cli-test"])
        .assert()
        .success();

    std::fs::remove_file(dir.join("databases/example.yaml")).unwrap();
    for source in ["shop", "warehouse"] {
        std::fs::write(
            dir.join(format!("databases/{source}.yaml")),
            format!("url: \"sqlite://{}\"\n", dir.join(format!("{source}.db")).display()),
        )
        .unwrap();
    }
}

fn teleport(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("teleport");
    cmd.args(["--config", dir.to_str().unwrap()]);
    cmd
}

#[test]
fn test_help_lists_commands() {
    cargo_bin_cmd!("teleport")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract-load"))
        .stdout(predicate::str::contains("describe-table"));
}

#[test]
fn test_init_then_validate() {
    let dir = tempfile::tempdir().unwrap();

    cargo_bin_cmd!("teleport")
        .args(["init", dir.path().to_str().unwrap()])
        .assert()
        .success();

    assert!(dir.path().join("teleport.yaml").exists());
    assert!(dir.path().join("databases/example.yaml").exists());

    teleport(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_validate_rejects_bad_strategy() {
    let dir = tempfile::tempdir().unwrap();
    setup_project(dir.path());
    std::fs::write(
        dir.path().join("databases/shop.yaml"),
        "url: sqlite://shop.db\ntables:\n  widgets:\n    load_strategy:\n      strategy: incremental\n",
    )
    .unwrap();

    teleport(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("primary_key"));
}

#[test]
fn test_extract_load_describe_and_drop() {
    let dir = tempfile::tempdir().unwrap();
    setup_project(dir.path());

    // Seed the source through a CSV load into a table created from a descriptor
    std::fs::write(
        dir.path().join("widgets.yaml"),
        "source: raw\nname: widgets\ncolumns:\n  - name: id\n    data_type: INTEGER\n    options: { BYTES: 8, NULLABLE: 0 }\n  - name: name\n    data_type: STRING\n    options: { LENGTH: 20 }\n",
    )
    .unwrap();
    teleport(dir.path())
        .args(["create-destination-table", "--to", "shop", "--file"])
        .arg(dir.path().join("widgets.yaml"))
        .assert()
        .success()
        .stdout("raw_widgets\n");

    std::fs::write(dir.path().join("widgets.csv"), "id,name\n1,a\n2,b\n3,c\n").unwrap();
    teleport(dir.path())
        .args(["load-csv", "--to", "shop", "--table", "raw_widgets", "--file"])
        .arg(dir.path().join("widgets.csv"))
        .assert()
        .success()
        .stdout("3 rows\n");

    teleport(dir.path())
        .args(["extract-load", "--from", "shop", "--to", "warehouse", "--table", "raw_widgets"])
        .assert()
        .success()
        .stdout("3 rows\n");

    teleport(dir.path())
        .args(["list-tables", "--from", "warehouse"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shop_raw_widgets"));

    teleport(dir.path())
        .args(["describe-table", "--from", "warehouse", "--table", "shop_raw_widgets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Table: shop_raw_widgets"))
        .stdout(predicate::str::contains("id | INTEGER ( BYTES: 8, NULLABLE: 0 )"));

    teleport(dir.path())
        .args(["table-metadata", "--from", "warehouse", "--table", "shop_raw_widgets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data_type: STRING"));

    teleport(dir.path())
        .args(["drop-table", "--from", "warehouse", "--table", "shop_raw_widgets"])
        .assert()
        .success();

    teleport(dir.path())
        .args(["drop-table", "--from", "warehouse", "--table", "shop_raw_widgets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_extract_prints_csv_path() {
    let dir = tempfile::tempdir().unwrap();
    setup_project(dir.path());
    std::fs::write(
        dir.path().join("widgets.yaml"),
        "source: raw\nname: widgets\ncolumns:\n  - name: id\n    data_type: INTEGER\n",
    )
    .unwrap();
    teleport(dir.path())
        .args(["create-destination-table", "--to", "shop", "--file"])
        .arg(dir.path().join("widgets.yaml"))
        .assert()
        .success();

    let output = teleport(dir.path())
        .args(["extract", "--from", "shop", "--table", "raw_widgets"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let path = String::from_utf8(output.stdout).unwrap();
    let path = Path::new(path.trim());
    assert!(path.starts_with(dir.path().join("tmp")));
    assert_eq!(std::fs::read_to_string(path).unwrap(), "id\n");
}

#[test]
fn test_about_db() {
    let dir = tempfile::tempdir().unwrap();
    setup_project(dir.path());

    teleport(dir.path())
        .args(["about-db", "--from", "shop"])
        .assert()
        .success()
        .stdout("Name: shop\nType: SQLite\n");
}

#[test]
fn test_unknown_source_fails() {
    let dir = tempfile::tempdir().unwrap();
    setup_project(dir.path());

    teleport(dir.path())
        .args(["list-tables", "--from", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown database 'nowhere'"));
}
