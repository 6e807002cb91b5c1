//! Shared setup for CLI integration tests.

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use rusqlite::Connection;
use tempfile::{tempdir, TempDir};

fn campus_sql() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures/campus.sql");
    fs::read_to_string(path).expect("campus fixture present")
}

/// Create `<data-dir>/projects/campus/map.db` from the campus fixture.
pub fn campus_data_dir() -> TempDir {
    let temp_dir = tempdir().expect("create temp dir");
    let project_dir = temp_dir.path().join("projects").join("campus");
    fs::create_dir_all(&project_dir).expect("create project dir");
    let connection = Connection::open(project_dir.join("map.db")).expect("open fixture db");
    connection
        .execute_batch(&campus_sql())
        .expect("apply fixture sql");
    temp_dir
}

/// Command with logging and colors turned off and project selection
/// environment cleared.
pub fn cli() -> Command {
    let mut cmd = cargo_bin_cmd!("indoornav-cli");
    cmd.env("RUST_LOG", "error")
        .env("NO_COLOR", "1")
        .env_remove("INDOORNAV_PROJECT")
        .env_remove("INDOORNAV_DATA_DIR")
        .env_remove("INDOORNAV_ROUTE_ONLY");
    cmd
}

/// Command bound to the campus project in a fresh data directory.
pub fn prepare_command() -> (Command, TempDir) {
    let temp_dir = campus_data_dir();
    let mut cmd = cli();
    cmd.arg("--project")
        .arg("campus")
        .arg("--data-dir")
        .arg(temp_dir.path());
    (cmd, temp_dir)
}
