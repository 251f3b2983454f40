//! CLI integration tests for obschema2mysql.
//!
//! These tests verify argument handling, exit codes, and the on-disk
//! results of convert and recovery runs.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

/// Get a command for the obschema2mysql binary.
fn cmd() -> Command {
    Command::cargo_bin("obschema2mysql").unwrap()
}

const BACKUP_DIR_NAME: &str = "_obschema2mysql_";

const OB_TABLE: &str = "CREATE TABLE `orders` (\n\
    \x20\x20`id` bigint(20) NOT NULL AUTO_INCREMENT,\n\
    \x20\x20`note` varchar(255) DEFAULT NULL,\n\
    \x20\x20PRIMARY KEY (`id`),\n\
    \x20\x20KEY `idx_note` (`note`) BLOCK_SIZE 16384\n\
    ) AUTO_INCREMENT = 4 DEFAULT CHARSET = utf8mb4 ROW_FORMAT = DYNAMIC \
    COMPRESSION = 'zstd_1.3.8' REPLICA_NUM = 1 USE_BLOOM_FILTER = FALSE;\n";

const OB_DATABASE: &str = "CREATE DATABASE /*!32312 IF NOT EXISTS*/ `shop` \
    /*!40100 DEFAULT CHARACTER SET utf8mb4 */ REPLICA_NUM = 2 PRIMARY_ZONE = 'zone1';\n";

fn seed_dump(dir: &Path) {
    fs::write(dir.join("orders-schema.sql"), OB_TABLE).unwrap();
    fs::write(dir.join("shop-schema-create.sql"), OB_DATABASE).unwrap();
    fs::write(dir.join("orders.00001.sql"), "INSERT INTO `orders` VALUES (1);\n").unwrap();
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_no_args_shows_help_with_code_1() {
    cmd()
        .assert()
        .code(1) // EC_HELP
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_help_flag_exits_with_code_1() {
    cmd()
        .arg("--help")
        .assert()
        .code(1) // EC_HELP
        .stdout(predicate::str::contains("--convert"))
        .stdout(predicate::str::contains("--recover"))
        .stdout(predicate::str::contains("--max-row-size"))
        .stdout(predicate::str::contains("--report-json"));
}

#[test]
fn test_help_shows_max_row_size_default() {
    cmd()
        .arg("--help")
        .assert()
        .code(1) // EC_HELP
        .stdout(predicate::str::contains("[default: 65500]"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("obschema2mysql"));
}

// =============================================================================
// Exit Code Tests - Argument Errors (Exit Code 2)
// =============================================================================

#[test]
fn test_missing_work_dir_exits_with_code_2() {
    cmd()
        .arg("--convert")
        .assert()
        .code(2) // EC_ARGS
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_extra_positional_exits_with_code_2() {
    cmd()
        .args(["--convert", "dir_a", "dir_b"])
        .assert()
        .code(2); // EC_ARGS
}

#[test]
fn test_unknown_flag_exits_with_code_2() {
    cmd()
        .args(["--frobnicate", "dir"])
        .assert()
        .code(2); // EC_ARGS
}

// =============================================================================
// Exit Code Tests - Mode Flags (Exit Code 3)
// =============================================================================

#[test]
fn test_both_mode_flags_exit_with_code_3() {
    cmd()
        .args(["--convert", "--recover", "dir"])
        .assert()
        .code(3) // EC_FLAGS
        .stderr(predicate::str::contains("exactly one"));
}

#[test]
fn test_no_mode_flag_exits_with_code_3() {
    let work = tempfile::tempdir().unwrap();
    cmd()
        .arg(work.path())
        .assert()
        .code(3) // EC_FLAGS
        .stderr(predicate::str::contains("exactly one"));
}

// =============================================================================
// Exit Code Tests - Work Dir (Exit Code 4)
// =============================================================================

#[test]
fn test_missing_work_dir_path_exits_with_code_4() {
    cmd()
        .args(["--convert", "/definitely/not/a/real/dir"])
        .assert()
        .code(4) // EC_WORKDIR
        .stderr(predicate::str::contains("work dir is not a directory"));
}

#[test]
fn test_work_dir_that_is_a_file_exits_with_code_4() {
    let work = tempfile::tempdir().unwrap();
    let file = work.path().join("not_a_dir");
    fs::write(&file, "x").unwrap();
    cmd()
        .args(["--recover", file.to_str().unwrap()])
        .assert()
        .code(4); // EC_WORKDIR
}

// =============================================================================
// Exit Code Tests - Run Failures (Exit Code 5)
// =============================================================================

#[test]
fn test_non_empty_backup_dir_exits_with_code_5() {
    let work = tempfile::tempdir().unwrap();
    seed_dump(work.path());
    let backup = work.path().join(BACKUP_DIR_NAME);
    fs::create_dir(&backup).unwrap();
    fs::write(backup.join("stale-schema.sql"), "x").unwrap();

    cmd()
        .args(["--convert"])
        .arg(work.path())
        .assert()
        .code(5) // EC_RUN
        .stderr(predicate::str::contains("recover dir must be empty"));
}

#[test]
fn test_recover_without_backup_exits_with_code_5() {
    let work = tempfile::tempdir().unwrap();
    cmd()
        .args(["--recover"])
        .arg(work.path())
        .assert()
        .code(5) // EC_RUN
        .stderr(predicate::str::contains("nothing to recover"));
}

#[test]
fn test_unconvertible_row_exits_with_code_5() {
    let work = tempfile::tempdir().unwrap();
    fs::write(
        work.path().join("big-schema.sql"),
        "CREATE TABLE `big` (\n  `c` char(200) NOT NULL\n) REPLICA_NUM = 1;\n",
    )
    .unwrap();

    // Budget below char(200) * 4 with nothing demotable.
    cmd()
        .args(["--convert", "--max-row-size", "500"])
        .arg(work.path())
        .assert()
        .code(5) // EC_RUN
        .stderr(predicate::str::contains("big-schema.sql"));

    // The original file was never moved.
    assert!(work.path().join("big-schema.sql").exists());
}

// =============================================================================
// Convert Mode
// =============================================================================

#[test]
fn test_convert_rewrites_schema_files() {
    let work = tempfile::tempdir().unwrap();
    seed_dump(work.path());

    cmd()
        .args(["--convert"])
        .arg(work.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("SUMMARY"))
        .stderr(predicate::str::contains("Tables:    1"))
        .stderr(predicate::str::contains("Databases: 1"));

    let table = fs::read_to_string(work.path().join("orders-schema.sql")).unwrap();
    for clause in [
        "ROW_FORMAT",
        "COMPRESSION",
        "REPLICA_NUM",
        "USE_BLOOM_FILTER",
        "AUTO_INCREMENT",
        "PRIMARY KEY",
        "KEY `idx_note`",
    ] {
        assert!(!table.contains(clause), "{} left in: {}", clause, table);
    }
    assert!(table.contains("`note` varchar(255) DEFAULT NULL\n"));

    let db = fs::read_to_string(work.path().join("shop-schema-create.sql")).unwrap();
    assert!(!db.contains("REPLICA_NUM"));
    assert!(!db.contains("PRIMARY_ZONE"));
    assert!(db.contains("`shop`"));

    // Originals live in the backup dir, data files stay put.
    let backup = work.path().join(BACKUP_DIR_NAME);
    assert_eq!(
        fs::read_to_string(backup.join("orders-schema.sql")).unwrap(),
        OB_TABLE
    );
    assert_eq!(
        fs::read_to_string(backup.join("shop-schema-create.sql")).unwrap(),
        OB_DATABASE
    );
    assert!(work.path().join("orders.00001.sql").exists());
}

#[test]
fn test_convert_demotes_oversized_varchar() {
    let work = tempfile::tempdir().unwrap();
    fs::write(
        work.path().join("wide-schema.sql"),
        "CREATE TABLE `wide` (\n\
         \x20\x20`payload` varchar(16500) DEFAULT NULL,\n\
         \x20\x20`id` bigint(20) NOT NULL\n\
         ) DEFAULT CHARSET = utf8mb4;\n",
    )
    .unwrap();

    cmd()
        .args(["--convert"])
        .arg(work.path())
        .assert()
        .success();

    let table = fs::read_to_string(work.path().join("wide-schema.sql")).unwrap();
    assert!(table.contains("`payload` TEXT DEFAULT NULL"));
    assert!(!table.to_uppercase().contains("VARCHAR"));
}

#[test]
fn test_convert_with_debug_logs_to_stderr() {
    let work = tempfile::tempdir().unwrap();
    seed_dump(work.path());

    cmd()
        .args(["--convert", "--debug"])
        .arg(work.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("[DEBUG]"));
}

// =============================================================================
// Recovery Mode
// =============================================================================

#[test]
fn test_convert_then_recover_restores_originals() {
    let work = tempfile::tempdir().unwrap();
    seed_dump(work.path());

    cmd().args(["--convert"]).arg(work.path()).assert().success();
    cmd().args(["--recover"]).arg(work.path()).assert().success();

    assert_eq!(
        fs::read_to_string(work.path().join("orders-schema.sql")).unwrap(),
        OB_TABLE
    );
    assert_eq!(
        fs::read_to_string(work.path().join("shop-schema-create.sql")).unwrap(),
        OB_DATABASE
    );

    // A second convert run works against the emptied backup dir.
    cmd().args(["--convert"]).arg(work.path()).assert().success();
}

// =============================================================================
// Run Report
// =============================================================================

#[test]
fn test_report_json_written_and_well_formed() {
    let work = tempfile::tempdir().unwrap();
    seed_dump(work.path());
    let report_path = work.path().join("report.json");

    cmd()
        .args(["--convert", "--report-json"])
        .arg(&report_path)
        .arg(work.path())
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["mode"], "convert");
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    let table = files
        .iter()
        .find(|f| f["kind"] == "table")
        .expect("table entry");
    assert_eq!(table["file"], "orders-schema.sql");
    assert_eq!(table["row_size_before"], 8 + 255 * 4);
}
