#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use checkguard::domain::decision::Decision;
use checkguard::domain::ports::RunArchive;
use checkguard::infrastructure::rocksdb::RocksDbRunArchive;
use std::process::Command;
use tempfile::tempdir;

fn run_once(db_path: &std::path::Path) {
    let output = Command::new(cargo_bin!("checkguard"))
        .arg("tests/fixtures/cases.csv")
        .arg("--clients")
        .arg("tests/fixtures/clients.csv")
        .arg("--history")
        .arg("tests/fixtures/history.csv")
        .arg("--db-path")
        .arg(db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
}

#[tokio::test]
async fn test_rocksdb_archive_accumulates_runs() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // Two runs over the same cases archive two independent decisions each.
    run_once(&db_path);
    run_once(&db_path);

    let archive = RocksDbRunArchive::open(&db_path).unwrap();
    let decisions = archive.for_case("CASE002").await.unwrap();
    assert_eq!(decisions.len(), 2);
    assert_ne!(decisions[0].run_id, decisions[1].run_id);
    assert!(decisions.iter().all(|d| d.decision == Decision::Fraud));

    let stored = archive.get(decisions[0].run_id).await.unwrap().unwrap();
    assert_eq!(stored.case_id, "CASE002");

    // Rejected cases are never archived.
    assert!(archive.for_case("CASE003").await.unwrap().is_empty());
}
