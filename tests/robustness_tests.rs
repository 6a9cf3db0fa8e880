use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use checkguard::application::config::OrchestratorConfig;
use checkguard::application::orchestrator::Orchestrator;
use checkguard::domain::ports::{HistoryStore, HistoryStoreRef, PolicyStoreRef};
use checkguard::infrastructure::in_memory::{InMemoryHistoryStore, InMemoryPolicyStore};
use checkguard::infrastructure::scoring::simulated_roster;
use checkguard::interfaces::csv::history_reader::{ClientReader, TransactionHistoryReader};
use predicates::prelude::*;
use rand::Rng;
use rust_decimal::Decimal;
use std::fs::File;
use std::process::Command;
use std::sync::Arc;

mod common;

#[test]
fn test_malformed_csv_handling() {
    let output_path = std::path::PathBuf::from("robustness_test.csv");
    let mut wtr = csv::Writer::from_path(&output_path).unwrap();
    wtr.write_record(common::CASES_HEADER).unwrap();

    let valid = [
        "CASE001", "CLIENT001", "1001", "2024-03-01", "120.00", "", "Water Utility", "",
        "1234567890", "021000021", "", "", "", "", "true", "true", "", "",
    ];
    wtr.write_record(valid).unwrap();
    // Amount is not a number
    let mut bad_amount = valid;
    bad_amount[0] = "CASE002";
    bad_amount[4] = "lots";
    wtr.write_record(bad_amount).unwrap();
    // Flag is not a boolean
    let mut bad_flag = valid;
    bad_flag[0] = "CASE003";
    bad_flag[14] = "maybe";
    wtr.write_record(bad_flag).unwrap();
    // Missing payee fails validation
    let mut no_payee = valid;
    no_payee[0] = "CASE004";
    no_payee[6] = "";
    wtr.write_record(no_payee).unwrap();
    let mut last = valid;
    last[0] = "CASE005";
    wtr.write_record(last).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("checkguard"));
    cmd.arg(&output_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading case"))
        .stderr(predicate::str::contains("Error processing case"))
        .stdout(predicate::str::contains("CASE001,"))
        .stdout(predicate::str::contains("CASE005,"))
        .stdout(predicate::str::contains("CASE002,").not())
        .stdout(predicate::str::contains("CASE003,").not())
        .stdout(predicate::str::contains("CASE004,").not());

    std::fs::remove_file(output_path).ok();
}

async fn fixture_orchestrator() -> Orchestrator {
    let history = InMemoryHistoryStore::new();
    let clients = File::open("tests/fixtures/clients.csv").unwrap();
    for client in ClientReader::new(clients).clients() {
        history.store_client(client.unwrap()).await.unwrap();
    }
    let transactions = File::open("tests/fixtures/history.csv").unwrap();
    for tx in TransactionHistoryReader::new(transactions).transactions() {
        history.store_transaction(tx.unwrap()).await.unwrap();
    }

    let history: HistoryStoreRef = Arc::new(history);
    let policies: PolicyStoreRef = Arc::new(InMemoryPolicyStore::with_defaults());
    Orchestrator::new(
        simulated_roster(history, policies),
        OrchestratorConfig::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_simulation_is_deterministic_for_random_cases() {
    let orchestrator = fixture_orchestrator().await;
    let mut rng = rand::thread_rng();

    for i in 0..50 {
        let mut case = common::case(&format!("RAND{:03}", i));
        case.client_id = ["CLIENT001", "CLIENT002", "CLIENT404"][rng.gen_range(0..3)].to_string();
        case.amount = Decimal::new(rng.gen_range(100..5_000_000), 2);
        case.payee = ["Electric Company", "Cash", "Landlord LLC", "John Smith"][rng.gen_range(0..4)]
            .to_string();
        case.has_watermark = rng.gen_bool(0.7);
        case.signature_present = rng.gen_bool(0.9);
        case.image_quality = Some(rng.gen_range(0.0..=1.0));

        let first = orchestrator.submit(case.clone()).await.unwrap();
        let second = orchestrator.submit(case).await.unwrap();

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.decision, second.decision);
        assert_eq!(first.votes, second.votes);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.disagreement, second.disagreement);
        assert_eq!(first.recommendations, second.recommendations);
        assert!((0.0..=1.0).contains(&first.confidence));
        assert!((0.0..=1.0).contains(&first.disagreement));
        assert!((-1.0..=1.0).contains(&first.normalized_score));
        assert!(first.abstained().is_empty());
    }
}

#[tokio::test]
async fn test_overflowing_written_amount_keeps_every_agent_voting() {
    let orchestrator = fixture_orchestrator().await;
    let mut case = common::case("CASE900");
    case.amount_written = Some(format!("one{} and 00/100", " hundred".repeat(12)));

    let run = orchestrator.execute(case).await.unwrap();

    assert!(run.errors().is_empty(), "{:?}", run.errors());
    assert!(run.decision().unwrap().abstained().is_empty());
}
