#![allow(dead_code)]

use async_trait::async_trait;
use checkguard::domain::case::Case;
use checkguard::domain::ports::{Score, ScoreRequest, Scorer, ScorerRef};
use checkguard::domain::run::AgentError;
use chrono::NaiveDate;
use rand::Rng;
use rust_decimal::Decimal;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const CASES_HEADER: [&str; 18] = [
    "case_id",
    "client_id",
    "check_number",
    "date",
    "amount",
    "amount_written",
    "payee",
    "bank_name",
    "account_number",
    "routing_number",
    "micr_line",
    "image_ref",
    "history_ref",
    "policy_ref",
    "has_watermark",
    "signature_present",
    "device",
    "image_quality",
];

pub fn case(id: &str) -> Case {
    Case {
        case_id: id.to_string(),
        client_id: "CLIENT001".to_string(),
        check_number: "1001".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        amount: Decimal::new(25000, 2),
        amount_written: None,
        payee: "Electric Company".to_string(),
        bank_name: None,
        account_number: "1234567890".to_string(),
        routing_number: "021000021".to_string(),
        micr_line: None,
        image_ref: None,
        history_ref: None,
        policy_ref: None,
        has_watermark: true,
        signature_present: true,
        device: None,
        image_quality: None,
    }
}

/// Scores every case with the same risk, optionally after a delay.
pub struct FixedScorer {
    pub risk: f64,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FixedScorer {
    pub fn new(risk: f64) -> Arc<Self> {
        Self::delayed(risk, Duration::ZERO)
    }

    pub fn delayed(risk: f64, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            risk,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scorer for FixedScorer {
    async fn score(&self, _request: &ScoreRequest<'_>) -> Result<Score, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Score {
            findings: vec![],
            raw_score: self.risk,
        })
    }
}

pub struct FailingScorer;

#[async_trait]
impl Scorer for FailingScorer {
    async fn score(&self, _request: &ScoreRequest<'_>) -> Result<Score, AgentError> {
        Err(AgentError::Execution("backend unavailable".to_string()))
    }
}

pub struct PanickingScorer;

#[async_trait]
impl Scorer for PanickingScorer {
    async fn score(&self, _request: &ScoreRequest<'_>) -> Result<Score, AgentError> {
        panic!("scorer crashed");
    }
}

/// Remembers how many prior verdicts, and how many abstentions among them,
/// it was handed.
#[derive(Default)]
pub struct PriorRecorder {
    pub seen_prior: AtomicUsize,
    pub seen_abstain: AtomicUsize,
}

#[async_trait]
impl Scorer for PriorRecorder {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<Score, AgentError> {
        self.seen_prior.store(request.prior.len(), Ordering::SeqCst);
        let abstained = request.prior.iter().filter(|p| p.is_abstain()).count();
        self.seen_abstain.store(abstained, Ordering::SeqCst);
        Ok(Score {
            findings: vec![],
            raw_score: 0.5,
        })
    }
}

pub fn scorer<S: Scorer + 'static>(scorer: Arc<S>) -> ScorerRef {
    scorer
}

/// Writes `rows` random but valid cases for CLIENT001.
pub fn generate_cases_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let mut rng = rand::thread_rng();
    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record(CASES_HEADER)?;

    for i in 1..=rows {
        let cents: i64 = rng.gen_range(1_000..2_000_000);
        let amount = Decimal::new(cents, 2).to_string();
        let payee = ["Electric Company", "Water Utility", "Cash", "Unknown Vendor"]
            [rng.gen_range(0..4)];
        let quality = format!("{:.2}", rng.gen_range(0.2..1.0));
        let case_id = format!("CASE{:05}", i);
        let check_number = i.to_string();
        wtr.write_record([
            case_id.as_str(),
            "CLIENT001",
            check_number.as_str(),
            "2024-03-01",
            amount.as_str(),
            "",
            payee,
            "First National Bank",
            "1234567890",
            "021000021",
            "",
            "",
            "",
            "",
            if rng.gen_bool(0.8) { "true" } else { "false" },
            if rng.gen_bool(0.9) { "true" } else { "false" },
            "",
            quality.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
