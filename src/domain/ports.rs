use super::case::Case;
use super::decision::FinalDecision;
use super::history::{ClientProfile, HistoricalTransaction};
use super::policy::PolicyRule;
use super::run::AgentError;
use super::verdict::{AgentVerdict, Finding};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Selects deterministic heuristic scoring or live model-backed scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Simulation,
    Real,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulation" => Ok(Mode::Simulation),
            "real" => Ok(Mode::Real),
            other => Err(format!("unknown mode '{}', expected simulation or real", other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Simulation => f.write_str("simulation"),
            Mode::Real => f.write_str("real"),
        }
    }
}

/// Input handed to a scoring collaborator.
pub struct ScoreRequest<'a> {
    pub case: &'a Case,
    /// Empty for independent agents; the three resolved verdicts for the
    /// generic agent.
    pub prior: &'a [AgentVerdict],
    pub mode: Mode,
}

/// Domain signal extracted by a scoring collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub findings: Vec<Finding>,
    /// Fraud risk in `[0, 1]`.
    pub raw_score: f64,
}

/// External collaborator an agent delegates its domain analysis to.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest<'_>) -> std::result::Result<Score, AgentError>;
}

#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn store(&self, case: Case) -> Result<()>;
    /// Fails with `NotFound` when the case is absent.
    async fn fetch(&self, case_id: &str) -> Result<Case>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn store_client(&self, client: ClientProfile) -> Result<()>;
    async fn store_transaction(&self, tx: HistoricalTransaction) -> Result<()>;
    async fn client(&self, client_id: &str) -> Result<Option<ClientProfile>>;
    async fn transactions(&self, client_id: &str) -> Result<Vec<HistoricalTransaction>>;
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn store_set(&self, name: &str, rules: Vec<PolicyRule>) -> Result<()>;
    /// Fails with `NotFound` when the policy set is absent.
    async fn policies(&self, name: &str) -> Result<Vec<PolicyRule>>;
}

/// Where decisions go once a run has emitted them.
#[async_trait]
pub trait RunArchive: Send + Sync {
    async fn archive(&self, decision: &FinalDecision) -> Result<()>;
    async fn get(&self, run_id: Uuid) -> Result<Option<FinalDecision>>;
    async fn for_case(&self, case_id: &str) -> Result<Vec<FinalDecision>>;
}

pub type ScorerRef = Arc<dyn Scorer>;
pub type CaseStoreBox = Box<dyn CaseStore>;
pub type HistoryStoreRef = Arc<dyn HistoryStore>;
pub type PolicyStoreRef = Arc<dyn PolicyStore>;
pub type RunArchiveBox = Box<dyn RunArchive>;
pub type RunArchiveFactory = Box<dyn Fn() -> RunArchiveBox + Send + Sync>;
