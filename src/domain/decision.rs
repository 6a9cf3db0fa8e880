use super::verdict::{AgentName, RiskLevel, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Outcome of the voting stage. There is no abstain outcome: a run where no
/// agent participated resolves to `Review`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Fraud,
    NotFraud,
    Review,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Fraud => "fraud",
            Decision::NotFraud => "not_fraud",
            Decision::Review => "review",
        }
    }

    pub fn matches(&self, verdict: Verdict) -> bool {
        matches!(
            (self, verdict),
            (Decision::Fraud, Verdict::Fraud)
                | (Decision::NotFraud, Verdict::NotFraud)
                | (Decision::Review, Verdict::Review)
        )
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the vote breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub agent: AgentName,
    pub verdict: Verdict,
    /// Effective weight; always 0 for an abstention.
    pub weight: f64,
    pub confidence: f64,
    pub risk_level: RiskLevel,
}

/// The consensus decision for one case, produced once per workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    pub case_id: String,
    pub run_id: Uuid,
    pub decision: Decision,
    /// Confidence-weighted risk of the active agents; `Critical` whenever
    /// any active agent reported it.
    pub risk_level: RiskLevel,
    /// Aggregate confidence in `[0, 1]`.
    pub confidence: f64,
    /// Normalized weighted vote `N` in `[-1, 1]`.
    pub normalized_score: f64,
    pub votes: Vec<VoteRecord>,
    /// Weighted variance of the votes, 0 when unanimous, at most 1.
    pub disagreement: f64,
    pub consensus: bool,
    pub rationale: String,
    /// Red flags raised by any agent, deduplicated and sorted.
    pub flags: Vec<String>,
    pub recommendations: Vec<String>,
}

impl FinalDecision {
    pub fn abstained(&self) -> Vec<AgentName> {
        self.votes
            .iter()
            .filter(|vote| vote.verdict == Verdict::Abstain)
            .map(|vote| vote.agent)
            .collect()
    }
}
