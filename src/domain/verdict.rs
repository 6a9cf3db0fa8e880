use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of analysis agents.
///
/// Declaration order is the order used for vote breakdowns and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentName {
    CheckAnalysis,
    TransactionHistory,
    PolicyAnalysis,
    GenericFraud,
}

impl AgentName {
    /// Agents that run concurrently in the first stage.
    pub const INDEPENDENT: [AgentName; 3] = [
        AgentName::CheckAnalysis,
        AgentName::TransactionHistory,
        AgentName::PolicyAnalysis,
    ];

    pub const ALL: [AgentName; 4] = [
        AgentName::CheckAnalysis,
        AgentName::TransactionHistory,
        AgentName::PolicyAnalysis,
        AgentName::GenericFraud,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::CheckAnalysis => "check_analysis",
            AgentName::TransactionHistory => "transaction_history",
            AgentName::PolicyAnalysis => "policy_analysis",
            AgentName::GenericFraud => "generic_fraud",
        }
    }

    pub fn is_independent(&self) -> bool {
        !matches!(self, AgentName::GenericFraud)
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An agent's categorical judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Fraud,
    NotFraud,
    Review,
    /// Substituted by the orchestrator for an agent that failed or timed out.
    Abstain,
}

impl Verdict {
    /// Signed vote used by the aggregator: fraud pulls up, not-fraud pulls down.
    pub fn score(&self) -> f64 {
        match self {
            Verdict::Fraud => 1.0,
            Verdict::NotFraud => -1.0,
            Verdict::Review | Verdict::Abstain => 0.0,
        }
    }

    pub fn is_decisive(&self) -> bool {
        matches!(self, Verdict::Fraud | Verdict::NotFraud)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Fraud => "fraud",
            Verdict::NotFraud => "not_fraud",
            Verdict::Review => "review",
            Verdict::Abstain => "abstain",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graded severity of the fraud risk behind a verdict or decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Grades a raw risk in `[0, 1]`.
    pub fn from_risk(risk: f64) -> Self {
        if risk >= 0.8 {
            RiskLevel::Critical
        } else if risk >= 0.6 {
            RiskLevel::High
        } else if risk >= 0.4 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// 1 for `Low` up to 4 for `Critical`.
    pub fn rank(&self) -> f64 {
        match self {
            RiskLevel::Low => 1.0,
            RiskLevel::Medium => 2.0,
            RiskLevel::High => 3.0,
            RiskLevel::Critical => 4.0,
        }
    }

    /// Rounds an averaged rank back to a level.
    pub fn from_rank(rank: f64) -> Self {
        if rank >= 3.5 {
            RiskLevel::Critical
        } else if rank >= 2.5 {
            RiskLevel::High
        } else if rank >= 1.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single key/value piece of evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub key: String,
    pub value: String,
}

impl Finding {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One agent's assessment of a case. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentVerdict {
    pub agent: AgentName,
    pub verdict: Verdict,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub rationale: String,
    pub evidence: Vec<Finding>,
}

impl AgentVerdict {
    pub fn new(
        agent: AgentName,
        verdict: Verdict,
        confidence: f64,
        rationale: impl Into<String>,
        evidence: Vec<Finding>,
    ) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        let implied_risk = match verdict {
            Verdict::NotFraud => 1.0 - confidence,
            _ => confidence,
        };
        Self {
            agent,
            verdict,
            confidence,
            risk_level: RiskLevel::from_risk(implied_risk),
            rationale: rationale.into(),
            evidence,
        }
    }

    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    /// Zero-confidence stand-in for an agent that produced no verdict.
    pub fn abstain(agent: AgentName, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            agent,
            verdict: Verdict::Abstain,
            confidence: 0.0,
            risk_level: RiskLevel::Medium,
            rationale: format!("Agent abstained: {}", reason),
            evidence: vec![Finding::new("abstain_reason", reason)],
        }
    }

    pub fn is_abstain(&self) -> bool {
        self.verdict == Verdict::Abstain
    }
}
