use crate::domain::ports::Mode;
use crate::domain::verdict::AgentName;
use crate::error::{CheckGuardError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Voting weight per agent. Weights need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentWeights {
    pub check_analysis: f64,
    pub transaction_history: f64,
    pub policy_analysis: f64,
    pub generic_fraud: f64,
}

impl Default for AgentWeights {
    fn default() -> Self {
        Self {
            check_analysis: 1.0,
            transaction_history: 1.0,
            policy_analysis: 1.0,
            generic_fraud: 1.5,
        }
    }
}

impl AgentWeights {
    pub fn weight(&self, agent: AgentName) -> f64 {
        match agent {
            AgentName::CheckAnalysis => self.check_analysis,
            AgentName::TransactionHistory => self.transaction_history,
            AgentName::PolicyAnalysis => self.policy_analysis,
            AgentName::GenericFraud => self.generic_fraud,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    pub weights: AgentWeights,
    /// `τ` in `(0, 1)`: a normalized vote strictly above it is FRAUD,
    /// strictly below its negation is NOT_FRAUD.
    pub fraud_threshold: f64,
    /// Share of active agents that must agree with the decision for consensus.
    pub consensus_ratio: f64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            weights: AgentWeights::default(),
            fraud_threshold: 0.5,
            consensus_ratio: 0.6,
        }
    }
}

/// Per-agent time budgets in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTimeouts {
    pub check_analysis_ms: u64,
    pub transaction_history_ms: u64,
    pub policy_analysis_ms: u64,
    pub generic_fraud_ms: u64,
}

impl Default for AgentTimeouts {
    fn default() -> Self {
        Self {
            check_analysis_ms: 5_000,
            transaction_history_ms: 5_000,
            policy_analysis_ms: 5_000,
            generic_fraud_ms: 15_000,
        }
    }
}

impl AgentTimeouts {
    pub fn uniform(budget: Duration) -> Self {
        let ms = budget.as_millis() as u64;
        Self {
            check_analysis_ms: ms,
            transaction_history_ms: ms,
            policy_analysis_ms: ms,
            generic_fraud_ms: ms,
        }
    }

    pub fn budget(&self, agent: AgentName) -> Duration {
        let ms = match agent {
            AgentName::CheckAnalysis => self.check_analysis_ms,
            AgentName::TransactionHistory => self.transaction_history_ms,
            AgentName::PolicyAnalysis => self.policy_analysis_ms,
            AgentName::GenericFraud => self.generic_fraud_ms,
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub mode: Mode,
    pub voting: VotingConfig,
    pub timeouts: AgentTimeouts,
}

impl OrchestratorConfig {
    /// Loads a JSON configuration file. Missing fields take their defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for agent in AgentName::ALL {
            let weight = self.voting.weights.weight(agent);
            if !weight.is_finite() || weight < 0.0 {
                return Err(CheckGuardError::Config(format!(
                    "weight for {} must be a non-negative number, got {}",
                    agent, weight
                )));
            }
            if self.timeouts.budget(agent).is_zero() {
                return Err(CheckGuardError::Config(format!(
                    "timeout for {} must be positive",
                    agent
                )));
            }
        }

        // |N| never exceeds 1, so τ = 1 could only ever yield REVIEW.
        let tau = self.voting.fraud_threshold;
        if !(tau > 0.0 && tau < 1.0) {
            return Err(CheckGuardError::Config(format!(
                "fraud_threshold must be within (0, 1), got {}",
                tau
            )));
        }

        let ratio = self.voting.consensus_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(CheckGuardError::Config(format!(
                "consensus_ratio must be within (0, 1], got {}",
                ratio
            )));
        }

        Ok(())
    }
}
