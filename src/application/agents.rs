use super::voting::{FLAG_KEY, RECOMMENDATION_KEY};
use crate::domain::case::Case;
use crate::domain::ports::{Mode, ScoreRequest, ScorerRef};
use crate::domain::run::AgentError;
use crate::domain::verdict::{AgentName, AgentVerdict, RiskLevel, Verdict};

/// Risk cut-offs turning a raw score into a verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub fraud_at: f64,
    pub review_at: f64,
}

impl Bands {
    pub fn classify(&self, risk: f64) -> (Verdict, f64) {
        if risk >= self.fraud_at {
            (Verdict::Fraud, risk)
        } else if risk >= self.review_at {
            (Verdict::Review, risk)
        } else {
            (Verdict::NotFraud, 1.0 - risk)
        }
    }
}

/// An analysis agent. Variants differ only in the scoring collaborator they
/// delegate to and in how they read its risk score.
#[derive(Clone)]
pub enum Agent {
    CheckAnalysis(ScorerRef),
    TransactionHistory(ScorerRef),
    PolicyAnalysis(ScorerRef),
    GenericFraud(ScorerRef),
}

impl Agent {
    pub fn name(&self) -> AgentName {
        match self {
            Agent::CheckAnalysis(_) => AgentName::CheckAnalysis,
            Agent::TransactionHistory(_) => AgentName::TransactionHistory,
            Agent::PolicyAnalysis(_) => AgentName::PolicyAnalysis,
            Agent::GenericFraud(_) => AgentName::GenericFraud,
        }
    }

    fn scorer(&self) -> &ScorerRef {
        match self {
            Agent::CheckAnalysis(scorer)
            | Agent::TransactionHistory(scorer)
            | Agent::PolicyAnalysis(scorer)
            | Agent::GenericFraud(scorer) => scorer,
        }
    }

    pub fn bands(&self) -> Bands {
        let (fraud_at, review_at) = match self {
            Agent::CheckAnalysis(_) => (0.8, 0.4),
            Agent::TransactionHistory(_) => (0.75, 0.45),
            Agent::PolicyAnalysis(_) => (0.85, 0.4),
            Agent::GenericFraud(_) => (0.7, 0.35),
        };
        Bands {
            fraud_at,
            review_at,
        }
    }

    /// Evaluates a case. Independent agents take no prior verdicts; the
    /// generic agent takes exactly the three independent ones.
    pub async fn evaluate(
        &self,
        case: &Case,
        prior: &[AgentVerdict],
        mode: Mode,
    ) -> Result<AgentVerdict, AgentError> {
        let name = self.name();
        let expected_prior = if name.is_independent() { 0 } else { 3 };
        if prior.len() != expected_prior {
            return Err(AgentError::Execution(format!(
                "{} expects {} prior verdicts, got {}",
                name,
                expected_prior,
                prior.len()
            )));
        }

        let request = ScoreRequest { case, prior, mode };
        let score = self.scorer().score(&request).await?;
        if !score.raw_score.is_finite() || !(0.0..=1.0).contains(&score.raw_score) {
            return Err(AgentError::Execution(format!(
                "{} scorer returned risk {} outside [0, 1]",
                name, score.raw_score
            )));
        }

        let (verdict, confidence) = self.bands().classify(score.raw_score);
        let signals: Vec<String> = score
            .findings
            .iter()
            .filter(|finding| finding.key != RECOMMENDATION_KEY && finding.key != FLAG_KEY)
            .map(|finding| format!("{}: {}", finding.key, finding.value))
            .collect();
        let rationale = if signals.is_empty() {
            format!("{} risk {:.2}; no adverse signals", name, score.raw_score)
        } else {
            format!(
                "{} risk {:.2}; {}",
                name,
                score.raw_score,
                signals.join("; ")
            )
        };

        Ok(
            AgentVerdict::new(name, verdict, confidence, rationale, score.findings)
                .with_risk_level(RiskLevel::from_risk(score.raw_score)),
        )
    }
}

/// Exactly one agent per name.
#[derive(Clone)]
pub struct AgentRoster {
    check: Agent,
    history: Agent,
    policy: Agent,
    generic: Agent,
}

impl AgentRoster {
    pub fn new(
        check_analysis: ScorerRef,
        transaction_history: ScorerRef,
        policy_analysis: ScorerRef,
        generic_fraud: ScorerRef,
    ) -> Self {
        Self {
            check: Agent::CheckAnalysis(check_analysis),
            history: Agent::TransactionHistory(transaction_history),
            policy: Agent::PolicyAnalysis(policy_analysis),
            generic: Agent::GenericFraud(generic_fraud),
        }
    }

    pub fn independent(&self) -> [&Agent; 3] {
        [&self.check, &self.history, &self.policy]
    }

    pub fn generic(&self) -> &Agent {
        &self.generic
    }
}
