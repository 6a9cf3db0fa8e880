use super::case::Case;
use super::decision::FinalDecision;
use super::verdict::{AgentName, AgentVerdict};
use crate::error::{CheckGuardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Workflow stages. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    RunningIndependent,
    RunningDependent,
    Aggregating,
    Done,
    Failed,
}

impl Stage {
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        match (self, next) {
            (Init, RunningIndependent)
            | (RunningIndependent, RunningDependent)
            | (RunningDependent, Aggregating)
            | (Aggregating, Done) => true,
            (Done | Failed, _) => false,
            (_, Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

/// Non-fatal failure of a single agent call.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("execution failed: {0}")]
    Execution(String),
}

/// State of one case moving through the pipeline.
///
/// Owned exclusively by the orchestrator for the lifetime of the run. Agents
/// only ever see the shared `Arc<Case>` and cloned prior verdicts.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub run_id: Uuid,
    case: Arc<Case>,
    stage: Stage,
    verdicts: BTreeMap<AgentName, AgentVerdict>,
    errors: BTreeMap<AgentName, AgentError>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    decision: Option<FinalDecision>,
}

impl WorkflowRun {
    pub fn new(case: Case) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            case: Arc::new(case),
            stage: Stage::Init,
            verdicts: BTreeMap::new(),
            errors: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
            decision: None,
        }
    }

    pub fn case(&self) -> Arc<Case> {
        Arc::clone(&self.case)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn verdicts(&self) -> &BTreeMap<AgentName, AgentVerdict> {
        &self.verdicts
    }

    pub fn errors(&self) -> &BTreeMap<AgentName, AgentError> {
        &self.errors
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn decision(&self) -> Option<&FinalDecision> {
        self.decision.as_ref()
    }

    pub fn into_decision(self) -> Option<FinalDecision> {
        self.decision
    }

    pub fn advance(&mut self, next: Stage) -> Result<()> {
        if !self.stage.can_advance_to(next) {
            return Err(CheckGuardError::InvariantViolation(format!(
                "illegal stage transition {:?} -> {:?}",
                self.stage, next
            )));
        }
        self.stage = next;
        Ok(())
    }

    /// Records a verdict. A second write for the same agent is an invariant
    /// violation and leaves the first verdict untouched.
    pub fn record(&mut self, verdict: AgentVerdict) -> Result<()> {
        let expected = match verdict.agent {
            AgentName::GenericFraud => Stage::RunningDependent,
            _ => Stage::RunningIndependent,
        };
        if self.stage != expected {
            return Err(CheckGuardError::InvariantViolation(format!(
                "{} verdict recorded during {:?}",
                verdict.agent, self.stage
            )));
        }
        if self.verdicts.contains_key(&verdict.agent) {
            return Err(CheckGuardError::InvariantViolation(format!(
                "duplicate verdict for {}",
                verdict.agent
            )));
        }
        self.verdicts.insert(verdict.agent, verdict);
        Ok(())
    }

    /// Records an agent failure and substitutes an ABSTAIN verdict for it.
    pub fn record_failure(&mut self, agent: AgentName, error: AgentError) -> Result<()> {
        self.record(AgentVerdict::abstain(agent, error.to_string()))?;
        self.errors.insert(agent, error);
        Ok(())
    }

    /// The three independent verdicts, in agent order. Fails unless every
    /// independent agent has resolved.
    pub fn prior_verdicts(&self) -> Result<Vec<AgentVerdict>> {
        AgentName::INDEPENDENT
            .iter()
            .map(|agent| {
                self.verdicts.get(agent).cloned().ok_or_else(|| {
                    CheckGuardError::InvariantViolation(format!(
                        "{} has not resolved before the dependent stage",
                        agent
                    ))
                })
            })
            .collect()
    }

    pub fn complete(&mut self, decision: FinalDecision) -> Result<()> {
        self.advance(Stage::Done)?;
        self.finished_at = Some(Utc::now());
        self.decision = Some(decision);
        Ok(())
    }

    pub fn fail(&mut self) {
        if !self.stage.is_terminal() {
            self.stage = Stage::Failed;
            self.finished_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::case::tests::sample_case;
    use crate::domain::verdict::Verdict;

    fn verdict(agent: AgentName) -> AgentVerdict {
        AgentVerdict::new(agent, Verdict::NotFraud, 0.8, "clean", vec![])
    }

    #[test]
    fn test_stage_transitions() {
        assert!(Stage::Init.can_advance_to(Stage::RunningIndependent));
        assert!(!Stage::Init.can_advance_to(Stage::Aggregating));
        assert!(Stage::RunningDependent.can_advance_to(Stage::Failed));
        assert!(!Stage::Done.can_advance_to(Stage::Failed));
        assert!(!Stage::Failed.can_advance_to(Stage::RunningIndependent));
    }

    #[test]
    fn test_duplicate_verdict_rejected() {
        let mut run = WorkflowRun::new(sample_case());
        run.advance(Stage::RunningIndependent).unwrap();
        run.record(verdict(AgentName::CheckAnalysis)).unwrap();

        let mut second = verdict(AgentName::CheckAnalysis);
        second.verdict = Verdict::Fraud;
        assert!(matches!(
            run.record(second),
            Err(CheckGuardError::InvariantViolation(_))
        ));
        assert_eq!(
            run.verdicts()[&AgentName::CheckAnalysis].verdict,
            Verdict::NotFraud
        );
    }

    #[test]
    fn test_generic_verdict_rejected_during_independent_stage() {
        let mut run = WorkflowRun::new(sample_case());
        run.advance(Stage::RunningIndependent).unwrap();
        assert!(run.record(verdict(AgentName::GenericFraud)).is_err());
    }

    #[test]
    fn test_prior_verdicts_requires_all_independent() {
        let mut run = WorkflowRun::new(sample_case());
        run.advance(Stage::RunningIndependent).unwrap();
        run.record(verdict(AgentName::CheckAnalysis)).unwrap();
        run.record_failure(
            AgentName::TransactionHistory,
            AgentError::Timeout(Duration::from_millis(10)),
        )
        .unwrap();
        assert!(run.prior_verdicts().is_err());

        run.record(verdict(AgentName::PolicyAnalysis)).unwrap();
        let prior = run.prior_verdicts().unwrap();
        assert_eq!(prior.len(), 3);
        assert!(prior[1].is_abstain());
        assert!(run.errors().contains_key(&AgentName::TransactionHistory));
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut run = WorkflowRun::new(sample_case());
        run.fail();
        assert_eq!(run.stage(), Stage::Failed);
        assert!(run.finished_at().is_some());
        assert!(run.advance(Stage::RunningIndependent).is_err());
    }
}
