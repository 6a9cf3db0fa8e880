use super::agents::{Agent, AgentRoster};
use super::config::OrchestratorConfig;
use super::voting;
use crate::domain::case::Case;
use crate::domain::decision::FinalDecision;
use crate::domain::ports::{CaseStoreBox, RunArchiveBox};
use crate::domain::run::{AgentError, Stage, WorkflowRun};
use crate::domain::verdict::{AgentName, AgentVerdict};
use crate::error::{CheckGuardError, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type AgentOutcome = std::result::Result<AgentVerdict, AgentError>;

/// Drives a case through the fraud-review workflow.
///
/// The three independent agents run concurrently, each under its own time
/// budget. Once all of them have resolved, the generic agent runs over their
/// verdicts, and the voting aggregator turns the four verdicts into one
/// decision. An agent that fails or times out is replaced by an ABSTAIN
/// verdict; only invalid cases and broken invariants abort a run.
///
/// Every submission gets a fresh `WorkflowRun`, so submitting the same case
/// twice yields two independent runs.
pub struct Orchestrator {
    roster: AgentRoster,
    config: OrchestratorConfig,
    case_store: Option<CaseStoreBox>,
    archive: Option<RunArchiveBox>,
}

impl Orchestrator {
    /// Creates a new `Orchestrator`.
    ///
    /// # Arguments
    ///
    /// * `roster` - The four analysis agents.
    /// * `config` - Mode, voting weights and per-agent timeouts. Validated here.
    pub fn new(roster: AgentRoster, config: OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            roster,
            config,
            case_store: None,
            archive: None,
        })
    }

    /// Enables [`Orchestrator::submit_by_id`].
    pub fn with_case_store(mut self, store: CaseStoreBox) -> Self {
        self.case_store = Some(store);
        self
    }

    /// Archives every emitted decision.
    pub fn with_archive(mut self, archive: RunArchiveBox) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn archive(&self) -> Option<&RunArchiveBox> {
        self.archive.as_ref()
    }

    /// Runs the workflow for `case` and returns its decision.
    pub async fn submit(&self, case: Case) -> Result<FinalDecision> {
        let run = self.execute(case).await?;
        run.into_decision().ok_or_else(|| {
            CheckGuardError::InvariantViolation("run finished without a decision".to_string())
        })
    }

    /// Looks the case up in the configured case store, then submits it.
    pub async fn submit_by_id(&self, case_id: &str) -> Result<FinalDecision> {
        let store = self.case_store.as_ref().ok_or_else(|| {
            CheckGuardError::Config("no case store configured".to_string())
        })?;
        let case = store.fetch(case_id).await?;
        self.submit(case).await
    }

    /// Runs the workflow and returns the completed run, including per-agent
    /// errors and timestamps.
    pub async fn execute(&self, case: Case) -> Result<WorkflowRun> {
        if let Err(e) = case.validate() {
            error!(case_id = %case.case_id, error = %e, "Case rejected");
            return Err(e);
        }

        let mut run = WorkflowRun::new(case);
        match self.drive(&mut run).await {
            Ok(()) => Ok(run),
            Err(e) => {
                run.fail();
                error!(run_id = %run.run_id, error = %e, "Workflow run failed");
                Err(e)
            }
        }
    }

    async fn drive(&self, run: &mut WorkflowRun) -> Result<()> {
        let case = run.case();
        let mode = self.config.mode;

        run.advance(Stage::RunningIndependent)?;
        info!(run_id = %run.run_id, case_id = %case.case_id, %mode, "Dispatching independent agents");

        let no_prior: Arc<[AgentVerdict]> = Arc::from(Vec::new());
        let handles: Vec<(AgentName, JoinHandle<AgentOutcome>)> = self
            .roster
            .independent()
            .into_iter()
            .map(|agent| {
                (
                    agent.name(),
                    self.dispatch(agent, Arc::clone(&case), Arc::clone(&no_prior)),
                )
            })
            .collect();

        // Barrier: every independent agent resolves before the next stage.
        for (agent, handle) in handles {
            let outcome = join(agent, handle).await;
            self.resolve(run, agent, outcome)?;
        }

        run.advance(Stage::RunningDependent)?;
        let prior: Arc<[AgentVerdict]> = Arc::from(run.prior_verdicts()?);
        info!(run_id = %run.run_id, "Dispatching generic agent");
        let generic = self.roster.generic();
        let handle = self.dispatch(generic, Arc::clone(&case), prior);
        let outcome = join(generic.name(), handle).await;
        self.resolve(run, generic.name(), outcome)?;

        run.advance(Stage::Aggregating)?;
        let decision = voting::aggregate(&case.case_id, run.run_id, run.verdicts(), &self.config.voting)?;
        run.complete(decision)?;

        if let Some(decision) = run.decision() {
            info!(
                run_id = %run.run_id,
                case_id = %decision.case_id,
                decision = %decision.decision,
                risk_level = %decision.risk_level,
                confidence = decision.confidence,
                disagreement = decision.disagreement,
                "Workflow run complete"
            );
            if let Some(archive) = &self.archive
                && let Err(e) = archive.archive(decision).await
            {
                warn!(run_id = %run.run_id, error = %e, "Failed to archive decision");
            }
        }

        Ok(())
    }

    /// Spawns one agent call under its own timeout. Expiry drops the agent's
    /// future inside its task and leaves sibling tasks running.
    fn dispatch(
        &self,
        agent: &Agent,
        case: Arc<Case>,
        prior: Arc<[AgentVerdict]>,
    ) -> JoinHandle<AgentOutcome> {
        let agent = agent.clone();
        let budget = self.config.timeouts.budget(agent.name());
        let mode = self.config.mode;

        tokio::spawn(async move {
            match tokio::time::timeout(budget, agent.evaluate(&case, &prior, mode)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AgentError::Timeout(budget)),
            }
        })
    }

    fn resolve(&self, run: &mut WorkflowRun, agent: AgentName, outcome: AgentOutcome) -> Result<()> {
        match outcome {
            Ok(verdict) => {
                debug!(
                    run_id = %run.run_id,
                    %agent,
                    verdict = %verdict.verdict,
                    confidence = verdict.confidence,
                    "Agent resolved"
                );
                run.record(verdict)
            }
            Err(e) => {
                warn!(run_id = %run.run_id, %agent, error = %e, "Agent failed; substituting abstain");
                run.record_failure(agent, e)
            }
        }
    }
}

async fn join(agent: AgentName, handle: JoinHandle<AgentOutcome>) -> AgentOutcome {
    handle.await.unwrap_or_else(|e| {
        Err(AgentError::Execution(format!("{} task aborted: {}", agent, e)))
    })
}
