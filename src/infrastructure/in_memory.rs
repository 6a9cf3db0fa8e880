use crate::domain::case::{Case, DEFAULT_POLICY_SET};
use crate::domain::decision::FinalDecision;
use crate::domain::history::{ClientProfile, HistoricalTransaction};
use crate::domain::policy::{PolicyRule, default_policies};
use crate::domain::ports::{CaseStore, HistoryStore, PolicyStore, RunArchive};
use crate::error::{CheckGuardError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory store for cases awaiting review.
///
/// Uses `Arc<RwLock<HashMap<String, Case>>>` keyed by case id.
#[derive(Default, Clone)]
pub struct InMemoryCaseStore {
    cases: Arc<RwLock<HashMap<String, Case>>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn store(&self, case: Case) -> Result<()> {
        let mut cases = self.cases.write().await;
        cases.insert(case.case_id.clone(), case);
        Ok(())
    }

    async fn fetch(&self, case_id: &str) -> Result<Case> {
        let cases = self.cases.read().await;
        cases
            .get(case_id)
            .cloned()
            .ok_or_else(|| CheckGuardError::NotFound(format!("case {}", case_id)))
    }
}

/// Client profiles and their past transactions, keyed by client id.
#[derive(Default, Clone)]
pub struct InMemoryHistoryStore {
    clients: Arc<RwLock<HashMap<String, ClientProfile>>>,
    transactions: Arc<RwLock<HashMap<String, Vec<HistoricalTransaction>>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn store_client(&self, client: ClientProfile) -> Result<()> {
        let mut clients = self.clients.write().await;
        clients.insert(client.client_id.clone(), client);
        Ok(())
    }

    async fn store_transaction(&self, tx: HistoricalTransaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        transactions.entry(tx.client_id.clone()).or_default().push(tx);
        Ok(())
    }

    async fn client(&self, client_id: &str) -> Result<Option<ClientProfile>> {
        let clients = self.clients.read().await;
        Ok(clients.get(client_id).cloned())
    }

    async fn transactions(&self, client_id: &str) -> Result<Vec<HistoricalTransaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(client_id).cloned().unwrap_or_default())
    }
}

/// Named policy sets.
#[derive(Default, Clone)]
pub struct InMemoryPolicyStore {
    sets: Arc<RwLock<HashMap<String, Vec<PolicyRule>>>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the bank's standard rules under [`DEFAULT_POLICY_SET`].
    pub fn with_defaults() -> Self {
        let mut sets = HashMap::new();
        sets.insert(DEFAULT_POLICY_SET.to_string(), default_policies());
        Self {
            sets: Arc::new(RwLock::new(sets)),
        }
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn store_set(&self, name: &str, rules: Vec<PolicyRule>) -> Result<()> {
        let mut sets = self.sets.write().await;
        sets.insert(name.to_string(), rules);
        Ok(())
    }

    async fn policies(&self, name: &str) -> Result<Vec<PolicyRule>> {
        let sets = self.sets.read().await;
        sets.get(name)
            .cloned()
            .ok_or_else(|| CheckGuardError::NotFound(format!("policy set {}", name)))
    }
}

/// Decisions kept for the lifetime of the process.
#[derive(Default, Clone)]
pub struct InMemoryRunArchive {
    decisions: Arc<RwLock<HashMap<Uuid, FinalDecision>>>,
}

impl InMemoryRunArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunArchive for InMemoryRunArchive {
    async fn archive(&self, decision: &FinalDecision) -> Result<()> {
        let mut decisions = self.decisions.write().await;
        if decisions.contains_key(&decision.run_id) {
            return Err(CheckGuardError::InvariantViolation(format!(
                "run {} already archived",
                decision.run_id
            )));
        }
        decisions.insert(decision.run_id, decision.clone());
        Ok(())
    }

    async fn get(&self, run_id: Uuid) -> Result<Option<FinalDecision>> {
        let decisions = self.decisions.read().await;
        Ok(decisions.get(&run_id).cloned())
    }

    async fn for_case(&self, case_id: &str) -> Result<Vec<FinalDecision>> {
        let decisions = self.decisions.read().await;
        Ok(decisions
            .values()
            .filter(|decision| decision.case_id == case_id)
            .cloned()
            .collect())
    }
}
