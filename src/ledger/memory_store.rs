use super::LedgerStore;
use crate::error::CoordinatorError;
use crate::models::Assignment;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// Pure in-memory backend: tests and ephemeral single-run deployments.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    by_agent: RwLock<HashMap<String, Assignment>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert(&self, assignment: Assignment) -> Result<(), CoordinatorError> {
        let mut guard = self.by_agent.write().expect("ledger lock poisoned");
        guard.insert(assignment.agent_id.clone(), assignment);
        Ok(())
    }

    async fn try_claim(&self, assignment: Assignment) -> Result<bool, CoordinatorError> {
        let mut guard = self.by_agent.write().expect("ledger lock poisoned");
        if guard.values().any(|a| a.task_id == assignment.task_id) {
            return Ok(false);
        }
        guard.insert(assignment.agent_id.clone(), assignment);
        Ok(true)
    }

    async fn remove_by_agent(&self, agent_id: &str) -> Result<Option<Assignment>, CoordinatorError> {
        let mut guard = self.by_agent.write().expect("ledger lock poisoned");
        Ok(guard.remove(agent_id))
    }

    async fn get_by_agent(&self, agent_id: &str) -> Result<Option<Assignment>, CoordinatorError> {
        let guard = self.by_agent.read().expect("ledger lock poisoned");
        Ok(guard.get(agent_id).cloned())
    }

    async fn get_by_task(&self, task_id: &str) -> Result<Option<Assignment>, CoordinatorError> {
        let guard = self.by_agent.read().expect("ledger lock poisoned");
        Ok(guard.values().find(|a| a.task_id == task_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Assignment>, CoordinatorError> {
        let guard = self.by_agent.read().expect("ledger lock poisoned");
        Ok(guard.values().cloned().collect())
    }

    async fn expire_older_than(&self, max_age: Duration) -> Result<Vec<Assignment>, CoordinatorError> {
        let mut guard = self.by_agent.write().expect("ledger lock poisoned");
        let now = Utc::now();
        let expired: Vec<String> = guard
            .values()
            .filter(|a| {
                let age = now.signed_duration_since(a.assigned_at);
                age.num_seconds().max(0) as u64 >= max_age.as_secs()
            })
            .map(|a| a.agent_id.clone())
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for agent_id in expired {
            if let Some(assignment) = guard.remove(&agent_id) {
                removed.push(assignment);
            }
        }
        Ok(removed)
    }
}
