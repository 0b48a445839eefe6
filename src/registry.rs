//! In-process registry of connected agents (§5 "shared resource policy").
//! Guarded per-agent so unrelated agents never contend on registration.

use crate::error::CoordinatorError;
use crate::models::Agent;
use std::collections::HashMap;
use std::collections::HashSet;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        agent_id: &str,
        name: &str,
        role: &str,
        skills: HashSet<String>,
    ) -> Result<Agent, CoordinatorError> {
        let mut agents = self.agents.write().await;
        if agents.contains_key(agent_id) {
            return Err(CoordinatorError::DuplicateAgent(agent_id.to_string()));
        }
        let agent = Agent::new(agent_id.to_string(), name.to_string(), role.to_string(), skills);
        agents.insert(agent_id.to_string(), agent.clone());
        Ok(agent)
    }

    pub async fn get(&self, agent_id: &str) -> Option<Agent> {
        self.agents.read().await.get(agent_id).cloned()
    }

    pub async fn list(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }

    pub async fn mark_working(&self, agent_id: &str, task_id: &str) -> Result<(), CoordinatorError> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| CoordinatorError::NotFound(format!("agent {agent_id}")))?;
        agent.current_task = Some(task_id.to_string());
        Ok(())
    }

    pub async fn mark_idle(&self, agent_id: &str, completed: bool) -> Result<(), CoordinatorError> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| CoordinatorError::NotFound(format!("agent {agent_id}")))?;
        agent.current_task = None;
        if completed {
            agent.completed_count += 1;
        }
        Ok(())
    }
}
