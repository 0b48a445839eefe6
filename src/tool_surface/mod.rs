//! `ToolSurface` (SPEC_FULL §4.12, §6): the exact ten worker-facing
//! operations, dispatched over whatever transport the caller wires up
//! (HTTP/JSON in `api/`, a stdio framing elsewhere). Stateless per call;
//! all state lives in `CoordinatorState`.
//!
//! Enforces the per-agent session state machine (unregistered -> idle ->
//! working -> idle) and serializes calls for a single agent via a
//! per-agent `tokio::sync::Mutex` keyed in a concurrent map (SPEC_FULL §5).

use crate::ai::Severity;
use crate::assignment::{AssignmentEngine, TaskInstruction};
use crate::error::CoordinatorError;
use crate::feature_inserter::{FeatureInserter, IntegrationPoint, InsertFeatureOutcome};
use crate::mode::ModeSelector;
use crate::models::{Agent, BoardQualityScore, Mode, ProjectSnapshot};
use crate::progress::{ProgressAck, ProgressTracker, ReportedStatus};
use crate::state::CoordinatorState;
use crate::synthesizer::{CreateProjectOptions, CreateProjectOutcome, ProjectSynthesizer};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Working,
}

#[derive(Default)]
struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl SessionRegistry {
    async fn require_idle(&self, agent_id: &str) -> Result<(), CoordinatorError> {
        let sessions = self.sessions.lock().await;
        match sessions.get(agent_id) {
            None | Some(SessionState::Idle) => Ok(()),
            Some(SessionState::Working) => Err(CoordinatorError::AgentState {
                agent_id: agent_id.to_string(),
                message: "agent already holds a task".to_string(),
            }),
        }
    }

    async fn set(&self, agent_id: &str, state: SessionState) {
        self.sessions.lock().await.insert(agent_id.to_string(), state);
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RegisterAgentResult {
    pub success: bool,
    pub agent: Agent,
}

#[derive(Debug, serde::Serialize)]
pub struct RequestNextTaskResult {
    pub has_task: bool,
    pub assignment: Option<TaskInstruction>,
}

#[derive(Debug, serde::Serialize)]
pub struct AgentStatusResult {
    pub found: bool,
    pub agent: Option<Agent>,
}

#[derive(Debug, serde::Serialize)]
pub struct ProjectStatusResult {
    pub totals: usize,
    pub completion_pct: f64,
    pub board_quality: BoardQualityScore,
    pub mode: Mode,
}

#[derive(Debug, serde::Serialize)]
pub struct PingResult {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Dispatches the ten operations of SPEC_FULL §6 against a shared
/// `CoordinatorState`. One instance is shared (behind an `Arc`) across
/// every connection.
pub struct ToolSurface {
    state: Arc<CoordinatorState>,
    sessions: SessionRegistry,
}

impl ToolSurface {
    pub fn new(state: Arc<CoordinatorState>) -> Self {
        Self {
            state,
            sessions: SessionRegistry::default(),
        }
    }

    pub async fn register_agent(
        &self,
        agent_id: &str,
        name: &str,
        role: &str,
        skills: HashSet<String>,
    ) -> Result<RegisterAgentResult, CoordinatorError> {
        let agent = self.state.registry.register(agent_id, name, role, skills).await?;
        self.sessions.set(agent_id, SessionState::Idle).await;
        Ok(RegisterAgentResult { success: true, agent })
    }

    pub async fn request_next_task(
        &self,
        agent_id: &str,
    ) -> Result<RequestNextTaskResult, CoordinatorError> {
        self.sessions.require_idle(agent_id).await?;
        let agent = self
            .state
            .registry
            .get(agent_id)
            .await
            .ok_or_else(|| CoordinatorError::NotFound(format!("agent {agent_id}")))?;

        let engine = AssignmentEngine::new(self.state.board.as_ref(), self.state.ai.as_ref(), &self.state.ledger);
        let instruction = engine.request_next_task(&agent).await?;

        if let Some(task) = &instruction {
            self.state.registry.mark_working(agent_id, &task.task_id).await?;
            self.sessions.set(agent_id, SessionState::Working).await;
        }

        Ok(RequestNextTaskResult {
            has_task: instruction.is_some(),
            assignment: instruction,
        })
    }

    pub async fn report_task_progress(
        &self,
        agent_id: &str,
        task_id: &str,
        status: ReportedStatus,
        progress: u8,
        message: &str,
    ) -> Result<ProgressAck, CoordinatorError> {
        let tracker = ProgressTracker::new(self.state.board.as_ref(), self.state.ai.as_ref(), &self.state.ledger);
        let ack = tracker
            .report_task_progress(agent_id, task_id, status, progress, message)
            .await?;

        if matches!(status, ReportedStatus::Completed | ReportedStatus::Blocked) {
            let completed = status == ReportedStatus::Completed;
            self.state.registry.mark_idle(agent_id, completed).await.ok();
            self.sessions.set(agent_id, SessionState::Idle).await;
        }

        Ok(ack)
    }

    pub async fn report_blocker(
        &self,
        agent_id: &str,
        task_id: &str,
        description: &str,
        severity: Severity,
    ) -> Result<Option<crate::ai::BlockerSuggestion>, CoordinatorError> {
        let tracker = ProgressTracker::new(self.state.board.as_ref(), self.state.ai.as_ref(), &self.state.ledger);
        let suggestion = tracker.report_blocker(agent_id, task_id, description, severity).await?;
        self.state.registry.mark_idle(agent_id, false).await.ok();
        self.sessions.set(agent_id, SessionState::Idle).await;
        Ok(suggestion)
    }

    pub async fn get_agent_status(&self, agent_id: &str) -> AgentStatusResult {
        let agent = self.state.registry.get(agent_id).await;
        AgentStatusResult {
            found: agent.is_some(),
            agent,
        }
    }

    pub async fn list_registered_agents(&self) -> Vec<Agent> {
        self.state.registry.list().await
    }

    pub async fn get_project_status(&self) -> Result<ProjectStatusResult, CoordinatorError> {
        let tasks = self.state.board.list_tasks().await?;
        let snapshot = ProjectSnapshot::new(tasks);
        let score = self.state.analyzer.score(&snapshot);
        let mode = ModeSelector::select(&score, None);

        Ok(ProjectStatusResult {
            totals: snapshot.tasks.len(),
            completion_pct: snapshot.completion_percentage(),
            board_quality: score,
            mode,
        })
    }

    pub async fn create_project_from_description(
        &self,
        description: &str,
        options: &CreateProjectOptions,
    ) -> Result<CreateProjectOutcome, CoordinatorError> {
        let synthesizer = ProjectSynthesizer::new(self.state.board.as_ref(), self.state.ai.as_ref());
        synthesizer.create_project(description, options).await
    }

    pub async fn add_feature(
        &self,
        feature_description: &str,
        feature_name: &str,
        integration_point: IntegrationPoint,
    ) -> Result<InsertFeatureOutcome, CoordinatorError> {
        let inserter = FeatureInserter::new(self.state.board.as_ref(), self.state.ai.as_ref());
        inserter
            .insert_feature(feature_description, feature_name, integration_point)
            .await
    }

    pub async fn ping(&self) -> PingResult {
        PingResult {
            status: "ok",
            service: "project-coordinator",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
