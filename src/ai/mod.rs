//! `AIClient`: the typed boundary between the coordinator and an LLM
//! backend (SPEC_FULL §4.2). The core never parses free-form model
//! output itself — every operation returns a fixed, typed shape.

mod null;
mod scripted;

pub use null::NullAiClient;
pub use scripted::ScriptedAiClient;

use crate::error::CoordinatorError;
use crate::models::{Agent, Task};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrdParseOptions {
    pub team_size: Option<u32>,
    pub tech_stack: Vec<String>,
    pub complexity: Complexity,
}

impl Default for PrdParseOptions {
    fn default() -> Self {
        Self {
            team_size: None,
            tech_stack: Vec::new(),
            complexity: Complexity::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Mvp,
    Standard,
    Enterprise,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrdResult {
    pub features: Vec<String>,
    pub tech_stack: Vec<String>,
    pub constraints: Vec<String>,
    pub confidence: f64,
}

/// One task as proposed by project synthesis or feature insertion, before
/// it has been assigned a board id. `local_id` is only meaningful within
/// the plan and is rewritten to a board id as tasks are published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    pub local_id: String,
    pub title: String,
    pub description: String,
    pub labels: Vec<String>,
    pub priority: crate::models::Priority,
    pub estimated_hours: Option<f64>,
    pub phase: Option<String>,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    pub tasks: Vec<PlannedTask>,
    pub dependencies: Vec<(String, String)>,
    pub phases: Vec<String>,
    pub estimated_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockerSuggestion {
    pub suggestion: String,
    pub estimated_impact: String,
}

#[async_trait]
pub trait AIClient: Send + Sync {
    async fn parse_prd(
        &self,
        text: &str,
        options: &PrdParseOptions,
    ) -> Result<Option<PrdResult>, CoordinatorError>;

    async fn synthesize_tasks(
        &self,
        prd_result: &PrdResult,
    ) -> Result<Option<TaskPlan>, CoordinatorError>;

    async fn score_task_for_agent(
        &self,
        task: &Task,
        agent: &Agent,
    ) -> Result<Option<ScoreResult>, CoordinatorError>;

    async fn suggest_blocker_resolution(
        &self,
        task: &Task,
        description: &str,
        severity: Severity,
    ) -> Result<Option<BlockerSuggestion>, CoordinatorError>;
}
