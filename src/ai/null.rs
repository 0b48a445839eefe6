use super::{
    AIClient, BlockerSuggestion, PrdParseOptions, PrdResult, ScoreResult, Severity, TaskPlan,
};
use crate::error::CoordinatorError;
use crate::models::{Agent, Task};
use async_trait::async_trait;

/// Always reports `unavailable`. Used when `ai.enabled = false`; every
/// caller must have a deterministic fallback path (SPEC_FULL §4.2).
pub struct NullAiClient;

#[async_trait]
impl AIClient for NullAiClient {
    async fn parse_prd(
        &self,
        _text: &str,
        _options: &PrdParseOptions,
    ) -> Result<Option<PrdResult>, CoordinatorError> {
        Ok(None)
    }

    async fn synthesize_tasks(
        &self,
        _prd_result: &PrdResult,
    ) -> Result<Option<TaskPlan>, CoordinatorError> {
        Ok(None)
    }

    async fn score_task_for_agent(
        &self,
        _task: &Task,
        _agent: &Agent,
    ) -> Result<Option<ScoreResult>, CoordinatorError> {
        Ok(None)
    }

    async fn suggest_blocker_resolution(
        &self,
        _task: &Task,
        _description: &str,
        _severity: Severity,
    ) -> Result<Option<BlockerSuggestion>, CoordinatorError> {
        Ok(None)
    }
}
