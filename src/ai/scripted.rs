use super::{
    AIClient, BlockerSuggestion, PrdParseOptions, PrdResult, ScoreResult, Severity, TaskPlan,
};
use crate::error::CoordinatorError;
use crate::models::{Agent, Task};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Test double that returns pre-recorded typed responses in FIFO order
/// per operation, mirroring a live model closely enough to exercise the
/// exact engine code path a real `AIClient` would run through.
#[derive(Default)]
pub struct ScriptedAiClient {
    prd_responses: Mutex<Vec<Option<PrdResult>>>,
    plan_responses: Mutex<Vec<Option<TaskPlan>>>,
    score_responses: Mutex<Vec<Option<ScoreResult>>>,
    blocker_responses: Mutex<Vec<Option<BlockerSuggestion>>>,
}

impl ScriptedAiClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_prd_result(&self, result: Option<PrdResult>) -> &Self {
        self.prd_responses.try_lock().unwrap().push(result);
        self
    }

    pub fn push_task_plan(&self, plan: Option<TaskPlan>) -> &Self {
        self.plan_responses.try_lock().unwrap().push(plan);
        self
    }

    pub fn push_score(&self, score: Option<ScoreResult>) -> &Self {
        self.score_responses.try_lock().unwrap().push(score);
        self
    }

    pub fn push_blocker_suggestion(&self, suggestion: Option<BlockerSuggestion>) -> &Self {
        self.blocker_responses.try_lock().unwrap().push(suggestion);
        self
    }
}

#[async_trait]
impl AIClient for ScriptedAiClient {
    async fn parse_prd(
        &self,
        _text: &str,
        _options: &PrdParseOptions,
    ) -> Result<Option<PrdResult>, CoordinatorError> {
        let mut queue = self.prd_responses.lock().await;
        Ok(if queue.is_empty() { None } else { queue.remove(0) })
    }

    async fn synthesize_tasks(
        &self,
        _prd_result: &PrdResult,
    ) -> Result<Option<TaskPlan>, CoordinatorError> {
        let mut queue = self.plan_responses.lock().await;
        Ok(if queue.is_empty() { None } else { queue.remove(0) })
    }

    async fn score_task_for_agent(
        &self,
        _task: &Task,
        _agent: &Agent,
    ) -> Result<Option<ScoreResult>, CoordinatorError> {
        let mut queue = self.score_responses.lock().await;
        Ok(if queue.is_empty() { None } else { queue.remove(0) })
    }

    async fn suggest_blocker_resolution(
        &self,
        _task: &Task,
        _description: &str,
        _severity: Severity,
    ) -> Result<Option<BlockerSuggestion>, CoordinatorError> {
        let mut queue = self.blocker_responses.lock().await;
        Ok(if queue.is_empty() { None } else { queue.remove(0) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_queued_responses_in_order_then_falls_back_to_none() {
        let client = ScriptedAiClient::new();
        client.push_score(Some(ScoreResult {
            score: 0.9,
            rationale: "good fit".into(),
        }));

        let task = crate::models::Task {
            id: "T1".into(),
            title: "t".into(),
            description: "d".into(),
            status: crate::models::TaskStatus::Todo,
            labels: Default::default(),
            priority: crate::models::Priority::Medium,
            estimated_hours: None,
            dependencies: vec![],
            assignee: None,
            phase: None,
        };
        let agent = crate::models::Agent::new(
            "a1".into(),
            "agent".into(),
            "dev".into(),
            Default::default(),
        );

        let first = client.score_task_for_agent(&task, &agent).await.unwrap();
        assert_eq!(first.unwrap().score, 0.9);

        let second = client.score_task_for_agent(&task, &agent).await.unwrap();
        assert!(second.is_none());
    }
}
