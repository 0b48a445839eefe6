//! `ProgressTracker` (SPEC_FULL §4.11): workers report progress and
//! blockers through here. Every call is validated against a live
//! assignment in the ledger before it touches the board.

use crate::ai::{AIClient, BlockerSuggestion, Severity};
use crate::board::{BoardClient, TaskPatch};
use crate::error::CoordinatorError;
use crate::ledger::AssignmentLedger;
use crate::models::TaskStatus;
use crate::validation::ContentValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedStatus {
    InProgress,
    Completed,
    Blocked,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressAck {
    pub acknowledged: bool,
}

pub struct ProgressTracker<'a> {
    pub board: &'a dyn BoardClient,
    pub ai: &'a dyn AIClient,
    pub ledger: &'a AssignmentLedger,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(board: &'a dyn BoardClient, ai: &'a dyn AIClient, ledger: &'a AssignmentLedger) -> Self {
        Self { board, ai, ledger }
    }

    pub async fn report_task_progress(
        &self,
        agent_id: &str,
        task_id: &str,
        status: ReportedStatus,
        _progress: u8,
        message: &str,
    ) -> Result<ProgressAck, CoordinatorError> {
        let assignment = self.ledger.get_by_agent(agent_id).await?;
        let live = match assignment {
            Some(a) if a.task_id == task_id => Some(a),
            _ => None,
        };

        if live.is_none() {
            // Completed reports are idempotent: a duplicate after the
            // ledger entry was already removed is accepted silently.
            if status == ReportedStatus::Completed {
                return Ok(ProgressAck { acknowledged: true });
            }
            return Err(CoordinatorError::NoSuchAssignment {
                agent_id: agent_id.to_string(),
                task_id: task_id.to_string(),
            });
        }

        let validator = ContentValidator::new()?;
        let sanitized_message = validator.validate_and_sanitize_description(message).unwrap_or_default();

        match status {
            ReportedStatus::InProgress => {
                if !sanitized_message.is_empty() {
                    self.board.add_comment(task_id, &sanitized_message).await?;
                }
            }
            ReportedStatus::Completed => {
                self.ledger.release(agent_id).await?;
                self.board
                    .update_task(
                        task_id,
                        TaskPatch {
                            status: Some(TaskStatus::Done),
                            assignee: None,
                            labels: None,
                        },
                    )
                    .await?;
            }
            ReportedStatus::Blocked => {
                self.ledger.release(agent_id).await?;
                self.board
                    .update_task(
                        task_id,
                        TaskPatch {
                            status: Some(TaskStatus::Blocked),
                            assignee: None,
                            labels: None,
                        },
                    )
                    .await?;
                if !sanitized_message.is_empty() {
                    self.board.add_comment(task_id, &sanitized_message).await?;
                }

                if let Some(task) = self.board.list_tasks().await?.into_iter().find(|t| t.id == task_id) {
                    let severity = if sanitized_message.is_empty() {
                        Severity::Low
                    } else {
                        Severity::Medium
                    };
                    if let Some(suggestion) = self
                        .ai
                        .suggest_blocker_resolution(&task, &sanitized_message, severity)
                        .await?
                    {
                        self.board
                            .add_comment(task_id, &format!("Suggested resolution: {}", suggestion.suggestion))
                            .await?;
                    }
                }
            }
        }

        Ok(ProgressAck { acknowledged: true })
    }

    pub async fn report_blocker(
        &self,
        agent_id: &str,
        task_id: &str,
        description: &str,
        severity: Severity,
    ) -> Result<Option<BlockerSuggestion>, CoordinatorError> {
        let assignment = self.ledger.get_by_agent(agent_id).await?;
        match assignment {
            Some(a) if a.task_id == task_id => {}
            _ => {
                return Err(CoordinatorError::NoSuchAssignment {
                    agent_id: agent_id.to_string(),
                    task_id: task_id.to_string(),
                })
            }
        }

        let validator = ContentValidator::new()?;
        let sanitized = validator.validate_and_sanitize_description(description)?;

        self.ledger.release(agent_id).await?;
        self.board.add_comment(task_id, &sanitized).await?;
        self.board
            .update_task(
                task_id,
                TaskPatch {
                    status: Some(TaskStatus::Blocked),
                    assignee: None,
                    labels: None,
                },
            )
            .await?;

        let tasks = self.board.list_tasks().await?;
        let task = tasks
            .into_iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| CoordinatorError::NotFound(format!("task {task_id}")))?;

        self.ai.suggest_blocker_resolution(&task, &sanitized, severity).await
    }
}
