//! `AssignmentEngine` (SPEC_FULL §4.9): the hot path. Picks the next task
//! for an agent, scores candidates, and atomically commits the choice to
//! the ledger and the board.

use crate::ai::AIClient;
use crate::board::{BoardClient, TaskPatch};
use crate::constants::{
    AI_RECOMMENDATION_FALLBACK_SCORE, MAX_ASSIGNMENT_CONTENTION_RETRIES, WEIGHT_AI_RECOMMENDATION,
    WEIGHT_PREDICTED_IMPACT, WEIGHT_PRIORITY, WEIGHT_SKILL_MATCH, WEIGHT_UNBLOCK_IMPACT,
};
use crate::dependency::SafetyChecker;
use crate::error::CoordinatorError;
use crate::ledger::AssignmentLedger;
use crate::models::{Agent, ProjectSnapshot, Task, TaskStatus};
use std::collections::HashSet;

#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskInstruction {
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
    pub estimated_hours: Option<f64>,
}

pub struct AssignmentEngine<'a> {
    pub board: &'a dyn BoardClient,
    pub ai: &'a dyn AIClient,
    pub ledger: &'a AssignmentLedger,
}

impl<'a> AssignmentEngine<'a> {
    pub fn new(board: &'a dyn BoardClient, ai: &'a dyn AIClient, ledger: &'a AssignmentLedger) -> Self {
        Self { board, ai, ledger }
    }

    pub async fn request_next_task(
        &self,
        agent: &Agent,
    ) -> Result<Option<TaskInstruction>, CoordinatorError> {
        if let Some(existing) = self.ledger.get_by_agent(&agent.agent_id).await? {
            let tasks = self.board.list_tasks().await?;
            if let Some(task) = tasks.iter().find(|t| t.id == existing.task_id) {
                return Ok(Some(instruction_for(task)));
            }
        }

        let mut excluded: HashSet<String> = HashSet::new();

        for _ in 0..=MAX_ASSIGNMENT_CONTENTION_RETRIES {
            // Re-read the board on every attempt: a task another agent won
            // in the meantime must disappear from the candidate pool, not
            // just get excluded by id (§5's "reads fresh per decision").
            let tasks = self.board.list_tasks().await?;
            let snapshot = ProjectSnapshot::new(tasks);

            let candidates: Vec<&Task> = self
                .candidate_tasks(&snapshot)
                .await?
                .into_iter()
                .filter(|t| !excluded.contains(&t.id))
                .collect();
            if candidates.is_empty() {
                return Ok(None);
            }

            let mut scored = Vec::with_capacity(candidates.len());
            for task in &candidates {
                let score = self.score_candidate(task, agent, &snapshot).await?;
                scored.push((*task, score));
            }

            scored.sort_by(|(a_task, a_score), (b_task, b_score)| {
                b_score
                    .partial_cmp(a_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| {
                        a_task
                            .estimated_hours
                            .unwrap_or(f64::MAX)
                            .partial_cmp(&b_task.estimated_hours.unwrap_or(f64::MAX))
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .then_with(|| a_task.id.cmp(&b_task.id))
            });

            let (chosen, _score) = scored[0];

            match self.ledger.assign(&agent.agent_id, &chosen.id, chosen.estimated_hours).await {
                Ok(_) => {}
                Err(CoordinatorError::Transient(_)) => {
                    // Lost the race for this task to another concurrent
                    // caller; drop it and retry selection (§5, §8 P1).
                    excluded.insert(chosen.id.clone());
                    continue;
                }
                Err(err) => return Err(err),
            }

            return match self
                .board
                .update_task(
                    &chosen.id,
                    TaskPatch {
                        status: Some(TaskStatus::InProgress),
                        assignee: Some(Some(agent.agent_id.clone())),
                        labels: None,
                    },
                )
                .await
            {
                Ok(_) => Ok(Some(instruction_for(chosen))),
                Err(CoordinatorError::Permanent(msg)) => {
                    self.ledger.release(&agent.agent_id).await?;
                    Err(CoordinatorError::Permanent(msg))
                }
                Err(other) => Err(other),
            };
        }

        Ok(None)
    }

    /// §4.9 step 3: a task is a candidate iff it's unassigned `todo` with
    /// every dependency done, and (the "never deploy what isn't built"
    /// invariant) no implementation task anywhere on the board is still
    /// unfinished if the candidate is itself a deployment task.
    async fn candidate_tasks<'s>(&self, snapshot: &'s ProjectSnapshot) -> Result<Vec<&'s Task>, CoordinatorError> {
        let implementation_incomplete = SafetyChecker::implementation_incomplete(&snapshot.tasks);

        let candidates = snapshot
            .tasks
            .iter()
            .filter(|t| t.is_candidate_status())
            .filter(|t| {
                t.dependencies.iter().all(|dep_id| {
                    snapshot
                        .task(dep_id)
                        .map(|dep| dep.is_done())
                        .unwrap_or(false)
                })
            })
            .filter(|t| {
                let is_deployment = crate::dependency::classify(&t.title, &t.labels.iter().cloned().collect::<Vec<_>>())
                    == crate::dependency::TaskKind::Deployment;
                !is_deployment || !implementation_incomplete
            })
            .collect();

        Ok(candidates)
    }

    async fn score_candidate(
        &self,
        task: &Task,
        agent: &Agent,
        snapshot: &ProjectSnapshot,
    ) -> Result<f64, CoordinatorError> {
        // |agent.skills ∩ task.skill-labels| / max(1, |task.skill-labels|) (§4.9),
        // literally including the empty-label-set case: a task with no
        // skill labels scores 0.0 here, not 1.0.
        let skill_labels = task.skill_labels();
        let agent_skills: HashSet<&str> = agent.skills.iter().map(String::as_str).collect();
        let overlap = skill_labels.intersection(&agent_skills).count();
        let skill_match = overlap as f64 / skill_labels.len().max(1) as f64;

        let priority = task.priority.score();

        let todo_count = snapshot.tasks.iter().filter(|t| t.status == TaskStatus::Todo).count().max(1);
        let unblocked = snapshot
            .tasks
            .iter()
            .filter(|t| t.dependencies.iter().any(|d| d == &task.id))
            .filter(|t| {
                t.dependencies
                    .iter()
                    .filter(|d| *d != &task.id)
                    .all(|d| snapshot.task(d).map(|dep| dep.is_done()).unwrap_or(false))
            })
            .count();
        let unblock_impact = (unblocked as f64 / todo_count as f64).min(1.0);

        let ai_recommendation = match self.ai.score_task_for_agent(task, agent).await? {
            Some(result) => result.score.clamp(0.0, 1.0),
            None => AI_RECOMMENDATION_FALLBACK_SCORE,
        };

        let predicted_impact = (priority * (1.0 + unblock_impact)).clamp(0.0, 1.0);

        Ok(skill_match * WEIGHT_SKILL_MATCH
            + priority * WEIGHT_PRIORITY
            + unblock_impact * WEIGHT_UNBLOCK_IMPACT
            + ai_recommendation * WEIGHT_AI_RECOMMENDATION
            + predicted_impact * WEIGHT_PREDICTED_IMPACT)
    }
}

fn instruction_for(task: &Task) -> TaskInstruction {
    let acceptance_criteria = task
        .labels
        .iter()
        .filter(|l| l.starts_with("type:"))
        .cloned()
        .collect::<Vec<_>>();

    TaskInstruction {
        task_id: task.id.clone(),
        title: task.title.clone(),
        description: task.description.clone(),
        acceptance_criteria,
        estimated_hours: task.estimated_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::NullAiClient;
    use crate::board::{InMemoryBoardClient, NewTask};
    use crate::ledger::InMemoryLedgerStore;
    use crate::models::Priority;

    fn agent(id: &str) -> Agent {
        Agent::new(id.to_string(), "Agent".to_string(), "dev".to_string(), HashSet::new())
    }

    #[tokio::test]
    async fn returns_none_when_board_is_empty() {
        let board = InMemoryBoardClient::new();
        let ai = NullAiClient;
        let ledger = AssignmentLedger::with_default_bounds(Box::new(InMemoryLedgerStore::new()));
        let engine = AssignmentEngine::new(&board, &ai, &ledger);

        let result = engine.request_next_task(&agent("a1")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn assigns_a_candidate_and_marks_board_in_progress() {
        let board = InMemoryBoardClient::new();
        board
            .create_task(NewTask {
                title: "Implement login".into(),
                description: "d".into(),
                priority: Priority::High,
                ..Default::default()
            })
            .await
            .unwrap();

        let ai = NullAiClient;
        let ledger = AssignmentLedger::with_default_bounds(Box::new(InMemoryLedgerStore::new()));
        let engine = AssignmentEngine::new(&board, &ai, &ledger);

        let instruction = engine.request_next_task(&agent("a1")).await.unwrap();
        assert!(instruction.is_some());

        let tasks = board.list_tasks().await.unwrap();
        let task = &tasks[0];
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.assignee.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn duplicate_request_returns_existing_assignment() {
        let board = InMemoryBoardClient::new();
        board
            .create_task(NewTask {
                title: "Implement login".into(),
                description: "d".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let ai = NullAiClient;
        let ledger = AssignmentLedger::with_default_bounds(Box::new(InMemoryLedgerStore::new()));
        let engine = AssignmentEngine::new(&board, &ai, &ledger);

        let first = engine.request_next_task(&agent("a1")).await.unwrap().unwrap();
        let second = engine.request_next_task(&agent("a1")).await.unwrap().unwrap();
        assert_eq!(first.task_id, second.task_id);
    }

    #[tokio::test]
    async fn deployment_task_is_not_a_candidate_while_implementation_is_unfinished() {
        let board = InMemoryBoardClient::new();
        board
            .create_task(NewTask {
                title: "Implement core logic".into(),
                description: "d".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        board
            .create_task(NewTask {
                title: "Deploy to production".into(),
                description: "d".into(),
                priority: Priority::Urgent,
                ..Default::default()
            })
            .await
            .unwrap();

        let ai = NullAiClient;
        let ledger = AssignmentLedger::with_default_bounds(Box::new(InMemoryLedgerStore::new()));
        let engine = AssignmentEngine::new(&board, &ai, &ledger);

        let instruction = engine.request_next_task(&agent("a1")).await.unwrap().unwrap();
        assert_eq!(instruction.title, "Implement core logic");
    }
}
