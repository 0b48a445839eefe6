//! `PRDParser` + `ProjectSynthesizer` (SPEC_FULL §4.6): turns free-form
//! project prose into a published, dependency-safe task set.

use crate::ai::{AIClient, Complexity, PrdParseOptions, PrdResult, TaskPlan};
use crate::board::{BoardClient, NewTask};
use crate::dependency::{DependencyInferer, SafetyChecker};
use crate::error::CoordinatorError;
use crate::models::Task;
use crate::templates::ProjectTemplate;
use crate::validation::ContentValidator;
use std::collections::HashMap;

/// Recognized options for project creation (§4.6). Unlike `AIClient`'s
/// own option bag, `deadline` is informational only and is not consumed
/// by any downstream component yet.
#[derive(Debug, Clone, Default)]
pub struct CreateProjectOptions {
    pub team_size: Option<u32>,
    pub tech_stack: Vec<String>,
    pub deadline: Option<String>,
    pub allow_on_nonempty: bool,
    pub complexity: Option<Complexity>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CreateProjectOutcome {
    pub tasks_created: usize,
    pub phases: Vec<String>,
    pub estimated_days: u32,
    pub dependencies_mapped: usize,
    pub risk_level: String,
    pub confidence: f64,
    pub missing_tasks: Vec<String>,
}

pub struct ProjectSynthesizer<'a> {
    pub board: &'a dyn BoardClient,
    pub ai: &'a dyn AIClient,
}

impl<'a> ProjectSynthesizer<'a> {
    pub fn new(board: &'a dyn BoardClient, ai: &'a dyn AIClient) -> Self {
        Self { board, ai }
    }

    pub async fn create_project(
        &self,
        description: &str,
        options: &CreateProjectOptions,
    ) -> Result<CreateProjectOutcome, CoordinatorError> {
        let validator = ContentValidator::new()?;
        let description = validator.validate_and_sanitize_description(description)?;

        if !options.allow_on_nonempty {
            let existing = self.board.list_tasks().await?;
            if !existing.is_empty() {
                return Err(CoordinatorError::NonEmptyBoard);
            }
        }

        let complexity = options.complexity.unwrap_or(Complexity::Standard);
        let parse_options = PrdParseOptions {
            team_size: options.team_size,
            tech_stack: options.tech_stack.clone(),
            complexity,
        };

        let (prd_result, confidence_floor) = match self.ai.parse_prd(&description, &parse_options).await? {
            Some(result) => (result, 1.0),
            None => {
                let template = ProjectTemplate::match_description(&description)
                    .unwrap_or(ProjectTemplate::WebApp);
                (template.prd_result(&description), 0.6)
            }
        };

        let mut plan = match self.ai.synthesize_tasks(&prd_result).await? {
            Some(plan) => plan,
            None => {
                let template = ProjectTemplate::match_description(&description)
                    .unwrap_or(ProjectTemplate::WebApp);
                template.task_plan(complexity)
            }
        };

        if !options.tech_stack.is_empty() {
            for task in &mut plan.tasks {
                for stack_item in &options.tech_stack {
                    task.labels.push(crate::models::Label::make("skill", stack_item));
                }
            }
        }

        DependencyInferer::infer(&mut plan.tasks)?;

        let (published, missing) = publish_plan(self.board, &plan).await?;
        SafetyChecker::check(&published)?;

        Ok(CreateProjectOutcome {
            tasks_created: published.len(),
            phases: plan.phases.clone(),
            estimated_days: plan.estimated_days,
            dependencies_mapped: plan.tasks.iter().map(|t| t.depends_on.len()).sum(),
            risk_level: risk_level_for(prd_result.confidence.min(confidence_floor)),
            confidence: prd_result.confidence.min(confidence_floor),
            missing_tasks: missing,
        })
    }
}

fn risk_level_for(confidence: f64) -> String {
    if confidence >= 0.8 {
        "low".to_string()
    } else if confidence >= 0.5 {
        "medium".to_string()
    } else {
        "high".to_string()
    }
}

/// Publishes a `TaskPlan` in dependency-topological order, translating
/// local ids to board-assigned ids as each task is created. A task whose
/// dependency failed to publish is skipped and reported as missing,
/// rather than aborting the whole plan (§4.6 step 4 roll-forward).
pub async fn publish_plan(
    board: &dyn BoardClient,
    plan: &crate::ai::TaskPlan,
) -> Result<(Vec<Task>, Vec<String>), CoordinatorError> {
    let order = topological_order(&plan.tasks);
    let mut local_to_board: HashMap<String, String> = HashMap::new();
    let mut published = Vec::new();
    let mut missing = Vec::new();

    for local_id in order {
        let Some(planned) = plan.tasks.iter().find(|t| t.local_id == local_id) else {
            continue;
        };

        let mut unresolved = false;
        let mut board_deps = Vec::with_capacity(planned.depends_on.len());
        for dep in &planned.depends_on {
            match local_to_board.get(dep) {
                Some(board_id) => board_deps.push(board_id.clone()),
                None => {
                    unresolved = true;
                    break;
                }
            }
        }
        if unresolved {
            missing.push(planned.title.clone());
            continue;
        }

        let spec = NewTask {
            title: planned.title.clone(),
            description: planned.description.clone(),
            labels: planned.labels.iter().cloned().collect(),
            priority: planned.priority,
            estimated_hours: planned.estimated_hours,
            dependencies: board_deps,
            phase: planned.phase.clone(),
        };

        match board.create_task(spec).await {
            Ok(task) => {
                local_to_board.insert(local_id, task.id.clone());
                published.push(task);
            }
            Err(CoordinatorError::Permanent(_)) => {
                missing.push(planned.title.clone());
            }
            Err(other) => return Err(other),
        }
    }

    Ok((published, missing))
}

fn topological_order(tasks: &[crate::ai::PlannedTask]) -> Vec<String> {
    let mut indegree: HashMap<&str, usize> = tasks.iter().map(|t| (t.local_id.as_str(), 0)).collect();
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();

    for task in tasks {
        for dep in &task.depends_on {
            edges.entry(dep.as_str()).or_default().push(&task.local_id);
            if let Some(deg) = indegree.get_mut(task.local_id.as_str()) {
                *deg += 1;
            }
        }
    }

    let mut queue: Vec<&str> = indegree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| *id)
        .collect();
    queue.sort();

    let mut order = Vec::with_capacity(tasks.len());
    let mut idx = 0;
    while idx < queue.len() {
        let node = queue[idx];
        idx += 1;
        order.push(node.to_string());
        if let Some(next) = edges.get(node) {
            let mut newly_ready: Vec<&str> = Vec::new();
            for &n in next {
                if let Some(deg) = indegree.get_mut(n) {
                    *deg -= 1;
                    if *deg == 0 {
                        newly_ready.push(n);
                    }
                }
            }
            newly_ready.sort();
            queue.extend(newly_ready);
        }
    }

    // Any task not reached (leftover cycle) is appended so publish_plan can
    // still report it as missing rather than silently dropping it.
    for task in tasks {
        if !order.contains(&task.local_id) {
            order.push(task.local_id.clone());
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::NullAiClient;
    use crate::board::InMemoryBoardClient;

    #[tokio::test]
    async fn creates_project_from_description_without_ai() {
        let board = InMemoryBoardClient::new();
        let ai = NullAiClient;
        let synthesizer = ProjectSynthesizer::new(&board, &ai);

        let outcome = synthesizer
            .create_project("Build a web app dashboard for tracking expenses", &CreateProjectOptions::default())
            .await
            .unwrap();

        assert!(outcome.tasks_created > 0);
        assert_eq!(outcome.missing_tasks.len(), 0);
    }

    #[tokio::test]
    async fn refuses_nonempty_board_without_opt_in() {
        let board = InMemoryBoardClient::new();
        board
            .create_task(NewTask {
                title: "existing".into(),
                description: "d".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let ai = NullAiClient;
        let synthesizer = ProjectSynthesizer::new(&board, &ai);

        let result = synthesizer
            .create_project("Build a CLI tool", &CreateProjectOptions::default())
            .await;
        assert!(matches!(result, Err(CoordinatorError::NonEmptyBoard)));
    }

    #[tokio::test]
    async fn allow_on_nonempty_appends_tasks() {
        let board = InMemoryBoardClient::new();
        board
            .create_task(NewTask {
                title: "existing".into(),
                description: "d".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let ai = NullAiClient;
        let synthesizer = ProjectSynthesizer::new(&board, &ai);

        let options = CreateProjectOptions {
            allow_on_nonempty: true,
            ..Default::default()
        };
        let outcome = synthesizer
            .create_project("Build a REST API service", &options)
            .await
            .unwrap();
        assert!(outcome.tasks_created > 0);
    }

    #[tokio::test]
    async fn published_plan_satisfies_deployment_safety_invariant() {
        let board = InMemoryBoardClient::new();
        let ai = NullAiClient;
        let synthesizer = ProjectSynthesizer::new(&board, &ai);

        synthesizer
            .create_project("Build a data pipeline ETL job", &CreateProjectOptions::default())
            .await
            .unwrap();

        let tasks = board.list_tasks().await.unwrap();
        assert!(SafetyChecker::check(&tasks).is_ok());
    }
}
