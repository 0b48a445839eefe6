//! `FeatureInserter` (SPEC_FULL §4.7): inserts a small task plan for one
//! feature into an already-populated board, wiring it into the existing
//! dependency graph at the requested integration point.

use crate::ai::AIClient;
use crate::board::{BoardClient, NewTask};
use crate::constants::FEATURE_INTEGRATION_OVERLAP_THRESHOLD;
use crate::dependency::SafetyChecker;
use crate::error::CoordinatorError;
use crate::models::{Label, ProjectSnapshot, Task, TaskStatus};
use crate::validation::ContentValidator;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationPoint {
    AutoDetect,
    AfterCurrent,
    Parallel,
    NewPhase,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct InsertFeatureOutcome {
    pub tasks_created: usize,
    pub integration_point: String,
}

pub struct FeatureInserter<'a> {
    pub board: &'a dyn BoardClient,
    pub ai: &'a dyn AIClient,
}

impl<'a> FeatureInserter<'a> {
    pub fn new(board: &'a dyn BoardClient, ai: &'a dyn AIClient) -> Self {
        Self { board, ai }
    }

    pub async fn insert_feature(
        &self,
        feature_description: &str,
        feature_name: &str,
        integration_point: IntegrationPoint,
    ) -> Result<InsertFeatureOutcome, CoordinatorError> {
        let validator = ContentValidator::new()?;
        let description = validator.validate_and_sanitize_description(feature_description)?;

        let tasks = self.board.list_tasks().await?;
        let snapshot = ProjectSnapshot::new(tasks);

        let mut plan = match self
            .ai
            .parse_prd(&description, &crate::ai::PrdParseOptions::default())
            .await?
        {
            Some(prd) => self
                .ai
                .synthesize_tasks(&prd)
                .await?
                .unwrap_or_else(|| small_fallback_plan(&description, feature_name)),
            None => small_fallback_plan(&description, feature_name),
        };

        match integration_point {
            IntegrationPoint::AutoDetect => self.auto_detect_links(&mut plan, &snapshot),
            IntegrationPoint::AfterCurrent => after_current_links(&mut plan, &snapshot),
            IntegrationPoint::Parallel => {}
            IntegrationPoint::NewPhase => new_phase_links(&mut plan, &snapshot, feature_name),
        }

        crate::dependency::DependencyInferer::infer(&mut plan.tasks)?;

        let (published, _missing) = crate::synthesizer::publish_plan(self.board, &plan).await?;

        let mut all_tasks = snapshot.tasks.clone();
        all_tasks.extend(published.iter().cloned());
        SafetyChecker::check(&all_tasks)?;

        Ok(InsertFeatureOutcome {
            tasks_created: published.len(),
            integration_point: format!("{integration_point:?}"),
        })
    }

    fn auto_detect_links(&self, plan: &mut crate::ai::TaskPlan, snapshot: &ProjectSnapshot) {
        for planned in &mut plan.tasks {
            let title_tokens: HashSet<&str> = planned.title.split_whitespace().collect();
            let label_set: HashSet<&str> = planned.labels.iter().map(String::as_str).collect();

            let mut best: Option<(&Task, f64)> = None;
            for existing in &snapshot.tasks {
                let existing_tokens: HashSet<&str> = existing.title.split_whitespace().collect();
                let token_overlap = jaccard(&title_tokens, &existing_tokens);
                let existing_labels: HashSet<&str> = existing.labels.iter().map(String::as_str).collect();
                let label_overlap = jaccard(&label_set, &existing_labels);
                let overlap = token_overlap.max(label_overlap);

                if overlap >= FEATURE_INTEGRATION_OVERLAP_THRESHOLD
                    && overlap > best.map(|(_, s)| s).unwrap_or(0.0)
                {
                    best = Some((existing, overlap));
                }
            }

            if let Some((matched, _)) = best {
                if !planned.depends_on.contains(&matched.id) {
                    planned.depends_on.push(matched.id.clone());
                }
            } else if let Some(component) = planned
                .labels
                .iter()
                .filter_map(|l| l.strip_prefix("component:"))
                .next()
            {
                if let Some(latest_unfinished) = snapshot
                    .tasks
                    .iter()
                    .filter(|t| t.component_labels().contains(component) && !t.is_done())
                    .max_by_key(|t| t.id.clone())
                {
                    planned.depends_on.push(latest_unfinished.id.clone());
                }
            }
        }
    }
}

fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

fn after_current_links(plan: &mut crate::ai::TaskPlan, snapshot: &ProjectSnapshot) {
    let mut anchors: Vec<&Task> = snapshot
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress)
        .collect();

    if anchors.is_empty() {
        let mut all: Vec<&Task> = snapshot.tasks.iter().collect();
        all.sort_by(|a, b| b.id.cmp(&a.id));
        anchors = all.into_iter().take(1).collect();
    }

    for planned in &mut plan.tasks {
        for anchor in &anchors {
            if !planned.depends_on.contains(&anchor.id) {
                planned.depends_on.push(anchor.id.clone());
            }
        }
    }
}

fn new_phase_links(plan: &mut crate::ai::TaskPlan, snapshot: &ProjectSnapshot, feature_name: &str) {
    let new_phase_label = Label::make("phase", feature_name);
    let previous_terminal = snapshot
        .tasks
        .iter()
        .filter(|t| t.phase.as_deref() == Some("deployment"))
        .max_by_key(|t| t.id.clone());

    for planned in &mut plan.tasks {
        planned.phase = Some(feature_name.to_string());
        if !planned.labels.contains(&new_phase_label) {
            planned.labels.push(new_phase_label.clone());
        }
        if let Some(anchor) = previous_terminal {
            if !planned.depends_on.contains(&anchor.id) {
                planned.depends_on.push(anchor.id.clone());
            }
        }
    }
}

fn small_fallback_plan(description: &str, feature_name: &str) -> crate::ai::TaskPlan {
    use crate::ai::PlannedTask;
    use crate::models::Priority;

    let tasks = vec![
        PlannedTask {
            local_id: "feature-design".to_string(),
            title: format!("Design {feature_name}"),
            description: format!("Sketch the approach for: {description}"),
            labels: vec![Label::make("component", feature_name)],
            priority: Priority::Medium,
            estimated_hours: Some(2.0),
            phase: Some("design".to_string()),
            depends_on: vec![],
        },
        PlannedTask {
            local_id: "feature-impl".to_string(),
            title: format!("Implement {feature_name}"),
            description: description.to_string(),
            labels: vec![Label::make("component", feature_name)],
            priority: Priority::Medium,
            estimated_hours: Some(6.0),
            phase: Some("implementation".to_string()),
            depends_on: vec!["feature-design".to_string()],
        },
        PlannedTask {
            local_id: "feature-test".to_string(),
            title: format!("Test {feature_name}"),
            description: format!("Verify {feature_name} behaves as described."),
            labels: vec![Label::make("component", feature_name)],
            priority: Priority::Medium,
            estimated_hours: Some(3.0),
            phase: Some("testing".to_string()),
            depends_on: vec!["feature-impl".to_string()],
        },
        PlannedTask {
            local_id: "feature-docs".to_string(),
            title: format!("Document {feature_name}"),
            description: format!("Write user-facing documentation for {feature_name}."),
            labels: vec![Label::make("component", feature_name)],
            priority: Priority::Low,
            estimated_hours: Some(2.0),
            phase: Some("testing".to_string()),
            depends_on: vec!["feature-impl".to_string()],
        },
    ];

    crate::ai::TaskPlan {
        tasks,
        dependencies: vec![],
        phases: vec!["design".to_string(), "implementation".to_string(), "testing".to_string()],
        estimated_days: 2,
    }
}
