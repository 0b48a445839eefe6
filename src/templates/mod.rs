//! Deterministic project templates used when `AIClient` is unavailable
//! (SPEC_FULL §4.6 step 1, §10 "Supplemented feature: deterministic
//! template library"). Each template expands into a complete,
//! phase-ordered task skeleton so `ai.enabled = false` deployments stay
//! fully functional, not merely non-crashing.

use crate::ai::{Complexity, PlannedTask, PrdResult, TaskPlan};
use crate::models::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectTemplate {
    WebApp,
    ApiService,
    Cli,
    DataPipeline,
}

impl ProjectTemplate {
    const KEYWORDS: &'static [(ProjectTemplate, &'static [&'static str])] = &[
        (
            ProjectTemplate::WebApp,
            &["web", "ui", "frontend", "website", "dashboard", "app"],
        ),
        (
            ProjectTemplate::ApiService,
            &["api", "rest", "endpoint", "service", "backend", "microservice"],
        ),
        (
            ProjectTemplate::Cli,
            &["cli", "command-line", "command line", "terminal", "script"],
        ),
        (
            ProjectTemplate::DataPipeline,
            &["pipeline", "etl", "ingest", "data processing", "batch"],
        ),
    ];

    /// Keyword-scores `description` against every template and returns the
    /// best match, or `None` if nothing scores above 0.3 of its keyword
    /// set (§4.6 step 1 fallback rule).
    pub fn match_description(description: &str) -> Option<Self> {
        let lowered = description.to_lowercase();
        let mut best: Option<(Self, f64)> = None;

        for (template, keywords) in Self::KEYWORDS {
            let hits = keywords.iter().filter(|kw| lowered.contains(*kw)).count();
            let score = hits as f64 / keywords.len() as f64;
            if score > best.map(|(_, s)| s).unwrap_or(0.0) {
                best = Some((*template, score));
            }
        }

        best.filter(|(_, score)| *score > 0.3).map(|(t, _)| t)
    }

    pub fn prd_result(self, description: &str) -> PrdResult {
        let (features, tech_stack, constraints) = match self {
            ProjectTemplate::WebApp => (
                vec!["user interface".into(), "authentication".into()],
                vec!["html".into(), "css".into(), "javascript".into()],
                vec!["single deployment target".into()],
            ),
            ProjectTemplate::ApiService => (
                vec!["rest endpoints".into(), "authentication".into()],
                vec!["rust".into()],
                vec!["stateless request handling".into()],
            ),
            ProjectTemplate::Cli => (
                vec!["argument parsing".into(), "core command logic".into()],
                vec!["rust".into()],
                vec!["single binary distribution".into()],
            ),
            ProjectTemplate::DataPipeline => (
                vec!["ingestion".into(), "transformation".into(), "output sink".into()],
                vec!["rust".into()],
                vec!["batch processing".into()],
            ),
        };
        PrdResult {
            features,
            tech_stack,
            constraints,
            confidence: if description.trim().is_empty() { 0.3 } else { 0.6 },
        }
    }

    /// Deterministic task-plan expansion standing in for
    /// `AIClient::synthesize_tasks` (§4.6 step 2).
    pub fn task_plan(self, complexity: Complexity) -> TaskPlan {
        let component = match self {
            ProjectTemplate::WebApp => "web",
            ProjectTemplate::ApiService => "api",
            ProjectTemplate::Cli => "cli",
            ProjectTemplate::DataPipeline => "pipeline",
        };

        let mut tasks = vec![
            planned("setup-1", "Initialize project scaffold", "setup", component, Priority::High, 2.0),
            planned("setup-2", "Configure CI pipeline", "setup", component, Priority::Medium, 3.0),
            planned("design-1", "Design data model", "design", component, Priority::High, 4.0),
            planned(
                "impl-1",
                &format!("Implement core {component} logic"),
                "implementation",
                component,
                Priority::High,
                8.0,
            ),
            planned(
                "impl-2",
                "Implement authentication",
                "implementation",
                component,
                Priority::Medium,
                6.0,
            ),
            planned(
                "impl-3",
                "Implement error handling and logging",
                "implementation",
                component,
                Priority::Medium,
                4.0,
            ),
            planned(
                "test-1",
                "Write unit and integration tests",
                "testing",
                component,
                Priority::Medium,
                6.0,
            ),
            planned(
                "deploy-1",
                "Deploy to production",
                "deployment",
                component,
                Priority::Urgent,
                3.0,
            ),
        ];

        if complexity == Complexity::Enterprise {
            tasks.insert(
                6,
                planned(
                    "test-2",
                    "Load and security testing",
                    "testing",
                    component,
                    Priority::High,
                    8.0,
                ),
            );
        }

        let phases = vec![
            "setup".to_string(),
            "design".to_string(),
            "implementation".to_string(),
            "testing".to_string(),
            "deployment".to_string(),
        ];
        let estimated_days = (tasks.iter().filter_map(|t| t.estimated_hours).sum::<f64>() / 6.0).ceil() as u32;

        TaskPlan {
            tasks,
            dependencies: vec![],
            phases,
            estimated_days,
        }
    }
}

fn planned(
    local_id: &str,
    title: &str,
    phase: &str,
    component: &str,
    priority: Priority,
    estimated_hours: f64,
) -> PlannedTask {
    PlannedTask {
        local_id: local_id.to_string(),
        title: title.to_string(),
        description: format!("{title} for the {component} component."),
        labels: vec![
            crate::models::Label::make("phase", phase),
            crate::models::Label::make("component", component),
        ],
        priority,
        estimated_hours: Some(estimated_hours),
        phase: Some(phase.to_string()),
        depends_on: vec![],
    }
}
