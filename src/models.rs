use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// A unit of work as tracked on the external board.
///
/// The board is the source of truth for a task's fields; the coordinator
/// never invents a `task_id` — it is always board-assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub labels: HashSet<String>,
    pub priority: Priority,
    pub estimated_hours: Option<f64>,
    pub dependencies: Vec<String>,
    pub assignee: Option<String>,
    pub phase: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    Done,
}

/// Total priority ordering: `Urgent > High > Medium > Low`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Numeric weight used by the assignment scorer (§4.9).
    pub fn score(&self) -> f64 {
        match self {
            Priority::Urgent => 1.0,
            Priority::High => 0.75,
            Priority::Medium => 0.5,
            Priority::Low => 0.25,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

impl Task {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    pub fn is_candidate_status(&self) -> bool {
        self.status == TaskStatus::Todo && self.assignee.is_none()
    }

    /// Labels in the `component:*` namespace (§4.3, §10).
    pub fn component_labels(&self) -> HashSet<&str> {
        Label::values_in_namespace(&self.labels, "component")
    }

    /// Labels in the `skill:*` namespace, used for skill-match scoring.
    pub fn skill_labels(&self) -> HashSet<&str> {
        Label::values_in_namespace(&self.labels, "skill")
    }

    pub fn type_labels(&self) -> HashSet<&str> {
        Label::values_in_namespace(&self.labels, "type")
    }
}

/// Helpers for the reserved label namespaces `phase:*`, `component:*`,
/// `type:*`, `priority:*`, `skill:*` (SPEC_FULL §10). Shared by
/// `BoardAnalyzer`, `DependencyInferer`, `AssignmentEngine`, and
/// `FeatureInserter` so the prefix convention is defined exactly once.
pub struct Label;

impl Label {
    pub fn make(namespace: &str, value: &str) -> String {
        format!("{namespace}:{value}")
    }

    pub fn namespace_of(label: &str) -> Option<&str> {
        label.split_once(':').map(|(ns, _)| ns)
    }

    pub fn value_of(label: &str) -> Option<&str> {
        label.split_once(':').map(|(_, v)| v)
    }

    pub fn values_in_namespace<'a>(
        labels: &'a HashSet<String>,
        namespace: &str,
    ) -> HashSet<&'a str> {
        labels
            .iter()
            .filter_map(|l| l.split_once(':'))
            .filter(|(ns, _)| *ns == namespace)
            .map(|(_, v)| v)
            .collect()
    }
}

/// An external autonomous worker connected to the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub agent_id: String,
    pub name: String,
    pub role: String,
    pub skills: HashSet<String>,
    pub current_task: Option<String>,
    pub completed_count: u32,
}

impl Agent {
    pub fn new(agent_id: String, name: String, role: String, skills: HashSet<String>) -> Self {
        Self {
            agent_id,
            name,
            role,
            skills,
            current_task: None,
            completed_count: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current_task.is_none()
    }
}

/// A live hold of one task by one agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub agent_id: String,
    pub task_id: String,
    pub assigned_at: chrono::DateTime<chrono::Utc>,
    pub lease_id: u64,
    /// Snapshot of the estimate used to compute the lease TTL, so a sweep
    /// does not need to re-fetch the task from the board.
    pub estimated_hours: Option<f64>,
}

/// An immutable read of the board taken at one point in time. Every
/// engine decision operates on a snapshot, never a live, mutating view.
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    pub tasks: Vec<Task>,
    pub labels_in_use: HashSet<String>,
    pub captured_at: chrono::DateTime<chrono::Utc>,
}

impl ProjectSnapshot {
    pub fn new(tasks: Vec<Task>) -> Self {
        let labels_in_use = tasks.iter().flat_map(|t| t.labels.iter().cloned()).collect();
        Self {
            tasks,
            labels_in_use,
            captured_at: chrono::Utc::now(),
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn completion_percentage(&self) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        let done = self.tasks.iter().filter(|t| t.is_done()).count();
        (done as f64 / self.tasks.len() as f64) * 100.0
    }
}

/// Board structure-quality classification (§3, §4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BoardClass {
    Empty,
    Chaotic,
    Basic,
    Good,
    Excellent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardQualityScore {
    pub descriptions: f64,
    pub labels: f64,
    pub estimates: f64,
    pub priorities: f64,
    pub dependencies: f64,
    pub overall: f64,
    pub class: BoardClass,
}

/// Coordinator operating mode (§4.5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Creator,
    Enricher,
    Adaptive,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creator" => Ok(Mode::Creator),
            "enricher" => Ok(Mode::Enricher),
            "adaptive" => Ok(Mode::Adaptive),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}
