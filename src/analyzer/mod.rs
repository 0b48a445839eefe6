//! `BoardAnalyzer`: board structure-quality scoring and classification
//! (SPEC_FULL §4.4). Results are cached per project for `cache_ttl` so a
//! burst of tool calls does not recompute the score on every request.

use crate::constants::{
    BOARD_CLASS_BASIC_MAX, BOARD_CLASS_CHAOTIC_MAX, BOARD_CLASS_GOOD_MAX,
    MIN_DESCRIPTION_LENGTH_FOR_QUALITY, MIN_LABELS_FOR_QUALITY, WEIGHT_DEPENDENCIES,
    WEIGHT_DESCRIPTIONS, WEIGHT_ESTIMATES, WEIGHT_LABELS, WEIGHT_PRIORITY,
};
use crate::models::{BoardClass, BoardQualityScore, ProjectSnapshot};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct BoardAnalyzer {
    cache_ttl: Duration,
    cache: Mutex<Option<(Instant, BoardQualityScore)>>,
}

impl BoardAnalyzer {
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            cache_ttl,
            cache: Mutex::new(None),
        }
    }

    /// Scores `snapshot`, reusing a cached result younger than
    /// `cache_ttl`. Callers that need a guaranteed-fresh score (e.g. after
    /// publishing new tasks) should construct a fresh `BoardAnalyzer` or
    /// call `score_uncached`.
    pub fn score(&self, snapshot: &ProjectSnapshot) -> BoardQualityScore {
        let mut cache = self.cache.lock().expect("analyzer cache poisoned");
        if let Some((computed_at, score)) = cache.as_ref() {
            if computed_at.elapsed() < self.cache_ttl {
                return score.clone();
            }
        }
        let score = Self::score_uncached(snapshot);
        *cache = Some((Instant::now(), score.clone()));
        score
    }

    pub fn score_uncached(snapshot: &ProjectSnapshot) -> BoardQualityScore {
        if snapshot.tasks.is_empty() {
            return BoardQualityScore {
                descriptions: 0.0,
                labels: 0.0,
                estimates: 0.0,
                priorities: 0.0,
                dependencies: 0.0,
                overall: 0.0,
                class: BoardClass::Empty,
            };
        }

        let total = snapshot.tasks.len() as f64;

        let descriptions = snapshot
            .tasks
            .iter()
            .filter(|t| t.description.len() >= MIN_DESCRIPTION_LENGTH_FOR_QUALITY)
            .count() as f64
            / total;

        let labels = snapshot
            .tasks
            .iter()
            .filter(|t| t.labels.len() >= MIN_LABELS_FOR_QUALITY)
            .count() as f64
            / total;

        let estimates = snapshot
            .tasks
            .iter()
            .filter(|t| t.estimated_hours.is_some_and(|h| h > 0.0))
            .count() as f64
            / total;

        let mut priority_counts: HashMap<crate::models::Priority, usize> = HashMap::new();
        for task in &snapshot.tasks {
            *priority_counts.entry(task.priority).or_insert(0) += 1;
        }
        let modal_count = priority_counts.values().copied().max().unwrap_or(0) as f64;
        let priorities = (1.0 - modal_count / total).max(0.0);

        let mut referenced = std::collections::HashSet::new();
        for task in &snapshot.tasks {
            if !task.dependencies.is_empty() {
                referenced.insert(task.id.clone());
                referenced.extend(task.dependencies.iter().cloned());
            }
        }
        let dependencies = snapshot
            .tasks
            .iter()
            .filter(|t| referenced.contains(&t.id))
            .count() as f64
            / total;

        let overall = descriptions * WEIGHT_DESCRIPTIONS
            + labels * WEIGHT_LABELS
            + estimates * WEIGHT_ESTIMATES
            + priorities * WEIGHT_PRIORITY
            + dependencies * WEIGHT_DEPENDENCIES;

        let class = if overall < BOARD_CLASS_CHAOTIC_MAX {
            BoardClass::Chaotic
        } else if overall < BOARD_CLASS_BASIC_MAX {
            BoardClass::Basic
        } else if overall < BOARD_CLASS_GOOD_MAX {
            BoardClass::Good
        } else {
            BoardClass::Excellent
        };

        BoardQualityScore {
            descriptions,
            labels,
            estimates,
            priorities,
            dependencies,
            overall,
            class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Task, TaskStatus};
    use std::collections::HashSet;

    fn task(id: &str, description: &str, labels: &[&str], estimate: Option<f64>) -> Task {
        Task {
            id: id.to_string(),
            title: id.to_string(),
            description: description.to_string(),
            status: TaskStatus::Todo,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            priority: Priority::Medium,
            estimated_hours: estimate,
            dependencies: vec![],
            assignee: None,
            phase: None,
        }
    }

    #[test]
    fn empty_board_is_its_own_class() {
        let snap = ProjectSnapshot::new(vec![]);
        let score = BoardAnalyzer::score_uncached(&snap);
        assert_eq!(score.class, BoardClass::Empty);
        assert_eq!(score.overall, 0.0);
    }

    #[test]
    fn well_described_labeled_estimated_board_scores_high() {
        let long_desc = "x".repeat(80);
        let tasks = vec![
            task("T1", &long_desc, &["component:auth", "skill:rust"], Some(4.0)),
            task("T2", &long_desc, &["component:api", "skill:rust"], Some(2.0)),
        ];
        let snap = ProjectSnapshot::new(tasks);
        let score = BoardAnalyzer::score_uncached(&snap);
        assert!(score.overall > BOARD_CLASS_GOOD_MAX, "{:?}", score);
        assert_eq!(score.class, BoardClass::Excellent);
    }

    #[test]
    fn sparse_board_is_chaotic() {
        let tasks = vec![task("T1", "", &[], None), task("T2", "", &[], None)];
        let snap = ProjectSnapshot::new(tasks);
        let score = BoardAnalyzer::score_uncached(&snap);
        assert_eq!(score.class, BoardClass::Chaotic);
    }

    #[test]
    fn cache_reuses_score_within_ttl() {
        let analyzer = BoardAnalyzer::new(Duration::from_secs(60));
        let snap = ProjectSnapshot::new(vec![task("T1", "short", &[], None)]);
        let first = analyzer.score(&snap);
        let bigger_snap = ProjectSnapshot::new(vec![
            task("T1", &"x".repeat(80), &["component:a", "skill:b"], Some(1.0)),
        ]);
        let second = analyzer.score(&bigger_snap);
        assert_eq!(first.overall, second.overall, "cached score should be reused");
    }
}
