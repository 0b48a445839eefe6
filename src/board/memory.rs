use super::{BoardClient, BoardColumn, NewTask, TaskPatch};
use crate::error::CoordinatorError;
use crate::models::{Task, TaskStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Reference `BoardClient` used by tests, demos, and single-process
/// deployments that do not need a real provider (SPEC_FULL §4.1).
pub struct InMemoryBoardClient {
    tasks: RwLock<HashMap<String, Task>>,
    next_id: AtomicU64,
    comments: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryBoardClient {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            comments: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let max_id = tasks
            .iter()
            .filter_map(|t| t.id.strip_prefix('T').and_then(|n| n.parse::<u64>().ok()))
            .max()
            .unwrap_or(0);
        let by_id = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            tasks: RwLock::new(by_id),
            next_id: AtomicU64::new(max_id + 1),
            comments: RwLock::new(HashMap::new()),
        }
    }

    fn next_task_id(&self) -> String {
        format!("T{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    pub async fn comments_for(&self, task_id: &str) -> Vec<String> {
        self.comments
            .read()
            .await
            .get(task_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for InMemoryBoardClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BoardClient for InMemoryBoardClient {
    async fn list_tasks(&self) -> Result<Vec<Task>, CoordinatorError> {
        Ok(self.tasks.read().await.values().cloned().collect())
    }

    async fn create_task(&self, spec: NewTask) -> Result<Task, CoordinatorError> {
        let id = self.next_task_id();
        let task = Task {
            id: id.clone(),
            title: spec.title,
            description: spec.description,
            status: TaskStatus::Todo,
            labels: spec.labels,
            priority: spec.priority,
            estimated_hours: spec.estimated_hours,
            dependencies: spec.dependencies,
            assignee: None,
            phase: spec.phase,
        };
        self.tasks.write().await.insert(id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, task_id: &str, patch: TaskPatch) -> Result<Task, CoordinatorError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| CoordinatorError::NotFound(format!("task {task_id}")))?;

        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(assignee) = patch.assignee {
            task.assignee = assignee;
        }
        if let Some(labels) = patch.labels {
            task.labels = labels;
        }
        Ok(task.clone())
    }

    async fn add_comment(&self, task_id: &str, text: &str) -> Result<(), CoordinatorError> {
        if !self.tasks.read().await.contains_key(task_id) {
            return Err(CoordinatorError::NotFound(format!("task {task_id}")));
        }
        self.comments
            .write()
            .await
            .entry(task_id.to_string())
            .or_default()
            .push(text.to_string());
        Ok(())
    }

    async fn move_task(&self, task_id: &str, column: BoardColumn) -> Result<(), CoordinatorError> {
        let status = match column {
            BoardColumn::Todo => TaskStatus::Todo,
            BoardColumn::InProgress => TaskStatus::InProgress,
            BoardColumn::Done => TaskStatus::Done,
        };
        self.update_task(
            task_id,
            TaskPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }
}
