//! `BoardClient`: the abstract capability set the coordinator needs from
//! whichever kanban provider backs a project (SPEC_FULL §4.1). Concrete
//! provider adapters (GitHub Projects, Linear, ...) implement this trait;
//! only an in-memory reference implementation ships here.

mod memory;

pub use memory::InMemoryBoardClient;

use crate::error::CoordinatorError;
use crate::models::Task;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fields accepted when creating a task. `dependencies` carries
/// coordinator-local ids (e.g. synthesizer-assigned) which the caller is
/// responsible for translating to board ids once each dependency has
/// itself been created (SPEC_FULL §4.6 step 4).
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub labels: HashSet<String>,
    pub priority: crate::models::Priority,
    pub estimated_hours: Option<f64>,
    pub dependencies: Vec<String>,
    pub phase: Option<String>,
}

/// A partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub status: Option<crate::models::TaskStatus>,
    pub assignee: Option<Option<String>>,
    pub labels: Option<HashSet<String>>,
}

/// One of a small fixed set of column-ish states a provider may expose;
/// providers without columns treat this as a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardColumn {
    Todo,
    InProgress,
    Done,
}

#[async_trait]
pub trait BoardClient: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, CoordinatorError>;

    async fn create_task(&self, spec: NewTask) -> Result<Task, CoordinatorError>;

    async fn update_task(&self, task_id: &str, patch: TaskPatch) -> Result<Task, CoordinatorError>;

    async fn add_comment(&self, task_id: &str, text: &str) -> Result<(), CoordinatorError>;

    async fn move_task(&self, task_id: &str, column: BoardColumn) -> Result<(), CoordinatorError>;
}

#[cfg(test)]
mod contract_tests {
    use super::*;

    /// Any `BoardClient` implementation must satisfy this contract; the
    /// in-memory client's own tests invoke it directly (`memory.rs`), and
    /// a real provider adapter should do the same against a sandbox
    /// account.
    pub async fn create_then_list_round_trips(client: &dyn BoardClient) {
        let created = client
            .create_task(NewTask {
                title: "round trip".to_string(),
                description: "d".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let tasks = client.list_tasks().await.unwrap();
        assert!(tasks.iter().any(|t| t.id == created.id));
    }
}
