//! `AssignmentLedger` (SPEC_FULL §4.10): the durable record of which
//! agent currently holds which task. A `LedgerStore` backend persists
//! entries; `AssignmentLedger` layers lease-TTL computation and the
//! background sweeper on top of whichever store is configured.

mod file_store;
mod memory_store;

pub use file_store::FileLedgerStore;
pub use memory_store::InMemoryLedgerStore;

use crate::board::{BoardClient, TaskPatch};
use crate::constants::{
    DEFAULT_LEASE_CEILING_SECS, DEFAULT_LEASE_FLOOR_SECS, LEASE_ESTIMATE_MULTIPLIER,
};
use crate::error::CoordinatorError;
use crate::models::{Assignment, TaskStatus};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert(&self, assignment: Assignment) -> Result<(), CoordinatorError>;
    /// Atomically inserts `assignment` unless another live assignment
    /// already holds the same `task_id`, in which case it returns `false`
    /// and leaves the store untouched. This is the compare-and-set
    /// primitive that keeps two concurrent `request_next_task` calls from
    /// both winning the same task (§5, §8 P1).
    async fn try_claim(&self, assignment: Assignment) -> Result<bool, CoordinatorError>;
    async fn remove_by_agent(&self, agent_id: &str) -> Result<Option<Assignment>, CoordinatorError>;
    async fn get_by_agent(&self, agent_id: &str) -> Result<Option<Assignment>, CoordinatorError>;
    async fn get_by_task(&self, task_id: &str) -> Result<Option<Assignment>, CoordinatorError>;
    async fn list_all(&self) -> Result<Vec<Assignment>, CoordinatorError>;
    /// Returns, and removes, every assignment older than `max_age`.
    async fn expire_older_than(&self, max_age: Duration) -> Result<Vec<Assignment>, CoordinatorError>;
}

pub struct AssignmentLedger {
    store: Box<dyn LedgerStore>,
    lease_floor: Duration,
    lease_ceiling: Duration,
    next_lease_id: AtomicU64,
}

impl AssignmentLedger {
    pub fn new(store: Box<dyn LedgerStore>, lease_floor: Duration, lease_ceiling: Duration) -> Self {
        Self {
            store,
            lease_floor,
            lease_ceiling,
            next_lease_id: AtomicU64::new(1),
        }
    }

    pub fn with_default_bounds(store: Box<dyn LedgerStore>) -> Self {
        Self::new(
            store,
            Duration::from_secs(DEFAULT_LEASE_FLOOR_SECS),
            Duration::from_secs(DEFAULT_LEASE_CEILING_SECS),
        )
    }

    /// `stale_after = clamp(2 * estimated_hours, floor, ceiling)` (§4.10).
    pub fn lease_ttl_for(&self, estimated_hours: Option<f64>) -> Duration {
        let hours = estimated_hours.unwrap_or(1.0).max(0.0);
        let seconds = (hours * 3600.0 * LEASE_ESTIMATE_MULTIPLIER) as u64;
        Duration::from_secs(seconds.clamp(
            self.lease_floor.as_secs(),
            self.lease_ceiling.as_secs(),
        ))
    }

    /// Claims `task_id` for `agent_id`, or returns `CoordinatorError::Transient`
    /// if another live assignment already holds that task (the caller is
    /// expected to drop the task from its candidate pool and retry
    /// selection, per §5's ordering guarantee).
    pub async fn assign(
        &self,
        agent_id: &str,
        task_id: &str,
        estimated_hours: Option<f64>,
    ) -> Result<Assignment, CoordinatorError> {
        let lease_id = self.next_lease_id.fetch_add(1, Ordering::SeqCst);
        let assignment = Assignment {
            agent_id: agent_id.to_string(),
            task_id: task_id.to_string(),
            assigned_at: Utc::now(),
            lease_id,
            estimated_hours,
        };
        if !self.store.try_claim(assignment.clone()).await? {
            return Err(CoordinatorError::Transient(format!(
                "task {task_id} was claimed by another agent"
            )));
        }
        Ok(assignment)
    }

    pub async fn release(&self, agent_id: &str) -> Result<Option<Assignment>, CoordinatorError> {
        self.store.remove_by_agent(agent_id).await
    }

    pub async fn get_by_agent(&self, agent_id: &str) -> Result<Option<Assignment>, CoordinatorError> {
        self.store.get_by_agent(agent_id).await
    }

    pub async fn get_by_task(&self, task_id: &str) -> Result<Option<Assignment>, CoordinatorError> {
        self.store.get_by_task(task_id).await
    }

    pub async fn list_all(&self) -> Result<Vec<Assignment>, CoordinatorError> {
        self.store.list_all().await
    }

    /// Sweeps every assignment whose lease (computed from its own
    /// `estimated_hours`) has expired, reverting the board task to
    /// `todo`/unassigned and leaving a comment explaining why.
    pub async fn sweep_expired(&self, board: &dyn BoardClient) -> Result<usize, CoordinatorError> {
        let all = self.store.list_all().await?;
        let mut expired_count = 0;

        for assignment in all {
            let ttl = self.lease_ttl_for(assignment.estimated_hours);
            let age = Utc::now().signed_duration_since(assignment.assigned_at);
            let age = Duration::from_secs(age.num_seconds().max(0) as u64);
            if age < ttl {
                continue;
            }

            self.store.remove_by_agent(&assignment.agent_id).await?;
            board
                .update_task(
                    &assignment.task_id,
                    TaskPatch {
                        status: Some(TaskStatus::Todo),
                        assignee: Some(None),
                        labels: None,
                    },
                )
                .await?;
            board
                .add_comment(
                    &assignment.task_id,
                    &format!(
                        "Lease for agent {} expired after {:?}; task returned to the pool.",
                        assignment.agent_id, ttl
                    ),
                )
                .await?;
            expired_count += 1;
        }

        Ok(expired_count)
    }

    /// Crash recovery (§4.10): cross-checks every surviving lease against
    /// the board. A lease whose task is no longer `in_progress`, or is
    /// held by a different assignee, is dropped.
    pub async fn reconcile_with_board(&self, board: &dyn BoardClient) -> Result<usize, CoordinatorError> {
        let tasks = board.list_tasks().await?;
        let all = self.store.list_all().await?;
        let mut dropped = 0;

        for assignment in all {
            let still_valid = tasks.iter().any(|t| {
                t.id == assignment.task_id
                    && t.status == TaskStatus::InProgress
                    && t.assignee.as_deref() == Some(assignment.agent_id.as_str())
            });
            if !still_valid {
                self.store.remove_by_agent(&assignment.agent_id).await?;
                dropped += 1;
            }
        }

        Ok(dropped)
    }
}
