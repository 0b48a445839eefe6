use super::LedgerStore;
use crate::error::CoordinatorError;
use crate::models::Assignment;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
enum Record {
    Insert { assignment: Assignment },
    Remove { agent_id: String },
}

/// Append-only JSON-lines ledger backend (§4.10). Every mutation is
/// appended as one record; on construction the log is replayed to
/// rebuild current state and then compacted. File I/O is blocking but
/// expected to stay sub-millisecond for local disk, matching the
/// latency budget in §5.
pub struct FileLedgerStore {
    path: PathBuf,
    state: Mutex<HashMap<String, Assignment>>,
}

impl FileLedgerStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoordinatorError> {
        let path = path.into();
        let state = Self::replay(&path)?;
        let store = Self {
            path,
            state: Mutex::new(state),
        };
        store.compact()?;
        Ok(store)
    }

    fn replay(path: &PathBuf) -> Result<HashMap<String, Assignment>, CoordinatorError> {
        let mut state = HashMap::new();
        let Ok(file) = fs::File::open(path) else {
            return Ok(state);
        };

        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let Ok(line) = line else {
                warn!("ledger file read error at line {line_no}, stopping replay");
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(&line) {
                Ok(Record::Insert { assignment }) => {
                    state.insert(assignment.agent_id.clone(), assignment);
                }
                Ok(Record::Remove { agent_id }) => {
                    state.remove(&agent_id);
                }
                Err(e) => {
                    warn!("dropping corrupt ledger record at line {line_no}: {e}");
                }
            }
        }
        Ok(state)
    }

    fn append(&self, record: &Record) -> Result<(), CoordinatorError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CoordinatorError::Configuration(format!("cannot open ledger file: {e}")))?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")
            .map_err(|e| CoordinatorError::Configuration(format!("cannot write ledger file: {e}")))?;
        Ok(())
    }

    /// Rewrites the log to contain only the current in-memory state, one
    /// insert record per live assignment.
    fn compact(&self) -> Result<(), CoordinatorError> {
        let state = self.state.lock().expect("ledger lock poisoned");
        let mut file = fs::File::create(&self.path)
            .map_err(|e| CoordinatorError::Configuration(format!("cannot compact ledger file: {e}")))?;
        for assignment in state.values() {
            let line = serde_json::to_string(&Record::Insert {
                assignment: assignment.clone(),
            })?;
            writeln!(file, "{line}")
                .map_err(|e| CoordinatorError::Configuration(format!("cannot write ledger file: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn insert(&self, assignment: Assignment) -> Result<(), CoordinatorError> {
        self.append(&Record::Insert {
            assignment: assignment.clone(),
        })?;
        let mut state = self.state.lock().expect("ledger lock poisoned");
        state.insert(assignment.agent_id.clone(), assignment);
        Ok(())
    }

    async fn try_claim(&self, assignment: Assignment) -> Result<bool, CoordinatorError> {
        let mut state = self.state.lock().expect("ledger lock poisoned");
        if state.values().any(|a| a.task_id == assignment.task_id) {
            return Ok(false);
        }
        self.append(&Record::Insert {
            assignment: assignment.clone(),
        })?;
        state.insert(assignment.agent_id.clone(), assignment);
        Ok(true)
    }

    async fn remove_by_agent(&self, agent_id: &str) -> Result<Option<Assignment>, CoordinatorError> {
        self.append(&Record::Remove {
            agent_id: agent_id.to_string(),
        })?;
        let mut state = self.state.lock().expect("ledger lock poisoned");
        Ok(state.remove(agent_id))
    }

    async fn get_by_agent(&self, agent_id: &str) -> Result<Option<Assignment>, CoordinatorError> {
        let state = self.state.lock().expect("ledger lock poisoned");
        Ok(state.get(agent_id).cloned())
    }

    async fn get_by_task(&self, task_id: &str) -> Result<Option<Assignment>, CoordinatorError> {
        let state = self.state.lock().expect("ledger lock poisoned");
        Ok(state.values().find(|a| a.task_id == task_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Assignment>, CoordinatorError> {
        let state = self.state.lock().expect("ledger lock poisoned");
        Ok(state.values().cloned().collect())
    }

    async fn expire_older_than(&self, max_age: Duration) -> Result<Vec<Assignment>, CoordinatorError> {
        let expired: Vec<Assignment> = {
            let state = self.state.lock().expect("ledger lock poisoned");
            let now = Utc::now();
            state
                .values()
                .filter(|a| {
                    let age = now.signed_duration_since(a.assigned_at);
                    age.num_seconds().max(0) as u64 >= max_age.as_secs()
                })
                .cloned()
                .collect()
        };
        for assignment in &expired {
            self.remove_by_agent(&assignment.agent_id).await?;
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn survives_restart_via_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");

        {
            let store = FileLedgerStore::open(&path).unwrap();
            store
                .insert(Assignment {
                    agent_id: "a1".into(),
                    task_id: "t1".into(),
                    assigned_at: Utc::now(),
                    lease_id: 1,
                    estimated_hours: None,
                })
                .await
                .unwrap();
        }

        let reopened = FileLedgerStore::open(&path).unwrap();
        let found = reopened.get_by_agent("a1").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn corrupt_trailing_record_is_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        fs::write(&path, "{\"action\":\"Insert\"\nnot json at all\n").unwrap();

        let store = FileLedgerStore::open(&path);
        assert!(store.is_ok());
    }
}
