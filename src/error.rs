use thiserror::Error;

/// Convenience alias for Results carrying a `CoordinatorError`.
pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// All errors that can cross a component boundary in the coordinator.
///
/// Every variant maps to one `error_kind` string returned to a worker
/// through the tool surface (see `CoordinatorError::kind`).
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("board request failed (retriable): {0}")]
    Transient(String),

    #[error("board request failed: {0}")]
    Permanent(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("illegal state transition for agent {agent_id}: {message}")]
    AgentState { agent_id: String, message: String },

    #[error("dependency graph has a cycle that could not be repaired: {0}")]
    CyclicPlan(String),

    #[error("safety invariant violated: {0}")]
    SafetyViolation(String),

    #[error("no live assignment for agent {agent_id} and task {task_id}")]
    NoSuchAssignment { agent_id: String, task_id: String },

    #[error("agent {0} is already registered")]
    DuplicateAgent(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("board is non-empty; pass allow_on_nonempty to proceed")]
    NonEmptyBoard,

    #[error("invalid status transition: {0}")]
    InvalidStatus(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoordinatorError {
    /// Machine-readable discriminant surfaced to workers alongside the
    /// human-readable message.
    pub fn kind(&self) -> &'static str {
        match self {
            CoordinatorError::Transient(_) => "transient_error",
            CoordinatorError::Permanent(_) => "permanent_error",
            CoordinatorError::NotFound(_) => "not_found",
            CoordinatorError::AgentState { .. } => "agent_state_error",
            CoordinatorError::CyclicPlan(_) => "cyclic_plan_error",
            CoordinatorError::SafetyViolation(_) => "safety_violation_error",
            CoordinatorError::NoSuchAssignment { .. } => "no_such_assignment",
            CoordinatorError::DuplicateAgent(_) => "duplicate_agent",
            CoordinatorError::Timeout(_) => "timeout",
            CoordinatorError::NonEmptyBoard => "non_empty_board",
            CoordinatorError::InvalidStatus(_) => "invalid_status",
            CoordinatorError::Validation(_) => "validation_error",
            CoordinatorError::Configuration(_) => "configuration_error",
            CoordinatorError::Config(_) => "configuration_error",
            CoordinatorError::Http(_) => "transient_error",
            CoordinatorError::Serialization(_) => "permanent_error",
            CoordinatorError::Internal(_) => "internal_error",
        }
    }

    /// Whether the engine should retry this error with backoff rather than
    /// surface it immediately.
    pub fn is_retriable(&self) -> bool {
        matches!(self, CoordinatorError::Transient(_) | CoordinatorError::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_for_worker_facing_variants() {
        assert_eq!(CoordinatorError::NonEmptyBoard.kind(), "non_empty_board");
        assert_eq!(
            CoordinatorError::DuplicateAgent("a1".into()).kind(),
            "duplicate_agent"
        );
        assert_eq!(
            CoordinatorError::NoSuchAssignment {
                agent_id: "a1".into(),
                task_id: "t1".into()
            }
            .kind(),
            "no_such_assignment"
        );
    }

    #[test]
    fn transient_errors_are_retriable() {
        assert!(CoordinatorError::Transient("timeout".into()).is_retriable());
        assert!(!CoordinatorError::Permanent("bad request".into()).is_retriable());
    }
}
