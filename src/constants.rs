//! Coordinator-wide tuning constants.

/// Description length threshold used by the "descriptions" board-quality
/// subscore (SPEC_FULL §4.4).
pub const MIN_DESCRIPTION_LENGTH_FOR_QUALITY: usize = 50;

/// Minimum label count for a task to count as "labeled" in the "labels"
/// subscore.
pub const MIN_LABELS_FOR_QUALITY: usize = 2;

/// Board-quality classification boundaries (§4.4). Ties round down.
pub const BOARD_CLASS_CHAOTIC_MAX: f64 = 0.3;
pub const BOARD_CLASS_BASIC_MAX: f64 = 0.6;
pub const BOARD_CLASS_GOOD_MAX: f64 = 0.8;

/// Board-quality subscore weights, summing to 1.0.
pub const WEIGHT_DESCRIPTIONS: f64 = 0.25;
pub const WEIGHT_LABELS: f64 = 0.20;
pub const WEIGHT_ESTIMATES: f64 = 0.25;
pub const WEIGHT_PRIORITIES: f64 = 0.15;
pub const WEIGHT_DEPENDENCIES: f64 = 0.15;

/// Assignment-scoring weights (§4.9), summing to 1.0.
pub const WEIGHT_SKILL_MATCH: f64 = 0.15;
pub const WEIGHT_PRIORITY: f64 = 0.15;
pub const WEIGHT_UNBLOCK_IMPACT: f64 = 0.25;
pub const WEIGHT_AI_RECOMMENDATION: f64 = 0.30;
pub const WEIGHT_PREDICTED_IMPACT: f64 = 0.15;

/// Fallback score used in place of `AIClient::score_task_for_agent` when
/// the AI client is unavailable.
pub const AI_RECOMMENDATION_FALLBACK_SCORE: f64 = 0.5;

/// Default board-quality cache lifetime (`analyzer.cache_ttl`).
pub const DEFAULT_ANALYZER_CACHE_TTL_SECS: u64 = 5;

/// Lease TTL bounds (§4.10): `stale_after = clamp(2 * estimated_hours, floor, ceiling)`.
pub const DEFAULT_LEASE_FLOOR_SECS: u64 = 3600;
pub const DEFAULT_LEASE_CEILING_SECS: u64 = 24 * 3600;
pub const LEASE_ESTIMATE_MULTIPLIER: f64 = 2.0;

/// Retry policy for `BoardClient`/`AIClient` transient failures (§5, §7).
pub const RETRY_INITIAL_BACKOFF_MS: u64 = 500;
pub const RETRY_BACKOFF_FACTOR: u32 = 2;
pub const RETRY_MAX_BACKOFF_MS: u64 = 8_000;
pub const BOARD_CALL_BUDGET_SECS: u64 = 30;
pub const AI_CALL_BUDGET_SECS: u64 = 60;

/// Bound on repeated cycle-repair attempts during dependency inference
/// before `CyclicPlanError` is raised (§4.8).
pub const MAX_CYCLE_REPAIR_ATTEMPTS: usize = 8;

/// Feature-insertion auto-detect label/token overlap threshold (§4.7).
pub const FEATURE_INTEGRATION_OVERLAP_THRESHOLD: f64 = 0.34;

/// Default board-sweeper cadence for expiring stale leases.
pub const LEASE_SWEEP_INTERVAL_SECS: u64 = 60;

/// Bound on re-running candidate selection when `AssignmentEngine` loses a
/// race to claim a task another concurrent caller just took (§5, §8 P1).
pub const MAX_ASSIGNMENT_CONTENTION_RETRIES: usize = 8;
