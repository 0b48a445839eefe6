//! Retry-with-backoff and circuit-breaker protection for calls into
//! `BoardClient`/`AIClient` implementations that cross a network boundary
//! (SPEC_FULL §5, §7).

use crate::error::CoordinatorError;
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::constants::{RETRY_BACKOFF_FACTOR, RETRY_INITIAL_BACKOFF_MS, RETRY_MAX_BACKOFF_MS};

/// Retries `op` while it returns a retriable `CoordinatorError`, backing off
/// exponentially (`RETRY_INITIAL_BACKOFF_MS`, factor `RETRY_BACKOFF_FACTOR`,
/// capped at `RETRY_MAX_BACKOFF_MS`) until `budget` elapses.
pub async fn with_retry<T, F, Fut>(budget: Duration, mut op: F) -> Result<T, CoordinatorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoordinatorError>>,
{
    let deadline = Instant::now() + budget;
    let mut backoff_ms = RETRY_INITIAL_BACKOFF_MS;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retriable() && Instant::now() < deadline => {
                warn!("retriable error, backing off {}ms: {}", backoff_ms, err);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * RETRY_BACKOFF_FACTOR as u64).min(RETRY_MAX_BACKOFF_MS);
            }
            Err(err) => return Err(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_duration: Duration,
    pub success_threshold: u32,
    pub failure_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout_duration: Duration::from_secs(60),
            success_threshold: 3,
            failure_window: Duration::from_secs(300),
        }
    }
}

/// Guards a single external dependency (one board provider, or the AI
/// backend) against repeatedly retrying a service that is down.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: RwLock<CircuitState>,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    last_failure_time: RwLock<Option<Instant>>,
    last_state_change: RwLock<Instant>,
    total_requests: AtomicU64,
    total_failures: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            last_failure_time: RwLock::new(None),
            last_state_change: RwLock::new(Instant::now()),
            total_requests: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
        }
    }

    pub async fn should_allow_request(&self) -> bool {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        match *self.state.read().await {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let last_change = *self.last_state_change.read().await;
                if last_change.elapsed() >= self.config.timeout_duration {
                    self.transition_to_half_open().await;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => true,
        }
    }

    pub async fn record_success(&self) {
        match *self.state.read().await {
            CircuitState::HalfOpen => {
                let count = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
                if count >= self.config.success_threshold {
                    self.transition_to_closed().await;
                }
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Relaxed);
            }
            CircuitState::Open => {
                warn!("success recorded while circuit is open");
            }
        }
    }

    pub async fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);

        match *self.state.read().await {
            CircuitState::Closed => {
                let mut last_failure = self.last_failure_time.write().await;
                let now = Instant::now();

                match *last_failure {
                    Some(last_time) if now.duration_since(last_time) <= self.config.failure_window => {
                        let count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
                        debug!(
                            "circuit breaker failure count: {}/{}",
                            count, self.config.failure_threshold
                        );
                        if count >= self.config.failure_threshold {
                            self.transition_to_open().await;
                        }
                    }
                    _ => self.failure_count.store(1, Ordering::Relaxed),
                }
                *last_failure = Some(now);
            }
            CircuitState::HalfOpen => self.transition_to_open().await,
            CircuitState::Open => {
                *self.last_failure_time.write().await = Some(Instant::now());
            }
        }
    }

    async fn transition_to_open(&self) {
        let mut state = self.state.write().await;
        let previous = *state;
        *state = CircuitState::Open;
        *self.last_state_change.write().await = Instant::now();
        self.success_count.store(0, Ordering::Relaxed);
        warn!(
            "circuit breaker opened (was {:?}); {} total requests, {} total failures",
            previous,
            self.total_requests.load(Ordering::Relaxed),
            self.total_failures.load(Ordering::Relaxed)
        );
    }

    async fn transition_to_half_open(&self) {
        *self.state.write().await = CircuitState::HalfOpen;
        *self.last_state_change.write().await = Instant::now();
        self.success_count.store(0, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        info!("circuit breaker half-open");
    }

    async fn transition_to_closed(&self) {
        let previous = {
            let mut state = self.state.write().await;
            let previous = *state;
            *state = CircuitState::Closed;
            previous
        };
        *self.last_state_change.write().await = Instant::now();
        self.failure_count.store(0, Ordering::Relaxed);
        self.success_count.store(0, Ordering::Relaxed);
        info!("circuit breaker closed (was {:?})", previous);
    }

    pub async fn get_state(&self) -> CircuitState {
        *self.state.read().await
    }

    pub async fn get_metrics(&self) -> CircuitBreakerMetrics {
        let last_change = *self.last_state_change.read().await;
        CircuitBreakerMetrics {
            state: *self.state.read().await,
            failure_count: self.failure_count.load(Ordering::Relaxed),
            success_count: self.success_count.load(Ordering::Relaxed),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            last_state_change_seconds: last_change.elapsed().as_secs(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub total_requests: u64,
    pub total_failures: u64,
    pub last_state_change_seconds: u64,
}

pub type SharedCircuitBreaker = Arc<CircuitBreaker>;
