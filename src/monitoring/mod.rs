//! Minimal health reporting. Dashboards and long-horizon metrics
//! retention are out of scope (SPEC_FULL §1 Non-goals); this module
//! answers exactly the two questions the tool surface needs to answer:
//! "is the process up" (`ping`) and "how is the board holding together"
//! (folded into `get_project_status`, see `crate::tool_surface`).

use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    pub uptime_seconds: f64,
    pub board_reachable: bool,
    pub ai_enabled: bool,
}

/// Tracks process start time for uptime reporting.
pub struct HealthMonitor {
    started_at: Instant,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    pub fn snapshot(&self, board_reachable: bool, ai_enabled: bool) -> ServiceHealth {
        let status = if board_reachable {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        ServiceHealth {
            status,
            uptime_seconds: self.started_at.elapsed().as_secs_f64(),
            board_reachable,
            ai_enabled,
        }
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_board_degrades_health() {
        let monitor = HealthMonitor::new();
        let health = monitor.snapshot(false, true);
        assert_eq!(health.status, HealthStatus::Degraded);
    }

    #[test]
    fn reachable_board_is_healthy() {
        let monitor = HealthMonitor::new();
        let health = monitor.snapshot(true, false);
        assert_eq!(health.status, HealthStatus::Healthy);
    }
}
