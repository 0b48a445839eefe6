//! `CoordinatorState`: the process-wide handles every request dispatches
//! through. Mirrors the ambient "shared app state behind Arc" pattern the
//! web-transport layer expects (SPEC_FULL §10).

use crate::ai::AIClient;
use crate::analyzer::BoardAnalyzer;
use crate::board::BoardClient;
use crate::config::Config;
use crate::ledger::AssignmentLedger;
use crate::monitoring::HealthMonitor;
use crate::registry::AgentRegistry;
use std::sync::Arc;

pub struct CoordinatorState {
    pub board: Arc<dyn BoardClient>,
    pub ai: Arc<dyn AIClient>,
    pub ledger: Arc<AssignmentLedger>,
    pub registry: Arc<AgentRegistry>,
    pub analyzer: Arc<BoardAnalyzer>,
    pub health: Arc<HealthMonitor>,
    pub config: Arc<Config>,
}

impl CoordinatorState {
    pub fn new(
        board: Arc<dyn BoardClient>,
        ai: Arc<dyn AIClient>,
        ledger: Arc<AssignmentLedger>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            board,
            ai,
            ledger,
            registry: Arc::new(AgentRegistry::new()),
            analyzer: Arc::new(BoardAnalyzer::new(config.analyzer.cache_ttl)),
            health: Arc::new(HealthMonitor::new()),
            config,
        }
    }
}
