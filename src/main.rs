use anyhow::Result;
use project_coordinator::ai::{AIClient, NullAiClient};
use project_coordinator::api::ApiServer;
use project_coordinator::board::{BoardClient, InMemoryBoardClient};
use project_coordinator::config::Config;
use project_coordinator::constants::LEASE_SWEEP_INTERVAL_SECS;
use project_coordinator::ledger::{AssignmentLedger, FileLedgerStore, InMemoryLedgerStore, LedgerStore};
use project_coordinator::state::CoordinatorState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("starting project coordinator");

    let mut config = Config::load()?;
    if config.server.api_key.is_none() {
        let key = project_coordinator::security::ensure_api_key_exists(None)?;
        info!(
            "no API_KEY configured, generated one at {}",
            project_coordinator::security::API_KEY_FILE
        );
        config.server.api_key = Some(key);
        config.server.enable_auth = true;
    }

    let board: Arc<dyn BoardClient> = match config.board.provider.as_str() {
        "memory" => Arc::new(InMemoryBoardClient::new()),
        other => anyhow::bail!("unsupported board provider: {other}"),
    };

    let ai: Arc<dyn AIClient> = Arc::new(NullAiClient);

    let ledger_store: Box<dyn LedgerStore> = match &config.ledger.path {
        Some(path) => Box::new(FileLedgerStore::open(path.clone())?),
        None => Box::new(InMemoryLedgerStore::new()),
    };
    let ledger = Arc::new(AssignmentLedger::new(ledger_store, config.lease.floor, config.lease.ceiling));

    let reconciled = ledger.reconcile_with_board(board.as_ref()).await?;
    if reconciled > 0 {
        info!(count = reconciled, "reconciled stale leases against board state on startup");
    }

    let config = Arc::new(config);
    let state = Arc::new(CoordinatorState::new(board.clone(), ai, ledger.clone(), config.clone()));
    let api_server = ApiServer::new(config, state);

    let sweeper_board = board.clone();
    let sweeper_ledger = ledger.clone();
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(LEASE_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match sweeper_ledger.sweep_expired(sweeper_board.as_ref()).await {
                Ok(0) => {}
                Ok(n) => info!(count = n, "swept expired lease(s)"),
                Err(e) => error!("lease sweep failed: {e}"),
            }
        }
    });

    tokio::select! {
        result = api_server.run() => {
            if let Err(e) = result {
                error!("api server failed: {e}");
            }
        }
        _ = sweeper => {
            error!("lease sweeper task exited unexpectedly");
        }
    }

    Ok(())
}
