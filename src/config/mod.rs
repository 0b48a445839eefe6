use crate::{CoordinatorError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[cfg(test)]
mod tests;

/// Process-level configuration, assembled once at startup from environment
/// variables (and a `.env` file, if present).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub board: BoardConfig,
    pub ai: AiConfig,
    pub lease: LeaseConfig,
    pub analyzer: AnalyzerConfig,
    pub ledger: LedgerConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub provider: String,
    pub project_id: String,
    pub board_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseConfig {
    pub stale_after: Option<Duration>,
    pub floor: Duration,
    pub ceiling: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub enable_auth: bool,
    pub allowed_origins: Vec<String>,
}

fn parse_duration_secs(var: &str, default_secs: u64) -> Duration {
    Duration::from_secs(
        env::var(var)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_secs),
    )
}

impl Config {
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::info!("loaded .env file from {:?}", path),
            Err(e) => tracing::debug!("no .env file loaded: {}", e),
        }

        let provider = env::var("BOARD_PROVIDER").unwrap_or_else(|_| "memory".to_string());
        let project_id = env::var("BOARD_PROJECT_ID").unwrap_or_default();
        let board_id = env::var("BOARD_ID").unwrap_or_default();

        if provider != "memory" && (project_id.trim().is_empty() || board_id.trim().is_empty()) {
            return Err(CoordinatorError::Configuration(
                "BOARD_PROJECT_ID and BOARD_ID are required for non-memory board providers"
                    .to_string(),
            ));
        }

        let board = BoardConfig {
            provider,
            project_id,
            board_id,
        };

        let ai_enabled = env::var("AI_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(false);
        let ai_api_key = env::var("AI_API_KEY").ok().filter(|k| !k.trim().is_empty());

        if ai_enabled && ai_api_key.is_none() {
            return Err(CoordinatorError::Configuration(
                "AI_ENABLED is true but AI_API_KEY is not set".to_string(),
            ));
        }

        let ai = AiConfig {
            enabled: ai_enabled,
            api_key: ai_api_key,
            model: env::var("AI_MODEL").unwrap_or_else(|_| "claude-3-5-sonnet-20241022".to_string()),
        };

        let lease = LeaseConfig {
            stale_after: env::var("LEASE_STALE_AFTER_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs),
            floor: parse_duration_secs("LEASE_FLOOR_SECS", 3600),
            ceiling: parse_duration_secs("LEASE_CEILING_SECS", 24 * 3600),
        };

        if lease.floor > lease.ceiling {
            return Err(CoordinatorError::Configuration(
                "LEASE_FLOOR_SECS cannot exceed LEASE_CEILING_SECS".to_string(),
            ));
        }

        let analyzer = AnalyzerConfig {
            cache_ttl: parse_duration_secs("ANALYZER_CACHE_TTL_SECS", 5),
        };

        let ledger = LedgerConfig {
            path: env::var("LEDGER_PATH").ok(),
        };

        let api_key = env::var("API_KEY").ok();
        match &api_key {
            Some(key) if key.trim().is_empty() => {
                return Err(CoordinatorError::Configuration(
                    "API_KEY is set but blank".to_string(),
                ));
            }
            Some(key) if key.len() < 32 => {
                return Err(CoordinatorError::Configuration(
                    "API_KEY must be at least 32 characters".to_string(),
                ));
            }
            _ => {}
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server = ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4200),
            enable_auth: api_key.is_some(),
            api_key,
            allowed_origins,
        };

        Ok(Config {
            board,
            ai,
            lease,
            analyzer,
            ledger,
            server,
        })
    }
}
