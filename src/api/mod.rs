//! HTTP/JSON transport for the `ToolSurface` (SPEC_FULL §4.12, §10).
//! One route per worker-facing operation, wrapped in the ambient
//! rate-limit/auth/trace/CORS middleware stack.

use crate::ai::Severity;
use crate::auth::{auth_middleware, create_auth_state};
use crate::config::Config;
use crate::feature_inserter::IntegrationPoint;
use crate::progress::ReportedStatus;
use crate::rate_limit::{rate_limit_middleware, RateLimitConfig};
use crate::state::CoordinatorState;
use crate::synthesizer::CreateProjectOptions;
use crate::tool_surface::ToolSurface;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

// 🏗️ ARCHITECTURE DECISION: route path constants
// Why: single source of truth for route definitions, shared by the router and tests
// Alternative: inline string literals per route (rejected: easy to typo, hard to grep)
const ROUTE_PING: &str = "/ping";
const ROUTE_REGISTER_AGENT: &str = "/register_agent";
const ROUTE_REQUEST_NEXT_TASK: &str = "/request_next_task";
const ROUTE_REPORT_PROGRESS: &str = "/report_task_progress";
const ROUTE_REPORT_BLOCKER: &str = "/report_blocker";
const ROUTE_AGENT_STATUS: &str = "/get_agent_status";
const ROUTE_LIST_AGENTS: &str = "/list_registered_agents";
const ROUTE_PROJECT_STATUS: &str = "/get_project_status";
const ROUTE_CREATE_PROJECT: &str = "/create_project_from_description";
const ROUTE_ADD_FEATURE: &str = "/add_feature";

#[derive(Clone)]
pub struct ApiServer {
    config: Arc<Config>,
    tool_surface: Arc<ToolSurface>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

fn error_response(err: crate::error::CoordinatorError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err.kind() {
        "not_found" | "no_such_assignment" => StatusCode::NOT_FOUND,
        "duplicate_agent" | "non_empty_board" => StatusCode::CONFLICT,
        "validation_error" | "invalid_status" => StatusCode::BAD_REQUEST,
        "agent_state_error" => StatusCode::CONFLICT,
        "timeout" => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind(),
        }),
    )
}

impl ApiServer {
    pub fn new(config: Arc<Config>, state: Arc<CoordinatorState>) -> Self {
        Self {
            config,
            tool_surface: Arc::new(ToolSurface::new(state)),
        }
    }

    pub async fn run(&self) -> crate::error::Result<()> {
        let app = self.build_router();
        let listener = tokio::net::TcpListener::bind(format!(
            "{}:{}",
            self.config.server.host, self.config.server.port
        ))
        .await
        .map_err(|e| crate::error::CoordinatorError::Internal(e.into()))?;

        info!("tool-surface listening on {}:{}", self.config.server.host, self.config.server.port);

        axum::serve(listener, app)
            .await
            .map_err(|e| crate::error::CoordinatorError::Internal(e.into()))?;

        Ok(())
    }

    pub fn build_router(&self) -> Router {
        let auth_state = create_auth_state(self.config.server.clone());
        let rate_limits = RateLimitConfig::new();

        let cors_layer = CorsLayer::new()
            .allow_origin(
                self.config
                    .server
                    .allowed_origins
                    .iter()
                    .filter_map(|origin| origin.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
                axum::http::HeaderName::from_static("x-api-key"),
            ])
            .max_age(std::time::Duration::from_secs(3600));

        Router::new()
            .route(ROUTE_PING, get(ping))
            .route(ROUTE_REGISTER_AGENT, post(register_agent))
            .route(ROUTE_REQUEST_NEXT_TASK, post(request_next_task))
            .route(ROUTE_REPORT_PROGRESS, post(report_task_progress))
            .route(ROUTE_REPORT_BLOCKER, post(report_blocker))
            .route(ROUTE_AGENT_STATUS, post(get_agent_status))
            .route(ROUTE_LIST_AGENTS, get(list_registered_agents))
            .route(ROUTE_PROJECT_STATUS, get(get_project_status))
            .route(ROUTE_CREATE_PROJECT, post(create_project_from_description))
            .route(ROUTE_ADD_FEATURE, post(add_feature))
            // 🏗️ ARCHITECTURE DECISION: layered middleware approach
            // Why: clear separation of concerns for security and observability
            // Alternative: one monolithic handler wrapper (rejected: poor separation, hard to test layers individually)
            // Order matters: rate limit -> auth -> trace -> cors, outermost first
            .layer(
                ServiceBuilder::new()
                    .layer(middleware::from_fn_with_state(rate_limits, rate_limit_middleware))
                    .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
                    .layer(TraceLayer::new_for_http())
                    .layer(cors_layer),
            )
            .with_state(self.tool_surface.clone())
    }
}

// 🏗️ ARCHITECTURE DECISION: static health response
// Why: cheap liveness check for load balancers, no board/ledger access on this path
// Alternative: include board/ledger health (rejected: a slow dependency would make /ping itself unreliable)
async fn ping(State(surface): State<Arc<ToolSurface>>) -> impl IntoResponse {
    Json(surface.ping().await)
}

#[derive(Debug, Deserialize)]
struct RegisterAgentRequest {
    agent_id: String,
    name: String,
    role: String,
    #[serde(default)]
    skills: HashSet<String>,
}

async fn register_agent(
    State(surface): State<Arc<ToolSurface>>,
    Json(req): Json<RegisterAgentRequest>,
) -> impl IntoResponse {
    match surface.register_agent(&req.agent_id, &req.name, &req.role, req.skills).await {
        Ok(result) => (StatusCode::CREATED, Json(json!(result))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct AgentIdRequest {
    agent_id: String,
}

async fn request_next_task(
    State(surface): State<Arc<ToolSurface>>,
    Json(req): Json<AgentIdRequest>,
) -> impl IntoResponse {
    match surface.request_next_task(&req.agent_id).await {
        Ok(result) => (StatusCode::OK, Json(json!(result))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ReportProgressRequest {
    agent_id: String,
    task_id: String,
    status: String,
    progress: u8,
    #[serde(default)]
    message: String,
}

async fn report_task_progress(
    State(surface): State<Arc<ToolSurface>>,
    Json(req): Json<ReportProgressRequest>,
) -> impl IntoResponse {
    let status = match req.status.as_str() {
        "in_progress" => ReportedStatus::InProgress,
        "completed" => ReportedStatus::Completed,
        "blocked" => ReportedStatus::Blocked,
        other => {
            return error_response(crate::error::CoordinatorError::InvalidStatus(format!(
                "unknown status: {other}"
            )))
            .into_response()
        }
    };

    match surface
        .report_task_progress(&req.agent_id, &req.task_id, status, req.progress, &req.message)
        .await
    {
        Ok(ack) => (StatusCode::OK, Json(json!(ack))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ReportBlockerRequest {
    agent_id: String,
    task_id: String,
    description: String,
    severity: String,
}

async fn report_blocker(
    State(surface): State<Arc<ToolSurface>>,
    Json(req): Json<ReportBlockerRequest>,
) -> impl IntoResponse {
    let severity = match req.severity.as_str() {
        "low" => Severity::Low,
        "high" => Severity::High,
        _ => Severity::Medium,
    };

    match surface.report_blocker(&req.agent_id, &req.task_id, &req.description, severity).await {
        Ok(suggestion) => (StatusCode::OK, Json(json!({"suggestion": suggestion}))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn get_agent_status(
    State(surface): State<Arc<ToolSurface>>,
    Json(req): Json<AgentIdRequest>,
) -> impl IntoResponse {
    Json(surface.get_agent_status(&req.agent_id).await)
}

async fn list_registered_agents(State(surface): State<Arc<ToolSurface>>) -> impl IntoResponse {
    Json(json!({"agents": surface.list_registered_agents().await}))
}

async fn get_project_status(State(surface): State<Arc<ToolSurface>>) -> impl IntoResponse {
    match surface.get_project_status().await {
        Ok(status) => (StatusCode::OK, Json(json!(status))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct CreateProjectRequest {
    description: String,
    #[serde(default)]
    project_name: String,
    #[serde(default)]
    team_size: Option<u32>,
    #[serde(default)]
    tech_stack: Vec<String>,
    #[serde(default)]
    allow_on_nonempty: bool,
    #[serde(default)]
    complexity: Option<String>,
}

async fn create_project_from_description(
    State(surface): State<Arc<ToolSurface>>,
    Json(req): Json<CreateProjectRequest>,
) -> impl IntoResponse {
    let complexity = match req.complexity.as_deref() {
        Some("mvp") => Some(crate::ai::Complexity::Mvp),
        Some("enterprise") => Some(crate::ai::Complexity::Enterprise),
        Some("standard") => Some(crate::ai::Complexity::Standard),
        _ => None,
    };
    let options = CreateProjectOptions {
        team_size: req.team_size,
        tech_stack: req.tech_stack,
        deadline: None,
        allow_on_nonempty: req.allow_on_nonempty,
        complexity,
    };

    match surface.create_project_from_description(&req.description, &options).await {
        Ok(outcome) => (StatusCode::CREATED, Json(json!(outcome))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct AddFeatureRequest {
    feature_description: String,
    #[serde(default = "default_feature_name")]
    feature_name: String,
    #[serde(default = "default_integration_point")]
    integration_point: String,
}

fn default_feature_name() -> String {
    "feature".to_string()
}

fn default_integration_point() -> String {
    "auto_detect".to_string()
}

async fn add_feature(
    State(surface): State<Arc<ToolSurface>>,
    Json(req): Json<AddFeatureRequest>,
) -> impl IntoResponse {
    let integration_point = match req.integration_point.as_str() {
        "after_current" => IntegrationPoint::AfterCurrent,
        "parallel" => IntegrationPoint::Parallel,
        "new_phase" => IntegrationPoint::NewPhase,
        _ => IntegrationPoint::AutoDetect,
    };

    match surface
        .add_feature(&req.feature_description, &req.feature_name, integration_point)
        .await
    {
        Ok(outcome) => (StatusCode::CREATED, Json(json!(outcome))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::NullAiClient;
    use crate::board::InMemoryBoardClient;
    use crate::ledger::{AssignmentLedger, InMemoryLedgerStore};
    use std::time::Duration;

    fn test_config() -> Config {
        Config {
            board: crate::config::BoardConfig {
                provider: "memory".to_string(),
                project_id: String::new(),
                board_id: String::new(),
            },
            ai: crate::config::AiConfig {
                enabled: false,
                api_key: None,
                model: "none".to_string(),
            },
            lease: crate::config::LeaseConfig {
                stale_after: None,
                floor: Duration::from_secs(3600),
                ceiling: Duration::from_secs(86400),
            },
            analyzer: crate::config::AnalyzerConfig {
                cache_ttl: Duration::from_secs(5),
            },
            ledger: crate::config::LedgerConfig { path: None },
            server: crate::config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 4200,
                api_key: None,
                enable_auth: false,
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }

    #[tokio::test]
    async fn router_builds_without_panicking() {
        let config = Arc::new(test_config());
        let board: Arc<dyn crate::board::BoardClient> = Arc::new(InMemoryBoardClient::new());
        let ai: Arc<dyn crate::ai::AIClient> = Arc::new(NullAiClient);
        let ledger = Arc::new(AssignmentLedger::with_default_bounds(Box::new(
            InMemoryLedgerStore::new(),
        )));
        let state = Arc::new(CoordinatorState::new(board, ai, ledger, config.clone()));
        let server = ApiServer::new(config, state);
        let _router = server.build_router();
    }
}
