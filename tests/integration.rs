//! End-to-end scenarios from SPEC_FULL.md §8, driven through the same
//! `ToolSurface` entry points a real worker agent would call, backed by
//! the in-memory reference `BoardClient` and a disabled `AIClient`.

use project_coordinator::ai::NullAiClient;
use project_coordinator::assignment::AssignmentEngine;
use project_coordinator::board::{BoardClient, InMemoryBoardClient, NewTask};
use project_coordinator::config::{
    AiConfig, AnalyzerConfig, BoardConfig, Config, LeaseConfig, LedgerConfig, ServerConfig,
};
use project_coordinator::dependency::SafetyChecker;
use project_coordinator::ledger::{AssignmentLedger, InMemoryLedgerStore};
use project_coordinator::models::{Agent, Priority};
use project_coordinator::progress::ReportedStatus;
use project_coordinator::state::CoordinatorState;
use project_coordinator::synthesizer::CreateProjectOptions;
use project_coordinator::tool_surface::ToolSurface;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn test_config() -> Config {
    Config {
        board: BoardConfig {
            provider: "memory".to_string(),
            project_id: String::new(),
            board_id: String::new(),
        },
        ai: AiConfig {
            enabled: false,
            api_key: None,
            model: "none".to_string(),
        },
        lease: LeaseConfig {
            stale_after: None,
            floor: Duration::from_secs(3600),
            ceiling: Duration::from_secs(86400),
        },
        analyzer: AnalyzerConfig {
            cache_ttl: Duration::from_secs(5),
        },
        ledger: LedgerConfig { path: None },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 4200,
            api_key: None,
            enable_auth: false,
            allowed_origins: vec![],
        },
    }
}

fn new_surface() -> Arc<ToolSurface> {
    new_surface_with_board().0
}

fn new_surface_with_board() -> (Arc<ToolSurface>, Arc<InMemoryBoardClient>) {
    let board = Arc::new(InMemoryBoardClient::new());
    let board_trait: Arc<dyn BoardClient> = board.clone();
    let ai: Arc<dyn project_coordinator::ai::AIClient> = Arc::new(NullAiClient);
    let ledger = Arc::new(AssignmentLedger::with_default_bounds(Box::new(InMemoryLedgerStore::new())));
    let config = Arc::new(test_config());
    let state = Arc::new(CoordinatorState::new(board_trait, ai, ledger, config));
    (Arc::new(ToolSurface::new(state)), board)
}

// Scenario 1: fresh project from prose.
#[tokio::test]
async fn fresh_project_from_prose_creates_a_safe_phased_plan() {
    let surface = new_surface();

    let outcome = surface
        .create_project_from_description(
            "Build a todo app with JWT auth, REST API, and a web UI. Deploy to a single VM.",
            &CreateProjectOptions::default(),
        )
        .await
        .unwrap();

    assert!(outcome.tasks_created >= 8, "expected >= 8 tasks, got {}", outcome.tasks_created);
    assert!(outcome.confidence >= 0.5);

    let status = surface.get_project_status().await.unwrap();
    assert_eq!(status.totals, outcome.tasks_created);
}

// Scenario 2 + boundary B2: deployment-safety gate.
#[tokio::test]
async fn deployment_task_is_gated_until_implementation_completes() {
    let surface = new_surface();
    // Reach into the board directly via a second handle sharing state
    // would require exposing it; instead build the board via the
    // synthesizer-free path: register two tasks through create_project
    // in allow_on_nonempty mode is overkill, so talk to a fresh
    // InMemoryBoardClient/ToolSurface pairing built by hand here.
    let board = InMemoryBoardClient::new();
    board
        .create_task(NewTask {
            title: "Deploy to production".to_string(),
            description: "ship it".to_string(),
            priority: Priority::Urgent,
            ..Default::default()
        })
        .await
        .unwrap();
    board
        .create_task(NewTask {
            title: "Implement auth endpoint".to_string(),
            description: "build it".to_string(),
            priority: Priority::Medium,
            ..Default::default()
        })
        .await
        .unwrap();

    let ai = NullAiClient;
    let ledger = AssignmentLedger::with_default_bounds(Box::new(InMemoryLedgerStore::new()));
    let engine = AssignmentEngine::new(&board, &ai, &ledger);

    let agent_a = Agent::new("a".to_string(), "A".to_string(), "dev".to_string(), HashSet::new());
    let agent_b = Agent::new("b".to_string(), "B".to_string(), "dev".to_string(), HashSet::new());

    let given_to_a = engine.request_next_task(&agent_a).await.unwrap().unwrap();
    assert_eq!(given_to_a.title, "Implement auth endpoint");

    let given_to_b = engine.request_next_task(&agent_b).await.unwrap();
    assert!(given_to_b.is_none(), "deployment task must stay gated while implementation is in flight");

    ledger.release("a").await.unwrap();
    board
        .update_task(
            &given_to_a.task_id,
            project_coordinator::board::TaskPatch {
                status: Some(project_coordinator::models::TaskStatus::Done),
                assignee: Some(None),
                labels: None,
            },
        )
        .await
        .unwrap();

    let given_to_b_now = engine.request_next_task(&agent_b).await.unwrap().unwrap();
    assert_eq!(given_to_b_now.title, "Deploy to production");
}

// Scenario 3: duplicate-assignment race.
#[tokio::test]
async fn concurrent_requests_never_double_assign_the_same_task() {
    let board = InMemoryBoardClient::new();
    board
        .create_task(NewTask {
            title: "Only candidate".to_string(),
            description: "d".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let ai = NullAiClient;
    let ledger = AssignmentLedger::with_default_bounds(Box::new(InMemoryLedgerStore::new()));
    let engine = AssignmentEngine::new(&board, &ai, &ledger);

    let agent_a = Agent::new("a".to_string(), "A".to_string(), "dev".to_string(), HashSet::new());
    let agent_b = Agent::new("b".to_string(), "B".to_string(), "dev".to_string(), HashSet::new());

    let (a_result, b_result) = tokio::join!(
        engine.request_next_task(&agent_a),
        engine.request_next_task(&agent_b)
    );
    let a_result = a_result.unwrap();
    let b_result = b_result.unwrap();

    let winners = [a_result.is_some(), b_result.is_some()].into_iter().filter(|x| *x).count();
    assert_eq!(winners, 1, "exactly one caller should win the single candidate task");

    let live = ledger.list_all().await.unwrap();
    assert_eq!(live.len(), 1);
}

// Scenario 4: lease expiry recovery.
#[tokio::test]
async fn expired_lease_returns_task_to_the_pool() {
    let board = InMemoryBoardClient::new();
    board
        .create_task(NewTask {
            title: "Long-running task".to_string(),
            description: "d".to_string(),
            estimated_hours: Some(0.0001),
            ..Default::default()
        })
        .await
        .unwrap();

    let ai = NullAiClient;
    let ledger = Arc::new(AssignmentLedger::new(
        Box::new(InMemoryLedgerStore::new()),
        Duration::from_millis(50),
        Duration::from_millis(50),
    ));
    let engine = AssignmentEngine::new(&board, &ai, ledger.as_ref());

    let agent_a = Agent::new("a".to_string(), "A".to_string(), "dev".to_string(), HashSet::new());
    let given = engine.request_next_task(&agent_a).await.unwrap();
    assert!(given.is_some());

    tokio::time::sleep(Duration::from_millis(150)).await;
    let swept = ledger.sweep_expired(&board).await.unwrap();
    assert_eq!(swept, 1);

    let agent_b = Agent::new("b".to_string(), "B".to_string(), "dev".to_string(), HashSet::new());
    let given_to_b = engine.request_next_task(&agent_b).await.unwrap();
    assert!(given_to_b.is_some(), "task should be available again after the sweep");
}

// Scenario 5: feature insertion into a live board.
#[tokio::test]
async fn feature_insertion_adds_tasks_without_breaking_safety_invariants() {
    let surface = new_surface();
    surface
        .create_project_from_description(
            "Build a web app for managing customer accounts with a REST API and web UI.",
            &CreateProjectOptions::default(),
        )
        .await
        .unwrap();

    let outcome = surface
        .add_feature(
            "Add user avatar uploads",
            "avatar-uploads",
            project_coordinator::feature_inserter::IntegrationPoint::AutoDetect,
        )
        .await
        .unwrap();

    assert!(outcome.tasks_created > 0);

    let status = surface.get_project_status().await.unwrap();
    assert!(status.totals > 0);
}

// Scenario 6: blocker suggestion clears the assignment.
#[tokio::test]
async fn reporting_a_blocker_releases_the_assignment_and_offers_a_suggestion() {
    let surface = new_surface();
    surface
        .create_project_from_description("Build a CLI tool for managing todos", &CreateProjectOptions::default())
        .await
        .unwrap();

    surface.register_agent("a1", "Ada", "dev", HashSet::new()).await.unwrap();
    let assignment = surface.request_next_task("a1").await.unwrap();
    assert!(assignment.has_task);
    let task_id = assignment.assignment.unwrap().task_id;

    surface
        .report_blocker("a1", &task_id, "waiting on a missing dependency", project_coordinator::ai::Severity::High)
        .await
        .unwrap();

    // The ledger entry for a1 is gone; the same agent reporting progress on
    // the same task again is rejected until it requests a new task.
    let result = surface
        .report_task_progress("a1", &task_id, ReportedStatus::InProgress, 10, "still working")
        .await;
    assert!(result.is_err());
}

// Boundary B1: empty board.
#[tokio::test]
async fn empty_board_reports_zero_completion_and_creator_mode() {
    let surface = new_surface();
    let status = surface.get_project_status().await.unwrap();
    assert_eq!(status.completion_pct, 0.0);
    assert_eq!(status.mode, project_coordinator::models::Mode::Creator);
}

// Boundary B3: cyclic plan is refused before anything is created.
#[tokio::test]
async fn cyclic_dependency_graph_is_rejected() {
    use project_coordinator::ai::PlannedTask;
    use project_coordinator::error::CoordinatorError;

    let mut tasks = vec![
        PlannedTask {
            local_id: "t1".to_string(),
            title: "Task one".to_string(),
            description: "d".to_string(),
            labels: vec![],
            priority: Priority::Medium,
            estimated_hours: Some(1.0),
            phase: None,
            depends_on: vec!["t2".to_string()],
        },
        PlannedTask {
            local_id: "t2".to_string(),
            title: "Task two".to_string(),
            description: "d".to_string(),
            labels: vec![],
            priority: Priority::Medium,
            estimated_hours: Some(1.0),
            phase: None,
            depends_on: vec!["t1".to_string()],
        },
    ];

    let result = project_coordinator::dependency::DependencyInferer::infer(&mut tasks);
    assert!(matches!(result, Err(CoordinatorError::CyclicPlan(_))));
}

// P3/P4 style check: every published plan is acyclic and deployment tasks
// depend on implementation when implementation tasks exist.
#[tokio::test]
async fn published_plans_always_satisfy_safety_invariants() {
    let (surface, board) = new_surface_with_board();
    surface
        .create_project_from_description(
            "Build an API service with background workers. Deploy with zero downtime.",
            &CreateProjectOptions::default(),
        )
        .await
        .unwrap();

    surface
        .add_feature(
            "Add request rate limiting",
            "rate-limiting",
            project_coordinator::feature_inserter::IntegrationPoint::AutoDetect,
        )
        .await
        .unwrap();

    let tasks = board.list_tasks().await.unwrap();
    assert!(SafetyChecker::check(&tasks).is_ok());
}
