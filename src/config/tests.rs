use super::*;
use serial_test::serial;
use std::env;

fn cleanup_test_env() {
    for var in [
        "BOARD_PROVIDER",
        "BOARD_PROJECT_ID",
        "BOARD_ID",
        "AI_ENABLED",
        "AI_API_KEY",
        "API_KEY",
        "SERVER_HOST",
        "SERVER_PORT",
        "ALLOWED_ORIGINS",
        "LEASE_FLOOR_SECS",
        "LEASE_CEILING_SECS",
    ] {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_to_memory_provider_with_no_board_env() {
    cleanup_test_env();
    let config = Config::load().expect("memory provider needs no board ids");
    assert_eq!(config.board.provider, "memory");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 4200);
    assert!(!config.ai.enabled);
    cleanup_test_env();
}

#[test]
#[serial]
fn non_memory_provider_requires_project_and_board_id() {
    cleanup_test_env();
    env::set_var("BOARD_PROVIDER", "github");
    let result = Config::load();
    assert!(result.is_err());
    match result.unwrap_err() {
        CoordinatorError::Configuration(msg) => {
            assert!(msg.contains("BOARD_PROJECT_ID"));
        }
        other => panic!("expected Configuration error, got {other:?}"),
    }
    cleanup_test_env();
}

#[test]
#[serial]
fn ai_enabled_without_key_is_rejected() {
    cleanup_test_env();
    env::set_var("AI_ENABLED", "true");
    let result = Config::load();
    assert!(result.is_err());
    cleanup_test_env();
}

#[test]
#[serial]
fn ai_enabled_with_key_succeeds() {
    cleanup_test_env();
    env::set_var("AI_ENABLED", "true");
    env::set_var("AI_API_KEY", "sk-test-key");
    let config = Config::load().expect("ai key provided");
    assert!(config.ai.enabled);
    assert_eq!(config.ai.api_key.as_deref(), Some("sk-test-key"));
    cleanup_test_env();
}

#[test]
#[serial]
fn short_api_key_is_rejected() {
    cleanup_test_env();
    env::set_var("API_KEY", "too-short");
    let result = Config::load();
    assert!(result.is_err());
    cleanup_test_env();
}

#[test]
#[serial]
fn blank_api_key_is_rejected() {
    cleanup_test_env();
    env::set_var("API_KEY", "");
    let result = Config::load();
    assert!(result.is_err());
    cleanup_test_env();
}

#[test]
#[serial]
fn secure_api_key_enables_auth() {
    cleanup_test_env();
    env::set_var(
        "API_KEY",
        "secure-api-key-1234567890123456789012345678901234567890",
    );
    let config = Config::load().expect("secure key accepted");
    assert!(config.server.enable_auth);
    cleanup_test_env();
}

#[test]
#[serial]
fn lease_floor_over_ceiling_is_rejected() {
    cleanup_test_env();
    env::set_var("LEASE_FLOOR_SECS", "100");
    env::set_var("LEASE_CEILING_SECS", "10");
    let result = Config::load();
    assert!(result.is_err());
    cleanup_test_env();
}

#[test]
#[serial]
fn allowed_origins_are_split_and_trimmed() {
    cleanup_test_env();
    env::set_var(
        "ALLOWED_ORIGINS",
        "https://example.com, https://app.example.com",
    );
    let config = Config::load().expect("valid config");
    assert_eq!(config.server.allowed_origins.len(), 2);
    assert!(config
        .server
        .allowed_origins
        .contains(&"https://app.example.com".to_string()));
    cleanup_test_env();
}
