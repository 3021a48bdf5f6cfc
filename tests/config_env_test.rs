//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Note that Config::from_env() also loads
//! from .env file via dotenvy, so these tests focus on override behavior.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use crossmodal_analytics::config::{Config, LogFormat};
use serial_test::serial;
use std::env;

#[test]
#[serial]
fn test_config_from_env_loads_successfully() {
    // Every variable has a default; a bare environment must work.
    let result = Config::from_env();
    assert!(result.is_ok());
}

#[test]
#[serial]
fn test_config_works_without_api_key() {
    env::remove_var("CROSSMODAL_API_KEY");

    let config = Config::from_env().unwrap();
    assert!(config.provider.api_key.is_none());
}

#[test]
#[serial]
fn test_config_from_env_custom_base_url() {
    env::set_var("CROSSMODAL_BASE_URL", "https://custom.api.com");

    let config = Config::from_env().unwrap();
    assert_eq!(config.provider.base_url, "https://custom.api.com");

    env::remove_var("CROSSMODAL_BASE_URL");
}

#[test]
#[serial]
fn test_config_from_env_custom_models() {
    env::set_var("CROSSMODAL_EMBEDDING_MODEL", "embed-v2");
    env::set_var("CROSSMODAL_COMPLETION_MODEL", "complete-v2");

    let config = Config::from_env().unwrap();
    assert_eq!(config.provider.embedding_model, "embed-v2");
    assert_eq!(config.provider.completion_model, "complete-v2");

    env::remove_var("CROSSMODAL_EMBEDDING_MODEL");
    env::remove_var("CROSSMODAL_COMPLETION_MODEL");
}

#[test]
#[serial]
fn test_config_from_env_custom_request() {
    env::set_var("REQUEST_TIMEOUT_MS", "60000");
    env::set_var("MAX_RETRIES", "5");
    env::set_var("RETRY_DELAY_MS", "2000");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 60000);
    assert_eq!(config.request.max_retries, 5);
    assert_eq!(config.request.retry_delay_ms, 2000);

    env::remove_var("REQUEST_TIMEOUT_MS");
    env::remove_var("MAX_RETRIES");
    env::remove_var("RETRY_DELAY_MS");
}

#[test]
#[serial]
fn test_config_from_env_custom_thresholds() {
    env::set_var("SEMANTIC_INTEGRITY_THRESHOLD", "0.9");
    env::set_var("INTEGRITY_FLOOR", "0.5");
    env::set_var("MODE_CONFIDENCE_FLOOR", "0.7");
    env::set_var("STEP_TIMEOUT_MS", "10000");

    let config = Config::from_env().unwrap();
    assert_eq!(config.thresholds.semantic_integrity, 0.9);
    assert_eq!(config.thresholds.integrity_floor, 0.5);
    assert_eq!(config.thresholds.mode_confidence_floor, 0.7);
    assert_eq!(config.thresholds.step_timeout_ms, 10000);

    env::remove_var("SEMANTIC_INTEGRITY_THRESHOLD");
    env::remove_var("INTEGRITY_FLOOR");
    env::remove_var("MODE_CONFIDENCE_FLOOR");
    env::remove_var("STEP_TIMEOUT_MS");
}

#[test]
#[serial]
fn test_config_rejects_floor_above_threshold() {
    env::set_var("SEMANTIC_INTEGRITY_THRESHOLD", "0.5");
    env::set_var("INTEGRITY_FLOOR", "0.8");

    let result = Config::from_env();
    assert!(result.is_err());

    env::remove_var("SEMANTIC_INTEGRITY_THRESHOLD");
    env::remove_var("INTEGRITY_FLOOR");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    env::set_var("LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    env::remove_var("LOG_FORMAT");
}

#[test]
#[serial]
fn test_config_invalid_number_uses_default() {
    env::set_var("MAX_RETRIES", "not-a-number");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.max_retries, 2);

    env::remove_var("MAX_RETRIES");
}

#[test]
#[serial]
fn test_config_from_env_log_level() {
    env::set_var("LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.level, "debug");

    env::remove_var("LOG_LEVEL");
}
