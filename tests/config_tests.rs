use quiz_session::config::{mask_sensitive_data, Config};
use std::env;
use std::time::Duration;

const VARS: [&str; 10] = [
    "QUIZ_CATALOG_PATH",
    "LLM_API_KEY",
    "LLM_MODEL",
    "LLM_MAX_TOKENS",
    "PORT",
    "HOST",
    "LOG_FILE_ENABLED",
    "SESSION_TICK_MILLIS",
    "SESSION_RETENTION_SECS",
    "SESSION_SWEEP_SECS",
];

fn clear_vars() {
    for var in VARS {
        unsafe { env::remove_var(var) };
    }
}

// Environment variables are process-wide, so every scenario lives in one test.
#[test]
fn test_config_from_environment() {
    clear_vars();

    let config = Config::from_env().unwrap();
    assert_eq!(config.catalog.path, "data/quizzes.json");
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.llm.max_tokens, 1500);
    assert_eq!(config.server.address(), "0.0.0.0:3000");
    assert_eq!(config.session.tick_period(), Duration::from_secs(1));
    assert_eq!(config.session.retention(), Duration::from_secs(1800));
    assert!(config.validate().is_ok());

    unsafe {
        env::set_var("QUIZ_CATALOG_PATH", "/srv/quizzes.json");
        env::set_var("LLM_API_KEY", "sk-test-1234567890");
        env::set_var("LLM_MODEL", "gpt-4o");
        env::set_var("LLM_MAX_TOKENS", "800");
        env::set_var("PORT", "8080");
        env::set_var("HOST", "127.0.0.1");
        env::set_var("LOG_FILE_ENABLED", "false");
        env::set_var("SESSION_TICK_MILLIS", "250");
        env::set_var("SESSION_RETENTION_SECS", "120");
        env::set_var("SESSION_SWEEP_SECS", "15");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.catalog.path, "/srv/quizzes.json");
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.llm.max_tokens, 800);
    assert_eq!(config.server.address(), "127.0.0.1:8080");
    assert!(!config.logging.file_enabled);
    assert_eq!(config.session.tick_period(), Duration::from_millis(250));
    assert_eq!(config.session.retention(), Duration::from_secs(120));
    assert_eq!(config.session.sweep_period(), Duration::from_secs(15));
    assert_eq!(mask_sensitive_data(&config.llm.api_key), "sk-t***7890");

    unsafe { env::set_var("PORT", "not-a-port") };
    assert!(Config::from_env().is_err());

    unsafe {
        env::set_var("PORT", "3000");
        env::set_var("SESSION_TICK_MILLIS", "0");
    }
    let config = Config::from_env().unwrap();
    assert!(config.validate().is_err());

    clear_vars();
}
