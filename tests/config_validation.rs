//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use login_link::config::{LinkConfig, LoggingConfig, DEFAULT_LOGIN_PORT};
use login_link::error::LinkError;
use std::time::Duration;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = LinkConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
    assert_eq!(config.login.port, DEFAULT_LOGIN_PORT);
    assert_eq!(config.liveness.stall_time, Duration::from_secs(60));
}

#[test]
fn test_empty_login_address() {
    let mut config = LinkConfig::default();
    config.login.address = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("address cannot be empty")));
}

#[test]
fn test_zero_port() {
    let mut config = LinkConfig::default();
    config.login.port = 0;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("port cannot be 0")));
}

#[test]
fn test_credentials_too_long() {
    let mut config = LinkConfig::default();
    config.login.userid = "u".repeat(25);
    config.login.passwd = "p".repeat(24);

    let errors = config.validate();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].contains("userid too long"));
}

#[test]
fn test_empty_credentials() {
    let mut config = LinkConfig::default();
    config.login.userid = String::new();
    config.login.passwd = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("userid cannot be empty")));
    assert!(errors.iter().any(|e| e.contains("passwd cannot be empty")));
}

#[test]
fn test_stall_time_bounds() {
    let mut config = LinkConfig::default();
    config.liveness.stall_time = Duration::from_millis(50);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Stall time too short")));

    config.liveness.stall_time = Duration::from_secs(7200);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Stall time too long")));
}

#[test]
fn test_supervisor_intervals() {
    let mut config = LinkConfig::default();
    config.supervisor.check_interval = Duration::from_millis(5);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Check interval too short")));

    let mut config = LinkConfig::default();
    config.supervisor.poll_interval = Duration::ZERO;
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Poll interval must be greater than 0")));

    let mut config = LinkConfig::default();
    config.supervisor.poll_interval = Duration::from_secs(20);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Poll interval cannot be longer")));

    let mut config = LinkConfig::default();
    config.supervisor.connect_timeout = Duration::ZERO;
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Connect timeout too short")));

    let mut config = LinkConfig::default();
    config.supervisor.initial_delay = Duration::from_secs(120);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Initial delay too long")));
}

#[test]
fn test_logging_app_name() {
    let config = LinkConfig::default_with_overrides(|c| {
        c.logging = LoggingConfig {
            app_name: String::new(),
            log_level: Level::DEBUG,
            json_format: true,
        };
    });

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Application name cannot be empty")));
}

#[test]
fn test_multiple_validation_errors() {
    let mut config = LinkConfig::default();
    config.login.address = String::new();
    config.login.port = 0;
    config.liveness.stall_time = Duration::from_millis(1);

    let errors = config.validate();
    assert!(errors.len() >= 3, "Should have at least 3 errors: {errors:?}");
}

#[test]
fn test_validate_strict() {
    assert!(LinkConfig::default().validate_strict().is_ok());

    let mut config = LinkConfig::default();
    config.login.port = 0;
    match config.validate_strict() {
        Err(LinkError::ConfigError(msg)) => {
            assert!(msg.contains("Configuration validation failed"));
            assert!(msg.contains("port cannot be 0"));
        }
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn test_from_toml_partial_sections() {
    let config = LinkConfig::from_toml(
        r#"
        [login]
        address = "login.example.net"
        port = 6901
        userid = "map01"
        passwd = "secret"

        [liveness]
        stall_time = 30000

        [logging]
        app_name = "map-server"
        log_level = "debug"
        json_format = true
        "#,
    )
    .expect("valid toml");

    assert_eq!(config.login.address, "login.example.net");
    assert_eq!(config.login.port, 6901);
    assert_eq!(config.login.userid, "map01");
    assert_eq!(config.liveness.stall_time, Duration::from_secs(30));
    assert_eq!(config.supervisor.check_interval, Duration::from_secs(10));
    assert_eq!(config.supervisor.connect_timeout, Duration::from_secs(5));
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.logging.json_format);
    assert!(config.validate().is_empty());
}

#[test]
fn test_from_toml_rejects_bad_log_level() {
    let result = LinkConfig::from_toml(
        r#"
        [logging]
        app_name = "x"
        log_level = "loud"
        json_format = false
        "#,
    );
    assert!(matches!(result, Err(LinkError::ConfigError(_))));
}

#[test]
fn test_example_config_round_trips() {
    let text = LinkConfig::example_config();
    assert!(text.contains("[login]"));
    assert!(text.contains("stall_time = 60000"));

    let parsed = LinkConfig::from_toml(&text).expect("example config parses");
    assert_eq!(parsed.login.port, DEFAULT_LOGIN_PORT);
    assert_eq!(parsed.supervisor.poll_interval, Duration::from_millis(50));
}

#[test]
fn test_from_file_missing() {
    let result = LinkConfig::from_file("/nonexistent/login-link.toml");
    match result {
        Err(LinkError::ConfigError(msg)) => assert!(msg.contains("Failed to open config file")),
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn test_from_env_overrides() {
    std::env::set_var("LOGIN_LINK_ADDRESS", "10.1.2.3");
    std::env::set_var("LOGIN_LINK_PORT", "7000");
    std::env::set_var("LOGIN_LINK_STALL_TIME_MS", "15000");

    let config = LinkConfig::from_env().expect("valid environment");
    assert_eq!(config.login.address, "10.1.2.3");
    assert_eq!(config.login.port, 7000);
    assert_eq!(config.liveness.stall_time, Duration::from_secs(15));
    assert_eq!(config.login.userid, "s1");

    std::env::set_var("LOGIN_LINK_PORT", "not-a-port");
    assert!(matches!(
        LinkConfig::from_env(),
        Err(LinkError::ConfigError(_))
    ));
    std::env::set_var("LOGIN_LINK_PORT", "7000");

    for (var, bad) in [
        ("LOGIN_LINK_STALL_TIME_MS", "sixty"),
        ("LOGIN_LINK_CHECK_INTERVAL_MS", "-5"),
        ("LOGIN_LINK_CONNECT_TIMEOUT_MS", "1.5"),
    ] {
        std::env::set_var(var, bad);
        match LinkConfig::from_env() {
            Err(LinkError::ConfigError(msg)) => assert!(msg.contains(var), "{msg}"),
            other => panic!("{var}={bad} should be rejected, got {other:?}"),
        }
        std::env::remove_var(var);
    }

    std::env::set_var("LOGIN_LINK_CONNECT_TIMEOUT_MS", "250");
    let config = LinkConfig::from_env().expect("valid environment");
    assert_eq!(config.supervisor.connect_timeout, Duration::from_millis(250));

    for var in [
        "LOGIN_LINK_ADDRESS",
        "LOGIN_LINK_PORT",
        "LOGIN_LINK_STALL_TIME_MS",
        "LOGIN_LINK_CONNECT_TIMEOUT_MS",
    ] {
        std::env::remove_var(var);
    }
}
