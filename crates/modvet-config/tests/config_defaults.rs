//! Config defaults and validation tests for modvet-config.
// crates/modvet-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults and Validation Tests
// Description: Validate default values and per-section invariants.
// Purpose: Ensure an empty config matches the historical flag defaults.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use modvet_config::ModvetConfig;
use modvet_core::LogLevel;

mod common;

type TestResult = Result<(), String>;

#[test]
fn default_config_validates() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn defaults_match_historical_flags() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    if config.server.bind != "0.0.0.0:8080" {
        return Err(format!("unexpected bind {}", config.server.bind));
    }
    if config.storage.data_dir != PathBuf::from("/tmp/go_data") {
        return Err("unexpected data_dir".to_string());
    }
    if config.storage.save_interval() != Duration::from_secs(3600) {
        return Err("unexpected save interval".to_string());
    }
    if config.validator.runtime != "docker" || config.validator.image != "gobuilder:manual" {
        return Err("unexpected validator defaults".to_string());
    }
    if config.validator.env_file != PathBuf::from("/tmp/go_data/env") {
        return Err("unexpected env_file".to_string());
    }
    if config.validator.endpoint != "http://192.168.1.2:8080/api/report" {
        return Err("unexpected endpoint".to_string());
    }
    if config.dispatch.workers != 3 || config.dispatch.queue_capacity != 64 {
        return Err("unexpected dispatch defaults".to_string());
    }
    if config.logging.level != LogLevel::Info || config.logging.audit_path.is_some() {
        return Err("unexpected logging defaults".to_string());
    }
    if config != ModvetConfig::default() {
        return Err("empty toml should equal ModvetConfig::default()".to_string());
    }
    Ok(())
}

#[test]
fn partial_sections_keep_other_defaults() -> TestResult {
    let config = ModvetConfig::parse(
        r#"
[server]
bind = "127.0.0.1:9090"

[dispatch]
workers = 8

[logging]
level = "debug"
audit_path = "/var/log/modvet.jsonl"
"#,
    )
    .map_err(|err| err.to_string())?;
    if config.server.bind != "127.0.0.1:9090" || config.server.max_body_bytes != 1024 * 1024 {
        return Err("server section not merged with defaults".to_string());
    }
    if config.dispatch.workers != 8 || config.dispatch.queue_capacity != 64 {
        return Err("dispatch section not merged with defaults".to_string());
    }
    if config.logging.level != LogLevel::Debug {
        return Err("logging level not parsed".to_string());
    }
    Ok(())
}

#[test]
fn rejects_bad_bind_address() -> TestResult {
    common::assert_invalid(
        ModvetConfig::parse("[server]\nbind = \":8080\"\n"),
        "server.bind is not a socket address",
    )
}

#[test]
fn rejects_zero_body_limit() -> TestResult {
    common::assert_invalid(
        ModvetConfig::parse("[server]\nmax_body_bytes = 0\n"),
        "server.max_body_bytes",
    )
}

#[test]
fn rejects_zero_save_interval() -> TestResult {
    common::assert_invalid(
        ModvetConfig::parse("[storage]\nsave_interval_secs = 0\n"),
        "storage.save_interval_secs",
    )
}

#[test]
fn rejects_empty_data_dir() -> TestResult {
    common::assert_invalid(ModvetConfig::parse("[storage]\ndata_dir = \"\"\n"), "storage.data_dir")
}

#[test]
fn rejects_invalid_dispatch_pool() -> TestResult {
    common::assert_invalid(
        ModvetConfig::parse("[dispatch]\nqueue_capacity = 0\n"),
        "dispatch.queue_capacity",
    )
}

#[test]
fn rejects_non_http_endpoint() -> TestResult {
    common::assert_invalid(
        ModvetConfig::parse("[validator]\nendpoint = \"unix:///tmp/sock\"\n"),
        "validator.endpoint",
    )
}

#[test]
fn rejects_unknown_fields() -> TestResult {
    common::assert_invalid(ModvetConfig::parse("[server]\nport = 8080\n"), "config parse error")?;
    common::assert_invalid(ModvetConfig::parse("[extras]\nx = 1\n"), "config parse error")
}

#[test]
fn rejects_unknown_log_level() -> TestResult {
    common::assert_invalid(ModvetConfig::parse("[logging]\nlevel = \"loud\"\n"), "config parse error")
}
