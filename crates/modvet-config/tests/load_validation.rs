//! Config load validation tests for modvet-config.
// crates/modvet-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict.
// =============================================================================

use std::io::Write;
use std::path::Path;

use modvet_config::MAX_CONFIG_FILE_SIZE;
use modvet_config::ModvetConfig;
use tempfile::NamedTempFile;

mod common;

type TestResult = Result<(), String>;

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    common::assert_invalid(
        ModvetConfig::load(Some(Path::new(&long_path))),
        "config path exceeds max length",
    )
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    common::assert_invalid(
        ModvetConfig::load(Some(Path::new(&long_component))),
        "config path component too long",
    )
}

#[test]
fn load_rejects_missing_explicit_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    common::assert_invalid(
        ModvetConfig::load(Some(&dir.path().join("absent.toml"))),
        "config io error",
    )
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let padding = format!("# {}\n", "x".repeat(MAX_CONFIG_FILE_SIZE));
    file.write_all(padding.as_bytes()).map_err(|err| err.to_string())?;
    common::assert_invalid(ModvetConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xff, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    common::assert_invalid(ModvetConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_reads_explicit_file_and_records_source() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[storage]\ndata_dir = \"/srv/modvet\"\nsave_interval_secs = 60\n")
        .map_err(|err| err.to_string())?;
    let config = ModvetConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.storage.data_dir != Path::new("/srv/modvet") {
        return Err("data_dir not loaded".to_string());
    }
    if config.storage.save_interval_secs != 60 {
        return Err("save interval not loaded".to_string());
    }
    if config.source.as_deref() != Some(file.path()) {
        return Err("source path not recorded".to_string());
    }
    Ok(())
}
