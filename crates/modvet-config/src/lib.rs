// crates/modvet-config/src/lib.rs
// ============================================================================
// Module: modvet Config Library
// Description: Configuration model and loader for modvet.
// Purpose: Share one validated configuration between the server and CLI.
// Dependencies: modvet-core, modvet-dispatch, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Loads `modvet.toml` into a [`ModvetConfig`]. See [`config`] for the
//! resolution rules and limits.

pub mod config;

pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::LoggingConfig;
pub use config::MAX_BODY_BYTES_LIMIT;
pub use config::MAX_CONFIG_FILE_SIZE;
pub use config::MAX_SAVE_INTERVAL_SECS;
pub use config::ModvetConfig;
pub use config::ServerConfig;
pub use config::StorageConfig;
