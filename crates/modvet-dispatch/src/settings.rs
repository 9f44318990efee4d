// crates/modvet-dispatch/src/settings.rs
// ============================================================================
// Module: Dispatch Settings
// Description: Validator invocation bundle and worker pool sizing.
// Purpose: Carry the process-wide settings supplied once at startup.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`ValidatorSettings`] describes how to invoke the external validator and
//! where it should report back. [`DispatchSettings`] sizes the worker pool and
//! its queue. Both deserialize directly from configuration sections.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::error::DispatchError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Upper bound on concurrently running validator processes.
pub const MAX_WORKERS: usize = 256;
/// Upper bound on buffered dispatch requests.
pub const MAX_QUEUE_CAPACITY: usize = 65_536;

// ============================================================================
// SECTION: Validator Settings
// ============================================================================

/// How to invoke the containerized validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorSettings {
    /// Container runtime executable.
    pub runtime: String,
    /// Container image that performs the validation.
    pub image: String,
    /// Environment file passed to the container.
    pub env_file: PathBuf,
    /// URL the validator reports results to.
    pub endpoint: String,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            image: default_image(),
            env_file: default_env_file(),
            endpoint: default_endpoint(),
        }
    }
}

impl ValidatorSettings {
    /// Validates the invocation bundle.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Invalid`] when a field is empty or the
    /// endpoint is not an HTTP URL.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.runtime.trim().is_empty() {
            return Err(DispatchError::Invalid("validator.runtime must not be empty".to_string()));
        }
        if self.image.trim().is_empty() {
            return Err(DispatchError::Invalid("validator.image must not be empty".to_string()));
        }
        if self.env_file.as_os_str().is_empty() {
            return Err(DispatchError::Invalid("validator.env_file must not be empty".to_string()));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(DispatchError::Invalid(
                "validator.endpoint must be an http or https url".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default container runtime.
fn default_runtime() -> String {
    "docker".to_string()
}

/// Default validator image.
fn default_image() -> String {
    "gobuilder:manual".to_string()
}

/// Default environment file.
fn default_env_file() -> PathBuf {
    PathBuf::from("/tmp/go_data/env")
}

/// Default report endpoint.
fn default_endpoint() -> String {
    "http://192.168.1.2:8080/api/report".to_string()
}

// ============================================================================
// SECTION: Pool Settings
// ============================================================================

/// Worker pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchSettings {
    /// Worker count; also the ceiling on concurrent validator processes.
    pub workers: usize,
    /// Requests buffered ahead of the workers.
    pub queue_capacity: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            workers: 3,
            queue_capacity: 64,
        }
    }
}

impl DispatchSettings {
    /// Validates pool sizing.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Invalid`] when either value is zero or above
    /// its limit.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(DispatchError::Invalid(format!(
                "dispatch.workers must be between 1 and {MAX_WORKERS}"
            )));
        }
        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(DispatchError::Invalid(format!(
                "dispatch.queue_capacity must be between 1 and {MAX_QUEUE_CAPACITY}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
