// crates/modvet-core/src/model.rs
// ============================================================================
// Module: Package Data Model
// Description: Package keys and per-package validation records.
// Purpose: Define the values tracked by the validation store and snapshots.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A package is one module at one version, identified by a [`PackageKey`] of
//! the form `module@version`. The external validator reports a
//! [`ValidationRecord`] for each package; the store keeps one record per key.
//!
//! When [`ValidationRecord::download_succeeded`] is false every other field is
//! meaningless and consumers must treat the record as "no data".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator between the module path and the version in a package key.
pub const KEY_SEPARATOR: char = '@';

// ============================================================================
// SECTION: Package Key
// ============================================================================

/// Package key parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The key has no `@` separator.
    #[error("package key {0:?} is missing the '@' separator")]
    MissingSeparator(String),
    /// The module path portion is empty.
    #[error("package key {0:?} has an empty module path")]
    EmptyModule(String),
    /// The version portion is empty.
    #[error("package key {0:?} has an empty version")]
    EmptyVersion(String),
    /// The module path contains the `@` separator.
    #[error("module path {0:?} must not contain '@'")]
    SeparatorInModule(String),
}

/// Unique identity of a tracked package (`module@version`).
///
/// # Invariants
/// - Contains at least one `@`; the text before the first `@` (the module
///   path) and the text after it (the version) are both non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageKey {
    /// Full `module@version` text.
    raw: String,
    /// Byte offset of the separator within `raw`.
    split: usize,
}

impl PackageKey {
    /// Builds a key from a module path and a version.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when either part is empty or the module path
    /// contains the separator.
    pub fn new(module: &str, version: &str) -> Result<Self, KeyError> {
        if module.contains(KEY_SEPARATOR) {
            return Err(KeyError::SeparatorInModule(module.to_string()));
        }
        Self::parse(&format!("{module}{KEY_SEPARATOR}{version}"))
    }

    /// Parses a `module@version` string.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when the separator is missing or either part is
    /// empty.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let Some(split) = raw.find(KEY_SEPARATOR) else {
            return Err(KeyError::MissingSeparator(raw.to_string()));
        };
        if split == 0 {
            return Err(KeyError::EmptyModule(raw.to_string()));
        }
        if split + KEY_SEPARATOR.len_utf8() == raw.len() {
            return Err(KeyError::EmptyVersion(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            split,
        })
    }

    /// Returns the full `module@version` text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the module path portion.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.raw[.. self.split]
    }

    /// Returns the version portion.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.raw[self.split + KEY_SEPARATOR.len_utf8() ..]
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for PackageKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PackageKey> for String {
    fn from(key: PackageKey) -> Self {
        key.raw
    }
}

// ============================================================================
// SECTION: Validation Record
// ============================================================================

/// Validation outcome for one package as reported by the external validator.
///
/// # Invariants
/// - When `download_succeeded` is false the remaining fields carry no data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationRecord {
    /// Whether source retrieval completed.
    pub download_succeeded: bool,
    /// Number of compilable targets.
    pub buildable_targets: u64,
    /// Whether every buildable target built.
    pub all_builds_pass: bool,
    /// Number of targets with tests.
    pub testable_targets: u64,
    /// Whether every testable target passed its tests.
    pub all_tests_pass: bool,
    /// Targets that passed vet.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub passed_vets: Vec<String>,
    /// Targets that failed to build.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_builds: Vec<String>,
    /// Targets whose tests failed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_tests: Vec<String>,
    /// Targets that failed vet.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_vets: Vec<String>,
    /// Targets with formatting differences.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_fmt: Vec<String>,
}

// ============================================================================
// SECTION: Package
// ============================================================================

/// A key and a copy of its record, as produced by bulk iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Package key.
    pub key: PackageKey,
    /// Copy of the stored validation record.
    pub record: ValidationRecord,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
