// crates/modvet-core/src/deciders.rs
// ============================================================================
// Module: Decision Engine
// Description: Pure predicates that flag package records as discardable.
// Purpose: Classify records for the maintenance purge pass.
// Dependencies: crate::model
// ============================================================================

//! ## Overview
//! Three heuristics flag keys that are almost certainly junk:
//! - [`domain_only`]: the module path is a bare hostname.
//! - [`banned`]: a forge owner without a repository, or a known-bad root.
//! - [`incommensurate_name`]: a major version of 2 or higher whose module
//!   path does not end in the matching `/vN` suffix.
//!
//! [`purge_reason`] composes them with the download outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::model::Package;
use crate::model::PackageKey;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Forge hosts whose two-segment paths name an owner rather than a module.
const FORGE_ROOTS: [&str; 2] = ["github.com", "bitbucket.org"];

/// Module paths that are known to be umbrella roots rather than modules.
const BANNED_MODULES: [&str; 4] =
    ["honnef.co/go", "cloud.google.com/go", "dmitri.shuralyov.com/gpu", "golang.org/x"];

/// Version suffix for pre-module major versions.
const INCOMPATIBLE_SUFFIX: &str = "+incompatible";

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Returns true when the module path has no `/` (a bare hostname).
#[must_use]
pub fn domain_only(key: &PackageKey) -> bool {
    !key.module().contains('/')
}

/// Returns true for forge owner paths and known umbrella roots.
#[must_use]
pub fn banned(key: &PackageKey) -> bool {
    let module = key.module();
    let segments: Vec<&str> = module.split('/').collect();
    if segments.len() == 2 && FORGE_ROOTS.contains(&segments[0]) {
        return true;
    }
    BANNED_MODULES.contains(&module)
}

/// Returns true when a v2+ version does not match the module path suffix.
///
/// Versions that do not start with `v`, whose major token is not numeric, or
/// whose major version is 0 or 1 never mismatch. `+incompatible` versions are
/// exempt.
#[must_use]
pub fn incommensurate_name(key: &PackageKey) -> bool {
    let Some(major) = major_version(key.version()) else {
        return false;
    };
    if major < 2 || key.version().ends_with(INCOMPATIBLE_SUFFIX) {
        return false;
    }
    let last_segment = key.module().rsplit('/').next().unwrap_or_default();
    last_segment != format!("v{major}")
}

/// Parses the major version from `vMAJOR[.-+]...`.
fn major_version(version: &str) -> Option<u64> {
    let rest = version.strip_prefix('v')?;
    let end = rest.find(['.', '-', '+']).unwrap_or(rest.len());
    let token = &rest[.. end];
    if token.is_empty() || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

// ============================================================================
// SECTION: Purge Policy
// ============================================================================

/// Why the maintenance pass discards a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PurgeReason {
    /// Module path is a bare hostname.
    DomainOnly,
    /// Module path is a forge owner or known umbrella root.
    Banned,
    /// Major version and module path disagree.
    IncommensurateName,
    /// The validator could not download the source.
    DownloadFailed,
}

impl PurgeReason {
    /// Returns the stable label used in logs and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DomainOnly => "domain_only",
            Self::Banned => "banned",
            Self::IncommensurateName => "incommensurate_name",
            Self::DownloadFailed => "download_failed",
        }
    }
}

impl fmt::Display for PurgeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returns the first reason to purge `package`, or `None` to keep it.
///
/// A package is purged when any key predicate holds or its download failed.
#[must_use]
pub fn purge_reason(package: &Package) -> Option<PurgeReason> {
    if domain_only(&package.key) {
        Some(PurgeReason::DomainOnly)
    } else if banned(&package.key) {
        Some(PurgeReason::Banned)
    } else if incommensurate_name(&package.key) {
        Some(PurgeReason::IncommensurateName)
    } else if !package.record.download_succeeded {
        Some(PurgeReason::DownloadFailed)
    } else {
        None
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
