// crates/modvet-core/src/maintenance.rs
// ============================================================================
// Module: Maintenance Pass
// Description: Offline purge of records flagged by the Decision Engine.
// Purpose: Drop junk and failed packages from a quiescent store.
// Dependencies: crate::deciders, crate::store
// ============================================================================

//! ## Overview
//! [`clean_store`] copies every record out of the store, asks
//! [`purge_reason`] about each one, and purges the flagged keys. It is meant
//! for quiescent stores: records written while the pass runs are not
//! revisited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::audit::LogLevel;
use crate::deciders::PurgeReason;
use crate::deciders::purge_reason;
use crate::store::PackageStore;

// ============================================================================
// SECTION: Report
// ============================================================================

/// Outcome of one maintenance pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Records inspected.
    pub examined: usize,
    /// Purged record count per reason.
    pub purged: BTreeMap<PurgeReason, usize>,
}

impl CleanReport {
    /// Returns the total number of purged records.
    #[must_use]
    pub fn total_purged(&self) -> usize {
        self.purged.values().sum()
    }

    /// Returns the purged count for one reason.
    #[must_use]
    pub fn purged_for(&self, reason: PurgeReason) -> usize {
        self.purged.get(&reason).copied().unwrap_or(0)
    }
}

// ============================================================================
// SECTION: Pass
// ============================================================================

/// Purges every record that [`purge_reason`] flags.
pub fn clean_store(store: &PackageStore, audit: &dyn AuditSink) -> CleanReport {
    let mut report = CleanReport::default();
    for package in store.all_packages() {
        report.examined += 1;
        let Some(reason) = purge_reason(&package) else {
            continue;
        };
        store.purge_package(&package.key);
        *report.purged.entry(reason).or_default() += 1;
        audit.record(
            &AuditEvent::new("package_purged", LogLevel::Debug)
                .package(&package.key)
                .reason(reason.label()),
        );
    }
    audit.record(
        &AuditEvent::new("clean_completed", LogLevel::Info)
            .count(report.total_purged())
            .message(format!("examined {} packages", report.examined)),
    );
    report
}
