// crates/modvet-core/src/lib.rs
// ============================================================================
// Module: modvet Core Library
// Description: Package records, decision predicates, and the validation store.
// Purpose: Provide the state and rules shared by the server and offline tools.
// Dependencies: serde, serde_json, tempfile, thiserror, time
// ============================================================================

//! ## Overview
//! `modvet-core` owns the package validation state: the [`PackageKey`] and
//! [`ValidationRecord`] model, the concurrent [`PackageStore`] with snapshot
//! persistence, the pure Decision Engine predicates, the maintenance purge
//! pass, and the statistics accumulator behind the tabulation report.
//! Structured audit events for every crate in the workspace live in
//! [`audit`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod deciders;
pub mod maintenance;
pub mod model;
pub mod stats;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEvent;
pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::LogLevel;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use deciders::PurgeReason;
pub use deciders::banned;
pub use deciders::domain_only;
pub use deciders::incommensurate_name;
pub use deciders::purge_reason;
pub use maintenance::CleanReport;
pub use maintenance::clean_store;
pub use model::KeyError;
pub use model::Package;
pub use model::PackageKey;
pub use model::ValidationRecord;
pub use stats::Accumulator;
pub use stats::ModuleCount;
pub use stats::Percentiles;
pub use stats::Tabulation;
pub use stats::mean_and_stddev;
pub use stats::percent;
pub use stats::percentiles;
pub use store::PackageStore;
pub use store::SNAPSHOT_PREFIX;
pub use store::StoreError;
pub use store::latest_snapshot;
