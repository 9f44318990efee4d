// crates/modvet-core/tests/deciders.rs
// ============================================================================
// Module: Decision Engine Tests
// Description: Known-answer cases for the purge predicates and policy.
// Purpose: Pin the version and module-path heuristics.
// ============================================================================

//! Decision Engine tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use modvet_core::Package;
use modvet_core::PackageKey;
use modvet_core::PurgeReason;
use modvet_core::ValidationRecord;
use modvet_core::banned;
use modvet_core::domain_only;
use modvet_core::incommensurate_name;
use modvet_core::purge_reason;

fn key(raw: &str) -> PackageKey {
    PackageKey::parse(raw).expect("valid key")
}

fn package(raw: &str, download_succeeded: bool) -> Package {
    Package {
        key: key(raw),
        record: ValidationRecord {
            download_succeeded,
            ..ValidationRecord::default()
        },
    }
}

#[test]
fn incommensurate_name_cases() {
    let cases = [
        ("example.com/code/v1@v2.0.0", true),
        ("example.com/code/v2@v2.0.0", false),
        ("example.com/code/v3@v2.0.0", true),
        ("example.com/code@v0.0.0", false),
        ("example.com/code@v1.0.0", false),
        ("example.com/code@v2.0.0", true),
        ("example.com/code@v2.0.0+incompatible", false),
        ("example.com/code@v10.0.0", true),
        ("example.com/code/v10@v10.2.0", false),
        ("example.com/code/v3@v3.0.0-rc.1", false),
        ("example.com/code@2.0.0", false),
        ("example.com/code@vNext", false),
    ];
    for (raw, expected) in cases {
        assert_eq!(incommensurate_name(&key(raw)), expected, "{raw}");
    }
}

#[test]
fn domain_only_cases() {
    assert!(domain_only(&key("github.com@foo")));
    assert!(domain_only(&key("github.com@v1.0.0")));
    assert!(!domain_only(&key("github.com/foo@foo")));
    assert!(!domain_only(&key("github.com/foo@v1.0.0")));
}

#[test]
fn banned_cases() {
    assert!(banned(&key("github.com/owner@v1.0.0")));
    assert!(banned(&key("bitbucket.org/owner@v1.0.0")));
    assert!(!banned(&key("github.com/owner/repo@v1.0.0")));
    assert!(!banned(&key("gitlab.com/owner@v1.0.0")));
    assert!(banned(&key("golang.org/x@v0.0.0")));
    assert!(banned(&key("honnef.co/go@v0.1.0")));
    assert!(banned(&key("cloud.google.com/go@v0.100.0")));
    assert!(banned(&key("dmitri.shuralyov.com/gpu@v0.0.0")));
    assert!(!banned(&key("golang.org/x/tools@v0.1.0")));
    assert!(!banned(&key("cloud.google.com/go/storage@v1.0.0")));
}

#[test]
fn purge_reason_reports_first_match() {
    assert_eq!(purge_reason(&package("github.com@v1.0.0", true)), Some(PurgeReason::DomainOnly));
    assert_eq!(purge_reason(&package("github.com/owner@v1.0.0", true)), Some(PurgeReason::Banned));
    assert_eq!(
        purge_reason(&package("example.com/code@v2.0.0", true)),
        Some(PurgeReason::IncommensurateName)
    );
    assert_eq!(
        purge_reason(&package("example.com/code@v1.0.0", false)),
        Some(PurgeReason::DownloadFailed)
    );
    assert_eq!(purge_reason(&package("example.com/code@v1.0.0", true)), None);
    assert_eq!(purge_reason(&package("example.com/code/v2@v2.0.0", true)), None);
}
