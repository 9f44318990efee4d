// crates/modvet-core/tests/proptest_store.rs
// ============================================================================
// Module: Validation Store Property-Based Tests
// Description: Last-write-wins and snapshot equivalence over random histories.
// Purpose: Check store reads against a simple model map.
// ============================================================================

//! Property-based tests for store read-after-write semantics.

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

use std::collections::BTreeMap;
use std::sync::Arc;

use modvet_core::NoopAuditSink;
use modvet_core::PackageKey;
use modvet_core::PackageStore;
use modvet_core::ValidationRecord;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Set(usize, ValidationRecord),
    Purge(usize),
}

fn record_strategy() -> impl Strategy<Value = ValidationRecord> {
    (any::<bool>(), 0u64 .. 20, any::<bool>(), prop::collection::vec("[a-z./]{1,8}", 0 .. 3))
        .prop_map(|(download_succeeded, buildable_targets, all_builds_pass, failed_builds)| {
            ValidationRecord {
                download_succeeded,
                buildable_targets,
                all_builds_pass,
                failed_builds,
                ..ValidationRecord::default()
            }
        })
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize .. 6, record_strategy()).prop_map(|(index, record)| Op::Set(index, record)),
        1 => (0usize .. 6).prop_map(Op::Purge),
    ]
}

fn key(index: usize) -> PackageKey {
    PackageKey::new(&format!("example.com/mod{index}"), "v1.0.0").expect("valid key")
}

proptest! {
    #[test]
    fn reads_reflect_last_write(ops in prop::collection::vec(op_strategy(), 0 .. 40)) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PackageStore::open(dir.path(), Arc::new(NoopAuditSink)).expect("open");
        let mut model: BTreeMap<usize, ValidationRecord> = BTreeMap::new();
        for op in ops {
            match op {
                Op::Set(index, record) => {
                    store.set_package_data(key(index), record.clone());
                    model.insert(index, record);
                }
                Op::Purge(index) => {
                    store.purge_package(&key(index));
                    model.remove(&index);
                }
            }
        }
        for index in 0 .. 6 {
            prop_assert_eq!(store.get_package_data(&key(index)), model.get(&index).cloned());
        }

        if let Some(path) = store.save().expect("save") {
            let fresh = PackageStore::open(dir.path(), Arc::new(NoopAuditSink)).expect("open");
            fresh.load(&path).expect("load");
            for index in 0 .. 6 {
                prop_assert_eq!(fresh.get_package_data(&key(index)), model.get(&index).cloned());
            }
        }
    }
}
