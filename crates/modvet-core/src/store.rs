// crates/modvet-core/src/store.rs
// ============================================================================
// Module: Validation Store
// Description: Concurrent package record store with snapshot persistence.
// Purpose: Own every validation record and flush it to timestamped snapshots.
// Dependencies: serde_json, tempfile, thiserror, time
// ============================================================================

//! ## Overview
//! [`PackageStore`] maps [`PackageKey`] to [`ValidationRecord`] behind a
//! single lock. Readers always receive copies. Every mutation bumps a
//! generation counter; the store is dirty while that counter differs from the
//! generation captured by the last successful snapshot.
//!
//! Snapshots are JSON objects written to `pkgdata-<UTC timestamp>` files in
//! the storage directory. Files are published with a no-clobber rename from a
//! temporary file, so the directory only ever gains complete snapshots.
//!
//! ## Invariants
//! - The record lock is never held across filesystem I/O.
//! - At most one snapshot is written per dirty period; concurrent saves are
//!   serialized.
//! - A failed save leaves the store dirty so the next save retries.
//! - A failed load leaves the store untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use tempfile::NamedTempFile;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::audit::AuditEvent;
use crate::audit::AuditSink;
use crate::audit::LogLevel;
use crate::model::Package;
use crate::model::PackageKey;
use crate::model::ValidationRecord;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Filename prefix shared by every snapshot file.
pub const SNAPSHOT_PREFIX: &str = "pkgdata-";
/// Fixed-width UTC timestamp so filename order is chronological order.
/// No `:` so the names stay valid on every platform.
const SNAPSHOT_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour][minute][second].[subsecond digits:9]Z");
/// Maximum length for a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Validation store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Filesystem error while reading or writing snapshots.
    #[error("store io error: {0}")]
    Io(String),
    /// Snapshot contents could not be encoded or decoded.
    #[error("store snapshot parse error: {0}")]
    Parse(String),
    /// Storage directory or snapshot path is unusable.
    #[error("store invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Mutable state guarded by the store lock.
#[derive(Debug, Default)]
struct StoreState {
    /// Records keyed by package.
    packages: BTreeMap<PackageKey, ValidationRecord>,
    /// Incremented on every mutation.
    generation: u64,
    /// Generation captured by the last successful snapshot.
    saved_generation: u64,
}

impl StoreState {
    /// Records a mutation.
    const fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Inserts a default record when absent; returns whether it existed.
    fn ensure(&mut self, key: &PackageKey) -> bool {
        if self.packages.contains_key(key) {
            return true;
        }
        self.packages.insert(key.clone(), ValidationRecord::default());
        self.touch();
        false
    }

    /// Overwrites the record for `key`.
    fn set(&mut self, key: PackageKey, record: ValidationRecord) {
        self.packages.insert(key, record);
        self.touch();
    }

    /// Returns true when unsaved mutations exist.
    const fn is_dirty(&self) -> bool {
        self.generation != self.saved_generation
    }
}

/// Concurrent package validation store backed by a snapshot directory.
pub struct PackageStore {
    /// Directory holding snapshot files.
    dir: PathBuf,
    /// Records and dirty tracking.
    state: Mutex<StoreState>,
    /// Serializes snapshot writes.
    save_lock: Mutex<()>,
    /// Destination for store events.
    audit: Arc<dyn AuditSink>,
}

impl PackageStore {
    /// Opens an empty, clean store over an existing storage directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when the path is unusable or is not an
    /// existing directory.
    pub fn open(dir: impl Into<PathBuf>, audit: Arc<dyn AuditSink>) -> Result<Self, StoreError> {
        let dir = dir.into();
        validate_storage_dir(&dir)?;
        Ok(Self {
            dir,
            state: Mutex::new(StoreState::default()),
            save_lock: Mutex::new(()),
            audit,
        })
    }

    /// Returns the storage directory.
    #[must_use]
    pub fn storage_dir(&self) -> &Path {
        &self.dir
    }

    /// Inserts an empty record when `key` is absent.
    ///
    /// Returns whether the key already existed; callers claim new work on
    /// `false`.
    pub fn ensure_package(&self, key: &PackageKey) -> bool {
        self.state().ensure(key)
    }

    /// Returns a copy of the record for `key`.
    #[must_use]
    pub fn get_package_data(&self, key: &PackageKey) -> Option<ValidationRecord> {
        self.state().packages.get(key).cloned()
    }

    /// Overwrites the record for `key`, creating it when absent.
    ///
    /// Always marks the store dirty, even when the value is unchanged.
    pub fn set_package_data(&self, key: PackageKey, record: ValidationRecord) {
        self.state().set(key, record);
    }

    /// Removes the record for `key`. Marks the store dirty even when absent.
    pub fn purge_package(&self, key: &PackageKey) {
        let mut state = self.state();
        state.packages.remove(key);
        state.touch();
    }

    /// Removes every record whose download failed; returns how many.
    ///
    /// Always marks the store dirty.
    pub fn purge_download_failed(&self) -> usize {
        let mut state = self.state();
        let before = state.packages.len();
        state.packages.retain(|_, record| record.download_succeeded);
        state.touch();
        let removed = before - state.packages.len();
        drop(state);
        self.audit
            .record(&AuditEvent::new("store_purged_download_failed", LogLevel::Debug).count(removed));
        removed
    }

    /// Returns copies of every record as of the call.
    #[must_use]
    pub fn all_packages(&self) -> std::vec::IntoIter<Package> {
        let packages: Vec<Package> = self
            .state()
            .packages
            .iter()
            .map(|(key, record)| Package {
                key: key.clone(),
                record: record.clone(),
            })
            .collect();
        packages.into_iter()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().packages.len()
    }

    /// Returns true when no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().packages.is_empty()
    }

    /// Returns true when mutations exist that no snapshot holds.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state().is_dirty()
    }

    /// Writes a snapshot when the store is dirty.
    ///
    /// Returns the new snapshot path, or `None` when nothing changed since
    /// the last successful save.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when encoding or writing fails; the store stays
    /// dirty.
    pub fn save(&self) -> Result<Option<PathBuf>, StoreError> {
        let _save_guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (snapshot, generation) = {
            let state = self.state();
            if !state.is_dirty() {
                return Ok(None);
            }
            (state.packages.clone(), state.generation)
        };
        let result = serde_json::to_vec(&snapshot)
            .map_err(|err| StoreError::Parse(err.to_string()))
            .and_then(|payload| self.write_snapshot(&payload));
        match result {
            Ok(path) => {
                self.state().saved_generation = generation;
                self.audit.record(
                    &AuditEvent::new("store_saved", LogLevel::Info)
                        .path(&path)
                        .count(snapshot.len()),
                );
                Ok(Some(path))
            }
            Err(err) => {
                self.audit.record(
                    &AuditEvent::new("store_save_failed", LogLevel::Error)
                        .path(&self.dir)
                        .error(&err),
                );
                Err(err)
            }
        }
    }

    /// Merges a snapshot file into the store; returns the entry count.
    ///
    /// A store that was clean before the load stays clean.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the file cannot be read or parsed; the
    /// store is left unchanged.
    pub fn load(&self, path: &Path) -> Result<usize, StoreError> {
        let entries = match read_snapshot(path) {
            Ok(entries) => entries,
            Err(err) => {
                self.audit.record(
                    &AuditEvent::new("store_load_failed", LogLevel::Error).path(path).error(&err),
                );
                return Err(err);
            }
        };
        let count = entries.len();
        {
            let mut state = self.state();
            let was_clean = !state.is_dirty();
            for (key, record) in entries {
                state.ensure(&key);
                state.set(key, record);
            }
            if was_clean {
                state.saved_generation = state.generation;
            }
        }
        self.audit.record(&AuditEvent::new("store_loaded", LogLevel::Info).path(path).count(count));
        Ok(count)
    }

    /// Loads the newest snapshot in the storage directory, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory cannot be listed or the
    /// newest snapshot fails to load.
    pub fn load_latest(&self) -> Result<Option<PathBuf>, StoreError> {
        let Some(path) = latest_snapshot(&self.dir)? else {
            return Ok(None);
        };
        self.load(&path)?;
        Ok(Some(path))
    }

    /// Locks the record state, recovering from poisoning.
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes `payload` to a fresh snapshot file and returns its path.
    fn write_snapshot(&self, payload: &[u8]) -> Result<PathBuf, StoreError> {
        let mut file =
            NamedTempFile::new_in(&self.dir).map_err(|err| StoreError::Io(err.to_string()))?;
        file.write_all(payload).map_err(|err| StoreError::Io(err.to_string()))?;
        file.as_file().sync_all().map_err(|err| StoreError::Io(err.to_string()))?;
        let path = self.dir.join(snapshot_file_name()?);
        file.persist_noclobber(&path).map_err(|err| StoreError::Io(err.error.to_string()))?;
        Ok(path)
    }
}

// ============================================================================
// SECTION: Snapshot Files
// ============================================================================

/// Returns the newest `pkgdata-*` file in `dir`, if any.
///
/// # Errors
///
/// Returns [`StoreError::Io`] when the directory cannot be listed.
pub fn latest_snapshot(dir: &Path) -> Result<Option<PathBuf>, StoreError> {
    let entries = std::fs::read_dir(dir).map_err(|err| StoreError::Io(err.to_string()))?;
    let mut latest: Option<(String, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|err| StoreError::Io(err.to_string()))?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !name.starts_with(SNAPSHOT_PREFIX) {
            continue;
        }
        if !entry.file_type().is_ok_and(|file_type| file_type.is_file()) {
            continue;
        }
        if latest.as_ref().is_none_or(|(best, _)| name > *best) {
            latest = Some((name, entry.path()));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

/// Reads and fully decodes a snapshot file.
fn read_snapshot(path: &Path) -> Result<BTreeMap<PackageKey, ValidationRecord>, StoreError> {
    let bytes = std::fs::read(path).map_err(|err| StoreError::Io(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| StoreError::Parse(err.to_string()))
}

/// Builds the snapshot file name for the current instant.
fn snapshot_file_name() -> Result<String, StoreError> {
    let stamp = OffsetDateTime::now_utc()
        .format(SNAPSHOT_TIME_FORMAT)
        .map_err(|err| StoreError::Invalid(err.to_string()))?;
    Ok(format!("{SNAPSHOT_PREFIX}{stamp}"))
}

/// Validates the storage directory for safety limits.
fn validate_storage_dir(path: &Path) -> Result<(), StoreError> {
    if path.as_os_str().is_empty() {
        return Err(StoreError::Invalid("storage path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(StoreError::Invalid("storage path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(StoreError::Invalid(
                "storage path contains an overlong component".to_string(),
            ));
        }
    }
    if !path.is_dir() {
        return Err(StoreError::Invalid(format!(
            "storage path {path_string} is not an existing directory"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
