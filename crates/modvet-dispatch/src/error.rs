// crates/modvet-dispatch/src/error.rs
// ============================================================================
// Module: Dispatch Errors
// Description: Failures surfaced by the dispatch queue to its callers.
// Purpose: Distinguish bad settings from a saturated or closed queue.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Only queue admission fails visibly. Once a request is queued, spawn
//! failures are logged by the worker and never reach the submitter.

use thiserror::Error;

/// Dispatch queue errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Settings failed validation.
    #[error("dispatch settings invalid: {0}")]
    Invalid(String),
    /// No Tokio runtime is available to host the workers.
    #[error("dispatch queue requires a tokio runtime")]
    NoRuntime,
    /// The bounded queue has no free slot.
    #[error("dispatch queue is full")]
    QueueFull,
    /// The queue has been shut down.
    #[error("dispatch queue is closed")]
    Closed,
}
