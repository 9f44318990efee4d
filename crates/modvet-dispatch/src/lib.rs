// crates/modvet-dispatch/src/lib.rs
// ============================================================================
// Module: modvet Dispatch Library
// Description: Bounded worker pool for external validator invocations.
// Purpose: Trigger containerized validation without blocking callers.
// Dependencies: async-trait, modvet-core, serde, thiserror, tokio
// ============================================================================

//! ## Overview
//! `modvet-dispatch` turns "validate this module version" into a container
//! run. Requests flow through a bounded [`DispatchQueue`] into a fixed set of
//! workers; each worker runs one [`DispatchRequest`] at a time through a
//! [`CommandRunner`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod queue;
pub mod request;
pub mod runner;
pub mod settings;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::DispatchError;
pub use queue::DispatchQueue;
pub use request::DispatchRequest;
pub use runner::CommandRunner;
pub use runner::ProcessRunner;
pub use runner::RunOutcome;
pub use settings::DispatchSettings;
pub use settings::MAX_QUEUE_CAPACITY;
pub use settings::MAX_WORKERS;
pub use settings::ValidatorSettings;
