// crates/modvet-server/src/lib.rs
// ============================================================================
// Module: modvet Server Library
// Description: HTTP transport and lifecycle for the modvet service.
// Purpose: Expose the validation store and dispatch queue over HTTP.
// Dependencies: axum, modvet-config, modvet-core, modvet-dispatch, tokio
// ============================================================================

//! ## Overview
//! [`ModvetServer`] wires a [`modvet_core::PackageStore`] and a
//! [`modvet_dispatch::DispatchQueue`] behind an axum router built by
//! [`build_router`], runs the periodic snapshot ticker, and flushes the store
//! on shutdown.

pub mod server;

pub use server::AppState;
pub use server::ModvetServer;
pub use server::ServerError;
pub use server::build_router;
pub use server::spawn_periodic_save;
