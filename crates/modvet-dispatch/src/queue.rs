// crates/modvet-dispatch/src/queue.rs
// ============================================================================
// Module: Dispatch Queue
// Description: Fixed worker pool consuming a bounded request channel.
// Purpose: Run validator invocations with a hard concurrency ceiling.
// Dependencies: modvet-core, tokio
// ============================================================================

//! ## Overview
//! [`DispatchQueue::new`] spawns exactly `workers` tasks that share one
//! bounded channel. Each worker takes a request, runs it to completion through
//! the [`CommandRunner`], then takes the next, so at most `workers` validator
//! processes run at once.
//!
//! [`DispatchQueue::start`] never waits: it either queues the request or
//! reports [`DispatchError::QueueFull`]. Spawn failures are logged by the
//! worker and never reach the submitter.
//!
//! ## Invariants
//! - Requests are never cancelled once queued.
//! - [`DispatchQueue::shutdown`] runs every queued request before returning.
//! - Dropping the queue without `shutdown` aborts idle and running workers;
//!   already spawned processes keep running detached.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use modvet_core::AuditEvent;
use modvet_core::AuditSink;
use modvet_core::LogLevel;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinSet;

use crate::error::DispatchError;
use crate::request::DispatchRequest;
use crate::runner::CommandRunner;
use crate::runner::RunOutcome;
use crate::settings::DispatchSettings;
use crate::settings::ValidatorSettings;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Receiver shared by every worker.
type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<DispatchRequest>>>;

/// Bounded pool of validator workers.
pub struct DispatchQueue {
    /// Invocation bundle used to build requests.
    validator: ValidatorSettings,
    /// Pool sizing the queue was started with.
    settings: DispatchSettings,
    /// Producer side; `None` after shutdown.
    sender: Mutex<Option<mpsc::Sender<DispatchRequest>>>,
    /// Worker tasks; `None` after shutdown.
    workers: Mutex<Option<JoinSet<()>>>,
    /// Destination for dispatch events.
    audit: Arc<dyn AuditSink>,
}

impl DispatchQueue {
    /// Validates settings and spawns the worker tasks on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Invalid`] for bad settings and
    /// [`DispatchError::NoRuntime`] outside a Tokio runtime.
    pub fn new(
        validator: ValidatorSettings,
        settings: DispatchSettings,
        runner: Arc<dyn CommandRunner>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, DispatchError> {
        validator.validate()?;
        settings.validate()?;
        let handle = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        let (sender, receiver) = mpsc::channel(settings.queue_capacity);
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let mut workers = JoinSet::new();
        for worker in 0 .. settings.workers {
            workers.spawn_on(
                worker_loop(
                    worker,
                    Arc::clone(&receiver),
                    Arc::clone(&runner),
                    Arc::clone(&audit),
                ),
                &handle,
            );
        }
        Ok(Self {
            validator,
            settings,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(Some(workers)),
            audit,
        })
    }

    /// Returns the pool sizing.
    #[must_use]
    pub const fn settings(&self) -> DispatchSettings {
        self.settings
    }

    /// Returns the invocation bundle.
    #[must_use]
    pub const fn validator(&self) -> &ValidatorSettings {
        &self.validator
    }

    /// Queues a validation of `module@version` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::QueueFull`] when no slot is free and
    /// [`DispatchError::Closed`] after shutdown.
    pub fn start(&self, module: &str, version: &str) -> Result<(), DispatchError> {
        let request = DispatchRequest::new(&self.validator, module, version);
        let sender = self.sender()?;
        let package = request.package();
        match sender.try_send(request) {
            Ok(()) => {
                self.record_enqueued(&package);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.audit.record(
                    &AuditEvent::new("dispatch_rejected", LogLevel::Warn)
                        .package(&package)
                        .reason("queue_full"),
                );
                Err(DispatchError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }

    /// Queues a validation of `module@version`, waiting for a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] after shutdown.
    pub async fn enqueue(&self, module: &str, version: &str) -> Result<(), DispatchError> {
        let request = DispatchRequest::new(&self.validator, module, version);
        let sender = self.sender()?;
        let package = request.package();
        sender.send(request).await.map_err(|_| DispatchError::Closed)?;
        self.record_enqueued(&package);
        Ok(())
    }

    /// Closes the queue and waits until every queued request has run.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(PoisonError::into_inner).take());
        let workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(mut workers) = workers else {
            return;
        };
        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                self.audit
                    .record(&AuditEvent::new("dispatch_worker_failed", LogLevel::Error).error(err));
            }
        }
        self.audit.record(&AuditEvent::new("dispatch_stopped", LogLevel::Info));
    }

    /// Clones the producer handle out of the lock.
    fn sender(&self) -> Result<mpsc::Sender<DispatchRequest>, DispatchError> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .cloned()
            .ok_or(DispatchError::Closed)
    }

    /// Logs a successful enqueue.
    fn record_enqueued(&self, package: &str) {
        self.audit.record(&AuditEvent::new("dispatch_enqueued", LogLevel::Debug).package(package));
    }
}

// ============================================================================
// SECTION: Workers
// ============================================================================

/// Takes requests until the channel closes, running each to completion.
async fn worker_loop(
    worker: usize,
    receiver: SharedReceiver,
    runner: Arc<dyn CommandRunner>,
    audit: Arc<dyn AuditSink>,
) {
    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(request) = next else {
            break;
        };
        let package = request.package();
        audit.record(
            &AuditEvent::new("dispatch_started", LogLevel::Debug)
                .package(&package)
                .args(&request.args)
                .message(format!("worker {worker}")),
        );
        match runner.run(&request.args).await {
            RunOutcome::Completed {
                exit_code,
            } => {
                let level = if exit_code == Some(0) { LogLevel::Info } else { LogLevel::Warn };
                audit.record(
                    &AuditEvent::new("dispatch_completed", level)
                        .package(&package)
                        .exit_code(exit_code),
                );
            }
            RunOutcome::SpawnFailed {
                error,
            } => {
                audit.record(
                    &AuditEvent::new("dispatch_spawn_failed", LogLevel::Error)
                        .package(&package)
                        .args(&request.args)
                        .error(error),
                );
            }
        }
    }
}
