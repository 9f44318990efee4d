// crates/modvet-dispatch/tests/queue.rs
// ============================================================================
// Module: Dispatch Queue Tests
// Description: Concurrency ceiling, admission, shutdown, and process runs.
// Purpose: Ensure the pool never exceeds its worker count and drains on close.
// ============================================================================

//! Dispatch queue integration tests.

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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use modvet_core::MemoryAuditSink;
use modvet_core::NoopAuditSink;
use modvet_dispatch::CommandRunner;
use modvet_dispatch::DispatchError;
use modvet_dispatch::DispatchQueue;
use modvet_dispatch::DispatchSettings;
use modvet_dispatch::ProcessRunner;
use modvet_dispatch::RunOutcome;
use modvet_dispatch::ValidatorSettings;
use tokio::sync::Semaphore;

// ============================================================================
// SECTION: Runners
// ============================================================================

/// Tracks how many invocations overlap.
#[derive(Default)]
struct CountingRunner {
    /// Invocations currently running.
    active: AtomicUsize,
    /// Highest overlap observed.
    max_active: AtomicUsize,
    /// Finished invocations.
    completed: AtomicUsize,
    /// Argument vectors in completion order.
    seen: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl CommandRunner for CountingRunner {
    async fn run(&self, args: &[String]) -> RunOutcome {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.seen.lock().unwrap().push(args.to_vec());
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        RunOutcome::Completed {
            exit_code: Some(0),
        }
    }
}

/// Blocks every invocation until permits are released.
struct GatedRunner {
    /// One permit per invocation allowed to finish.
    gate: Semaphore,
    /// Finished invocations.
    completed: AtomicUsize,
}

#[async_trait]
impl CommandRunner for GatedRunner {
    async fn run(&self, _args: &[String]) -> RunOutcome {
        let permit = self.gate.acquire().await.unwrap();
        permit.forget();
        self.completed.fetch_add(1, Ordering::SeqCst);
        RunOutcome::Completed {
            exit_code: Some(0),
        }
    }
}

fn pool(workers: usize, queue_capacity: usize) -> DispatchSettings {
    DispatchSettings {
        workers,
        queue_capacity,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_never_exceeds_worker_count() {
    let runner = Arc::new(CountingRunner::default());
    let queue = DispatchQueue::new(
        ValidatorSettings::default(),
        pool(3, 16),
        runner.clone(),
        Arc::new(NoopAuditSink),
    )
    .expect("start queue");

    for index in 0 .. 10 {
        queue.start(&format!("example.com/m{index}"), "v1.0.0").expect("queued");
    }
    queue.shutdown().await;

    assert_eq!(runner.completed.load(Ordering::SeqCst), 10);
    let max_active = runner.max_active.load(Ordering::SeqCst);
    assert!(max_active >= 1);
    assert!(max_active <= 3, "saw {max_active} concurrent runs");

    let seen = runner.seen.lock().unwrap();
    assert!(seen.iter().all(|args| args[0] == "docker" && args[7] == "v1.0.0"));
}

#[tokio::test(flavor = "current_thread")]
async fn start_rejects_when_queue_is_full() {
    let runner = Arc::new(GatedRunner {
        gate: Semaphore::new(0),
        completed: AtomicUsize::new(0),
    });
    let audit = Arc::new(MemoryAuditSink::new());
    let queue =
        DispatchQueue::new(ValidatorSettings::default(), pool(1, 1), runner.clone(), audit.clone())
            .expect("start queue");

    assert_eq!(queue.start("example.com/a", "v1.0.0"), Ok(()));
    assert_eq!(queue.start("example.com/b", "v1.0.0"), Err(DispatchError::QueueFull));
    assert_eq!(audit.named("dispatch_rejected").len(), 1);

    runner.gate.add_permits(8);
    queue.shutdown().await;
    assert_eq!(runner.completed.load(Ordering::SeqCst), 1);
    assert_eq!(audit.named("dispatch_completed").len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn enqueue_waits_for_capacity() {
    let runner = Arc::new(CountingRunner::default());
    let queue = DispatchQueue::new(
        ValidatorSettings::default(),
        pool(1, 1),
        runner.clone(),
        Arc::new(NoopAuditSink),
    )
    .expect("start queue");
    for index in 0 .. 4 {
        queue.enqueue(&format!("example.com/m{index}"), "v2.0.0").await.expect("enqueue");
    }
    queue.shutdown().await;
    assert_eq!(runner.completed.load(Ordering::SeqCst), 4);
    assert_eq!(runner.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn submissions_after_shutdown_are_closed() {
    let queue = DispatchQueue::new(
        ValidatorSettings::default(),
        DispatchSettings::default(),
        Arc::new(CountingRunner::default()),
        Arc::new(NoopAuditSink),
    )
    .expect("start queue");
    queue.shutdown().await;
    assert_eq!(queue.start("example.com/a", "v1.0.0"), Err(DispatchError::Closed));
    assert_eq!(queue.enqueue("example.com/a", "v1.0.0").await, Err(DispatchError::Closed));
    queue.shutdown().await;
}

#[test]
fn new_requires_a_runtime() {
    let result = DispatchQueue::new(
        ValidatorSettings::default(),
        DispatchSettings::default(),
        Arc::new(ProcessRunner),
        Arc::new(NoopAuditSink),
    );
    assert!(matches!(result, Err(DispatchError::NoRuntime)));
}

#[tokio::test]
async fn new_rejects_invalid_settings() {
    let result = DispatchQueue::new(
        ValidatorSettings::default(),
        pool(0, 4),
        Arc::new(ProcessRunner),
        Arc::new(NoopAuditSink),
    );
    assert!(matches!(result, Err(DispatchError::Invalid(_))));
}

#[cfg(unix)]
#[tokio::test]
async fn process_runner_reports_exit_codes_and_spawn_failures() {
    let run = |args: &[&str]| {
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        async move { ProcessRunner.run(&args).await }
    };
    assert_eq!(
        run(&["true"]).await,
        RunOutcome::Completed {
            exit_code: Some(0)
        }
    );
    assert_eq!(
        run(&["false"]).await,
        RunOutcome::Completed {
            exit_code: Some(1)
        }
    );
    assert!(matches!(run(&["/nonexistent/modvet-runtime"]).await, RunOutcome::SpawnFailed { .. }));
    assert!(matches!(run(&[]).await, RunOutcome::SpawnFailed { .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn spawn_failures_are_logged_not_returned() {
    let audit = Arc::new(MemoryAuditSink::new());
    let validator = ValidatorSettings {
        runtime: "/nonexistent/modvet-runtime".to_string(),
        ..ValidatorSettings::default()
    };
    let queue = DispatchQueue::new(
        validator,
        DispatchSettings::default(),
        Arc::new(ProcessRunner),
        audit.clone(),
    )
    .expect("start queue");
    assert_eq!(queue.start("example.com/a", "v1.0.0"), Ok(()));
    queue.shutdown().await;

    let failures = audit.named("dispatch_spawn_failed");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].package.as_deref(), Some("example.com/a@v1.0.0"));
    assert!(failures[0].error.is_some());
}
