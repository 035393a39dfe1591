//! Task bridge: a dedicated worker thread plus a wakeup-driven result drain.
//!
//! The event-loop thread submits blocking work; the worker executes it and
//! queues continuations back; the wakeup tells the loop thread to drain.
//! Shared mutable state is confined to the two queues; everything else
//! crosses threads only as values captured inside queued closures.

use crate::bridge::{TaskQueue, Wakeup};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Work executed on the bridge's worker thread.
pub type TaskFn = Box<dyn FnOnce(&Completer) + Send>;

/// Continuation executed back on the event-loop thread.
pub type ContinuationFn = Box<dyn FnOnce() + Send>;

/// Tuning for a bridge instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Worker idle back-off between polls of the task queue. Bounds the
    /// latency of a freshly submitted task when the worker was idle.
    pub poll_interval: Duration,

    /// How long [`TaskBridge::stop`] waits for the worker's current item
    /// before abandoning the thread.
    pub shutdown_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

/// Worker-side handle for publishing continuations.
///
/// Each executing task receives a reference to the bridge's completer, so
/// completing is only reachable from inside a running task. Continuations
/// therefore always originate on the worker thread.
#[derive(Clone)]
pub struct Completer {
    results: Arc<TaskQueue<ContinuationFn>>,
    wakeup: Arc<dyn Wakeup>,
}

impl Completer {
    /// Queue `continuation` for the event-loop thread and fire the wakeup.
    ///
    /// Redundant fires are harmless: a drain always empties the whole
    /// results queue.
    pub fn complete(&self, continuation: impl FnOnce() + Send + 'static) {
        self.results.push(Box::new(continuation));
        self.wakeup.fire();
    }
}

/// Offloads blocking work from a single-threaded event loop onto a
/// dedicated worker thread and carries results back.
///
/// One worker thread per bridge, started at construction. Tasks are FIFO
/// among themselves and continuations FIFO among themselves; there is no
/// ordering guarantee across the two queues. A continuation that touches a
/// captured peer reference must re-check the peer's liveness first: the
/// peer may have disconnected while the work was in flight.
pub struct TaskBridge {
    tasks: Arc<TaskQueue<TaskFn>>,
    results: Arc<TaskQueue<ContinuationFn>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    config: BridgeConfig,
}

impl TaskBridge {
    /// Create a bridge with default tuning and start its worker thread.
    pub fn new(wakeup: Arc<dyn Wakeup>) -> Self {
        Self::with_config(BridgeConfig::default(), wakeup)
    }

    /// Create a bridge with explicit tuning and start its worker thread.
    pub fn with_config(config: BridgeConfig, wakeup: Arc<dyn Wakeup>) -> Self {
        let tasks: Arc<TaskQueue<TaskFn>> = Arc::new(TaskQueue::new());
        let results: Arc<TaskQueue<ContinuationFn>> = Arc::new(TaskQueue::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let completer = Completer {
            results: results.clone(),
            wakeup,
        };
        let worker_tasks = tasks.clone();
        let worker_shutdown = shutdown.clone();
        let poll_interval = config.poll_interval;

        let handle = thread::Builder::new()
            .name("ember-bridge-worker".to_string())
            .spawn(move || {
                Self::worker_loop(worker_tasks, completer, worker_shutdown, poll_interval);
            })
            .expect("Failed to spawn bridge worker thread");

        Self {
            tasks,
            results,
            shutdown,
            handle: Some(handle),
            config,
        }
    }

    /// Queue `work` for the worker thread.
    ///
    /// Event-loop thread only. Returns immediately; the work runs on the
    /// worker as soon as it reaches the head of the task queue.
    pub fn submit(&self, work: impl FnOnce(&Completer) + Send + 'static) {
        self.tasks.push(Box::new(work));
    }

    /// Run queued continuations inline until the results queue is empty.
    ///
    /// Called on the event-loop thread when the wakeup fires. The queue
    /// lock covers only each pop, never the continuation body, so a
    /// continuation that submits new work cannot deadlock.
    pub fn drain(&self) {
        while let Some(continuation) = self.results.try_pop() {
            continuation();
        }
    }

    /// Number of tasks waiting for the worker.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Number of continuations waiting for a drain.
    pub fn pending_results(&self) -> usize {
        self.results.len()
    }

    /// Whether the worker thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Ask the worker to stop after its current item and wait for it.
    ///
    /// Cooperative: the worker observes the flag at its next poll, so a
    /// long-running item delays shutdown, up to `shutdown_timeout`, after
    /// which the thread is abandoned rather than blocking its owner
    /// forever. Tasks still queued are dropped unexecuted, releasing
    /// whatever they captured.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);

        if let Some(handle) = self.handle.take() {
            let start = Instant::now();
            loop {
                if handle.is_finished() {
                    let _ = handle.join();
                    break;
                }
                if start.elapsed() > self.config.shutdown_timeout {
                    // Abandoned: the worker exits on its own at its next
                    // shutdown check.
                    drop(handle);
                    break;
                }
                thread::sleep(Duration::from_millis(5));
            }
        }

        self.tasks.clear();
    }

    /// Worker thread main loop: poll, execute, back off when idle.
    fn worker_loop(
        tasks: Arc<TaskQueue<TaskFn>>,
        completer: Completer,
        shutdown: Arc<AtomicBool>,
        poll_interval: Duration,
    ) {
        loop {
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            match tasks.try_pop() {
                Some(task) => {
                    // One failing item must not kill the worker: a dead
                    // worker would silently stall every future submission.
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(&completer)));
                    if let Err(payload) = outcome {
                        let message = if let Some(text) = payload.downcast_ref::<&str>() {
                            *text
                        } else if let Some(text) = payload.downcast_ref::<String>() {
                            text.as_str()
                        } else {
                            "non-string panic payload"
                        };
                        eprintln!("bridge worker: task panicked: {}", message);
                    }
                }
                None => thread::sleep(poll_interval),
            }
        }

        #[cfg(debug_assertions)]
        eprintln!("Bridge worker shutting down");
    }
}

impl Drop for TaskBridge {
    fn drop(&mut self) {
        self.stop();
    }
}
