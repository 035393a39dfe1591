//! Ember Server Engine
//!
//! The scheduling and cross-thread dispatch core of the Ember pooled-object
//! server framework:
//! - **Scheduler**: circular timer wheel for tick-driven deferred work
//!   (`scheduler` module)
//! - **Bridge**: dedicated worker thread with a wakeup-driven result drain
//!   (`bridge` module)
//! - **Pool**: generation-checked object pool backing the wheel's intrusive
//!   bucket lists (`pool` module)
//! - **Wire**: little-endian snapshot primitives for wheel persistence
//!   (`wire` module)
//! - **Peer**: liveness handles continuations re-check after crossing
//!   threads (`peer` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use ember_engine::{NotifyWakeup, TaskBridge, TimerWheel};
//! use std::sync::Arc;
//!
//! // Tick-driven timers on the event-loop thread.
//! let mut wheel = TimerWheel::new(60).unwrap();
//! wheel.add(10, my_entry);
//! wheel.tick();
//!
//! // Blocking work offloaded to the bridge's worker thread.
//! let wakeup = Arc::new(NotifyWakeup::new());
//! let bridge = TaskBridge::new(wakeup.clone());
//! bridge.submit(|completer| {
//!     let rows = run_blocking_query();
//!     completer.complete(move || deliver(rows));
//! });
//!
//! // Event loop: woken, drain continuations inline.
//! wakeup.wait();
//! bridge.drain();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Bridge module: task queues, worker thread, wakeup, and drain
pub mod bridge;

/// Peer module: liveness handles for cross-thread continuations
pub mod peer;

/// Pool module: generation-checked slotted object pool
pub mod pool;

/// Scheduler module: timer wheel and deferred-work entries
pub mod scheduler;

/// Wire module: snapshot encode/decode primitives
pub mod wire;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::{
    BridgeConfig, Completer, ContinuationFn, NotifyWakeup, TaskBridge, TaskFn, TaskQueue, Wakeup,
};
pub use peer::{PeerHandle, PeerState};
pub use pool::{Handle, Pool};
pub use scheduler::{
    DecodeEntryFn, EntryKind, EntryRegistry, TimerEntry, TimerToken, TimerWheel, WheelError,
    DEFAULT_WHEEL_SIZE,
};
pub use wire::{CodecError, WireReader, WireWriter, WHEEL_MAGIC, WHEEL_VERSION};
