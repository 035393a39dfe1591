//! Cross-thread task dispatch.
//!
//! A [`TaskBridge`] pairs two [`TaskQueue`]s with one dedicated worker
//! thread: the event-loop thread submits blocking work, the worker executes
//! it and completes continuations back through a [`Wakeup`], and the loop
//! thread drains them inline.

#[allow(clippy::module_inception)]
mod bridge;
mod queue;
mod wakeup;

pub use bridge::{BridgeConfig, Completer, ContinuationFn, TaskBridge, TaskFn};
pub use queue::TaskQueue;
pub use wakeup::{NotifyWakeup, Wakeup};
