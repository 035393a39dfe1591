//! Tick-driven deferred execution.
//!
//! The event-loop thread drives a [`TimerWheel`] by calling
//! [`TimerWheel::tick`] once per logical time unit; everything scheduled for
//! that tick fires inline. Entries are one-shot [`TimerEntry`] objects, and
//! a persisted wheel is rebuilt through an [`EntryRegistry`] of per-kind
//! decoders.

mod entry;
mod wheel;

pub use entry::{DecodeEntryFn, EntryKind, EntryRegistry, TimerEntry};
pub use wheel::{TimerToken, TimerWheel, WheelError, DEFAULT_WHEEL_SIZE};
