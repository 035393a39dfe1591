//! Deferred work units and the decode registry for wheel snapshots.

use crate::scheduler::TimerWheel;
use crate::wire::{CodecError, WireReader, WireWriter};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Identifies a concrete [`TimerEntry`] implementation in persisted streams.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryKind(u32);

impl EntryKind {
    /// Create an entry kind from its wire tag.
    pub const fn new(tag: u32) -> Self {
        Self(tag)
    }

    /// The wire tag.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// A unit of deferred work scheduled on a [`TimerWheel`].
///
/// The wheel holds exactly one strong reference to each scheduled entry,
/// taken at insertion. When the entry's tick arrives, that reference is
/// handed to `execute` and consumed: unless the entry re-schedules itself or
/// another owner holds it, the entry is destroyed when `execute` returns, so
/// `execute` must not stash borrows that outlive the call.
pub trait TimerEntry: Send + Sync {
    /// Run the deferred work.
    ///
    /// The wheel's cursor has already moved past the entry's bucket, so
    /// re-adding with offset 0 lands in the next bucket and fires on the
    /// next tick.
    fn execute(self: Arc<Self>, wheel: &mut TimerWheel);

    /// Wire tag used to select a decoder on restore.
    fn kind(&self) -> EntryKind;

    /// Encode the entry's payload for wheel persistence.
    fn encode(&self, writer: &mut WireWriter);
}

/// Decoder for one entry kind; reads back exactly the payload
/// [`TimerEntry::encode`] wrote.
pub type DecodeEntryFn = fn(&mut WireReader<'_>) -> Result<Arc<dyn TimerEntry>, CodecError>;

/// Maps entry kinds to decoders for [`TimerWheel::restore`].
///
/// The embedding registers every kind it persists before restoring a wheel;
/// an unregistered kind in the stream fails the restore with
/// [`CodecError::UnknownEntryKind`].
pub struct EntryRegistry {
    decoders: FxHashMap<u32, DecodeEntryFn>,
}

impl EntryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            decoders: FxHashMap::default(),
        }
    }

    /// Register the decoder for `kind`.
    ///
    /// Registering the same kind twice is a programmer error.
    pub fn register(&mut self, kind: EntryKind, decode: DecodeEntryFn) {
        let previous = self.decoders.insert(kind.as_u32(), decode);
        assert!(
            previous.is_none(),
            "duplicate timer entry kind {}",
            kind.as_u32()
        );
    }

    /// Whether a decoder is registered for `kind`.
    pub fn contains(&self, kind: EntryKind) -> bool {
        self.decoders.contains_key(&kind.as_u32())
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decode one entry of the given kind from `reader`.
    pub fn decode(
        &self,
        kind: EntryKind,
        reader: &mut WireReader<'_>,
    ) -> Result<Arc<dyn TimerEntry>, CodecError> {
        match self.decoders.get(&kind.as_u32()) {
            Some(decode) => decode(reader),
            None => Err(CodecError::UnknownEntryKind(kind.as_u32())),
        }
    }
}

impl Default for EntryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
