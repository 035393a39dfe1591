//! Circular timer wheel for tick-driven deferred execution.
//!
//! A fixed array of buckets, each the head of an intrusive doubly-linked
//! list of scheduled entries, with a cursor that advances one bucket per
//! tick. Scheduling, cancellation, and firing are all O(1), paid for with
//! O(size) fixed memory and a delay ceiling of `size - 1` ticks. The list
//! nodes live in a [`Pool`], so "linked into a bucket" and "owned by the
//! wheel" are the same fact: unlinking a node releases the wheel's strong
//! reference to the entry.
//!
//! The wheel belongs to a single thread. None of its operations block,
//! yield, or take locks.

use crate::pool::{Handle, Pool};
use crate::scheduler::{EntryKind, EntryRegistry, TimerEntry};
use crate::wire::{CodecError, WireReader, WireWriter, WHEEL_MAGIC, WHEEL_VERSION};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Bucket count used by [`TimerWheel::default`].
pub const DEFAULT_WHEEL_SIZE: usize = 60;

/// Errors from wheel construction and restore.
#[derive(Debug, Error)]
pub enum WheelError {
    /// A wheel must have at least one bucket.
    #[error("Timer wheel size must be non-zero")]
    ZeroSize,

    /// A persisted wheel could not be decoded.
    #[error("Snapshot decode error: {0}")]
    Decode(#[from] CodecError),
}

/// Names one scheduled entry; returned by [`TimerWheel::add`].
///
/// A token dies when its entry fires or is removed. Passing a dead token to
/// [`TimerWheel::remove`] is a programmer error and panics.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimerToken {
    handle: Handle,
}

/// Bucket list node. The intrusive links live here, in wheel-owned pool
/// slots, rather than inside the entry itself.
struct Node {
    entry: Arc<dyn TimerEntry>,
    bucket: usize,
    prev: Option<Handle>,
    next: Option<Handle>,
}

/// Fixed-size circular timer wheel.
///
/// Timers are one-shot: an entry fires once and is released. Delays longer
/// than `size - 1` ticks need external re-arming, typically by the entry
/// re-adding itself from `execute`.
pub struct TimerWheel {
    buckets: Vec<Option<Handle>>,
    nodes: Pool<Node>,
    cursor: usize,
}

impl TimerWheel {
    /// Create a wheel with `size` empty buckets and the cursor at 0.
    pub fn new(size: usize) -> Result<Self, WheelError> {
        if size == 0 {
            return Err(WheelError::ZeroSize);
        }
        Ok(Self {
            buckets: vec![None; size],
            nodes: Pool::new(),
            cursor: 0,
        })
    }

    /// Number of buckets.
    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    /// Current cursor position, in `[0, size)`.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of scheduled entries.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no entries are scheduled.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Schedule `entry` to fire `offset` ticks from now.
    ///
    /// The wheel takes one strong reference to the entry. The absolute
    /// bucket `(cursor + offset) % size` is resolved here, once; it is never
    /// re-resolved as the cursor moves. Offset `size` or larger cannot be
    /// represented and panics.
    pub fn add(&mut self, offset: usize, entry: Arc<dyn TimerEntry>) -> TimerToken {
        assert!(
            offset < self.buckets.len(),
            "timer offset {} out of range for a wheel of {} buckets",
            offset,
            self.buckets.len()
        );

        let bucket = (self.cursor + offset) % self.buckets.len();
        let head = self.buckets[bucket];
        let handle = self.nodes.insert(Node {
            entry,
            bucket,
            prev: None,
            next: head,
        });
        if let Some(old_head) = head {
            self.node_mut(old_head).prev = Some(handle);
        }
        self.buckets[bucket] = Some(handle);

        TimerToken { handle }
    }

    /// Whether `token` still names a scheduled entry.
    pub fn contains(&self, token: TimerToken) -> bool {
        self.nodes.contains(token.handle)
    }

    /// Cancel the entry `token` names, returning the wheel's strong
    /// reference to it.
    ///
    /// O(1) unlink. Panics if the token is dead (already fired or removed):
    /// cancelling a timer that is not scheduled is a programmer error.
    pub fn remove(&mut self, token: TimerToken) -> Arc<dyn TimerEntry> {
        let node = match self.nodes.remove(token.handle) {
            Some(node) => node,
            None => panic!("remove of a timer that is not scheduled"),
        };

        if let Some(next) = node.next {
            self.node_mut(next).prev = node.prev;
        }
        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.buckets[node.bucket] = node.next,
        }

        node.entry
    }

    /// Fire every entry due at the current bucket, then advance the cursor.
    ///
    /// The bucket's chain is detached in full before anything executes, and
    /// the cursor advances before the callbacks run, so work an `execute`
    /// call schedules can never join the in-flight batch: an offset-0 re-add
    /// fires on the next tick. Entries run head-to-tail in bucket order; the
    /// wheel's strong reference to each is consumed by the call, so an entry
    /// with no other owner is destroyed the moment its `execute` returns.
    pub fn tick(&mut self) {
        let mut due: Vec<Arc<dyn TimerEntry>> = Vec::new();
        let mut cursor_node = self.buckets[self.cursor].take();
        while let Some(handle) = cursor_node {
            let node = match self.nodes.remove(handle) {
                Some(node) => node,
                None => unreachable!("bucket chain references a freed node"),
            };
            cursor_node = node.next;
            due.push(node.entry);
        }

        self.cursor = (self.cursor + 1) % self.buckets.len();

        for entry in due {
            entry.execute(self);
        }
    }

    /// Apply [`TimerWheel::tick`] exactly `ticks` times, in order.
    ///
    /// Each tick's side effects are fully visible before the next begins;
    /// there is no batching shortcut.
    pub fn advance(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Release every scheduled entry without firing it.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = None;
        }
        self.nodes.clear();
    }

    /// Serialize the wheel: header, cursor, size, a sparse
    /// `(bucket, kind, payload)` sequence terminated by a `-1` sentinel, and
    /// a crc32 trailer over everything after the header.
    pub fn persist(&self, writer: &mut WireWriter) {
        writer.write_raw(&WHEEL_MAGIC);
        writer.write_u32(WHEEL_VERSION);
        let body_start = writer.len();

        writer.write_u32(self.cursor as u32);
        writer.write_u32(self.buckets.len() as u32);
        for (bucket, head) in self.buckets.iter().enumerate() {
            let mut cursor_node = *head;
            while let Some(handle) = cursor_node {
                let node = self.node(handle);
                writer.write_i32(bucket as i32);
                writer.write_u32(node.entry.kind().as_u32());
                node.entry.encode(writer);
                cursor_node = node.next;
            }
        }
        writer.write_i32(-1);

        let checksum = writer.checksum_since(body_start);
        writer.write_u32(checksum);
    }

    /// Reconstruct a wheel from a stream [`TimerWheel::persist`] wrote,
    /// decoding entries through `registry`.
    ///
    /// Builds the wheel from nothing, so there is no wheel to corrupt on
    /// failure: any decode error aborts and returns `Err`, and per-bucket
    /// entry order comes back exactly as persisted.
    pub fn restore(
        reader: &mut WireReader<'_>,
        registry: &EntryRegistry,
    ) -> Result<Self, WheelError> {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(reader.read_raw(4)?);
        if magic != WHEEL_MAGIC {
            return Err(CodecError::InvalidMagic(magic).into());
        }
        let version = reader.read_u32()?;
        if version != WHEEL_VERSION {
            return Err(CodecError::UnsupportedVersion(version).into());
        }
        let body_start = reader.position();

        let cursor = reader.read_u32()? as usize;
        let size = reader.read_u32()? as usize;
        if size == 0 {
            return Err(WheelError::ZeroSize);
        }
        if cursor >= size {
            return Err(CodecError::CorruptedData.into());
        }

        let mut wheel = Self {
            buckets: vec![None; size],
            nodes: Pool::new(),
            cursor,
        };
        let mut tails: Vec<Option<Handle>> = vec![None; size];

        loop {
            let index = reader.read_i32()?;
            if index == -1 {
                break;
            }
            if index < 0 || index as usize >= size {
                return Err(CodecError::CorruptedData.into());
            }
            let kind = EntryKind::new(reader.read_u32()?);
            let entry = registry.decode(kind, reader)?;
            wheel.push_tail(index as usize, &mut tails, entry);
        }

        let actual = reader.checksum_since(body_start);
        let expected = reader.read_u32()?;
        if actual != expected {
            return Err(CodecError::ChecksumMismatch { expected, actual }.into());
        }

        Ok(wheel)
    }

    /// Write a snapshot of the wheel to `path`.
    pub fn persist_to_file(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let mut writer = WireWriter::new();
        self.persist(&mut writer);
        std::fs::write(path, writer.as_bytes())
    }

    /// Reconstruct a wheel from a snapshot file.
    pub fn restore_from_file(
        path: impl AsRef<Path>,
        registry: &EntryRegistry,
    ) -> Result<Self, WheelError> {
        let data = std::fs::read(path).map_err(CodecError::from)?;
        let mut reader = WireReader::new(&data);
        Self::restore(&mut reader, registry)
    }

    /// Append `entry` at the tail of `bucket`, preserving persisted order.
    fn push_tail(&mut self, bucket: usize, tails: &mut [Option<Handle>], entry: Arc<dyn TimerEntry>) {
        let handle = self.nodes.insert(Node {
            entry,
            bucket,
            prev: tails[bucket],
            next: None,
        });
        match tails[bucket] {
            Some(tail) => self.node_mut(tail).next = Some(handle),
            None => self.buckets[bucket] = Some(handle),
        }
        tails[bucket] = Some(handle);
    }

    fn node(&self, handle: Handle) -> &Node {
        match self.nodes.get(handle) {
            Some(node) => node,
            None => unreachable!("bucket chain references a freed node"),
        }
    }

    fn node_mut(&mut self, handle: Handle) -> &mut Node {
        match self.nodes.get_mut(handle) {
            Some(node) => node,
            None => unreachable!("bucket chain references a freed node"),
        }
    }
}

impl Default for TimerWheel {
    fn default() -> Self {
        Self {
            buckets: vec![None; DEFAULT_WHEEL_SIZE],
            nodes: Pool::new(),
            cursor: 0,
        }
    }
}
