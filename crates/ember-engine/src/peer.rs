//! Network peer liveness handles for in-flight continuations.
//!
//! The event loop owns its peers; work crossing the bridge only captures
//! [`PeerHandle`]s. By the time a continuation runs back on the loop thread
//! the peer may have disconnected or been destroyed, so the handle is
//! re-validated instead of trusted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Event-loop-owned connection state for one network peer.
pub struct PeerState {
    connected: AtomicBool,
}

impl PeerState {
    /// Create state for a freshly connected peer.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(true),
        })
    }

    /// Mark the peer disconnected. In-flight continuations observe this on
    /// their liveness re-check.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// Whether the peer is still connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Non-owning handle for capture inside queued closures.
    pub fn handle(self: &Arc<Self>) -> PeerHandle {
        PeerHandle {
            state: Arc::downgrade(self),
        }
    }
}

/// Validity-checked, non-owning reference to a peer.
///
/// Cheap to clone and safe to carry across threads; it never keeps a dead
/// peer alive.
#[derive(Clone)]
pub struct PeerHandle {
    state: Weak<PeerState>,
}

impl PeerHandle {
    /// True only while the peer both still exists and is connected.
    pub fn is_connected(&self) -> bool {
        self.state
            .upgrade()
            .is_some_and(|peer| peer.is_connected())
    }

    /// The owning state, if the peer still exists.
    ///
    /// Peer state is event-loop-owned; only code on that thread should act
    /// on the returned reference.
    pub fn upgrade(&self) -> Option<Arc<PeerState>> {
        self.state.upgrade()
    }
}
