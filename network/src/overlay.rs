//! The overlay broadcast surface.
//!
//! Consensus treats the overlay as fire-and-forget: it hands a message to
//! [`Overlay::broadcast`] (everyone) or [`Overlay::relay`] (everyone who has
//! not already seen the suppression id) and moves on. The production
//! implementation pushes encoded frames onto an outbound channel that the
//! connection layer drains; [`NullOverlay`] records messages for tests.

use crate::error::NetworkError;
use crate::wire::{encode, WireMessage};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Fire-and-forget peer messaging.
pub trait Overlay: Send + Sync {
    /// Broadcast a message to all connected peers.
    fn broadcast(&self, message: &WireMessage);

    /// Relay a message, tagged with its suppression id so downstream peers
    /// can deduplicate.
    fn relay(&self, message: &WireMessage, suppression_id: [u8; 32]);
}

/// An outbound frame: optional suppression id plus the encoded message.
pub type OutboundFrame = (Option<[u8; 32]>, Vec<u8>);

/// Queue-backed overlay.
///
/// Each call places one encoded frame onto the outbound channel; the
/// connection layer fans it out to peers. Sends never block; a full channel
/// drops the frame (peers recover via the next round's traffic).
#[derive(Clone)]
pub struct ChannelOverlay {
    outbound_tx: mpsc::Sender<OutboundFrame>,
}

impl ChannelOverlay {
    pub fn new(outbound_tx: mpsc::Sender<OutboundFrame>) -> Self {
        Self { outbound_tx }
    }

    fn send(&self, suppression: Option<[u8; 32]>, message: &WireMessage) {
        let bytes = match encode(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "dropping unencodable outbound message");
                return;
            }
        };
        if self.outbound_tx.try_send((suppression, bytes)).is_err() {
            tracing::warn!("outbound channel full, dropping message");
        }
    }

    /// Whether the outbound channel is still open.
    pub fn is_open(&self) -> Result<(), NetworkError> {
        if self.outbound_tx.is_closed() {
            Err(NetworkError::ChannelClosed)
        } else {
            Ok(())
        }
    }
}

impl Overlay for ChannelOverlay {
    fn broadcast(&self, message: &WireMessage) {
        self.send(None, message);
    }

    fn relay(&self, message: &WireMessage, suppression_id: [u8; 32]) {
        self.send(Some(suppression_id), message);
    }
}

/// A test overlay that records messages instead of sending them.
pub struct NullOverlay {
    sent: Mutex<Vec<WireMessage>>,
    relayed: Mutex<Vec<([u8; 32], WireMessage)>>,
}

impl NullOverlay {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            relayed: Mutex::new(Vec::new()),
        }
    }

    /// All broadcast messages, in order (for assertions).
    pub fn sent(&self) -> Vec<WireMessage> {
        self.sent.lock().expect("null overlay poisoned").clone()
    }

    /// All relayed messages with their suppression ids.
    pub fn relayed(&self) -> Vec<([u8; 32], WireMessage)> {
        self.relayed.lock().expect("null overlay poisoned").clone()
    }

    pub fn reset(&self) {
        self.sent.lock().expect("null overlay poisoned").clear();
        self.relayed.lock().expect("null overlay poisoned").clear();
    }
}

impl Default for NullOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Overlay for NullOverlay {
    fn broadcast(&self, message: &WireMessage) {
        self.sent
            .lock()
            .expect("null overlay poisoned")
            .push(message.clone());
    }

    fn relay(&self, message: &WireMessage, suppression_id: [u8; 32]) {
        self.relayed
            .lock()
            .expect("null overlay poisoned")
            .push((suppression_id, message.clone()));
    }
}
