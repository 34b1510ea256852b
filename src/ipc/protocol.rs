//! Messenger envelope exchanged between the engine and the host.
//!
//! The envelope is deliberately channel-agnostic: `payload` holds
//! whatever the channel's own codec produced (JSON method calls for
//! `flutter/platform`). Replies echo the request `id` and `channel`.

use serde::{Deserialize, Serialize};

/// One messenger frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    /// Request id chosen by the sender; echoed in the reply.
    pub id: u32,
    /// Channel name, e.g. `flutter/platform`.
    pub channel: String,
    /// Channel-encoded message. Empty for a not-implemented reply.
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Build the reply to this envelope with the given payload.
    pub fn reply(&self, payload: Vec<u8>) -> Self {
        Self {
            id: self.id,
            channel: self.channel.clone(),
            payload,
        }
    }
}

/// Maximum payload size (16 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;
