//! Messenger transport — length-prefixed MessagePack envelopes.
//!
//! Each frame carries one [`protocol::Envelope`]: a channel name plus
//! the opaque bytes produced by that channel's codec.

pub mod codec;
pub mod protocol;
