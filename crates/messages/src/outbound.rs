//! Outbound packet envelope.

use crate::{CallPacket, CommitPacket, PreparePacket};

/// Any packet the protocol can send over a channel.
///
/// The host framework performs the actual send; the protocol only names
/// the channel and the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Two-party counterparty leg dispatch.
    Call(CallPacket),

    /// Two-phase tentative leg dispatch.
    Prepare(PreparePacket),

    /// Two-phase decision delivery.
    Commit(CommitPacket),
}

impl Packet {
    /// Get a human-readable name for this packet type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Packet::Call(_) => "Call",
            Packet::Prepare(_) => "Prepare",
            Packet::Commit(_) => "Commit",
        }
    }
}
