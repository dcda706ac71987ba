//! Packet and acknowledgement types for the Lockstep protocol.
//!
//! The transport below these types guarantees ordered, at-least-once
//! delivery per channel and nothing more; every handler must therefore be
//! idempotent under redelivery. Wire encoding belongs to the host
//! framework — these are the payload shapes, not a codec.

mod ack;
mod call;
mod commit;
mod outbound;
mod prepare;

pub use ack::{AckResult, Acknowledgement};
pub use call::CallPacket;
pub use commit::CommitPacket;
pub use outbound::Packet;
pub use prepare::PreparePacket;

/// A protocol message with a stable type identifier.
///
/// The host framework uses the identifier to route raw payloads to the
/// right inbound handler.
pub trait PacketMessage {
    /// Stable identifier for this message type.
    fn message_type_id() -> &'static str;
}
