//! Capability traits supplied by the host framework.
//!
//! Small, explicit seams instead of deep interface hierarchies: the
//! protocol receives exactly the capabilities an operation needs, per
//! call, and holds no ambient references to the host.

use lockstep_messages::Packet;
use lockstep_store::{CommitMode, CommitStore, KvStore, StoreError};
use lockstep_types::{Account, CallResult, ChannelEndpoint, ContractCall};
use thiserror::Error;

/// Why a leg execution did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    /// The contract rejected the call.
    ///
    /// Never propagated across a message boundary: the protocol turns it
    /// into Prepare-Failed/Abort state and a Failed acknowledgement.
    #[error("Contract rejected the call: {0}")]
    Rejected(String),

    /// The store refused an access, including lock contention.
    ///
    /// Abandons the whole processing step.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Invokes contract code under a commit mode.
///
/// Writes buffer in the store under either mode, so a rejecting
/// execution leaves durable state untouched: the protocol discards the
/// buffer on rejection and flushes or precommits it on success.
pub trait LegExecutor<S: KvStore> {
    /// Execute a contract call, materializing reads and writes through the
    /// commit store under the given mode.
    fn execute(
        &self,
        store: &mut CommitStore<S>,
        mode: CommitMode,
        call: &ContractCall,
        signers: &[Account],
        resolved: &[CallResult],
    ) -> Result<(), ExecError>;
}

/// Outbound send failure reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Send over {channel} failed: {reason}")]
pub struct SendError {
    /// Channel the send was attempted on.
    pub channel: ChannelEndpoint,

    /// Host-reported reason.
    pub reason: String,
}

/// Outbound send primitive scoped to a caller-held channel capability.
pub trait PacketSender {
    /// Send a packet over a channel.
    fn send(&mut self, channel: &ChannelEndpoint, packet: Packet) -> Result<(), SendError>;
}

/// Channel existence lookup.
pub trait ChannelDirectory {
    /// Whether the endpoint names a live channel on this chain.
    fn has_channel(&self, endpoint: &ChannelEndpoint) -> bool;
}
