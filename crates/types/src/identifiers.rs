//! Domain-specific identifier types.

use crate::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cross-chain transaction identifier.
///
/// An opaque byte string, unique per cross-chain transaction. Deriving it
/// deterministically from the initiating request makes resubmission of the
/// same request detectable as a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(Vec<u8>);

impl TxId {
    /// Wrap raw identifier bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Derive a transaction id from the initiating request bytes.
    pub fn from_request(request: &[u8]) -> Self {
        Self(Hash::from_bytes(request).to_bytes().to_vec())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", hex::encode(&self.0))
    }
}

/// Stable position of a leg within a transaction's ordered leg list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BranchIndex(pub u8);

impl BranchIndex {
    /// The coordinator-local leg in the two-party protocol.
    pub const INITIATOR: Self = BranchIndex(0);

    /// The counterparty leg in the two-party protocol.
    pub const COUNTERPARTY: Self = BranchIndex(1);
}

impl fmt::Display for BranchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Branch({})", self.0)
    }
}

/// One end of a bidirectional messaging channel to exactly one counterparty.
///
/// Because a channel connects exactly two chains, the endpoint a
/// confirmation arrives on doubles as a lightweight sender-authentication
/// token: only the counterparty recorded for a branch can answer over that
/// branch's channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelEndpoint {
    /// Port identifier.
    pub port_id: String,

    /// Channel identifier.
    pub channel_id: String,
}

impl ChannelEndpoint {
    /// Create a new endpoint.
    pub fn new(port_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            port_id: port_id.into(),
            channel_id: channel_id.into(),
        }
    }

    /// The reserved endpoint standing for the local chain itself.
    ///
    /// Used as the recorded channel for a coordinator-local branch, which
    /// has no counterparty to answer over a real channel.
    pub fn local() -> Self {
        Self {
            port_id: String::new(),
            channel_id: String::new(),
        }
    }

    /// Whether this is the reserved local endpoint.
    pub fn is_local(&self) -> bool {
        self.port_id.is_empty() && self.channel_id.is_empty()
    }
}

impl fmt::Display for ChannelEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "local")
        } else {
            write!(f, "{}/{}", self.port_id, self.channel_id)
        }
    }
}

/// Where a leg runs, relative to the chain interpreting the reference.
///
/// Channel identifiers are chain-relative: the same counterparty is reached
/// over different endpoints from different chains, so a `ChainRef` only has
/// meaning within one chain's frame of reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainRef {
    /// The chain currently processing the message.
    SelfChain,

    /// A counterparty chain reached over the given endpoint.
    Channel(ChannelEndpoint),
}

impl ChainRef {
    /// Whether this references the local chain.
    pub fn is_self(&self) -> bool {
        matches!(self, ChainRef::SelfChain)
    }
}

impl fmt::Display for ChainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainRef::SelfChain => write!(f, "self"),
            ChainRef::Channel(ep) => write!(f, "{}", ep),
        }
    }
}

/// A signer identity, compared by value.
///
/// Signature validity is a pre-validated predicate checked by the host
/// before any of these reach this module; only set membership matters here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Account {
    /// Chain the account lives on, if not the local chain.
    pub chain: Option<ChannelEndpoint>,

    /// Account address bytes.
    pub address: Vec<u8>,
}

impl Account {
    /// An account on the local chain.
    pub fn local(address: impl Into<Vec<u8>>) -> Self {
        Self {
            chain: None,
            address: address.into(),
        }
    }

    /// An account on a counterparty chain.
    pub fn remote(chain: ChannelEndpoint, address: impl Into<Vec<u8>>) -> Self {
        Self {
            chain: Some(chain),
            address: address.into(),
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.chain {
            Some(chain) => write!(f, "{}:{}", chain, hex::encode(&self.address)),
            None => write!(f, "{}", hex::encode(&self.address)),
        }
    }
}

/// Height/timestamp bound carried by every packet.
///
/// A zero field means no bound of that kind. A packet arriving past either
/// bound is rejected by the receiving chain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct Timeout {
    /// Reject once the receiving chain reaches this height (0 = no bound).
    pub height: u64,

    /// Reject once the receiving chain's time reaches this (0 = no bound).
    pub timestamp_nanos: u64,
}

impl Timeout {
    /// No bound of either kind.
    pub const NONE: Self = Timeout {
        height: 0,
        timestamp_nanos: 0,
    };

    /// Create a timeout with both bounds.
    pub fn new(height: u64, timestamp_nanos: u64) -> Self {
        Self {
            height,
            timestamp_nanos,
        }
    }

    /// Bound by height only.
    pub fn at_height(height: u64) -> Self {
        Self {
            height,
            timestamp_nanos: 0,
        }
    }

    /// Whether the timeout has passed at the given height and time.
    pub fn is_expired(&self, current_height: u64, now_nanos: u64) -> bool {
        (self.height != 0 && current_height >= self.height)
            || (self.timestamp_nanos != 0 && now_nanos >= self.timestamp_nanos)
    }
}
