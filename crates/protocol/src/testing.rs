//! Shared fixtures for protocol tests.

use crate::{ChannelDirectory, ExecError, LegExecutor, PacketSender, SendError};
use lockstep_messages::Packet;
use lockstep_store::{CommitMode, CommitStore, KvStore};
use lockstep_types::{
    Account, CallResult, ChainRef, ChannelEndpoint, ChannelResolver, ContractCall, ResolveError,
};
use std::collections::HashSet;

pub fn endpoint(port: &str, channel: &str) -> ChannelEndpoint {
    ChannelEndpoint::new(port, channel)
}

/// A contract executor over little-endian u64 counters keyed by contract id.
///
/// * `increment` — read the counter, add one, write it back.
/// * `increment-by-link` — add the first resolved link value instead.
/// * `fail` — reject without touching anything.
/// * `increment-then-fail` — write the increment, then reject anyway.
pub struct CounterExecutor;

impl CounterExecutor {
    fn counter<S: KvStore>(
        store: &CommitStore<S>,
        mode: CommitMode,
        key: &[u8],
    ) -> Result<u64, ExecError> {
        let bytes = store.read(mode, key)?.unwrap_or_default();
        let mut raw = [0u8; 8];
        raw[..bytes.len().min(8)].copy_from_slice(&bytes[..bytes.len().min(8)]);
        Ok(u64::from_le_bytes(raw))
    }
}

impl<S: KvStore> LegExecutor<S> for CounterExecutor {
    fn execute(
        &self,
        store: &mut CommitStore<S>,
        mode: CommitMode,
        call: &ContractCall,
        _signers: &[Account],
        resolved: &[CallResult],
    ) -> Result<(), ExecError> {
        let delta = match call.method.as_str() {
            "increment" => 1,
            "increment-by-link" => {
                let value = &resolved
                    .first()
                    .ok_or_else(|| ExecError::Rejected("no linked value".into()))?
                    .value;
                let mut raw = [0u8; 8];
                raw[..value.len().min(8)].copy_from_slice(&value[..value.len().min(8)]);
                u64::from_le_bytes(raw)
            }
            "fail" => return Err(ExecError::Rejected("contract said no".into())),
            "increment-then-fail" => {
                let current = Self::counter(store, mode, &call.contract)?;
                store.write(mode, &call.contract, &(current + 1).to_le_bytes())?;
                return Err(ExecError::Rejected("rejected after writing".into()));
            }
            other => return Err(ExecError::Rejected(format!("unknown method {other}"))),
        };

        let current = Self::counter(store, mode, &call.contract)?;
        store.write(mode, &call.contract, &(current + delta).to_le_bytes())?;
        Ok(())
    }
}

/// Resolver over a fixed remote-chain set, with an optional return channel
/// for rewriting local origins into a remote frame.
pub struct StaticResolver {
    pub links: bool,
    pub return_channel: Option<ChannelEndpoint>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self {
            links: false,
            return_channel: None,
        }
    }

    pub fn with_links(return_channel: ChannelEndpoint) -> Self {
        Self {
            links: true,
            return_channel: Some(return_channel),
        }
    }
}

impl ChannelResolver for StaticResolver {
    fn resolve(&self, chain: &ChainRef) -> Result<ChannelEndpoint, ResolveError> {
        match chain {
            ChainRef::SelfChain => Ok(ChannelEndpoint::local()),
            ChainRef::Channel(endpoint) => Ok(endpoint.clone()),
        }
    }

    fn rewrite(&self, origin: &ChainRef, viewer: &ChainRef) -> Result<ChainRef, ResolveError> {
        if origin == viewer {
            return Ok(ChainRef::SelfChain);
        }
        match origin {
            ChainRef::SelfChain => match &self.return_channel {
                Some(channel) => Ok(ChainRef::Channel(channel.clone())),
                None => Err(ResolveError::Unrewritable {
                    origin: origin.clone(),
                    viewer: viewer.clone(),
                }),
            },
            ChainRef::Channel(_) => Ok(origin.clone()),
        }
    }

    fn supports_links(&self) -> bool {
        self.links
    }
}

/// Channel directory over a fixed endpoint set.
pub struct StaticDirectory {
    channels: HashSet<ChannelEndpoint>,
}

impl StaticDirectory {
    pub fn of(channels: &[ChannelEndpoint]) -> Self {
        Self {
            channels: channels.iter().cloned().collect(),
        }
    }
}

impl ChannelDirectory for StaticDirectory {
    fn has_channel(&self, endpoint: &ChannelEndpoint) -> bool {
        self.channels.contains(endpoint)
    }
}

/// Sender that records every packet, optionally refusing all sends.
pub struct RecordingSender {
    pub sent: Vec<(ChannelEndpoint, Packet)>,
    pub refuse: bool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            sent: Vec::new(),
            refuse: true,
        }
    }
}

impl PacketSender for RecordingSender {
    fn send(&mut self, channel: &ChannelEndpoint, packet: Packet) -> Result<(), SendError> {
        if self.refuse {
            return Err(SendError {
                channel: channel.clone(),
                reason: "transport refused".into(),
            });
        }
        self.sent.push((channel.clone(), packet));
        Ok(())
    }
}
