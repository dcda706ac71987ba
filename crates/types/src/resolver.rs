//! Channel resolution capability.

use crate::{ChainRef, ChannelEndpoint};

/// Errors from channel resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No channel is known for the referenced chain.
    #[error("No channel for chain {0}")]
    UnknownChain(ChainRef),

    /// The origin cannot be expressed in the viewer's frame of reference.
    #[error("Cannot rewrite {origin} into the frame of {viewer}")]
    Unrewritable {
        /// The reference being rewritten.
        origin: ChainRef,
        /// The frame it should be expressed in.
        viewer: ChainRef,
    },
}

/// Maps chain references to channels, supplied by the host framework.
///
/// Channel identifiers are chain-relative, so only the host — which owns
/// the channel directory — can translate a reference between two chains'
/// frames of reference. The protocol treats this as an injected capability
/// rather than reaching into any global registry.
pub trait ChannelResolver {
    /// The endpoint used to reach `chain` from the local chain.
    ///
    /// `ChainRef::SelfChain` resolves to [`ChannelEndpoint::local`].
    fn resolve(&self, chain: &ChainRef) -> Result<ChannelEndpoint, ResolveError>;

    /// Rewrite `origin` (a reference in the local frame) into `viewer`'s
    /// frame of reference.
    fn rewrite(&self, origin: &ChainRef, viewer: &ChainRef) -> Result<ChainRef, ResolveError>;

    /// Whether cross-leg value links are supported by this resolver.
    ///
    /// A resolver without cross-chain-call support causes dispatch to
    /// reject any transaction whose legs carry links.
    fn supports_links(&self) -> bool {
        false
    }
}
