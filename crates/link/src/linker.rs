//! Lazy, memoized resolution of cross-leg value references.

use lockstep_types::{
    BranchIndex, CallResult, ChainRef, ChannelResolver, Leg, Link, ResolveError,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from link resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The link names a branch outside the transaction's leg list.
    #[error("Link source {0} is out of range")]
    SourceOutOfRange(BranchIndex),

    /// The referenced leg declared no return value.
    #[error("Link source {0} declared no return value")]
    NoReturnValue(BranchIndex),

    /// The source's origin could not be rewritten into the requesting
    /// leg's frame of reference.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Memoization slot for one source leg's call result.
#[derive(Debug, Clone)]
enum LazyResult {
    Resolved(CallResult),
    Failed(LinkError),
}

/// Resolves cross-leg value references over one transaction's leg list.
///
/// Built once per assembly. Each source leg's `CallResult` is computed on
/// first access and memoized, including failures; resolving the same link
/// twice never recomputes the source.
#[derive(Debug)]
pub struct Linker<'a> {
    legs: &'a [Leg],
    results: BTreeMap<BranchIndex, LazyResult>,
}

impl<'a> Linker<'a> {
    /// Prepare a linker over the transaction's ordered leg list.
    pub fn build(legs: &'a [Leg]) -> Self {
        Self {
            legs,
            results: BTreeMap::new(),
        }
    }

    /// Resolve a requesting leg's links to concrete values.
    ///
    /// Forces each source leg's lazy result, then rewrites its origin
    /// chain into the requesting leg's frame of reference (channel
    /// identifiers are chain-relative). Results come back in link order.
    /// Fails on an out-of-range index or a source with no declared return
    /// value. Pure and synchronous; runs entirely before dispatch.
    pub fn resolve(
        &mut self,
        requesting: &ChainRef,
        links: &[Link],
        resolver: &dyn ChannelResolver,
    ) -> Result<Vec<CallResult>, LinkError> {
        let mut resolved = Vec::with_capacity(links.len());
        for link in links {
            let result = self.force(link.source)?;
            let origin = resolver.rewrite(&result.origin, requesting)?;
            resolved.push(CallResult { origin, ..result });
        }
        Ok(resolved)
    }

    /// Whether a source leg's result has already been computed.
    pub fn is_forced(&self, source: BranchIndex) -> bool {
        self.results.contains_key(&source)
    }

    /// Force a source leg's call result, memoized in the coordinator's
    /// frame of reference.
    fn force(&mut self, source: BranchIndex) -> Result<CallResult, LinkError> {
        if let Some(memo) = self.results.get(&source) {
            return match memo {
                LazyResult::Resolved(result) => Ok(result.clone()),
                LazyResult::Failed(err) => Err(err.clone()),
            };
        }

        let computed = self.compute(source);
        let memo = match &computed {
            Ok(result) => LazyResult::Resolved(result.clone()),
            Err(err) => LazyResult::Failed(err.clone()),
        };
        self.results.insert(source, memo);
        computed
    }

    fn compute(&self, source: BranchIndex) -> Result<CallResult, LinkError> {
        let leg = self
            .legs
            .get(source.0 as usize)
            .ok_or(LinkError::SourceOutOfRange(source))?;
        let value = leg
            .return_value
            .clone()
            .ok_or(LinkError::NoReturnValue(source))?;
        Ok(CallResult {
            origin: leg.chain.clone(),
            key: leg.result_key(),
            value,
        })
    }
}
