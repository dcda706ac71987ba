//! Legs: the per-chain contract calls making up a cross-chain transaction.

use crate::{Account, BranchIndex, ChainRef, Hash};
use serde::{Deserialize, Serialize};

/// An opaque contract call descriptor.
///
/// The coordination layer never interprets the contract, method, or
/// arguments; it only hashes them for call-result keys and hands them to
/// the injected executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    /// Contract identifier bytes.
    pub contract: Vec<u8>,

    /// Method name.
    pub method: String,

    /// Raw argument values.
    pub args: Vec<Vec<u8>>,
}

impl ContractCall {
    /// Create a call descriptor.
    pub fn new(
        contract: impl Into<Vec<u8>>,
        method: impl Into<String>,
        args: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            contract: contract.into(),
            method: method.into(),
            args,
        }
    }

    /// Key identifying a call result: hash of the call arguments and the
    /// signer set.
    ///
    /// Two chains computing this over the same leg agree on the key without
    /// a round trip, which is what lets a linked result be matched up on
    /// the receiving side.
    pub fn result_key(&self, signers: &[Account]) -> Hash {
        let mut parts: Vec<Vec<u8>> = Vec::new();
        parts.push(self.contract.clone());
        parts.push(self.method.as_bytes().to_vec());
        for arg in &self.args {
            parts.push(arg.clone());
        }
        for signer in signers {
            match &signer.chain {
                Some(chain) => parts.push(format!("{chain}").into_bytes()),
                None => parts.push(Vec::new()),
            }
            parts.push(signer.address.clone());
        }
        let refs: Vec<&[u8]> = parts.iter().map(|p| p.as_slice()).collect();
        Hash::from_parts(&refs)
    }
}

/// A declared dependency of one leg's arguments on another leg's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// The leg whose declared return value feeds this one.
    pub source: BranchIndex,
}

impl Link {
    /// Link to the given source leg.
    pub fn to(source: BranchIndex) -> Self {
        Self { source }
    }
}

/// One chain-local contract call forming part of a cross-chain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    /// Where the leg runs, in the coordinator's frame of reference.
    pub chain: ChainRef,

    /// The contract call to execute.
    pub call: ContractCall,

    /// Signers authorizing this leg.
    pub signers: Vec<Account>,

    /// Declared return value, if this leg's result may feed another leg.
    pub return_value: Option<Vec<u8>>,

    /// Cross-leg value dependencies of this leg's arguments.
    pub links: Vec<Link>,
}

impl Leg {
    /// Create a leg with no return value and no links.
    pub fn new(chain: ChainRef, call: ContractCall, signers: Vec<Account>) -> Self {
        Self {
            chain,
            call,
            signers,
            return_value: None,
            links: Vec::new(),
        }
    }

    /// Declare the leg's return value.
    pub fn with_return_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.return_value = Some(value.into());
        self
    }

    /// Add a cross-leg link.
    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    /// Whether this leg's arguments depend on another leg's result.
    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }

    /// The memoization key for this leg's call result.
    pub fn result_key(&self) -> Hash {
        self.call.result_key(&self.signers)
    }
}

/// A resolved cross-leg value: one leg's declared result, addressed so the
/// consuming leg knows which chain produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
    /// Chain that produced the value, in the consumer's frame of reference.
    pub origin: ChainRef,

    /// Hash of the producing call's arguments and signer set.
    pub key: Hash,

    /// The declared return value.
    pub value: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChannelEndpoint;

    fn call() -> ContractCall {
        ContractCall::new(b"counter".to_vec(), "increment", vec![b"1".to_vec()])
    }

    #[test]
    fn test_result_key_includes_signers() {
        let signers_a = vec![Account::local(b"alice".to_vec())];
        let signers_b = vec![Account::local(b"bob".to_vec())];

        assert_eq!(call().result_key(&signers_a), call().result_key(&signers_a));
        assert_ne!(call().result_key(&signers_a), call().result_key(&signers_b));
    }

    #[test]
    fn test_result_key_includes_args() {
        let a = ContractCall::new(b"counter".to_vec(), "add", vec![b"1".to_vec()]);
        let b = ContractCall::new(b"counter".to_vec(), "add", vec![b"2".to_vec()]);
        assert_ne!(a.result_key(&[]), b.result_key(&[]));
    }

    #[test]
    fn test_leg_builders() {
        let leg = Leg::new(
            ChainRef::Channel(ChannelEndpoint::new("lockstep", "channel-3")),
            call(),
            vec![],
        )
        .with_return_value(b"42".to_vec())
        .with_link(Link::to(BranchIndex(0)));

        assert!(leg.has_links());
        assert_eq!(leg.return_value.as_deref(), Some(b"42".as_slice()));
    }
}
