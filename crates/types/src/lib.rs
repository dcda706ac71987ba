//! Core types for the Lockstep cross-chain atomic commit protocol.
//!
//! A cross-chain transaction is a list of *legs*, each a contract call on
//! one chain, coordinated so that either every leg commits or every leg
//! aborts. Chains share no memory; the only connective tissue is ordered,
//! at-least-once messaging channels. Everything the protocol needs to
//! survive delay and redelivery is explicit, persisted state built from the
//! types in this crate.

mod branch;
mod coordinator;
mod hash;
mod identifiers;
mod leg;
mod resolver;

pub use branch::{BranchStatus, ContractTransactionState, PrepareResult};
pub use coordinator::{CommitKind, CoordinatorState, Decision, Phase, StateError};
pub use hash::{Hash, HexError};
pub use identifiers::{Account, BranchIndex, ChainRef, ChannelEndpoint, Timeout, TxId};
pub use leg::{CallResult, ContractCall, Leg, Link};
pub use resolver::{ChannelResolver, ResolveError};
