//! Branch protocols and coordinator state machine.
//!
//! Two protocols drive a cross-chain transaction to an all-or-nothing
//! outcome over asynchronous, ordered, at-least-once channels:
//!
//! - [`SimpleProtocol`] — two parties, one coordinator-local leg and one
//!   counterparty leg; the counterparty's acknowledgement is the decision.
//! - [`TpcProtocol`] — N-party two-phase commit; every leg prepares
//!   tentatively, and the coordinator broadcasts the decision once all
//!   acknowledgements (or the first failure) arrive.
//!
//! Every operation is one synchronous, deterministic step: no suspension,
//! no in-memory synchronization, all coordination through persisted state.
//! Host-framework services (channel directory, outbound send, contract
//! execution) are injected as capability traits per call.

mod error;
mod keys;
mod simple;
mod state_store;
#[cfg(test)]
mod testing;
mod tpc;
mod traits;

pub use error::ProtocolError;
pub use simple::SimpleProtocol;
pub use state_store::StateStore;
pub use tpc::TpcProtocol;
pub use traits::{ChannelDirectory, ExecError, LegExecutor, PacketSender, SendError};
