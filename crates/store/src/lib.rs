//! Lock-based commit store for tentative leg writes.
//!
//! Each pending leg gets write isolation: its writes accumulate in a
//! buffer invisible to everyone else, move to a persisted pending log at
//! precommit (locking every touched key), and are applied or discarded only
//! when the global decision arrives. Conflicting access to a locked key
//! fails immediately rather than blocking — a visible protocol-level error
//! that upstream disjoint-keyset discipline must already prevent.

mod commit_store;
mod error;
mod kv;

pub use commit_store::{CommitMode, CommitStore, WriteOp};
pub use error::StoreError;
pub use kv::{KvStore, MemStore, PrefixStore};
