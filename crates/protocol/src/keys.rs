//! Persisted key layout.
//!
//! Small integer type-prefix + transaction id (+ branch index where
//! applicable), namespaced under the module's store prefix by the host.
//! The prefixes keep the key-spaces collision-free.

use lockstep_types::{BranchIndex, TxId};

/// Prefix for coordinator state records.
pub const COORDINATOR_STATE_PREFIX: u8 = 0x01;

/// Prefix for contract transaction (branch) state records.
pub const CONTRACT_TX_STATE_PREFIX: u8 = 0x02;

/// Key for the coordinator state of a transaction.
pub fn coordinator_state_key(tx_id: &TxId) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + tx_id.as_bytes().len());
    key.push(COORDINATOR_STATE_PREFIX);
    key.extend_from_slice(tx_id.as_bytes());
    key
}

/// Key for the branch state of (transaction, branch).
pub fn contract_tx_state_key(tx_id: &TxId, branch: BranchIndex) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 + tx_id.as_bytes().len());
    key.push(CONTRACT_TX_STATE_PREFIX);
    key.extend_from_slice(tx_id.as_bytes());
    key.push(branch.0);
    key
}

/// Commit-store pending-log id for a branch's buffered writes.
pub fn pending_id(tx_id: &TxId, branch: BranchIndex) -> Vec<u8> {
    let mut id = Vec::with_capacity(1 + tx_id.as_bytes().len());
    id.extend_from_slice(tx_id.as_bytes());
    id.push(branch.0);
    id
}
