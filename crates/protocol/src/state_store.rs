//! Persistence of coordinator and branch state.

use crate::{keys, ProtocolError};
use lockstep_store::{KvStore, StoreError};
use lockstep_types::{BranchIndex, ContractTransactionState, CoordinatorState, TxId};
use serde::{de::DeserializeOwned, Serialize};

/// Durable coordinator/branch state, keyed per the layout in [`keys`].
///
/// Terminal entries are never pruned; retention is unbounded (a known
/// limitation, see DESIGN.md).
#[derive(Debug)]
pub struct StateStore<S> {
    store: S,
}

impl<S: KvStore> StateStore<S> {
    /// Create a state store over an injected, already-namespaced handle.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read the coordinator state of a transaction.
    pub fn coordinator_state(
        &self,
        tx_id: &TxId,
    ) -> Result<Option<CoordinatorState>, ProtocolError> {
        self.read(&keys::coordinator_state_key(tx_id))
    }

    /// Whether a transaction already has coordinator state.
    pub fn has_coordinator_state(&self, tx_id: &TxId) -> bool {
        self.store.contains(&keys::coordinator_state_key(tx_id))
    }

    /// Persist a fresh coordinator state. Fails if the id was already used.
    pub fn create_coordinator_state(
        &mut self,
        tx_id: &TxId,
        state: &CoordinatorState,
    ) -> Result<(), ProtocolError> {
        if self.has_coordinator_state(tx_id) {
            return Err(ProtocolError::TxIdInUse(tx_id.clone()));
        }
        self.write(&keys::coordinator_state_key(tx_id), state)
    }

    /// Persist an updated coordinator state.
    pub fn put_coordinator_state(
        &mut self,
        tx_id: &TxId,
        state: &CoordinatorState,
    ) -> Result<(), ProtocolError> {
        self.write(&keys::coordinator_state_key(tx_id), state)
    }

    /// Read the branch state of (transaction, branch).
    pub fn contract_tx_state(
        &self,
        tx_id: &TxId,
        branch: BranchIndex,
    ) -> Result<Option<ContractTransactionState>, ProtocolError> {
        self.read(&keys::contract_tx_state_key(tx_id, branch))
    }

    /// Whether a (transaction, branch) already has state.
    pub fn has_contract_tx_state(&self, tx_id: &TxId, branch: BranchIndex) -> bool {
        self.store
            .contains(&keys::contract_tx_state_key(tx_id, branch))
    }

    /// Persist a fresh branch state. Fails if the key was already used —
    /// a branch is never re-created, which is what makes redelivered
    /// dispatch packets detectable.
    pub fn create_contract_tx_state(
        &mut self,
        tx_id: &TxId,
        branch: BranchIndex,
        state: &ContractTransactionState,
    ) -> Result<(), ProtocolError> {
        if self.has_contract_tx_state(tx_id, branch) {
            return Err(ProtocolError::BranchExists {
                tx_id: tx_id.clone(),
                branch,
            });
        }
        self.write(&keys::contract_tx_state_key(tx_id, branch), state)
    }

    /// Persist an updated branch state.
    pub fn put_contract_tx_state(
        &mut self,
        tx_id: &TxId,
        branch: BranchIndex,
        state: &ContractTransactionState,
    ) -> Result<(), ProtocolError> {
        self.write(&keys::contract_tx_state_key(tx_id, branch), state)
    }

    fn read<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, ProtocolError> {
        match self.store.get(key) {
            Some(encoded) => {
                let (value, _) =
                    bincode::serde::decode_from_slice(&encoded, bincode::config::standard())
                        .map_err(|e| StoreError::Codec(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&mut self, key: &[u8], value: &T) -> Result<(), ProtocolError> {
        let encoded = bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| StoreError::Codec(e.to_string()))?;
        self.store.set(key, &encoded);
        Ok(())
    }
}
