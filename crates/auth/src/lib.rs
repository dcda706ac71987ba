//! Multi-party authentication aggregator.
//!
//! A multi-party transaction may require signers on several chains, whose
//! signature events arrive asynchronously and in any order. This crate
//! tracks the outstanding required signers per transaction; signature
//! *validity* is a pre-validated predicate checked by the host before an
//! event reaches this module, so only set membership is tracked here.
//!
//! Completion is reported through the boolean result of [`AuthAggregator::sign`];
//! the caller dispatches exactly once on the first `true`, and a repeat
//! `sign` after completion is an error rather than a second trigger.

use lockstep_store::KvStore;
use lockstep_types::Account;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Key-space prefix for persisted auth state.
const AUTH_STATE_PREFIX: u8 = 0x01;

/// Errors from the authentication aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Auth state already exists under this id.
    #[error("Auth state already exists for id {}", hex::encode(id))]
    AlreadyExists {
        /// The duplicate id.
        id: Vec<u8>,
    },

    /// A transaction needs at least one required signer; a state born
    /// complete could never report completion through `sign`.
    #[error("No required signers for id {}", hex::encode(id))]
    NoSigners {
        /// The offending id.
        id: Vec<u8>,
    },

    /// No auth state exists under this id.
    #[error("No auth state for id {}", hex::encode(id))]
    Unknown {
        /// The unknown id.
        id: Vec<u8>,
    },

    /// Every required signer already signed.
    #[error("Auth already complete for id {}", hex::encode(id))]
    AlreadyComplete {
        /// The completed id.
        id: Vec<u8>,
    },

    /// The persisted signer set failed to encode or decode.
    #[error("Auth state codec failure: {0}")]
    Codec(String),
}

/// Outstanding required signers for one multi-party transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxAuthState {
    /// Signers that have not signed yet.
    pub remaining_signers: BTreeSet<Account>,
}

impl TxAuthState {
    /// Whether every required signer has signed.
    pub fn is_completed(&self) -> bool {
        self.remaining_signers.is_empty()
    }
}

/// Tracks outstanding required signers before dispatch is permitted.
#[derive(Debug)]
pub struct AuthAggregator<S> {
    store: S,
}

impl<S: KvStore> AuthAggregator<S> {
    /// Create an aggregator over an injected, already-namespaced handle.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Register a multi-party transaction and its required signers.
    ///
    /// Fails if the id already has state, or if the signer set is empty —
    /// completion is only ever reported through [`Self::sign`].
    pub fn init_auth_state(
        &mut self,
        id: &[u8],
        required_signers: impl IntoIterator<Item = Account>,
    ) -> Result<(), AuthError> {
        let key = Self::scoped(id);
        if self.store.contains(&key) {
            return Err(AuthError::AlreadyExists { id: id.to_vec() });
        }
        let state = TxAuthState {
            remaining_signers: required_signers.into_iter().collect(),
        };
        if state.is_completed() {
            return Err(AuthError::NoSigners { id: id.to_vec() });
        }
        self.store.set(&key, &encode(&state)?);
        Ok(())
    }

    /// Record a signature event, removing any matched signers.
    ///
    /// Returns whether the remaining set is now empty. Fails if the id is
    /// unknown or already complete, so a completed transaction can only
    /// report `true` once.
    pub fn sign(&mut self, id: &[u8], presented: &[Account]) -> Result<bool, AuthError> {
        let key = Self::scoped(id);
        let encoded = self
            .store
            .get(&key)
            .ok_or_else(|| AuthError::Unknown { id: id.to_vec() })?;
        let mut state: TxAuthState = decode(&encoded)?;

        if state.is_completed() {
            return Err(AuthError::AlreadyComplete { id: id.to_vec() });
        }

        for signer in presented {
            state.remaining_signers.remove(signer);
        }
        self.store.set(&key, &encode(&state)?);

        let completed = state.is_completed();
        debug!(
            id = %hex::encode(id),
            remaining = state.remaining_signers.len(),
            completed,
            "signature event recorded"
        );
        Ok(completed)
    }

    /// Read the auth state for an id.
    pub fn get_auth_state(&self, id: &[u8]) -> Result<Option<TxAuthState>, AuthError> {
        match self.store.get(&Self::scoped(id)) {
            Some(encoded) => Ok(Some(decode(&encoded)?)),
            None => Ok(None),
        }
    }

    fn scoped(id: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + id.len());
        key.push(AUTH_STATE_PREFIX);
        key.extend_from_slice(id);
        key
    }
}

fn encode(state: &TxAuthState) -> Result<Vec<u8>, AuthError> {
    bincode::serde::encode_to_vec(state, bincode::config::standard())
        .map_err(|e| AuthError::Codec(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<TxAuthState, AuthError> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(state, _)| state)
        .map_err(|e| AuthError::Codec(e.to_string()))
}
