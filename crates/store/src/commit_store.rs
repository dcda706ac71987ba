//! The lock-based commit store.

use crate::{KvStore, StoreError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Key-space prefix for durable state.
const STATE_PREFIX: u8 = 0x00;

/// Key-space prefix for the lock table.
const LOCK_PREFIX: u8 = 0x01;

/// Key-space prefix for the pending-write log.
const PENDING_PREFIX: u8 = 0x02;

/// How a leg's reads and writes interact with the lock table.
///
/// Both modes buffer writes; the buffer is what makes a rejected
/// execution leave no trace either way. They differ in the lock table
/// and in how the buffer leaves the store: atomic ops fail fast on a
/// foreign lock and hand off through `precommit`, immediate ops ignore
/// the lock table and flush through `commit_immediately` in the same
/// step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Tentative: writes buffer invisibly until precommit locks them in.
    Atomic,

    /// Final in the same step: the lock table is bypassed entirely. For
    /// legs whose single-chain finality needs no isolation window.
    Immediate,
}

/// One buffered mutation: a value, or a tombstone for a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOp {
    /// The key being mutated.
    pub key: Vec<u8>,

    /// The new value, or `None` to delete the key.
    pub value: Option<Vec<u8>>,
}

/// Per-chain storage giving each pending leg write isolation plus
/// commit/abort.
///
/// Three key-spaces share the injected handle: durable state, a lock table
/// (key -> locked flag), and a pending-write log (id -> ordered op list).
/// The buffer records each distinct key a branch wrote, last write wins,
/// first-write order preserved.
#[derive(Debug)]
pub struct CommitStore<S> {
    store: S,
    buffer: IndexMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<S: KvStore> CommitStore<S> {
    /// Create a commit store over an injected, already-namespaced handle.
    pub fn new(store: S) -> Self {
        Self {
            store,
            buffer: IndexMap::new(),
        }
    }

    fn scoped(prefix: u8, key: &[u8]) -> Vec<u8> {
        let mut scoped = Vec::with_capacity(1 + key.len());
        scoped.push(prefix);
        scoped.extend_from_slice(key);
        scoped
    }

    /// Whether a key is currently locked by a pending branch.
    pub fn is_locked(&self, key: &[u8]) -> bool {
        self.store.contains(&Self::scoped(LOCK_PREFIX, key))
    }

    fn lock(&mut self, key: &[u8]) {
        self.store.set(&Self::scoped(LOCK_PREFIX, key), &[1]);
    }

    fn unlock(&mut self, key: &[u8]) {
        self.store.delete(&Self::scoped(LOCK_PREFIX, key));
    }

    /// Read a key.
    ///
    /// The branch sees its own buffered write first (read-your-own-writes).
    /// Under atomic mode a key locked by another branch fails immediately,
    /// never blocking and never returning stale data.
    pub fn read(&self, mode: CommitMode, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(buffered) = self.buffer.get(key) {
            return Ok(buffered.clone());
        }
        if mode == CommitMode::Atomic && self.is_locked(key) {
            return Err(StoreError::LockContention { key: key.to_vec() });
        }
        Ok(self.store.get(&Self::scoped(STATE_PREFIX, key)))
    }

    /// Write a value to a key.
    ///
    /// The write goes to the branch's buffer, invisible elsewhere until
    /// the buffer is handed off or flushed. Under atomic mode a key
    /// locked by another branch fails immediately.
    pub fn write(&mut self, mode: CommitMode, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.apply_op(mode, key, Some(value.to_vec()))
    }

    /// Delete a key. Buffered as a tombstone.
    pub fn delete(&mut self, mode: CommitMode, key: &[u8]) -> Result<(), StoreError> {
        self.apply_op(mode, key, None)
    }

    fn apply_op(
        &mut self,
        mode: CommitMode,
        key: &[u8],
        value: Option<Vec<u8>>,
    ) -> Result<(), StoreError> {
        if mode == CommitMode::Atomic && !self.buffer.contains_key(key) && self.is_locked(key) {
            return Err(StoreError::LockContention { key: key.to_vec() });
        }
        self.buffer.insert(key.to_vec(), value);
        Ok(())
    }

    /// Hand the buffer off from tentative to pending-decision.
    ///
    /// Persists the buffered ops keyed by `id` (which must not already
    /// exist) and locks every distinct key in them. The buffer is empty
    /// afterwards.
    pub fn precommit(&mut self, id: &[u8]) -> Result<(), StoreError> {
        let pending_key = Self::scoped(PENDING_PREFIX, id);
        if self.store.contains(&pending_key) {
            return Err(StoreError::PendingExists { id: id.to_vec() });
        }

        let ops: Vec<WriteOp> = self
            .buffer
            .drain(..)
            .map(|(key, value)| WriteOp { key, value })
            .collect();
        let encoded = encode_ops(&ops)?;
        self.store.set(&pending_key, &encoded);

        for op in &ops {
            self.lock(&op.key);
        }
        Ok(())
    }

    /// Apply the pending ops for `id` in recorded order, unlock their keys
    /// and clear the log entry. Errors if `id` is unknown.
    pub fn commit(&mut self, id: &[u8]) -> Result<(), StoreError> {
        let ops = self.take_pending(id)?.ok_or(StoreError::UnknownPending {
            id: id.to_vec(),
        })?;

        for op in ops {
            let scoped = Self::scoped(STATE_PREFIX, &op.key);
            match &op.value {
                Some(value) => self.store.set(&scoped, value),
                None => self.store.delete(&scoped),
            }
            self.unlock(&op.key);
        }
        Ok(())
    }

    /// Discard the pending ops for `id` without applying, unlocking their
    /// keys. A no-op success if `id` is unknown, tolerating replay.
    pub fn abort(&mut self, id: &[u8]) -> Result<(), StoreError> {
        let Some(ops) = self.take_pending(id)? else {
            return Ok(());
        };
        for op in ops {
            self.unlock(&op.key);
        }
        Ok(())
    }

    /// Apply the current buffer directly to durable state, never touching
    /// the lock table, and clear it.
    pub fn commit_immediately(&mut self) {
        let ops: Vec<(Vec<u8>, Option<Vec<u8>>)> = self.buffer.drain(..).collect();
        for (key, value) in ops {
            let scoped = Self::scoped(STATE_PREFIX, &key);
            match value {
                Some(value) => self.store.set(&scoped, &value),
                None => self.store.delete(&scoped),
            }
        }
    }

    /// Drop the current buffer without persisting anything.
    ///
    /// Used when a leg's execution is rejected: the whole tentative step
    /// leaves no trace.
    pub fn discard_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Number of distinct keys in the current buffer.
    pub fn buffered_keys(&self) -> usize {
        self.buffer.len()
    }

    fn take_pending(&mut self, id: &[u8]) -> Result<Option<Vec<WriteOp>>, StoreError> {
        let pending_key = Self::scoped(PENDING_PREFIX, id);
        let Some(encoded) = self.store.get(&pending_key) else {
            return Ok(None);
        };
        let ops = decode_ops(&encoded)?;
        self.store.delete(&pending_key);
        Ok(Some(ops))
    }
}

fn encode_ops(ops: &[WriteOp]) -> Result<Vec<u8>, StoreError> {
    bincode::serde::encode_to_vec(ops, bincode::config::standard())
        .map_err(|e| StoreError::Codec(e.to_string()))
}

fn decode_ops(bytes: &[u8]) -> Result<Vec<WriteOp>, StoreError> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(ops, _)| ops)
        .map_err(|e| StoreError::Codec(e.to_string()))
}
