//! N-party two-phase commit branch protocol.
//!
//! Every leg is dispatched directly by the coordinator and executes
//! tentatively under atomic mode on its chain. The first Failed
//! acknowledgement decides Abort; the last OK acknowledgement decides
//! Commit. Either decision is broadcast to every branch — including ones
//! that never answered — so their locks are released. Redelivery is safe
//! everywhere: participants treat a repeated decision for a terminal
//! branch as an OK no-op, and the coordinator ignores acknowledgements
//! arriving after the phase has moved.

use crate::{
    keys, ChannelDirectory, ExecError, LegExecutor, PacketSender, ProtocolError, StateStore,
};
use lockstep_link::Linker;
use lockstep_messages::{Acknowledgement, CommitPacket, Packet, PreparePacket};
use lockstep_store::{CommitMode, CommitStore, KvStore};
use lockstep_types::{
    BranchIndex, BranchStatus, ChannelEndpoint, ChannelResolver, CommitKind,
    ContractTransactionState, CoordinatorState, Decision, Leg, Phase, PrepareResult, Timeout, TxId,
};
use tracing::{debug, info, warn};

/// The N-party two-phase commit protocol, run per chain.
///
/// The same type serves both roles: `send_prepare`/
/// `handle_packet_acknowledgement_prepare`/`send_commit` on the
/// coordinator chain, `receive_packet_prepare`/`receive_packet_commit` on
/// participant chains.
#[derive(Debug)]
pub struct TpcProtocol<S> {
    states: StateStore<S>,
    store: CommitStore<S>,
}

impl<S: KvStore> TpcProtocol<S> {
    /// Create the protocol over two injected, already-namespaced handles.
    pub fn new(state_store: S, commit_store: S) -> Self {
        Self {
            states: StateStore::new(state_store),
            store: CommitStore::new(commit_store),
        }
    }

    /// The commit store backing this chain's legs.
    pub fn store(&self) -> &CommitStore<S> {
        &self.store
    }

    // ═══════════════════════════════════════════════════════════════════
    // Coordinator side
    // ═══════════════════════════════════════════════════════════════════

    /// Dispatch a Prepare to every leg's channel.
    ///
    /// Rejects an empty leg list, a past timeout, or a duplicate
    /// transaction id. Coordinator state is recorded only once every send
    /// has succeeded.
    #[allow(clippy::too_many_arguments)]
    pub fn send_prepare(
        &mut self,
        resolver: &dyn ChannelResolver,
        directory: &dyn ChannelDirectory,
        sender: &mut dyn PacketSender,
        tx_id: TxId,
        legs: Vec<Leg>,
        timeout: Timeout,
        current_height: u64,
        now_nanos: u64,
    ) -> Result<(), ProtocolError> {
        if legs.is_empty() {
            return Err(ProtocolError::NoLegs);
        }
        if legs.len() > usize::from(u8::MAX) + 1 {
            return Err(ProtocolError::TooManyLegs(legs.len()));
        }
        if timeout.is_expired(current_height, now_nanos) {
            return Err(ProtocolError::PacketExpired);
        }
        if self.states.has_coordinator_state(&tx_id) {
            return Err(ProtocolError::TxIdInUse(tx_id));
        }
        if legs.iter().any(Leg::has_links) && !resolver.supports_links() {
            return Err(ProtocolError::LinksUnsupported);
        }

        let mut channels = Vec::with_capacity(legs.len());
        for leg in &legs {
            let channel = resolver.resolve(&leg.chain)?;
            if channel.is_local() || !directory.has_channel(&channel) {
                return Err(ProtocolError::UnknownChannel(channel));
            }
            channels.push(channel);
        }

        let mut linker = Linker::build(&legs);
        for (index, leg) in legs.iter().enumerate() {
            let branch = BranchIndex(index as u8);
            let resolved = linker.resolve(&leg.chain, &leg.links, resolver)?;
            let packet = PreparePacket::new(
                tx_id.clone(),
                branch,
                leg.clone(),
                resolved,
                timeout,
            );
            sender.send(&channels[index], Packet::Prepare(packet))?;
        }

        let cs = CoordinatorState::new(CommitKind::TwoPhase, channels)?;
        self.states.create_coordinator_state(&tx_id, &cs)?;
        info!(%tx_id, branches = legs.len(), "prepare dispatched to all branches");
        Ok(())
    }

    /// Handle one branch's prepare acknowledgement.
    ///
    /// A Failed acknowledgement decides Abort immediately; the last OK
    /// acknowledgement decides Commit. Either decision is broadcast to
    /// every branch. An acknowledgement arriving after the phase has moved
    /// to Commit is a no-op, not an error.
    pub fn handle_packet_acknowledgement_prepare(
        &mut self,
        sender: &mut dyn PacketSender,
        tx_id: &TxId,
        branch: BranchIndex,
        source_channel: &ChannelEndpoint,
        ack: Acknowledgement,
    ) -> Result<Decision, ProtocolError> {
        let mut cs = self
            .states
            .coordinator_state(tx_id)?
            .ok_or_else(|| ProtocolError::UnknownTx(tx_id.clone()))?;
        if cs.phase() == Phase::Commit {
            debug!(%tx_id, %branch, "acknowledgement after decision ignored");
            return Ok(cs.decision());
        }

        cs.confirm(branch, source_channel)?;

        let decision = if !ack.is_ok() {
            Some(Decision::Abort)
        } else if cs.is_completed() {
            Some(Decision::Commit)
        } else {
            None
        };

        if let Some(decision) = decision {
            cs.decide(decision)?;
            cs.advance_to_commit()?;
            self.broadcast_decision(sender, tx_id, &cs)?;
            info!(%tx_id, %decision, "coordinator decided, decision broadcast");
        } else {
            debug!(%tx_id, %branch, "branch confirmed, awaiting others");
        }

        self.states.put_coordinator_state(tx_id, &cs)?;
        Ok(cs.decision())
    }

    /// Re-broadcast the decision to every branch.
    ///
    /// Requires a decision to exist. Safe to repeat while acknowledgements
    /// are outstanding; participants are idempotent.
    pub fn send_commit(
        &mut self,
        sender: &mut dyn PacketSender,
        tx_id: &TxId,
    ) -> Result<(), ProtocolError> {
        let cs = self
            .states
            .coordinator_state(tx_id)?
            .ok_or_else(|| ProtocolError::UnknownTx(tx_id.clone()))?;
        if cs.decision() == Decision::Unknown {
            return Err(ProtocolError::WrongPhase {
                expected: Phase::Commit,
                actual: cs.phase(),
            });
        }
        self.broadcast_decision(sender, tx_id, &cs)
    }

    /// Record a branch's commit-phase acknowledgement. Duplicates are
    /// no-ops.
    pub fn receive_commit_acknowledgement(
        &mut self,
        tx_id: &TxId,
        branch: BranchIndex,
    ) -> Result<(), ProtocolError> {
        let mut cs = self
            .states
            .coordinator_state(tx_id)?
            .ok_or_else(|| ProtocolError::UnknownTx(tx_id.clone()))?;
        if cs.mark_acked(branch) {
            self.states.put_coordinator_state(tx_id, &cs)?;
        }
        Ok(())
    }

    /// Decide Abort for a transaction whose acknowledgements never all
    /// arrived, and broadcast the abort so every branch releases its
    /// locks — the same path as an explicit Failed acknowledgement.
    pub fn abort_on_timeout(
        &mut self,
        sender: &mut dyn PacketSender,
        tx_id: &TxId,
    ) -> Result<(), ProtocolError> {
        let mut cs = self
            .states
            .coordinator_state(tx_id)?
            .ok_or_else(|| ProtocolError::UnknownTx(tx_id.clone()))?;
        if cs.phase() != Phase::Prepare {
            return Err(ProtocolError::WrongPhase {
                expected: Phase::Prepare,
                actual: cs.phase(),
            });
        }

        cs.decide(Decision::Abort)?;
        cs.advance_to_commit()?;
        self.broadcast_decision(sender, tx_id, &cs)?;
        self.states.put_coordinator_state(tx_id, &cs)?;
        warn!(%tx_id, "transaction timed out, abort broadcast");
        Ok(())
    }

    fn broadcast_decision(
        &self,
        sender: &mut dyn PacketSender,
        tx_id: &TxId,
        cs: &CoordinatorState,
    ) -> Result<(), ProtocolError> {
        let committable = cs.decision() == Decision::Commit;
        for (index, channel) in cs.channels().iter().enumerate() {
            let packet = CommitPacket::new(tx_id.clone(), BranchIndex(index as u8), committable);
            sender.send(channel, Packet::Commit(packet))?;
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Participant side
    // ═══════════════════════════════════════════════════════════════════

    /// Execute one leg tentatively under atomic mode.
    ///
    /// Success leaves the branch in Prepare with its writes locked in the
    /// pending log; rejection finalizes the branch as Abort with nothing
    /// staged. The acknowledgement mirrors the outcome.
    pub fn receive_packet_prepare(
        &mut self,
        directory: &dyn ChannelDirectory,
        executor: &dyn LegExecutor<S>,
        dest_channel: &ChannelEndpoint,
        packet: PreparePacket,
        current_height: u64,
        now_nanos: u64,
    ) -> Result<Acknowledgement, ProtocolError> {
        let PreparePacket {
            tx_id,
            branch_index,
            leg,
            resolved,
            timeout,
        } = packet;

        if timeout.is_expired(current_height, now_nanos) {
            return Err(ProtocolError::PacketExpired);
        }
        if self.states.has_contract_tx_state(&tx_id, branch_index) {
            return Err(ProtocolError::BranchExists {
                tx_id,
                branch: branch_index,
            });
        }
        if !directory.has_channel(dest_channel) {
            return Err(ProtocolError::UnknownChannel(dest_channel.clone()));
        }

        let state = match executor.execute(
            &mut self.store,
            CommitMode::Atomic,
            &leg.call,
            &leg.signers,
            &resolved,
        ) {
            Ok(()) => {
                self.store
                    .precommit(&keys::pending_id(&tx_id, branch_index))?;
                ContractTransactionState::prepared(dest_channel.clone())
            }
            Err(ExecError::Rejected(reason)) => {
                self.store.discard_buffer();
                warn!(%tx_id, %branch_index, %reason, "prepare rejected");
                ContractTransactionState::finalized(dest_channel.clone(), PrepareResult::Failed)
            }
            Err(ExecError::Store(err)) => {
                self.store.discard_buffer();
                return Err(err.into());
            }
        };

        let prepare_result = state.prepare_result();
        self.states
            .create_contract_tx_state(&tx_id, branch_index, &state)?;

        debug!(%tx_id, %branch_index, ?prepare_result, "prepare executed");
        Ok(match prepare_result {
            PrepareResult::Ok => Acknowledgement::ok(),
            PrepareResult::Failed => Acknowledgement::failed(),
        })
    }

    /// Apply the global decision to one branch.
    ///
    /// Committable applies the branch's locked writes, otherwise they are
    /// discarded. A redelivered decision for an already-terminal branch is
    /// acknowledged OK without re-applying.
    pub fn receive_packet_commit(
        &mut self,
        dest_channel: &ChannelEndpoint,
        packet: CommitPacket,
    ) -> Result<Acknowledgement, ProtocolError> {
        let CommitPacket {
            tx_id,
            branch_index,
            committable,
        } = packet;

        let mut ct = self
            .states
            .contract_tx_state(&tx_id, branch_index)?
            .ok_or_else(|| ProtocolError::UnknownBranch {
                tx_id: tx_id.clone(),
                branch: branch_index,
            })?;
        if ct.channel() != dest_channel {
            return Err(ProtocolError::UnknownChannel(dest_channel.clone()));
        }

        if ct.is_terminal() {
            let already_committed = ct.status() == BranchStatus::Commit;
            if already_committed != committable && ct.prepare_result() == PrepareResult::Ok {
                warn!(%tx_id, %branch_index, "decision redelivery disagrees with terminal status");
            }
            debug!(%tx_id, %branch_index, "decision redelivered to terminal branch");
            return Ok(Acknowledgement::ok());
        }

        let pending = keys::pending_id(&tx_id, branch_index);
        if committable {
            self.store.commit(&pending)?;
        } else {
            self.store.abort(&pending)?;
        }

        ct.decide(committable)?;
        self.states
            .put_contract_tx_state(&tx_id, branch_index, &ct)?;
        info!(%tx_id, %branch_index, committable, "branch finalized");
        Ok(Acknowledgement::ok())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════

    /// Read the coordinator state of a transaction.
    pub fn get_coordinator_state(
        &self,
        tx_id: &TxId,
    ) -> Result<Option<CoordinatorState>, ProtocolError> {
        self.states.coordinator_state(tx_id)
    }

    /// Read the branch state of (transaction, branch).
    pub fn get_contract_transaction_state(
        &self,
        tx_id: &TxId,
        branch: BranchIndex,
    ) -> Result<Option<ContractTransactionState>, ProtocolError> {
        self.states.contract_tx_state(tx_id, branch)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════
