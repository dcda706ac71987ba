//! Simple (two-party) branch protocol.
//!
//! One coordinator-local leg (branch 0) and one counterparty leg
//! (branch 1). The coordinator executes branch 0 tentatively, dispatches
//! branch 1 in a call packet, and treats the counterparty's
//! acknowledgement as the global decision: the counterparty executes its
//! leg with immediate finality, so only branch 0 ever holds locks.

use crate::{
    keys, ChannelDirectory, ExecError, LegExecutor, PacketSender, ProtocolError, StateStore,
};
use lockstep_link::Linker;
use lockstep_messages::{Acknowledgement, CallPacket, Packet};
use lockstep_store::{CommitMode, CommitStore, KvStore};
use lockstep_types::{
    BranchIndex, BranchStatus, ChannelEndpoint, ChannelResolver, CommitKind,
    ContractTransactionState, CoordinatorState, Decision, Leg, Phase, PrepareResult, StateError,
    Timeout, TxId,
};
use tracing::{debug, info, warn};

/// Exact leg count for the two-party protocol.
const LEG_COUNT: usize = 2;

/// The two-party branch protocol, run per chain.
///
/// The same type serves both roles: `send_call`/`receive_call_acknowledgement`/
/// `try_commit` on the coordinator chain, `receive_call_packet` on the
/// participant chain.
#[derive(Debug)]
pub struct SimpleProtocol<S> {
    states: StateStore<S>,
    store: CommitStore<S>,
}

impl<S: KvStore> SimpleProtocol<S> {
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

    /// Dispatch a two-party transaction.
    ///
    /// Executes leg 0 locally under atomic mode and sends leg 1 over its
    /// channel with any links already resolved to concrete values. On a
    /// local rejection the call aborts entirely and nothing is persisted.
    #[allow(clippy::too_many_arguments)]
    pub fn send_call(
        &mut self,
        resolver: &dyn ChannelResolver,
        directory: &dyn ChannelDirectory,
        sender: &mut dyn PacketSender,
        executor: &dyn LegExecutor<S>,
        tx_id: TxId,
        legs: Vec<Leg>,
        timeout: Timeout,
    ) -> Result<(), ProtocolError> {
        if self.states.has_coordinator_state(&tx_id) {
            return Err(ProtocolError::TxIdInUse(tx_id));
        }
        if legs.len() != LEG_COUNT {
            return Err(ProtocolError::WrongLegCount {
                expected: LEG_COUNT,
                actual: legs.len(),
            });
        }
        if legs.iter().any(Leg::has_links) && !resolver.supports_links() {
            return Err(ProtocolError::LinksUnsupported);
        }

        let local_channel = resolver.resolve(&legs[0].chain)?;
        if !local_channel.is_local() {
            // Branch 0 is the coordinator's own leg; a remote chain there
            // belongs to the N-party protocol.
            return Err(ProtocolError::UnknownChannel(local_channel));
        }
        let remote_channel = resolver.resolve(&legs[1].chain)?;
        if remote_channel.is_local() || !directory.has_channel(&remote_channel) {
            return Err(ProtocolError::UnknownChannel(remote_channel));
        }

        // Links resolve entirely before any message is sent.
        let mut linker = Linker::build(&legs);
        let local_resolved = linker.resolve(&legs[0].chain, &legs[0].links, resolver)?;
        let remote_resolved = linker.resolve(&legs[1].chain, &legs[1].links, resolver)?;

        match executor.execute(
            &mut self.store,
            CommitMode::Atomic,
            &legs[0].call,
            &legs[0].signers,
            &local_resolved,
        ) {
            Ok(()) => {}
            Err(ExecError::Rejected(reason)) => {
                self.store.discard_buffer();
                debug!(%tx_id, %reason, "local leg rejected, call aborted");
                return Err(ProtocolError::PrepareFailed { tx_id, reason });
            }
            Err(ExecError::Store(err)) => {
                self.store.discard_buffer();
                return Err(err.into());
            }
        }

        let pending = keys::pending_id(&tx_id, BranchIndex::INITIATOR);
        self.store.precommit(&pending)?;

        let packet = CallPacket::new(
            tx_id.clone(),
            legs[1].clone(),
            remote_resolved,
            timeout,
        );
        if let Err(err) = sender.send(&remote_channel, Packet::Call(packet)) {
            // Transport refused the step; release the locks it staged.
            self.store.abort(&pending)?;
            return Err(err.into());
        }

        let mut cs = CoordinatorState::new(
            CommitKind::Simple,
            vec![local_channel.clone(), remote_channel.clone()],
        )?;
        cs.confirm(BranchIndex::INITIATOR, &local_channel)?;
        self.states.create_coordinator_state(&tx_id, &cs)?;
        self.states.create_contract_tx_state(
            &tx_id,
            BranchIndex::INITIATOR,
            &ContractTransactionState::prepared(local_channel),
        )?;

        info!(%tx_id, channel = %remote_channel, "two-party call dispatched");
        Ok(())
    }

    /// Handle the counterparty's acknowledgement and decide the outcome.
    ///
    /// Requires the transaction in the Prepare phase and the
    /// acknowledgement arriving over branch 1's recorded channel. An OK
    /// acknowledgement decides Commit, a Failed one decides Abort; either
    /// way both branches are accounted for and the phase moves to Commit.
    pub fn receive_call_acknowledgement(
        &mut self,
        tx_id: &TxId,
        source_channel: &ChannelEndpoint,
        ack: Acknowledgement,
    ) -> Result<Decision, ProtocolError> {
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

        cs.confirm(BranchIndex::COUNTERPARTY, source_channel)?;
        let decision = if ack.is_ok() {
            Decision::Commit
        } else {
            Decision::Abort
        };
        cs.decide(decision)?;
        cs.mark_acked(BranchIndex::INITIATOR);
        cs.mark_acked(BranchIndex::COUNTERPARTY);
        cs.advance_to_commit()?;

        // A logic defect, not a user-triggerable condition: both branches
        // must be confirmed and acked at this point.
        if !cs.is_fully_acknowledged() {
            panic!("two-party transaction {tx_id} has confirmed-but-unacked branches");
        }

        self.states.put_coordinator_state(tx_id, &cs)?;
        info!(%tx_id, %decision, "coordinator decided");
        Ok(decision)
    }

    /// Finalize branch 0 per the decision.
    ///
    /// Committable applies the locked writes, otherwise they are
    /// discarded. A repeat call after the status changed fails rather than
    /// re-applying.
    pub fn try_commit(&mut self, tx_id: &TxId, committable: bool) -> Result<(), ProtocolError> {
        let mut ct = self
            .states
            .contract_tx_state(tx_id, BranchIndex::INITIATOR)?
            .ok_or_else(|| ProtocolError::UnknownTx(tx_id.clone()))?;
        if ct.status() != BranchStatus::Prepare {
            return Err(StateError::BranchTerminal.into());
        }

        let pending = keys::pending_id(tx_id, BranchIndex::INITIATOR);
        if committable {
            self.store.commit(&pending)?;
        } else {
            self.store.abort(&pending)?;
        }

        ct.decide(committable)?;
        self.states
            .put_contract_tx_state(tx_id, BranchIndex::INITIATOR, &ct)?;
        info!(%tx_id, committable, "local branch finalized");
        Ok(())
    }

    /// Decide Abort for a transaction whose acknowledgement never arrived.
    ///
    /// The host calls this when its clock passes the transaction's bound;
    /// the outcome then flows through [`Self::try_commit`] with
    /// `committable = false`, the same path as an explicit Failed
    /// acknowledgement.
    pub fn abort_on_timeout(&mut self, tx_id: &TxId) -> Result<(), ProtocolError> {
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
        self.states.put_coordinator_state(tx_id, &cs)?;
        warn!(%tx_id, "transaction timed out, aborting");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Participant side
    // ═══════════════════════════════════════════════════════════════════

    /// Execute the counterparty leg of a two-party transaction.
    ///
    /// The leg runs under immediate mode — single-leg finality needs no
    /// isolation window — so its buffered writes flush durably on success
    /// and are discarded whole on rejection; a rejecting contract never
    /// leaves a partial write behind. Always produces an acknowledgement:
    /// OK on success, Failed on rejection. A redelivered packet for an
    /// already-seen branch fails without re-executing.
    pub fn receive_call_packet(
        &mut self,
        directory: &dyn ChannelDirectory,
        executor: &dyn LegExecutor<S>,
        dest_channel: &ChannelEndpoint,
        packet: CallPacket,
        current_height: u64,
        now_nanos: u64,
    ) -> Result<Acknowledgement, ProtocolError> {
        let CallPacket {
            tx_id,
            leg,
            resolved,
            timeout,
        } = packet;

        if timeout.is_expired(current_height, now_nanos) {
            return Err(ProtocolError::PacketExpired);
        }
        if self
            .states
            .has_contract_tx_state(&tx_id, BranchIndex::COUNTERPARTY)
        {
            return Err(ProtocolError::BranchExists {
                tx_id,
                branch: BranchIndex::COUNTERPARTY,
            });
        }
        if !directory.has_channel(dest_channel) {
            return Err(ProtocolError::UnknownChannel(dest_channel.clone()));
        }

        let prepare_result = match executor.execute(
            &mut self.store,
            CommitMode::Immediate,
            &leg.call,
            &leg.signers,
            &resolved,
        ) {
            Ok(()) => {
                self.store.commit_immediately();
                PrepareResult::Ok
            }
            Err(ExecError::Rejected(reason)) => {
                self.store.discard_buffer();
                warn!(%tx_id, %reason, "counterparty leg rejected");
                PrepareResult::Failed
            }
            Err(ExecError::Store(err)) => {
                self.store.discard_buffer();
                return Err(err.into());
            }
        };

        self.states.create_contract_tx_state(
            &tx_id,
            BranchIndex::COUNTERPARTY,
            &ContractTransactionState::finalized(dest_channel.clone(), prepare_result),
        )?;

        debug!(%tx_id, ?prepare_result, "counterparty leg executed");
        Ok(match prepare_result {
            PrepareResult::Ok => Acknowledgement::ok(),
            PrepareResult::Failed => Acknowledgement::failed(),
        })
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{endpoint, CounterExecutor, RecordingSender, StaticDirectory, StaticResolver};
    use lockstep_store::MemStore;
    use lockstep_types::{Account, ChainRef, ContractCall, Link};
    use tracing_test::traced_test;

    const LOCAL_COUNTER: &[u8] = b"counter-a";
    const REMOTE_COUNTER: &[u8] = b"counter-b";

    fn protocol() -> SimpleProtocol<MemStore> {
        SimpleProtocol::new(MemStore::new(), MemStore::new())
    }

    fn tx(id: &str) -> TxId {
        TxId::new(id.as_bytes().to_vec())
    }

    fn local_leg(method: &str) -> Leg {
        Leg::new(
            ChainRef::SelfChain,
            ContractCall::new(LOCAL_COUNTER.to_vec(), method, vec![]),
            vec![Account::local(b"alice".to_vec())],
        )
    }

    fn remote_leg(channel: &ChannelEndpoint, method: &str) -> Leg {
        Leg::new(
            ChainRef::Channel(channel.clone()),
            ContractCall::new(REMOTE_COUNTER.to_vec(), method, vec![]),
            vec![Account::local(b"bob".to_vec())],
        )
    }

    fn counter(protocol: &SimpleProtocol<MemStore>, key: &[u8]) -> u64 {
        let bytes = protocol
            .store()
            .read(CommitMode::Immediate, key)
            .unwrap()
            .unwrap_or_default();
        let mut raw = [0u8; 8];
        raw[..bytes.len()].copy_from_slice(&bytes);
        u64::from_le_bytes(raw)
    }

    fn dispatch(
        coordinator: &mut SimpleProtocol<MemStore>,
        sender: &mut RecordingSender,
        tx_id: &TxId,
        channel: &ChannelEndpoint,
    ) {
        coordinator
            .send_call(
                &StaticResolver::new(),
                &StaticDirectory::of(&[channel.clone()]),
                sender,
                &CounterExecutor,
                tx_id.clone(),
                vec![local_leg("increment"), remote_leg(channel, "increment")],
                Timeout::NONE,
            )
            .unwrap();
    }

    #[test]
    #[traced_test]
    fn test_two_party_commit_increments_both_counters() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut counterparty = protocol();
        let mut sender = RecordingSender::new();
        let tx_id = tx("tx-1");

        dispatch(&mut coordinator, &mut sender, &tx_id, &channel);

        // Dispatched but undecided: branch 0 is locked, not visible.
        assert!(coordinator.store().is_locked(LOCAL_COUNTER));
        assert_eq!(counter(&coordinator, LOCAL_COUNTER), 0);

        let (sent_to, packet) = sender.sent.pop().unwrap();
        assert_eq!(sent_to, channel);
        let Packet::Call(packet) = packet else {
            panic!("expected a call packet");
        };

        let ack = counterparty
            .receive_call_packet(
                &StaticDirectory::of(&[channel.clone()]),
                &CounterExecutor,
                &channel,
                packet,
                10,
                1_000,
            )
            .unwrap();
        assert!(ack.is_ok());
        assert_eq!(counter(&counterparty, REMOTE_COUNTER), 1);

        let decision = coordinator
            .receive_call_acknowledgement(&tx_id, &channel, ack)
            .unwrap();
        assert_eq!(decision, Decision::Commit);

        coordinator.try_commit(&tx_id, true).unwrap();
        assert_eq!(counter(&coordinator, LOCAL_COUNTER), 1);
        assert!(!coordinator.store().is_locked(LOCAL_COUNTER));
    }

    #[test]
    fn test_local_rejection_aborts_whole_call() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut sender = RecordingSender::new();
        let tx_id = tx("tx-1");

        let err = coordinator
            .send_call(
                &StaticResolver::new(),
                &StaticDirectory::of(&[channel.clone()]),
                &mut sender,
                &CounterExecutor,
                tx_id.clone(),
                vec![local_leg("fail"), remote_leg(&channel, "increment")],
                Timeout::NONE,
            )
            .unwrap_err();

        assert!(matches!(err, ProtocolError::PrepareFailed { .. }));
        assert!(sender.sent.is_empty());
        assert_eq!(counter(&coordinator, LOCAL_COUNTER), 0);
        assert!(!coordinator.store().is_locked(LOCAL_COUNTER));
        assert!(coordinator.get_coordinator_state(&tx_id).unwrap().is_none());
    }

    #[test]
    fn test_send_failure_releases_locks() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut sender = RecordingSender::refusing();
        let tx_id = tx("tx-1");

        let err = coordinator
            .send_call(
                &StaticResolver::new(),
                &StaticDirectory::of(&[channel.clone()]),
                &mut sender,
                &CounterExecutor,
                tx_id.clone(),
                vec![local_leg("increment"), remote_leg(&channel, "increment")],
                Timeout::NONE,
            )
            .unwrap_err();

        assert!(matches!(err, ProtocolError::Send(_)));
        assert!(!coordinator.store().is_locked(LOCAL_COUNTER));
        assert!(coordinator.get_coordinator_state(&tx_id).unwrap().is_none());
    }

    #[test]
    fn test_rejects_wrong_leg_count_and_duplicate_id() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut sender = RecordingSender::new();
        let tx_id = tx("tx-1");

        let err = coordinator
            .send_call(
                &StaticResolver::new(),
                &StaticDirectory::of(&[channel.clone()]),
                &mut sender,
                &CounterExecutor,
                tx_id.clone(),
                vec![local_leg("increment")],
                Timeout::NONE,
            )
            .unwrap_err();
        assert!(matches!(err, ProtocolError::WrongLegCount { actual: 1, .. }));

        dispatch(&mut coordinator, &mut sender, &tx_id, &channel);
        let err = coordinator
            .send_call(
                &StaticResolver::new(),
                &StaticDirectory::of(&[channel.clone()]),
                &mut sender,
                &CounterExecutor,
                tx_id.clone(),
                vec![local_leg("increment"), remote_leg(&channel, "increment")],
                Timeout::NONE,
            )
            .unwrap_err();
        assert!(matches!(err, ProtocolError::TxIdInUse(_)));
    }

    #[test]
    fn test_rejects_remote_chain_on_branch_zero() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut sender = RecordingSender::new();
        let tx_id = tx("tx-1");

        let err = coordinator
            .send_call(
                &StaticResolver::new(),
                &StaticDirectory::of(&[channel.clone()]),
                &mut sender,
                &CounterExecutor,
                tx_id.clone(),
                vec![
                    remote_leg(&channel, "increment"),
                    remote_leg(&channel, "increment"),
                ],
                Timeout::NONE,
            )
            .unwrap_err();

        assert_eq!(err, ProtocolError::UnknownChannel(channel));
        assert!(sender.sent.is_empty());
        assert_eq!(counter(&coordinator, REMOTE_COUNTER), 0);
        assert!(coordinator.get_coordinator_state(&tx_id).unwrap().is_none());
    }

    #[test]
    fn test_failed_acknowledgement_decides_abort() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut counterparty = protocol();
        let mut sender = RecordingSender::new();
        let tx_id = tx("tx-1");

        dispatch(&mut coordinator, &mut sender, &tx_id, &channel);
        let Packet::Call(mut packet) = sender.sent.pop().unwrap().1 else {
            panic!("expected a call packet");
        };
        packet.leg.call.method = "fail".to_string();

        let ack = counterparty
            .receive_call_packet(
                &StaticDirectory::of(&[channel.clone()]),
                &CounterExecutor,
                &channel,
                packet,
                10,
                1_000,
            )
            .unwrap();
        assert!(!ack.is_ok());
        assert_eq!(counter(&counterparty, REMOTE_COUNTER), 0);

        let decision = coordinator
            .receive_call_acknowledgement(&tx_id, &channel, ack)
            .unwrap();
        assert_eq!(decision, Decision::Abort);

        coordinator.try_commit(&tx_id, false).unwrap();
        assert_eq!(counter(&coordinator, LOCAL_COUNTER), 0);
        assert!(!coordinator.store().is_locked(LOCAL_COUNTER));
    }

    #[test]
    fn test_redelivered_call_packet_does_not_reexecute() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut counterparty = protocol();
        let mut sender = RecordingSender::new();
        let tx_id = tx("tx-1");

        dispatch(&mut coordinator, &mut sender, &tx_id, &channel);
        let Packet::Call(packet) = sender.sent.pop().unwrap().1 else {
            panic!("expected a call packet");
        };
        let directory = StaticDirectory::of(&[channel.clone()]);

        counterparty
            .receive_call_packet(&directory, &CounterExecutor, &channel, packet.clone(), 10, 1_000)
            .unwrap();
        let err = counterparty
            .receive_call_packet(&directory, &CounterExecutor, &channel, packet, 10, 1_000)
            .unwrap_err();

        assert!(matches!(err, ProtocolError::BranchExists { .. }));
        assert_eq!(counter(&counterparty, REMOTE_COUNTER), 1);
    }

    #[test]
    fn test_rejected_leg_discards_its_own_writes() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut counterparty = protocol();
        let mut sender = RecordingSender::new();
        let tx_id = tx("tx-1");

        dispatch(&mut coordinator, &mut sender, &tx_id, &channel);
        let Packet::Call(mut packet) = sender.sent.pop().unwrap().1 else {
            panic!("expected a call packet");
        };
        packet.leg.call.method = "increment-then-fail".to_string();

        // The contract writes before rejecting; none of it may stick.
        let ack = counterparty
            .receive_call_packet(
                &StaticDirectory::of(&[channel.clone()]),
                &CounterExecutor,
                &channel,
                packet,
                10,
                1_000,
            )
            .unwrap();
        assert!(!ack.is_ok());
        assert_eq!(counter(&counterparty, REMOTE_COUNTER), 0);

        let ct = counterparty
            .get_contract_transaction_state(&tx_id, BranchIndex::COUNTERPARTY)
            .unwrap()
            .unwrap();
        assert_eq!(ct.status(), BranchStatus::Abort);
    }

    #[test]
    fn test_expired_packet_rejected_before_execution() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut counterparty = protocol();
        let mut sender = RecordingSender::new();
        let tx_id = tx("tx-1");

        coordinator
            .send_call(
                &StaticResolver::new(),
                &StaticDirectory::of(&[channel.clone()]),
                &mut sender,
                &CounterExecutor,
                tx_id,
                vec![local_leg("increment"), remote_leg(&channel, "increment")],
                Timeout::at_height(5),
            )
            .unwrap();
        let Packet::Call(packet) = sender.sent.pop().unwrap().1 else {
            panic!("expected a call packet");
        };

        let err = counterparty
            .receive_call_packet(
                &StaticDirectory::of(&[channel.clone()]),
                &CounterExecutor,
                &channel,
                packet,
                5,
                1_000,
            )
            .unwrap_err();
        assert!(matches!(err, ProtocolError::PacketExpired));
        assert_eq!(counter(&counterparty, REMOTE_COUNTER), 0);
    }

    #[test]
    fn test_timeout_abort_then_late_acknowledgement_rejected() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut sender = RecordingSender::new();
        let tx_id = tx("tx-1");

        dispatch(&mut coordinator, &mut sender, &tx_id, &channel);
        coordinator.abort_on_timeout(&tx_id).unwrap();
        coordinator.try_commit(&tx_id, false).unwrap();
        assert_eq!(counter(&coordinator, LOCAL_COUNTER), 0);

        let err = coordinator
            .receive_call_acknowledgement(&tx_id, &channel, Acknowledgement::ok())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::WrongPhase { .. }));
    }

    #[test]
    fn test_acknowledgement_on_wrong_channel_rejected() {
        let channel = endpoint("transfer", "channel-0");
        let other = endpoint("transfer", "channel-9");
        let mut coordinator = protocol();
        let mut sender = RecordingSender::new();
        let tx_id = tx("tx-1");

        dispatch(&mut coordinator, &mut sender, &tx_id, &channel);
        let err = coordinator
            .receive_call_acknowledgement(&tx_id, &other, Acknowledgement::ok())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::State(StateError::WrongChannel { .. })));
    }

    #[test]
    fn test_links_resolve_before_dispatch() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut counterparty = protocol();
        let mut sender = RecordingSender::new();
        let tx_id = tx("tx-1");
        let return_channel = endpoint("transfer", "channel-1");

        let legs = vec![
            local_leg("increment").with_return_value(5u64.to_le_bytes()),
            remote_leg(&channel, "increment-by-link").with_link(Link::to(BranchIndex::INITIATOR)),
        ];
        coordinator
            .send_call(
                &StaticResolver::with_links(return_channel.clone()),
                &StaticDirectory::of(&[channel.clone()]),
                &mut sender,
                &CounterExecutor,
                tx_id,
                legs,
                Timeout::NONE,
            )
            .unwrap();

        let Packet::Call(packet) = sender.sent.pop().unwrap().1 else {
            panic!("expected a call packet");
        };
        assert_eq!(packet.resolved.len(), 1);
        assert_eq!(packet.resolved[0].value, 5u64.to_le_bytes());
        assert_eq!(packet.resolved[0].origin, ChainRef::Channel(return_channel));

        let ack = counterparty
            .receive_call_packet(
                &StaticDirectory::of(&[channel.clone()]),
                &CounterExecutor,
                &channel,
                packet,
                10,
                1_000,
            )
            .unwrap();
        assert!(ack.is_ok());
        assert_eq!(counter(&counterparty, REMOTE_COUNTER), 5);
    }

    #[test]
    fn test_links_rejected_without_resolver_support() {
        let channel = endpoint("transfer", "channel-0");
        let mut coordinator = protocol();
        let mut sender = RecordingSender::new();

        let legs = vec![
            local_leg("increment").with_return_value(5u64.to_le_bytes()),
            remote_leg(&channel, "increment-by-link").with_link(Link::to(BranchIndex::INITIATOR)),
        ];
        let err = coordinator
            .send_call(
                &StaticResolver::new(),
                &StaticDirectory::of(&[channel.clone()]),
                &mut sender,
                &CounterExecutor,
                tx("tx-1"),
                legs,
                Timeout::NONE,
            )
            .unwrap_err();
        assert!(matches!(err, ProtocolError::LinksUnsupported));
    }
}
