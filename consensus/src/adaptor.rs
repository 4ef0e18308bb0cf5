//! The round adaptor: consensus meets the ledger world.
//!
//! [`RoundAdaptor`] implements the engine's [`Adaptor`] capability set
//! against the concrete collaborators: the ledger master, the open-ledger
//! mempool, the tx-set and validation stores, the overlay, and the time
//! keeper. [`LedgerConsensus`] wraps engine plus adaptor behind the single
//! round lock that serializes every public entry point.

use crate::censorship::CensorshipDetector;
use crate::engine::{Adaptor, CloseTimes, Consensus, ConsensusResult, ConsensusState, RawTx};
use crate::error::ConsensusError;
use crate::flag_voting::{AmendmentVote, FeeVote};
use crate::modes::ConsensusMode;
use crate::proposal::{PeerProposal, Proposal};
use crate::trusted_validators::TrustedValidators;
use crate::tx_set_store::TxSetStore;
use crate::validation::Validation;
use crate::validation_store::ValidationStore;
use crate::workers::{JobKind, JobQueue};
use crest_clock::TimeKeeper;
use crest_ledger::{
    CanonicalTxSet, Ledger, LedgerBuilder, LedgerMaster, LoadFeeTrack, LocalTxs, OpenLedger,
    Transaction, TxQueue, TxSet, TxSetBuilder,
};
use crest_network::{
    HashRouter, NodeEvent, Overlay, StatusChangeMsg, TransactionMsg, TxStatus, ValidationMsg,
    WireMessage,
};
use crest_types::params::FIX_ROUNDED_CLOSE;
use crest_types::time::{effective_close_time, round_close_time};
use crest_types::{
    CloseResolution, ConsensusParams, KeyPair, LedgerHash, LedgerIndex, NetTime, NodeId,
    PublicKey, TxId, TxSetId,
};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// The network-operations surface the adaptor signals into.
pub trait NetOps: Send + Sync {
    /// Our view of the previous ledger changed mid-round.
    fn consensus_view_change(&self);
    /// A round finished; the outer state machine may start the next one.
    fn end_consensus(&self);
    /// The network activated an amendment this node does not understand.
    fn is_amendment_blocked(&self) -> bool;
    /// Whether this node is fully synced.
    fn is_full(&self) -> bool;
}

/// Collects the adaptor's many collaborators before construction.
pub struct RoundAdaptorBuilder {
    pub keys: Option<KeyPair>,
    pub node_id: Option<NodeId>,
    pub standalone: bool,
    pub params: ConsensusParams,
    pub ledger_master: Arc<LedgerMaster>,
    pub open_ledger: Arc<OpenLedger>,
    pub local_txs: Arc<LocalTxs>,
    pub tx_queue: Arc<TxQueue>,
    pub builder: Arc<dyn LedgerBuilder>,
    pub tx_sets: Arc<TxSetStore>,
    pub validations: Arc<ValidationStore>,
    pub trusted: Arc<TrustedValidators>,
    pub overlay: Arc<dyn Overlay>,
    pub hash_router: Arc<HashRouter>,
    pub time_keeper: Arc<TimeKeeper>,
    pub net_ops: Arc<dyn NetOps>,
    pub fee_track: Arc<LoadFeeTrack>,
    pub fee_vote: Box<dyn FeeVote>,
    pub amendment_vote: Box<dyn AmendmentVote>,
    pub jobs: Arc<JobQueue>,
}

impl RoundAdaptorBuilder {
    pub fn build(self) -> Arc<RoundAdaptor> {
        let use_rounded = self.params.use_rounded_close_time;
        Arc::new_cyclic(|weak| RoundAdaptor {
            keys: self.keys,
            node_id: self.node_id,
            standalone: self.standalone,
            params: self.params,
            ledger_master: self.ledger_master,
            open_ledger: self.open_ledger,
            local_txs: self.local_txs,
            tx_queue: self.tx_queue,
            builder: self.builder,
            tx_sets: self.tx_sets,
            validations: self.validations,
            trusted: self.trusted,
            overlay: self.overlay,
            hash_router: self.hash_router,
            time_keeper: self.time_keeper,
            net_ops: self.net_ops,
            fee_track: self.fee_track,
            fee_vote: self.fee_vote,
            amendment_vote: self.amendment_vote,
            jobs: self.jobs,
            self_ref: Weak::clone(weak),
            validating: AtomicBool::new(false),
            use_rounded_close: AtomicBool::new(use_rounded),
            mode: Mutex::new(ConsensusMode::Observing),
            censorship: Mutex::new(CensorshipDetector::new()),
            acquiring_ledger: Mutex::new(None),
            last_validation_time: Mutex::new(NetTime::NULL),
            prev_proposers: AtomicUsize::new(0),
            prev_round_ms: AtomicU64::new(0),
            master_lock: Mutex::new(()),
        })
    }
}

/// The consensus adaptor for one node.
pub struct RoundAdaptor {
    keys: Option<KeyPair>,
    node_id: Option<NodeId>,
    standalone: bool,
    params: ConsensusParams,

    ledger_master: Arc<LedgerMaster>,
    open_ledger: Arc<OpenLedger>,
    local_txs: Arc<LocalTxs>,
    tx_queue: Arc<TxQueue>,
    builder: Arc<dyn LedgerBuilder>,
    tx_sets: Arc<TxSetStore>,
    validations: Arc<ValidationStore>,
    trusted: Arc<TrustedValidators>,
    overlay: Arc<dyn Overlay>,
    hash_router: Arc<HashRouter>,
    time_keeper: Arc<TimeKeeper>,
    net_ops: Arc<dyn NetOps>,
    fee_track: Arc<LoadFeeTrack>,
    fee_vote: Box<dyn FeeVote>,
    amendment_vote: Box<dyn AmendmentVote>,
    jobs: Arc<JobQueue>,
    self_ref: Weak<RoundAdaptor>,

    validating: AtomicBool,
    /// Whether proposals carry rounded close times this round (refreshed
    /// from the parent ledger's amendments).
    use_rounded_close: AtomicBool,
    mode: Mutex<ConsensusMode>,
    censorship: Mutex<CensorshipDetector<TxId, LedgerIndex>>,
    /// At most one ledger fetch is outstanding per distinct hash.
    acquiring_ledger: Mutex<Option<LedgerHash>>,
    last_validation_time: Mutex<NetTime>,
    prev_proposers: AtomicUsize,
    prev_round_ms: AtomicU64,
    /// Held across the open-ledger rebuild and LCL switch (the combined
    /// master + ledger-master critical section).
    master_lock: Mutex<()>,
}

impl RoundAdaptor {
    pub fn validating(&self) -> bool {
        self.validating.load(Ordering::SeqCst)
    }

    pub fn mode(&self) -> ConsensusMode {
        *self.mode.lock().expect("adaptor mode poisoned")
    }

    pub fn prev_proposers(&self) -> usize {
        self.prev_proposers.load(Ordering::SeqCst)
    }

    pub fn prev_round_ms(&self) -> u64 {
        self.prev_round_ms.load(Ordering::SeqCst)
    }

    /// Recompute `validating` and decide whether this round proposes.
    ///
    /// Validating requires a validator key, a parent at or past the
    /// anti-replay threshold, no amendment block, and (outside stand-alone
    /// mode) an unexpired trusted validator list. Returns validating ∧
    /// synced, which the engine uses to decide whether to emit proposals.
    pub fn pre_start_round(&self, prev_ledger: &Arc<Ledger>) -> bool {
        let mut validating = self.keys.is_some()
            && prev_ledger.seq() >= self.ledger_master.max_disallowed_seq()
            && !self.net_ops.is_amendment_blocked();

        if validating && !self.standalone && self.trusted.count() > 0 {
            if self.trusted.expired(self.time_keeper.now()) {
                tracing::error!(
                    "voluntarily bowing out of consensus: expired validator list"
                );
                validating = false;
            }
        }

        let synced = self.net_ops.is_full();
        if validating {
            tracing::info!(synced, "entering consensus process, validating");
        } else {
            tracing::info!(synced, "entering consensus process, watching");
        }
        self.validating.store(validating, Ordering::SeqCst);

        self.tx_sets.new_round(prev_ledger.seq());
        self.use_rounded_close.store(
            prev_ledger.rules().enabled(&FIX_ROUNDED_CLOSE),
            Ordering::SeqCst,
        );
        validating && synced
    }

    fn now_secs(&self) -> u64 {
        self.time_keeper.now().as_secs()
    }

    /// Broadcast a status change, substituting lost-sync when our LCL is
    /// wrong.
    fn notify(&self, event: NodeEvent, ledger: &Ledger, have_correct_lcl: bool) {
        let (first_seq, last_seq) = self.ledger_master.full_validated_range().unwrap_or((0, 0));
        let msg = StatusChangeMsg {
            new_event: if have_correct_lcl {
                event
            } else {
                NodeEvent::LostSync
            },
            ledger_seq: ledger.seq(),
            network_time: self.time_keeper.now().as_secs() as u32,
            ledger_hash_previous: *ledger.parent_id().as_bytes(),
            ledger_hash: *ledger.id().as_bytes(),
            first_seq,
            last_seq,
        };
        self.overlay.broadcast(&WireMessage::StatusChange(msg));
        tracing::trace!(event = ?event, "sent status change to peers");
    }

    /// Build (or replay) the next ledger, feed the fee queue, and store it.
    fn build_lcl(
        &self,
        prev_ledger: &Arc<Ledger>,
        retriable: &CanonicalTxSet,
        close_time: NetTime,
        close_time_correct: bool,
        resolution: CloseResolution,
        round_time_ms: u64,
        failed: &mut BTreeSet<TxId>,
    ) -> Result<Arc<Ledger>, ConsensusError> {
        let replayed = match self.ledger_master.release_replay() {
            Some(replay) if replay.parent_hash == prev_ledger.id() => {
                Some(self.builder.build_replay(prev_ledger, &replay, failed)?)
            }
            Some(replay) => {
                tracing::warn!(parent = %replay.parent_hash, "discarding replay for wrong parent");
                None
            }
            None => None,
        };
        let built = match replayed {
            Some(ledger) => ledger,
            None => self.builder.build(
                prev_ledger,
                retriable,
                close_time,
                close_time_correct,
                resolution,
                failed,
            )?,
        };

        self.tx_queue
            .process_closed_ledger(built.seq(), round_time_ms > self.params.slow_round_ms);

        if self.ledger_master.store_ledger(Arc::clone(&built)) {
            tracing::debug!(seq = built.seq(), "consensus built ledger we already had");
        } else {
            tracing::debug!(seq = built.seq(), hash = %built.id(), "consensus built new ledger");
        }
        Ok(built)
    }

    /// Sign and broadcast a validation for the built ledger.
    fn validate(&self, built: &Arc<Ledger>, consensus_hash: TxSetId, proposing: bool) {
        let (Some(keys), Some(node_id)) = (self.keys.as_ref(), self.node_id) else {
            return;
        };

        // Signing times are strictly increasing per validator.
        let signing_time = {
            let mut last = self
                .last_validation_time
                .lock()
                .expect("validation time poisoned");
            let now = self.time_keeper.close_time();
            let time = if now <= *last { *last + 1 } else { now };
            *last = time;
            time
        };

        let load_fee = self.fee_track.load_fee();
        let amendments = if self.params.is_flag_ledger(built.seq() + 1) {
            self.amendment_vote.do_validation(built)
        } else {
            Vec::new()
        };

        let validation = Validation::sign(
            built.id(),
            built.seq(),
            consensus_hash,
            signing_time,
            proposing,
            load_fee,
            amendments,
            node_id,
            keys,
        );
        self.hash_router
            .add_suppression(validation.suppression_id(), self.now_secs());
        self.validations.add_local(validation.clone());
        self.overlay.broadcast(&WireMessage::Validation(ValidationMsg {
            validation: validation.to_bytes(),
        }));
    }

    /// Apply an accepted round: decide the close time, build the ledger,
    /// reconcile censorship tracking, validate, rebuild the open ledger,
    /// switch the LCL, and feed the time keeper.
    pub fn do_accept(
        &self,
        result: ConsensusResult,
        prev_ledger: Arc<Ledger>,
        close_resolution: CloseResolution,
        raw_close_times: CloseTimes,
        mode: ConsensusMode,
        report: serde_json::Value,
    ) {
        self.prev_proposers.store(result.proposers, Ordering::SeqCst);
        self.prev_round_ms
            .store(result.round_time_ms, Ordering::SeqCst);

        let proposing = mode == ConsensusMode::Proposing;
        let have_correct_lcl = mode.correct_lcl();
        let consensus_fail = result.state == ConsensusState::MovedOn;

        // Close-time decision.
        let agreed = result.position.close_time;
        let (close_time, close_time_correct) = if agreed.is_null() {
            (prev_ledger.close_time() + 1, false)
        } else {
            (
                effective_close_time(agreed, close_resolution, prev_ledger.close_time()),
                true,
            )
        };

        tracing::debug!(
            proposing,
            validating = self.validating(),
            correct_lcl = have_correct_lcl,
            fail = consensus_fail,
            prev = %prev_ledger.id(),
            prev_seq = prev_ledger.seq(),
            "accepting consensus round"
        );

        // Canonicalize the agreed set; unparseable leaves fail permanently.
        let mut failed: BTreeSet<TxId> = BTreeSet::new();
        let salt = result.txns.id();
        let mut canonical = CanonicalTxSet::new(salt);
        for (id, bytes) in result.txns.iter() {
            match Transaction::from_bytes(bytes) {
                Ok(tx) => canonical.insert(tx),
                Err(_) => {
                    tracing::warn!(tx = %id, "agreed set contains unparseable transaction");
                    failed.insert(*id);
                }
            }
        }

        let built = match self.build_lcl(
            &prev_ledger,
            &canonical,
            close_time,
            close_time_correct,
            close_resolution,
            result.round_time_ms,
            &mut failed,
        ) {
            Ok(built) => built,
            Err(e) => {
                tracing::error!(error = %e, "failed to build ledger from agreed set");
                return;
            }
        };
        tracing::debug!(seq = built.seq(), hash = %built.id(), report = %report, "built ledger");

        self.notify(NodeEvent::AcceptedLedger, &built, have_correct_lcl);

        // Censorship reconciliation.
        if have_correct_lcl && result.state == ConsensusState::Yes {
            let accepted = result.txns.ids();
            let curr = built.seq();
            let warn_interval = self.params.censorship_warn_interval;
            let mut detector = self.censorship.lock().expect("censorship poisoned");
            detector.check(accepted, |id, since| {
                if failed.contains(id) {
                    return true;
                }
                let wait = curr.saturating_sub(since);
                if wait > 0 && wait % warn_interval == 0 {
                    tracing::warn!(
                        tx = %id,
                        since,
                        curr,
                        "potential censorship: eligible transaction still not included"
                    );
                }
                false
            });
        }

        // An incompatible build latches validating off for this round.
        if self.validating() && !self.ledger_master.is_compatible(&built) {
            tracing::warn!(seq = built.seq(), "built ledger incompatible with validated line, not validating");
            self.validating.store(false, Ordering::SeqCst);
        }
        if self.validating()
            && !consensus_fail
            && self.validations.can_validate_seq(built.seq())
        {
            self.validate(&built, result.txns.id(), proposing);
            tracing::info!(hash = %built.id(), "validated built ledger");
        } else {
            tracing::info!(hash = %built.id(), "built ledger without validation");
        }

        // Retriable pool: the builder's residue plus disputes we voted NO
        // on (pseudo-transactions never retry).
        let mut retriable = CanonicalTxSet::new(salt);
        for tx in canonical.iter() {
            if failed.contains(&tx.id()) {
                retriable.insert(tx.clone());
            }
        }
        for dispute in result.disputes.values() {
            if dispute.our_vote {
                continue;
            }
            match Transaction::from_bytes(&dispute.tx.bytes) {
                Ok(tx) if tx.is_pseudo() => {}
                Ok(tx) => {
                    tracing::debug!(tx = %tx.id(), "requeueing disputed transaction we voted against");
                    retriable.insert(tx);
                }
                Err(_) => {
                    tracing::debug!(tx = %dispute.tx.id, "dropping unparseable disputed transaction");
                }
            }
        }

        // Local transactions that made it in (or permanently failed) stop
        // retrying.
        let mut done: Vec<TxId> = result.txns.ids();
        done.extend(failed.iter().copied());
        self.local_txs.prune(&done);

        {
            // Combined master + ledger-master critical section: rebuild the
            // open ledger on the new LCL and switch the closed pointer.
            let _guard = self.master_lock.lock().expect("master lock poisoned");
            let rules = self
                .ledger_master
                .validated_ledger()
                .map(|l| l.rules().clone())
                .unwrap_or_else(|| built.rules().clone());
            self.open_ledger.accept(
                &rules,
                Arc::clone(&built),
                self.local_txs.tx_set(),
                &retriable,
                &self.tx_queue,
            );
            self.ledger_master.switch_lcl(Arc::clone(&built));
            debug_assert_eq!(self.ledger_master.closed_ledger().id(), built.id());
            debug_assert_eq!(self.open_ledger.parent_id(), built.id());
        }

        // Close-time offset estimation from the round's vote spread.
        if mode.participating() && !consensus_fail {
            let self_close = raw_close_times.self_close;
            let mut close_total = self_close.as_secs();
            let mut close_count: u64 = 1;
            for (time, votes) in &raw_close_times.peers {
                let votes = *votes as u64;
                tracing::debug!(time = %time, votes, "peer close-time vote");
                close_count += votes;
                close_total += time.as_secs() * votes;
            }
            // Rounding bias: add half the divisor before dividing.
            close_total += close_count / 2;
            close_total /= close_count;
            let offset = close_total as i64 - self_close.as_secs() as i64;
            tracing::info!(offset, voters = close_count, "close time offset estimated");
            self.time_keeper.adjust_close_time(offset);
        }
    }
}

impl Adaptor for RoundAdaptor {
    fn acquire_ledger(&self, hash: &LedgerHash) -> Option<Arc<Ledger>> {
        if let Some(ledger) = self.ledger_master.get_ledger_by_hash(hash) {
            self.tx_sets.new_round(ledger.seq());
            self.use_rounded_close.store(
                ledger.rules().enabled(&FIX_ROUNDED_CLOSE),
                Ordering::SeqCst,
            );
            return Some(ledger);
        }

        let mut acquiring = self.acquiring_ledger.lock().expect("acquire latch poisoned");
        if *acquiring != Some(*hash) {
            tracing::warn!(ledger = %hash, "need consensus ledger");
            *acquiring = Some(*hash);
            let wanted = *hash;
            self.jobs.add_job(JobKind::Advance, "getConsensusLedger", move || {
                // The inbound-ledger machinery owns the actual fetch; this
                // job hands the hash over outside the round lock.
                tracing::debug!(ledger = %wanted, "inbound ledger acquisition started");
            });
        }
        None
    }

    fn acquire_tx_set(&self, id: &TxSetId) -> Option<TxSet> {
        self.tx_sets.get_set(id, true)
    }

    fn share_proposal(&self, proposal: &PeerProposal) {
        self.overlay.relay(
            &WireMessage::ProposeSet(proposal.to_wire()),
            proposal.suppression_id(),
        );
    }

    fn share_tx_set(&self, set: &TxSet) {
        self.tx_sets.give_set(set.clone(), true);
    }

    fn share_tx(&self, tx: &RawTx) {
        if self.hash_router.should_relay(*tx.id.as_bytes(), self.now_secs()) {
            tracing::debug!(tx = %tx.id, "relaying disputed transaction");
            self.overlay.broadcast(&WireMessage::Transaction(TransactionMsg {
                raw_transaction: tx.bytes.clone(),
                status: TxStatus::New,
                receive_timestamp: self.time_keeper.now().as_secs(),
            }));
        } else {
            tracing::debug!(tx = %tx.id, "not relaying disputed transaction");
        }
    }

    fn propose(&self, proposal: Proposal) {
        let Some(keys) = self.keys.as_ref() else {
            return;
        };
        tracing::trace!(
            position = %proposal.position,
            bow_out = proposal.is_bow_out(),
            "we propose"
        );
        let signed = proposal.sign(keys);
        self.hash_router
            .add_suppression(signed.suppression_id(), self.now_secs());
        self.overlay
            .broadcast(&WireMessage::ProposeSet(signed.to_wire()));
    }

    fn proposers_validated(&self, hash: &LedgerHash) -> usize {
        self.validations.num_trusted_for(hash)
    }

    fn proposers_finished(&self, parent: &Arc<Ledger>, hash: &LedgerHash) -> usize {
        self.validations.nodes_after(parent, *hash)
    }

    fn get_prev_ledger(
        &self,
        local_id: LedgerHash,
        local: &Arc<Ledger>,
        mode: ConsensusMode,
    ) -> LedgerHash {
        let net_lgr = self
            .validations
            .preferred(local, self.ledger_master.valid_ledger_index());
        if net_lgr != local_id && mode != ConsensusMode::WrongLedger {
            self.net_ops.consensus_view_change();
        }
        net_lgr
    }

    fn on_close(
        &self,
        ledger: &Arc<Ledger>,
        close_time: NetTime,
        mode: ConsensusMode,
    ) -> ConsensusResult {
        let wrong_lcl = mode == ConsensusMode::WrongLedger;
        let proposing = mode == ConsensusMode::Proposing;
        self.notify(NodeEvent::ClosingLedger, ledger, !wrong_lcl);

        // Flush held transactions and mark the building sequence.
        for tx in self.ledger_master.take_held_transactions() {
            self.open_ledger.insert(tx);
        }
        let building_seq = ledger.seq() + 1;
        self.ledger_master.set_building_ledger(building_seq);

        // Snapshot the open ledger into an unbacked set.
        let mut initial_set = TxSetBuilder::new();
        for tx in self.open_ledger.snapshot() {
            tracing::trace!(tx = %tx.id(), "adding open ledger transaction");
            initial_set.insert(&tx);
        }

        // Flag-ledger voting, gated on quorum of trusted validations for
        // the parent's parent.
        if self.params.is_flag_ledger(ledger.seq())
            && (self.standalone || (proposing && !wrong_lcl))
        {
            let validations = self.validations.trusted_for(&ledger.parent_id());
            if validations.len() >= self.trusted.quorum() {
                self.fee_vote.do_voting(ledger, &validations, &mut initial_set);
                self.amendment_vote
                    .do_voting(ledger, &validations, &mut initial_set);
            }
        }

        let set = initial_set.snapshot();

        if !wrong_lcl {
            let proposed: Vec<(TxId, LedgerIndex)> = set
                .ids()
                .into_iter()
                .map(|id| (id, building_seq))
                .collect();
            self.censorship
                .lock()
                .expect("censorship poisoned")
                .propose(proposed);
        }

        let set_id = set.id();

        // Under the rounded-close rule our position carries a close time
        // snapped to this round's resolution grid.
        let position_close = if self.use_rounded_close.load(Ordering::SeqCst) {
            let resolution = ledger
                .close_time_resolution()
                .next(ledger.close_time_correct(), building_seq);
            round_close_time(close_time, resolution)
        } else {
            close_time
        };

        ConsensusResult {
            txns: set,
            position: Proposal::new(
                ledger.id(),
                Proposal::SEQ_JOIN,
                set_id,
                position_close,
                self.node_id.unwrap_or(NodeId([0u8; 32])),
            ),
            disputes: Default::default(),
            state: ConsensusState::No,
            proposers: 0,
            round_time_ms: 0,
        }
    }

    fn on_accept(
        &self,
        result: ConsensusResult,
        prev_ledger: Arc<Ledger>,
        close_resolution: CloseResolution,
        raw_close_times: CloseTimes,
        mode: ConsensusMode,
        report: serde_json::Value,
    ) {
        let Some(me) = self.self_ref.upgrade() else {
            return;
        };
        self.jobs.add_job(JobKind::Accept, "acceptLedger", move || {
            me.do_accept(
                result,
                prev_ledger,
                close_resolution,
                raw_close_times,
                mode,
                report,
            );
            me.net_ops.end_consensus();
        });
    }

    fn on_force_accept(
        &self,
        result: ConsensusResult,
        prev_ledger: Arc<Ledger>,
        close_resolution: CloseResolution,
        raw_close_times: CloseTimes,
        mode: ConsensusMode,
        report: serde_json::Value,
    ) {
        self.do_accept(
            result,
            prev_ledger,
            close_resolution,
            raw_close_times,
            mode,
            report,
        );
    }

    fn on_mode_change(&self, before: ConsensusMode, after: ConsensusMode) {
        tracing::info!(%before, %after, "consensus mode change");
        if before.participating() && before != after {
            self.censorship
                .lock()
                .expect("censorship poisoned")
                .reset();
        }
        *self.mode.lock().expect("adaptor mode poisoned") = after;
    }

    fn has_open_transactions(&self) -> bool {
        !self.open_ledger.is_empty()
    }

    fn have_validated(&self) -> bool {
        self.ledger_master.have_validated()
    }

    fn get_valid_ledger_index(&self) -> LedgerIndex {
        self.ledger_master.valid_ledger_index()
    }

    fn get_quorum_keys(&self) -> (usize, HashSet<PublicKey>) {
        self.trusted.quorum_keys()
    }

    fn laggards(&self, seq: LedgerIndex, trusted_keys: &mut HashSet<PublicKey>) -> usize {
        self.validations.laggards(seq, trusted_keys)
    }

    fn validator(&self) -> bool {
        self.keys.is_some()
    }
}

/// The locked public surface of consensus.
///
/// One mutex (the round lock) serializes every entry point; the engine is
/// only ever re-entered from under it. Background workers never take it.
pub struct LedgerConsensus {
    adaptor: Arc<RoundAdaptor>,
    consensus: Mutex<Consensus<RoundAdaptor>>,
}

impl LedgerConsensus {
    pub fn new(adaptor: Arc<RoundAdaptor>, genesis: Arc<Ledger>) -> Self {
        let params = adaptor.params.clone();
        Self {
            consensus: Mutex::new(Consensus::new(Arc::clone(&adaptor), params, genesis)),
            adaptor,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Consensus<RoundAdaptor>> {
        self.consensus.lock().expect("round lock poisoned")
    }

    /// Open a round on `prev_ledger`. `now_untrusted` names validators that
    /// just lost trusted status; their stale positions are discarded with
    /// the rest of the previous round's state.
    pub fn start_round(
        &self,
        now: NetTime,
        prev_ledger_id: LedgerHash,
        prev_ledger: Arc<Ledger>,
        now_untrusted: &HashSet<NodeId>,
    ) {
        let mut consensus = self.lock();
        if !now_untrusted.is_empty() {
            tracing::info!(count = now_untrusted.len(), "validators dropped from trusted list");
        }
        let proposing = self.adaptor.pre_start_round(&prev_ledger);
        consensus.start_round(now, prev_ledger_id, prev_ledger, proposing);
    }

    /// Drive timers. A missing tx-set node is fatal: the error propagates
    /// to the caller, which is expected to restart the process.
    pub fn timer_entry(&self, now: NetTime) -> Result<(), ConsensusError> {
        let result = self.lock().timer_entry(now);
        if let Err(e) = &result {
            tracing::error!(error = %e, "missing node during consensus process");
        }
        result
    }

    /// Deliver an acquired transaction set (same fatal-error policy as
    /// [`Self::timer_entry`]).
    pub fn got_tx_set(&self, now: NetTime, set: TxSet) -> Result<(), ConsensusError> {
        let result = self.lock().got_tx_set(now, set);
        if let Err(e) = &result {
            tracing::error!(error = %e, "missing node during consensus process");
        }
        result
    }

    /// Validate, deduplicate, and deliver a peer proposal. Returns whether
    /// the engine accepted it.
    pub fn peer_proposal(&self, now: NetTime, peer_pos: PeerProposal) -> bool {
        if !peer_pos.verify() {
            tracing::debug!(node = %peer_pos.proposal.node_id, "dropping proposal with bad signature");
            return false;
        }
        if !self
            .adaptor
            .hash_router
            .add_suppression(peer_pos.suppression_id(), self.adaptor.now_secs())
        {
            return false;
        }
        self.lock().peer_proposal(now, peer_pos)
    }

    /// Drive a synthetic round (stand-alone mode and tests).
    pub fn simulate(&self, now: NetTime, delay_ms: Option<u64>) {
        self.lock().simulate(now, delay_ms);
    }

    /// The engine's JSON report plus the adaptor's validating flag.
    pub fn get_json(&self, full: bool) -> serde_json::Value {
        let mut value = self.lock().get_json(full);
        value["validating"] = serde_json::json!(self.adaptor.validating());
        value
    }

    pub fn adaptor(&self) -> &Arc<RoundAdaptor> {
        &self.adaptor
    }

    pub fn mode(&self) -> ConsensusMode {
        self.lock().mode()
    }
}
