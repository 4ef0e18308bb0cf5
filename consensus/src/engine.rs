//! The generic round engine.
//!
//! [`Consensus`] drives one round at a time through its phases (open →
//! establish → accepted) and knows nothing about ledgers beyond what the
//! [`Adaptor`] capability trait exposes. The full dispute-voting algorithm
//! is intentionally modest here: positions are compared whole, disputes are
//! recorded per differing transaction, and agreement is declared when
//! enough proposers share our position. All ledger-world effects happen in
//! the adaptor's callbacks.

use crate::error::ConsensusError;
use crate::modes::ConsensusMode;
use crate::proposal::{PeerProposal, Proposal};
use crest_ledger::{Ledger, LedgerError, TxSet};
use crest_types::time::round_close_time;
use crest_types::{
    CloseResolution, ConsensusParams, LedgerHash, LedgerIndex, NetTime, NodeId, PublicKey, TxId,
    TxSetId,
};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// A raw transaction as exchanged during dispute resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTx {
    pub id: TxId,
    pub bytes: Vec<u8>,
}

/// Per-transaction dispute record: the transaction appears in some but not
/// all known positions, and this is our current vote on it.
#[derive(Clone, Debug)]
pub struct DisputedTx {
    pub tx: RawTx,
    /// `true` when our position includes the transaction.
    pub our_vote: bool,
}

/// How the round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsensusState {
    /// Not enough agreement yet.
    No,
    /// The network moved on without us; we adopt the result without
    /// validating it.
    MovedOn,
    /// Genuine agreement.
    Yes,
}

/// The outcome of a round, handed to the accept path.
#[derive(Clone, Debug)]
pub struct ConsensusResult {
    /// The transaction set behind our final position.
    pub txns: TxSet,
    /// Our final position.
    pub position: Proposal,
    /// Transactions disputed during the round.
    pub disputes: HashMap<TxId, DisputedTx>,
    pub state: ConsensusState,
    /// Number of proposers in the round (peers plus ourselves if proposing).
    pub proposers: usize,
    /// Establish-phase duration in milliseconds.
    pub round_time_ms: u64,
}

/// The raw close-time votes observed in a round.
#[derive(Clone, Debug, Default)]
pub struct CloseTimes {
    /// When we closed.
    pub self_close: NetTime,
    /// Peer close-time votes: time → vote count.
    pub peers: BTreeMap<NetTime, usize>,
}

/// The capability set the round adaptor provides to the engine.
pub trait Adaptor: Send + Sync {
    /// Fetch a ledger, or start acquiring it and return `None` (pending).
    fn acquire_ledger(&self, hash: &LedgerHash) -> Option<Arc<Ledger>>;
    /// Fetch a transaction set, or start acquiring it and return `None`.
    fn acquire_tx_set(&self, id: &TxSetId) -> Option<TxSet>;

    /// Relay a peer's position.
    fn share_proposal(&self, proposal: &PeerProposal);
    /// Share a transaction set with peers.
    fn share_tx_set(&self, set: &TxSet);
    /// Relay a single (disputed) transaction.
    fn share_tx(&self, tx: &RawTx);
    /// Sign and broadcast our own position.
    fn propose(&self, proposal: Proposal);

    /// How many trusted validators have validated ledger `hash`.
    fn proposers_validated(&self, hash: &LedgerHash) -> usize;
    /// How many trusted validators have moved past `hash` on the branch
    /// containing `parent`.
    fn proposers_finished(&self, parent: &Arc<Ledger>, hash: &LedgerHash) -> usize;
    /// The network-preferred previous ledger.
    fn get_prev_ledger(
        &self,
        local_id: LedgerHash,
        local: &Arc<Ledger>,
        mode: ConsensusMode,
    ) -> LedgerHash;

    /// Close the open ledger into an initial position.
    fn on_close(
        &self,
        ledger: &Arc<Ledger>,
        close_time: NetTime,
        mode: ConsensusMode,
    ) -> ConsensusResult;
    /// Consensus reached: apply the result asynchronously.
    #[allow(clippy::too_many_arguments)]
    fn on_accept(
        &self,
        result: ConsensusResult,
        prev_ledger: Arc<Ledger>,
        close_resolution: CloseResolution,
        raw_close_times: CloseTimes,
        mode: ConsensusMode,
        report: serde_json::Value,
    );
    /// Forced progress: apply the result synchronously.
    #[allow(clippy::too_many_arguments)]
    fn on_force_accept(
        &self,
        result: ConsensusResult,
        prev_ledger: Arc<Ledger>,
        close_resolution: CloseResolution,
        raw_close_times: CloseTimes,
        mode: ConsensusMode,
        report: serde_json::Value,
    );
    fn on_mode_change(&self, before: ConsensusMode, after: ConsensusMode);

    fn has_open_transactions(&self) -> bool;
    fn have_validated(&self) -> bool;
    fn get_valid_ledger_index(&self) -> LedgerIndex;
    fn get_quorum_keys(&self) -> (usize, HashSet<PublicKey>);
    fn laggards(&self, seq: LedgerIndex, trusted_keys: &mut HashSet<PublicKey>) -> usize;
    /// Whether this node carries a validator key.
    fn validator(&self) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Open,
    Establish,
    Accepted,
}

/// The round engine, generic over the adaptor capability set.
pub struct Consensus<A: Adaptor> {
    adaptor: Arc<A>,
    params: ConsensusParams,

    phase: Phase,
    mode: ConsensusMode,
    /// Whether this round was entered proposing.
    proposing: bool,

    prev_ledger: Arc<Ledger>,
    /// What we believe the round builds on (may diverge from
    /// `prev_ledger.id()` while wrong-ledger).
    prev_ledger_id: LedgerHash,
    close_resolution: CloseResolution,

    now: NetTime,
    open_since: NetTime,
    establish_since: Option<NetTime>,

    result: Option<ConsensusResult>,
    peer_positions: HashMap<NodeId, PeerProposal>,
    /// Nodes that bowed out of this round.
    dead_nodes: HashSet<NodeId>,
    acquired: HashMap<TxSetId, TxSet>,

    prev_proposers: usize,
    prev_round_ms: u64,
}

impl<A: Adaptor> Consensus<A> {
    pub fn new(adaptor: Arc<A>, params: ConsensusParams, genesis: Arc<Ledger>) -> Self {
        let genesis_id = genesis.id();
        Self {
            adaptor,
            params,
            phase: Phase::Accepted,
            mode: ConsensusMode::Observing,
            proposing: false,
            prev_ledger_id: genesis_id,
            close_resolution: genesis.close_time_resolution(),
            prev_ledger: genesis,
            now: NetTime::NULL,
            open_since: NetTime::NULL,
            establish_since: None,
            result: None,
            peer_positions: HashMap::new(),
            dead_nodes: HashSet::new(),
            acquired: HashMap::new(),
            prev_proposers: 0,
            prev_round_ms: 0,
        }
    }

    /// Begin a round on `prev_ledger`. `proposing` is the mode controller's
    /// verdict (validating ∧ synced).
    pub fn start_round(
        &mut self,
        now: NetTime,
        prev_ledger_id: LedgerHash,
        prev_ledger: Arc<Ledger>,
        proposing: bool,
    ) {
        self.now = now;
        self.proposing = proposing;
        self.phase = Phase::Open;
        self.open_since = now;
        self.establish_since = None;
        self.result = None;
        self.peer_positions.clear();
        self.dead_nodes.clear();
        self.acquired.clear();
        self.close_resolution = prev_ledger
            .close_time_resolution()
            .next(prev_ledger.close_time_correct(), prev_ledger.seq() + 1);
        self.prev_ledger_id = prev_ledger_id;

        let starting_mode = if prev_ledger.id() != prev_ledger_id {
            // We do not hold the ledger the network is building on.
            self.adaptor.acquire_ledger(&prev_ledger_id);
            ConsensusMode::WrongLedger
        } else if proposing {
            ConsensusMode::Proposing
        } else {
            ConsensusMode::Observing
        };
        self.prev_ledger = prev_ledger;
        self.set_mode(starting_mode);
        tracing::info!(
            prev = %self.prev_ledger_id,
            seq = self.prev_ledger.seq(),
            mode = %self.mode,
            "round started"
        );
    }

    /// Drive timers: check the previous ledger, close the open phase, or
    /// declare consensus.
    pub fn timer_entry(&mut self, now: NetTime) -> Result<(), ConsensusError> {
        self.now = now;
        if self.phase == Phase::Accepted {
            return Ok(());
        }
        self.check_ledger();
        match self.phase {
            Phase::Open => {
                if self.should_close() {
                    self.close_ledger();
                }
                Ok(())
            }
            Phase::Establish => self.update_establish(),
            Phase::Accepted => Ok(()),
        }
    }

    /// A previously missing transaction set arrived.
    pub fn got_tx_set(&mut self, now: NetTime, set: TxSet) -> Result<(), ConsensusError> {
        self.now = now;
        set.verify().map_err(map_missing_node)?;
        let id = set.id();
        if self.acquired.contains_key(&id) {
            return Ok(());
        }
        self.create_disputes(&set);
        self.acquired.insert(id, set);
        Ok(())
    }

    /// A signed peer position arrived (already signature-checked).
    /// Returns whether the engine accepted it.
    pub fn peer_proposal(&mut self, now: NetTime, peer_pos: PeerProposal) -> bool {
        self.now = now;
        let node = peer_pos.proposal.node_id;

        if peer_pos.proposal.prev_ledger != self.prev_ledger_id {
            tracing::debug!(%node, "proposal for a different previous ledger");
            return false;
        }
        if self.dead_nodes.contains(&node) {
            return false;
        }
        if let Some(existing) = self.peer_positions.get(&node) {
            // Sequences are strictly increasing per node and round;
            // out-of-order delivery is dropped.
            if peer_pos.proposal.propose_seq <= existing.proposal.propose_seq {
                return false;
            }
        }

        if peer_pos.proposal.is_bow_out() {
            tracing::info!(%node, "peer bowed out of the round");
            self.peer_positions.remove(&node);
            self.dead_nodes.insert(node);
            return true;
        }

        let position = peer_pos.proposal.position;
        self.peer_positions.insert(node, peer_pos);
        if !self.acquired.contains_key(&position) {
            if let Some(set) = self.adaptor.acquire_tx_set(&position) {
                self.create_disputes(&set);
                self.acquired.insert(position, set);
            }
        }
        true
    }

    /// Drive a synthetic round to completion (stand-alone mode and tests).
    pub fn simulate(&mut self, now: NetTime, delay_ms: Option<u64>) {
        self.now = now;
        tracing::info!("simulating consensus round");
        if self.phase == Phase::Open {
            self.close_ledger();
        }
        let Some(mut result) = self.result.clone() else {
            return;
        };
        result.state = ConsensusState::Yes;
        result.proposers = self.prev_proposers.max(1);
        result.round_time_ms = delay_ms.unwrap_or(100);
        self.prev_proposers = result.proposers;
        self.prev_round_ms = result.round_time_ms;
        self.phase = Phase::Accepted;
        let report = self.get_json(true);
        self.result = Some(result.clone());
        self.adaptor.on_force_accept(
            result,
            Arc::clone(&self.prev_ledger),
            self.close_resolution,
            self.raw_close_times(),
            self.mode,
            report,
        );
        tracing::info!("simulation complete");
    }

    /// The engine's view of the round as a JSON report.
    pub fn get_json(&self, full: bool) -> serde_json::Value {
        let phase = match self.phase {
            Phase::Open => "open",
            Phase::Establish => "establish",
            Phase::Accepted => "accepted",
        };
        let mut value = json!({
            "phase": phase,
            "mode": self.mode.to_string(),
            "proposing": self.proposing,
            "proposers": self.peer_positions.len(),
            "previous_ledger": self.prev_ledger_id.to_string(),
            "previous_proposers": self.prev_proposers,
            "previous_round_ms": self.prev_round_ms,
        });
        if full {
            value["synched_close_resolution"] =
                json!(self.close_resolution.as_secs());
            value["validator"] = json!(self.adaptor.validator());
            value["have_validated"] = json!(self.adaptor.have_validated());
            value["validated_seq"] = json!(self.adaptor.get_valid_ledger_index());
            value["open_transactions"] = json!(self.adaptor.has_open_transactions());
            let (quorum, mut trusted_keys) = self.adaptor.get_quorum_keys();
            value["quorum"] = json!(quorum);
            value["laggards"] =
                json!(self.adaptor.laggards(self.prev_ledger.seq(), &mut trusted_keys));
            if let Some(result) = &self.result {
                value["position"] = json!(result.position.position.to_string());
                value["disputes"] = json!(result.disputes.len());
            }
        }
        value
    }

    pub fn mode(&self) -> ConsensusMode {
        self.mode
    }

    pub fn prev_ledger(&self) -> &Arc<Ledger> {
        &self.prev_ledger
    }

    pub fn prev_proposers(&self) -> usize {
        self.prev_proposers
    }

    pub fn prev_round_ms(&self) -> u64 {
        self.prev_round_ms
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn set_mode(&mut self, after: ConsensusMode) {
        let before = self.mode;
        if before != after {
            self.mode = after;
            self.adaptor.on_mode_change(before, after);
        }
    }

    /// Make sure we are working on the ledger the network prefers.
    fn check_ledger(&mut self) {
        let net_lgr =
            self.adaptor
                .get_prev_ledger(self.prev_ledger_id, &self.prev_ledger, self.mode);
        if net_lgr == self.prev_ledger_id {
            return;
        }
        tracing::warn!(ours = %self.prev_ledger_id, net = %net_lgr, "wrong previous ledger");
        self.prev_ledger_id = net_lgr;
        self.set_mode(ConsensusMode::WrongLedger);
        if let Some(ledger) = self.adaptor.acquire_ledger(&net_lgr) {
            // Got the network's ledger: restart the open phase on it.
            self.prev_ledger = ledger;
            self.phase = Phase::Open;
            self.open_since = self.now;
            self.result = None;
            self.peer_positions.retain(|_, p| p.proposal.prev_ledger == net_lgr);
            self.set_mode(ConsensusMode::SwitchedLedger);
        }
    }

    fn should_close(&self) -> bool {
        let elapsed = self.now.saturating_sub(self.open_since);
        let min_close_secs = self.params.ledger_min_close_ms.div_ceil(1_000);
        if elapsed >= min_close_secs {
            return true;
        }
        // Trusted validators already signed off on our parent: the network
        // finished the previous round, so stop holding the ledger open.
        elapsed >= 1 && self.adaptor.proposers_validated(&self.prev_ledger_id) > 0
    }

    fn close_ledger(&mut self) {
        self.phase = Phase::Establish;
        self.establish_since = Some(self.now);
        let result = self.adaptor.on_close(&self.prev_ledger, self.now, self.mode);
        self.acquired.insert(result.txns.id(), result.txns.clone());
        if self.mode == ConsensusMode::Proposing {
            self.adaptor.propose(result.position.clone());
        }
        self.adaptor.share_tx_set(&result.txns);
        self.result = Some(result);
        // Disputes against positions that arrived before we closed.
        let sets: Vec<TxSet> = self
            .peer_positions
            .values()
            .filter_map(|p| self.acquired.get(&p.proposal.position).cloned())
            .collect();
        for set in sets {
            self.create_disputes(&set);
        }
    }

    /// Record disputes between our position and another set, relaying any
    /// transaction the other side lacks.
    fn create_disputes(&mut self, other: &TxSet) {
        let Some(result) = self.result.as_mut() else {
            return;
        };
        if other.id() == result.txns.id() {
            return;
        }
        let ours = &result.txns;
        let mut disputed: Vec<(TxId, bool, Vec<u8>)> = Vec::new();
        for (id, bytes) in ours.iter() {
            if !other.contains(id) {
                disputed.push((*id, true, bytes.to_vec()));
            }
        }
        for (id, bytes) in other.iter() {
            if !ours.contains(id) {
                disputed.push((*id, false, bytes.to_vec()));
            }
        }
        for (id, our_vote, bytes) in disputed {
            let tx = RawTx { id, bytes };
            if !result.disputes.contains_key(&id) {
                tracing::debug!(tx = %id, our_vote, "transaction disputed");
                self.adaptor.share_tx(&tx);
                result.disputes.insert(id, DisputedTx { tx, our_vote });
            }
        }
    }

    fn raw_close_times(&self) -> CloseTimes {
        let mut peers: BTreeMap<NetTime, usize> = BTreeMap::new();
        for pos in self.peer_positions.values() {
            *peers.entry(pos.proposal.close_time).or_insert(0) += 1;
        }
        CloseTimes {
            self_close: self
                .result
                .as_ref()
                .map_or(NetTime::NULL, |r| r.position.close_time),
            peers,
        }
    }

    /// The close time the round agrees on, or `NULL` when votes are too
    /// scattered. Votes are compared on the resolution grid.
    fn agreed_close_time(&self) -> NetTime {
        let mut votes: BTreeMap<NetTime, usize> = BTreeMap::new();
        let mut participants = 0usize;
        if let Some(result) = &self.result {
            *votes
                .entry(round_close_time(result.position.close_time, self.close_resolution))
                .or_insert(0) += 1;
            participants += 1;
        }
        for pos in self.peer_positions.values() {
            *votes
                .entry(round_close_time(pos.proposal.close_time, self.close_resolution))
                .or_insert(0) += 1;
            participants += 1;
        }
        let threshold = (participants * self.params.min_consensus_pct as usize).div_ceil(100);
        votes
            .into_iter()
            .find(|(_, count)| *count >= threshold)
            .map_or(NetTime::NULL, |(time, _)| time)
    }

    fn update_establish(&mut self) -> Result<(), ConsensusError> {
        let Some(establish_since) = self.establish_since else {
            return Ok(());
        };
        let round_secs = self.now.saturating_sub(establish_since);
        let min_secs = self.params.ledger_min_consensus_ms.div_ceil(1_000);
        if round_secs < min_secs {
            return Ok(());
        }
        let Some(result) = self.result.as_ref() else {
            return Ok(());
        };

        let peers = self.peer_positions.len();
        let participants = peers + 1;
        let agree = 1 + self
            .peer_positions
            .values()
            .filter(|p| p.proposal.position == result.position.position)
            .count();
        let agree_pct = agree * 100 / participants;

        let state = if agree_pct >= self.params.min_consensus_pct as usize {
            ConsensusState::Yes
        } else if self
            .adaptor
            .proposers_finished(&self.prev_ledger, &self.prev_ledger_id)
            > participants / 2
        {
            // The network is already validating past this round.
            ConsensusState::MovedOn
        } else {
            ConsensusState::No
        };
        if state == ConsensusState::No {
            return Ok(());
        }

        let agreed_close = self.agreed_close_time();
        let mut result = self.result.clone().ok_or(ConsensusError::NoRound)?;
        result.state = state;
        result.proposers = participants;
        result.round_time_ms = round_secs.saturating_mul(1_000);
        result.position.close_time = agreed_close;
        self.prev_proposers = participants;
        self.prev_round_ms = result.round_time_ms;
        self.phase = Phase::Accepted;
        let report = self.get_json(true);
        self.result = Some(result.clone());
        tracing::info!(state = ?state, proposers = participants, "consensus reached");
        self.adaptor.on_accept(
            result,
            Arc::clone(&self.prev_ledger),
            self.close_resolution,
            self.raw_close_times(),
            self.mode,
            report,
        );
        Ok(())
    }
}

fn map_missing_node(err: LedgerError) -> ConsensusError {
    match err {
        LedgerError::MissingNode(id) => ConsensusError::MissingTxSetNode(id),
        other => ConsensusError::BuildFailed(other),
    }
}
