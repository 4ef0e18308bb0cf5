//! The main CREST node struct — wires the consensus subsystems together.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use crest_clock::TimeKeeper;
use crest_consensus::{
    DefaultAmendmentVote, DefaultFeeVote, JobQueue, LedgerConsensus, PeerProposal,
    RoundAdaptorBuilder, TrustedValidators, TxSetStore, ValStatus, Validation, ValidationStore,
};
use crest_crypto::{keypair_from_seed, node_id_from_public};
use crest_ledger::{
    Ledger, LedgerMaster, LoadFeeTrack, LocalTxs, OpenLedger, Rules, StandardBuilder, Transaction,
    TxQueue,
};
use crest_consensus::tx_set_store;
use crest_network::overlay::OutboundFrame;
use crest_network::{
    ChannelOverlay, HashRouter, Overlay, ProposeSetMsg, TxSetDataMsg, TxSetRequestMsg,
    ValidationMsg,
};
use crest_types::params::FIX_ROUNDED_CLOSE;
use crest_types::{NetTime, NodeId, TxSetId};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::network_ops::{NetworkOps, OperatingMode};
use crate::stats::{ConsensusStats, Counter};

/// Capacity of the outbound peer-message channel.
const OUTBOUND_CHANNEL_CAPACITY: usize = 4096;

/// The base fee a fresh network votes for.
const DEFAULT_BASE_FEE: u32 = 10;

/// A running CREST consensus node.
pub struct ConsensusNode {
    pub config: NodeConfig,
    pub consensus: LedgerConsensus,
    pub ledger_master: Arc<LedgerMaster>,
    pub open_ledger: Arc<OpenLedger>,
    pub local_txs: Arc<LocalTxs>,
    pub validations: Arc<ValidationStore>,
    pub trusted: Arc<TrustedValidators>,
    pub network_ops: Arc<NetworkOps>,
    pub time_keeper: Arc<TimeKeeper>,
    pub stats: Arc<ConsensusStats>,
    pub tx_sets: Arc<TxSetStore>,
    node_id: Option<NodeId>,
    jobs: Arc<JobQueue>,
}

impl ConsensusNode {
    /// Assemble a node. Returns the node plus the outbound frame channel
    /// the connection layer drains.
    pub fn new(config: NodeConfig) -> Result<(Self, mpsc::Receiver<OutboundFrame>), NodeError> {
        Self::with_time_keeper(config, Arc::new(TimeKeeper::new()))
    }

    /// Assemble a node on an explicit time keeper (tests use a manual one).
    pub fn with_time_keeper(
        config: NodeConfig,
        time_keeper: Arc<TimeKeeper>,
    ) -> Result<(Self, mpsc::Receiver<OutboundFrame>), NodeError> {
        let keys = config.seed_bytes()?.map(|seed| keypair_from_seed(&seed));
        let node_id = keys.as_ref().map(|k| node_id_from_public(&k.public));

        let mut rules = Rules::default();
        rules.enable(FIX_ROUNDED_CLOSE);
        let genesis = Arc::new(Ledger::genesis(time_keeper.now(), rules));

        let ledger_master = Arc::new(LedgerMaster::new(Arc::clone(&genesis)));
        let open_ledger = Arc::new(OpenLedger::new(Arc::clone(&genesis)));
        let local_txs = Arc::new(LocalTxs::new());
        let tx_queue = Arc::new(TxQueue::new());
        let trusted = Arc::new(TrustedValidators::new());
        let validations = Arc::new(ValidationStore::new(Arc::clone(&trusted)));
        let jobs = Arc::new(JobQueue::new());

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let overlay: Arc<dyn Overlay> = Arc::new(ChannelOverlay::new(outbound_tx));
        let tx_sets = Arc::new(TxSetStore::new(Arc::clone(&overlay)));

        let network_ops = Arc::new(NetworkOps::new(if config.standalone {
            OperatingMode::Full
        } else {
            OperatingMode::Syncing
        }));

        let adaptor = RoundAdaptorBuilder {
            keys,
            node_id,
            standalone: config.standalone,
            params: config.consensus.clone(),
            ledger_master: Arc::clone(&ledger_master),
            open_ledger: Arc::clone(&open_ledger),
            local_txs: Arc::clone(&local_txs),
            tx_queue,
            builder: Arc::new(StandardBuilder),
            tx_sets: Arc::clone(&tx_sets),
            validations: Arc::clone(&validations),
            trusted: Arc::clone(&trusted),
            overlay,
            hash_router: Arc::new(HashRouter::new(config.consensus.suppression_hold_secs)),
            time_keeper: Arc::clone(&time_keeper),
            net_ops: Arc::clone(&network_ops) as Arc<dyn crest_consensus::NetOps>,
            fee_track: Arc::new(LoadFeeTrack::new()),
            fee_vote: Box::new(DefaultFeeVote::new(DEFAULT_BASE_FEE)),
            amendment_vote: Box::new(DefaultAmendmentVote::new(vec![FIX_ROUNDED_CLOSE])),
            jobs: Arc::clone(&jobs),
        }
        .build();

        let node = Self {
            consensus: LedgerConsensus::new(adaptor, genesis),
            config,
            ledger_master,
            open_ledger,
            local_txs,
            validations,
            trusted,
            network_ops,
            time_keeper,
            stats: Arc::new(ConsensusStats::new()),
            tx_sets,
            node_id,
            jobs,
        };
        Ok((node, outbound_rx))
    }

    pub fn node_id(&self) -> Option<NodeId> {
        self.node_id
    }

    fn now(&self) -> NetTime {
        self.time_keeper.now()
    }

    /// Submit a transaction through this node.
    pub fn submit_transaction(&self, tx: Transaction) {
        self.local_txs.push(tx.clone());
        self.open_ledger.insert(tx);
    }

    /// Open a consensus round on the current closed ledger.
    pub fn start_round(&self) {
        let closed = self.ledger_master.closed_ledger();
        self.stats.record(Counter::RoundsStarted);
        self.consensus
            .start_round(self.now(), closed.id(), closed, &HashSet::new());
    }

    /// The external tick driving the round.
    pub fn timer(&self) -> Result<(), NodeError> {
        Ok(self.consensus.timer_entry(self.now())?)
    }

    /// Run one complete round in stand-alone mode.
    pub fn run_standalone_round(&self) {
        self.start_round();
        self.consensus.simulate(self.now(), None);
        self.stats.record(Counter::RoundsAccepted);
    }

    /// An inbound peer proposal from the overlay.
    pub fn on_peer_proposal(&self, msg: &ProposeSetMsg) -> bool {
        let Some(peer_pos) = PeerProposal::from_wire(msg) else {
            return false;
        };
        self.stats.record(Counter::ProposalsIn);
        self.consensus.peer_proposal(self.now(), peer_pos)
    }

    /// An inbound peer validation from the overlay.
    pub fn on_peer_validation(&self, msg: &ValidationMsg) -> ValStatus {
        match Validation::from_bytes(&msg.validation) {
            Some(validation) => {
                let status = self.validations.add(validation);
                if status == ValStatus::Current {
                    self.stats.record(Counter::ValidationsIn);
                }
                status
            }
            None => ValStatus::BadSignature,
        }
    }

    /// An inbound transaction set from a peer. Returns whether the payload
    /// was internally consistent and delivered to the engine.
    pub fn on_peer_tx_set(&self, msg: &TxSetDataMsg) -> Result<bool, NodeError> {
        let Some(set) = tx_set_store::from_wire(msg) else {
            tracing::debug!("dropping transaction set with mismatched identity");
            return Ok(false);
        };
        self.tx_sets.give_set(set.clone(), false);
        self.consensus.got_tx_set(self.now(), set)?;
        Ok(true)
    }

    /// A peer asked for a transaction set we may hold.
    pub fn on_tx_set_request(&self, msg: &TxSetRequestMsg) -> Option<TxSetDataMsg> {
        self.tx_sets
            .get_set(&TxSetId::new(msg.set_id), false)
            .map(|set| tx_set_store::to_wire(&set))
    }

    pub fn get_json(&self, full: bool) -> serde_json::Value {
        self.consensus.get_json(full)
    }

    /// Drain background workers. Called once on node teardown.
    pub fn shutdown(&self) {
        self.jobs.shutdown();
    }
}
