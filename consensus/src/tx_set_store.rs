//! Content-addressed storage and exchange of candidate transaction sets.
//!
//! Peers converge on positions by hash; the sets behind those hashes arrive
//! out of band. The store holds every set seen or produced this round,
//! requests missing sets from peers (at most one outstanding request per
//! distinct id), and prunes stale sets when a new round begins.

use crest_ledger::{TxSet, TxSetBuilder};
use crest_network::{Overlay, TxSetDataMsg, TxSetRequestMsg, WireMessage};
use crest_types::{LedgerIndex, TxId, TxSetId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

struct StoreState {
    /// Sets by id, tagged with the round sequence they were stored in.
    sets: HashMap<TxSetId, (TxSet, LedgerIndex)>,
    /// Ids with an outstanding peer request.
    acquiring: HashSet<TxSetId>,
    /// The parent sequence of the round in progress.
    round_seq: LedgerIndex,
}

pub struct TxSetStore {
    overlay: Arc<dyn Overlay>,
    state: Mutex<StoreState>,
}

impl TxSetStore {
    pub fn new(overlay: Arc<dyn Overlay>) -> Self {
        Self {
            overlay,
            state: Mutex::new(StoreState {
                sets: HashMap::new(),
                acquiring: HashSet::new(),
                round_seq: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("tx set store poisoned")
    }

    /// A new round began on the given parent sequence. Sets from rounds
    /// before the previous one are pruned, and outstanding requests are
    /// forgotten (the new round re-requests what it needs).
    pub fn new_round(&self, parent_seq: LedgerIndex) {
        let mut state = self.lock();
        state.round_seq = parent_seq;
        state
            .sets
            .retain(|_, (_, stored_at)| *stored_at + 1 >= parent_seq);
        state.acquiring.clear();
    }

    /// Fetch a set. When absent and `acquire` is set, asks peers for it —
    /// at most one outstanding request per distinct id.
    pub fn get_set(&self, id: &TxSetId, acquire: bool) -> Option<TxSet> {
        let mut state = self.lock();
        if let Some((set, _)) = state.sets.get(id) {
            return Some(set.clone());
        }
        if acquire && state.acquiring.insert(*id) {
            tracing::debug!(set = %id, "requesting transaction set from peers");
            self.overlay
                .broadcast(&WireMessage::TxSetRequest(TxSetRequestMsg {
                    set_id: *id.as_bytes(),
                }));
        }
        None
    }

    /// Store a set (locally produced or received). Optionally shares it
    /// with peers. Returns `false` if the set was already present.
    pub fn give_set(&self, set: TxSet, share: bool) -> bool {
        let id = set.id();
        let mut state = self.lock();
        state.acquiring.remove(&id);
        let fresh = !state.sets.contains_key(&id);
        if fresh {
            let round = state.round_seq;
            if share {
                self.overlay.broadcast(&WireMessage::TxSetData(to_wire(&set)));
            }
            state.sets.insert(id, (set, round));
        }
        fresh
    }

    /// Whether a request for this id is outstanding.
    pub fn is_acquiring(&self, id: &TxSetId) -> bool {
        self.lock().acquiring.contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().sets.is_empty()
    }
}

/// Encode a set's leaves for the wire.
pub fn to_wire(set: &TxSet) -> TxSetDataMsg {
    TxSetDataMsg {
        set_id: *set.id().as_bytes(),
        leaves: set
            .iter()
            .map(|(id, data)| (*id.as_bytes(), data.to_vec()))
            .collect(),
    }
}

/// Rebuild a set from the wire, rejecting payloads whose recomputed
/// identity does not match the advertised id.
pub fn from_wire(msg: &TxSetDataMsg) -> Option<TxSet> {
    let mut builder = TxSetBuilder::new();
    for (id, data) in &msg.leaves {
        builder.insert_raw(TxId::new(*id), data.clone());
    }
    let set = builder.snapshot();
    (set.id() == TxSetId::new(msg.set_id)).then_some(set)
}
