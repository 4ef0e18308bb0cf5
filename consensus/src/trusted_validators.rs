//! The trusted validator list.
//!
//! Published lists name the validators this node trusts and expire; an
//! expired list forces the node to observe rather than validate (except in
//! stand-alone mode, where there is no list to expire).

use crest_types::{NetTime, NodeId, PublicKey};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

struct ListState {
    /// Trusted validators by node id, with their signing keys.
    validators: HashMap<NodeId, PublicKey>,
    /// When the published list expires, if one was loaded.
    expires: Option<NetTime>,
}

pub struct TrustedValidators {
    state: Mutex<ListState>,
}

impl TrustedValidators {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ListState {
                validators: HashMap::new(),
                expires: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ListState> {
        self.state.lock().expect("validator list poisoned")
    }

    /// Replace the list (new publication).
    pub fn set_list(
        &self,
        validators: impl IntoIterator<Item = (NodeId, PublicKey)>,
        expires: Option<NetTime>,
    ) {
        let mut state = self.lock();
        state.validators = validators.into_iter().collect();
        state.expires = expires;
    }

    pub fn count(&self) -> usize {
        self.lock().validators.len()
    }

    pub fn is_trusted(&self, node: &NodeId) -> bool {
        self.lock().validators.contains_key(node)
    }

    /// When the current list expires (`None` when no list is loaded).
    pub fn expires(&self) -> Option<NetTime> {
        self.lock().expires
    }

    /// Whether the list has expired as of `now`.
    pub fn expired(&self, now: NetTime) -> bool {
        match self.lock().expires {
            Some(when) => when < now,
            None => true,
        }
    }

    /// The minimum number of trusted validators whose agreement is required
    /// for fee/amendment voting to proceed: 80% of the list, rounded up.
    pub fn quorum(&self) -> usize {
        self.count().saturating_mul(4).div_ceil(5)
    }

    /// The quorum together with every trusted signing key.
    pub fn quorum_keys(&self) -> (usize, HashSet<PublicKey>) {
        let state = self.lock();
        let quorum = state.validators.len().saturating_mul(4).div_ceil(5);
        (quorum, state.validators.values().copied().collect())
    }
}

impl Default for TrustedValidators {
    fn default() -> Self {
        Self::new()
    }
}
