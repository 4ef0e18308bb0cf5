//! Fee and amendment voting seams.
//!
//! Every 256th ledger is a flag ledger: the one point where validators vote
//! on fees and amendments by inserting pseudo-transactions into the
//! candidate set before it is snapshotted. The voting *policies* are
//! opaque; consensus only defines the seams and ships straightforward
//! defaults.

use crate::validation::Validation;
use crest_ledger::{Ledger, Transaction, TxKind, TxSetBuilder};
use crest_types::AmendmentId;
use std::sync::Arc;

/// Fee-voting policy, invoked at flag-ledger boundaries.
pub trait FeeVote: Send + Sync {
    /// Insert this node's fee vote into the candidate set.
    fn do_voting(
        &self,
        prev_ledger: &Arc<Ledger>,
        validations: &[Arc<Validation>],
        initial_set: &mut TxSetBuilder,
    );
}

/// Amendment-voting policy, invoked at flag-ledger boundaries.
pub trait AmendmentVote: Send + Sync {
    /// Insert this node's amendment votes into the candidate set.
    fn do_voting(
        &self,
        prev_ledger: &Arc<Ledger>,
        validations: &[Arc<Validation>],
        initial_set: &mut TxSetBuilder,
    );

    /// The amendments to advertise on a flag-ledger validation.
    fn do_validation(&self, prev_ledger: &Arc<Ledger>) -> Vec<AmendmentId>;
}

/// Votes for a fixed fee level.
pub struct DefaultFeeVote {
    target_fee: u32,
}

impl DefaultFeeVote {
    pub fn new(target_fee: u32) -> Self {
        Self { target_fee }
    }
}

impl FeeVote for DefaultFeeVote {
    fn do_voting(
        &self,
        _prev_ledger: &Arc<Ledger>,
        _validations: &[Arc<Validation>],
        initial_set: &mut TxSetBuilder,
    ) {
        let tx = Transaction::pseudo(TxKind::SetFee, self.target_fee.to_be_bytes().to_vec());
        tracing::info!(fee = self.target_fee, tx = %tx.id(), "voting fee change");
        initial_set.insert(&tx);
    }
}

/// Votes to enable every supported amendment not yet active.
pub struct DefaultAmendmentVote {
    supported: Vec<AmendmentId>,
}

impl DefaultAmendmentVote {
    pub fn new(supported: Vec<AmendmentId>) -> Self {
        Self { supported }
    }

    fn pending<'a>(&'a self, prev_ledger: &'a Ledger) -> impl Iterator<Item = &'a AmendmentId> {
        self.supported
            .iter()
            .filter(|id| !prev_ledger.rules().enabled(id))
    }
}

impl AmendmentVote for DefaultAmendmentVote {
    fn do_voting(
        &self,
        prev_ledger: &Arc<Ledger>,
        _validations: &[Arc<Validation>],
        initial_set: &mut TxSetBuilder,
    ) {
        for id in self.pending(prev_ledger) {
            let tx = Transaction::pseudo(TxKind::EnableAmendment, id.as_bytes().to_vec());
            tracing::info!(amendment = %id, tx = %tx.id(), "voting amendment");
            initial_set.insert(&tx);
        }
    }

    fn do_validation(&self, prev_ledger: &Arc<Ledger>) -> Vec<AmendmentId> {
        self.pending(prev_ledger).copied().collect()
    }
}
