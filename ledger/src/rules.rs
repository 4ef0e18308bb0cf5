//! Per-ledger protocol rules: the set of enabled amendments.

use crest_types::AmendmentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The amendments enabled as of a given ledger.
///
/// Rules are carried forward from parent to child and only change when an
/// enable-amendment pseudo-transaction applies at a flag ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    amendments: BTreeSet<AmendmentId>,
}

impl Rules {
    pub fn new(amendments: impl IntoIterator<Item = AmendmentId>) -> Self {
        Self {
            amendments: amendments.into_iter().collect(),
        }
    }

    /// Whether the given amendment is enabled.
    pub fn enabled(&self, id: &AmendmentId) -> bool {
        self.amendments.contains(id)
    }

    /// Enable an amendment (flag-ledger transition only).
    pub fn enable(&mut self, id: AmendmentId) {
        self.amendments.insert(id);
    }

    /// All enabled amendments, in id order.
    pub fn enabled_amendments(&self) -> impl Iterator<Item = &AmendmentId> {
        self.amendments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rules_enable_nothing() {
        let rules = Rules::default();
        assert!(!rules.enabled(&AmendmentId::new([1u8; 32])));
    }

    #[test]
    fn enable_and_query() {
        let id = AmendmentId::new([2u8; 32]);
        let mut rules = Rules::default();
        rules.enable(id);
        assert!(rules.enabled(&id));
        assert_eq!(rules.enabled_amendments().count(), 1);
    }

    #[test]
    fn new_from_iterator() {
        let a = AmendmentId::new([1u8; 32]);
        let b = AmendmentId::new([2u8; 32]);
        let rules = Rules::new([a, b]);
        assert!(rules.enabled(&a));
        assert!(rules.enabled(&b));
    }
}
