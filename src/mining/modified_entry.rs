//! Overlay of pool entries whose ancestor state changed because some of their
//! ancestors are already in the block being assembled.
//!
//! The pool's own aggregates are a snapshot; the overlay carries corrected
//! copies, indexed by ancestor score the same way the pool is. Updating an
//! entry removes its index key, applies the change and reinserts the key.

use crate::mempool::{AncestorScoreKey, MempoolEntry};
use crate::parsing::transaction_structs::Txid;
use crate::policy::{ancestor_score, Amount, PackageFeeRate};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedEntry {
    txid: Txid,
    tx_size: u64,
    modified_fee: Amount,
    size_with_ancestors: u64,
    mod_fees_with_ancestors: Amount,
    sigop_cost_with_ancestors: u64,
}

impl ModifiedEntry {
    fn from_entry(entry: &MempoolEntry) -> Self {
        ModifiedEntry {
            txid: entry.txid(),
            tx_size: entry.tx_size(),
            modified_fee: entry.modified_fee(),
            size_with_ancestors: entry.size_with_ancestors(),
            mod_fees_with_ancestors: entry.mod_fees_with_ancestors(),
            sigop_cost_with_ancestors: entry.sigop_cost_with_ancestors(),
        }
    }

    pub fn txid(&self) -> Txid {
        self.txid
    }

    pub fn size_with_ancestors(&self) -> u64 {
        self.size_with_ancestors
    }

    pub fn mod_fees_with_ancestors(&self) -> Amount {
        self.mod_fees_with_ancestors
    }

    pub fn sigop_cost_with_ancestors(&self) -> u64 {
        self.sigop_cost_with_ancestors
    }

    pub fn ancestor_score(&self) -> PackageFeeRate {
        ancestor_score(
            self.modified_fee,
            self.tx_size,
            self.mod_fees_with_ancestors,
            self.size_with_ancestors,
        )
    }

    fn score_key(&self) -> AncestorScoreKey {
        AncestorScoreKey {
            score: self.ancestor_score(),
            txid: self.txid,
        }
    }
}

#[derive(Debug, Default)]
pub struct ModifiedTxSet {
    entries: HashMap<Txid, ModifiedEntry>,
    by_ancestor_score: BTreeSet<AncestorScoreKey>,
}

impl ModifiedTxSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, txid: &Txid) -> bool {
        self.entries.contains_key(txid)
    }

    pub fn get(&self, txid: &Txid) -> Option<&ModifiedEntry> {
        self.entries.get(txid)
    }

    /// Subtracts a placed ancestor's contribution from `entry`'s ancestor
    /// state, copying the pool's aggregates first if the entry is new.
    pub fn insert_or_adjust(
        &mut self,
        entry: &MempoolEntry,
        delta_size: u64,
        delta_fee: Amount,
        delta_sigops: u64,
    ) {
        let txid = entry.txid();
        let mut modified = match self.entries.remove(&txid) {
            Some(existing) => {
                self.by_ancestor_score.remove(&existing.score_key());
                existing
            }
            None => ModifiedEntry::from_entry(entry),
        };
        modified.size_with_ancestors = modified.size_with_ancestors.saturating_sub(delta_size);
        modified.mod_fees_with_ancestors -= delta_fee;
        modified.sigop_cost_with_ancestors =
            modified.sigop_cost_with_ancestors.saturating_sub(delta_sigops);

        self.by_ancestor_score.insert(modified.score_key());
        self.entries.insert(txid, modified);
    }

    /// Entry with the highest ancestor score, ties by txid.
    pub fn best(&self) -> Option<&ModifiedEntry> {
        self.by_ancestor_score
            .first()
            .and_then(|key| self.entries.get(&key.txid))
    }

    pub fn erase(&mut self, txid: &Txid) -> Option<ModifiedEntry> {
        let removed = self.entries.remove(txid)?;
        self.by_ancestor_score.remove(&removed.score_key());
        Some(removed)
    }
}
