use crate::parsing::transaction_structs::{Transaction, Txid};
use crate::policy::{ancestor_score, Amount, PackageFeeRate};
use crate::validation::weight_calculation::virtual_size;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A transaction admitted to the pool together with its own metrics, its
/// in-pool links and the aggregate state of its ancestor and descendant sets.
#[derive(Debug, Clone)]
pub struct MempoolEntry {
    tx: Arc<Transaction>,
    fee: u64,
    modified_fee: Amount,
    tx_size: u64,
    tx_weight: u64,
    sigop_cost: u64,
    entry_sequence: u64,

    pub(super) parents: BTreeSet<Txid>,
    pub(super) children: BTreeSet<Txid>,

    pub(super) count_with_ancestors: u64,
    pub(super) size_with_ancestors: u64,
    pub(super) mod_fees_with_ancestors: Amount,
    pub(super) sigop_cost_with_ancestors: u64,

    pub(super) count_with_descendants: u64,
    pub(super) size_with_descendants: u64,
    pub(super) mod_fees_with_descendants: Amount,
}

impl MempoolEntry {
    /// Builds an unlinked entry from a transaction whose metadata (txid,
    /// weight, fee, sigop cost) has already been filled in.
    pub fn new(tx: Transaction, entry_sequence: u64) -> Self {
        let fee = tx.meta.fee;
        let tx_weight = tx.meta.weight;
        let sigop_cost = tx.meta.sigop_cost;
        let tx_size = virtual_size(tx_weight, sigop_cost);
        let modified_fee = fee.min(i64::MAX as u64) as Amount;
        MempoolEntry {
            tx: Arc::new(tx),
            fee,
            modified_fee,
            tx_size,
            tx_weight,
            sigop_cost,
            entry_sequence,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            count_with_ancestors: 1,
            size_with_ancestors: tx_size,
            mod_fees_with_ancestors: modified_fee,
            sigop_cost_with_ancestors: sigop_cost,
            count_with_descendants: 1,
            size_with_descendants: tx_size,
            mod_fees_with_descendants: modified_fee,
        }
    }

    pub fn txid(&self) -> Txid {
        self.tx.meta.txid
    }

    pub fn tx(&self) -> &Transaction {
        &self.tx
    }

    pub fn shared_tx(&self) -> Arc<Transaction> {
        Arc::clone(&self.tx)
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn modified_fee(&self) -> Amount {
        self.modified_fee
    }

    /// Virtual size in vbytes.
    pub fn tx_size(&self) -> u64 {
        self.tx_size
    }

    pub fn tx_weight(&self) -> u64 {
        self.tx_weight
    }

    pub fn sigop_cost(&self) -> u64 {
        self.sigop_cost
    }

    pub fn entry_sequence(&self) -> u64 {
        self.entry_sequence
    }

    pub fn parents(&self) -> &BTreeSet<Txid> {
        &self.parents
    }

    pub fn children(&self) -> &BTreeSet<Txid> {
        &self.children
    }

    pub fn count_with_ancestors(&self) -> u64 {
        self.count_with_ancestors
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

    pub fn count_with_descendants(&self) -> u64 {
        self.count_with_descendants
    }

    pub fn size_with_descendants(&self) -> u64 {
        self.size_with_descendants
    }

    pub fn mod_fees_with_descendants(&self) -> Amount {
        self.mod_fees_with_descendants
    }

    pub(super) fn apply_fee_delta(&mut self, delta: Amount) {
        self.modified_fee = self.modified_fee.saturating_add(delta);
        self.mod_fees_with_ancestors = self.mod_fees_with_ancestors.saturating_add(delta);
        self.mod_fees_with_descendants = self.mod_fees_with_descendants.saturating_add(delta);
    }

    pub fn ancestor_score(&self) -> PackageFeeRate {
        ancestor_score(
            self.modified_fee,
            self.tx_size,
            self.mod_fees_with_ancestors,
            self.size_with_ancestors,
        )
    }

    pub(super) fn score_key(&self) -> AncestorScoreKey {
        AncestorScoreKey {
            score: self.ancestor_score(),
            txid: self.txid(),
        }
    }
}

/// Key of the ancestor-score index: best score first, ties by txid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AncestorScoreKey {
    pub score: PackageFeeRate,
    pub txid: Txid,
}

impl Ord for AncestorScoreKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.txid.cmp(&other.txid))
    }
}

impl PartialOrd for AncestorScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
