//! In-memory dependency graph of unconfirmed transactions.
//!
//! Entries live in one id-keyed arena; an ordered index of
//! [`AncestorScoreKey`]s gives the descending ancestor-feerate view used by
//! block assembly. Both views are kept in sync on every mutation.

mod entry;

pub use self::entry::{AncestorScoreKey, MempoolEntry};

use crate::error::MempoolError;
use crate::parsing::transaction_structs::{Transaction, Txid};
use crate::policy::Amount;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Caps applied while walking the ancestor graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AncestorLimits {
    pub ancestor_count: u64,
    pub ancestor_size: u64,
    pub descendant_count: u64,
    pub descendant_size: u64,
}

impl AncestorLimits {
    pub const fn unlimited() -> Self {
        AncestorLimits {
            ancestor_count: u64::MAX,
            ancestor_size: u64::MAX,
            descendant_count: u64::MAX,
            descendant_size: u64::MAX,
        }
    }
}

impl Default for AncestorLimits {
    // relay policy defaults: 25 transactions, 101 kvB
    fn default() -> Self {
        AncestorLimits {
            ancestor_count: 25,
            ancestor_size: 101_000,
            descendant_count: 25,
            descendant_size: 101_000,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct TxMemPool {
    entries: HashMap<Txid, MempoolEntry>,
    by_ancestor_score: BTreeSet<AncestorScoreKey>,
    // funding txid (in pool or not) -> in-pool spenders
    spent_by: HashMap<Txid, BTreeSet<Txid>>,
    next_sequence: u64,
}

impl TxMemPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pool from transactions in arbitrary order by admitting
    /// parents before children. Transactions whose in-set parents can never
    /// be admitted are dropped.
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        let mut pool = TxMemPool::new();
        let mut pending: HashMap<Txid, Transaction> = transactions
            .into_iter()
            .map(|tx| (tx.meta.txid, tx))
            .collect();

        // in-set parents and children of every pending transaction
        let mut missing_parents: HashMap<Txid, usize> = HashMap::new();
        let mut children: HashMap<Txid, Vec<Txid>> = HashMap::new();
        for (txid, tx) in &pending {
            let parents: HashSet<&Txid> = tx
                .spent_txids()
                .filter(|parent| pending.contains_key(parent))
                .collect();
            for parent in &parents {
                children.entry(**parent).or_default().push(*txid);
            }
            missing_parents.insert(*txid, parents.len());
        }

        let mut ready: VecDeque<Txid> = missing_parents
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(txid, _)| *txid)
            .collect();
        // deterministic admission order
        ready.make_contiguous().sort();

        while let Some(txid) = ready.pop_front() {
            let Some(tx) = pending.remove(&txid) else {
                continue;
            };
            if let Err(err) = pool.add_unchecked(tx) {
                warn!(%txid, %err, "could not admit transaction");
                continue;
            }
            for child in children.remove(&txid).unwrap_or_default() {
                if let Some(count) = missing_parents.get_mut(&child) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(child);
                    }
                }
            }
        }
        if !pending.is_empty() {
            warn!(dropped = pending.len(), "transactions with unadmittable parents");
        }
        pool
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

    pub fn get(&self, txid: &Txid) -> Option<&MempoolEntry> {
        self.entries.get(txid)
    }

    pub fn entry(&self, txid: &Txid) -> Result<&MempoolEntry, MempoolError> {
        self.entries.get(txid).ok_or(MempoolError::TxNotFound(*txid))
    }

    /// Entries ordered by descending ancestor score, ties by txid.
    pub fn iter_by_ancestor_score(&self) -> impl Iterator<Item = &MempoolEntry> + '_ {
        self.by_ancestor_score
            .iter()
            .filter_map(|key| self.entries.get(&key.txid))
    }

    /// Adds a transaction whose metadata is already computed. In-pool
    /// parents must have been added before it.
    pub fn add_unchecked(&mut self, tx: Transaction) -> Result<(), MempoolError> {
        let txid = tx.meta.txid;
        if self.entries.contains_key(&txid) {
            return Err(MempoolError::TxAlreadyExists(txid));
        }
        if let Some(child) = self.spent_by.get(&txid).and_then(|s| s.iter().next()) {
            return Err(MempoolError::ChildAddedBeforeParent {
                parent: txid,
                child: *child,
            });
        }

        let mut entry = MempoolEntry::new(tx, self.next_sequence);
        self.next_sequence += 1;

        let parents: BTreeSet<Txid> = entry
            .tx()
            .spent_txids()
            .filter(|parent| self.entries.contains_key(parent))
            .copied()
            .collect();
        let ancestors = self.ancestors_from_parents(&parents, AncestorLimits::unlimited(), 0)?;

        for ancestor_id in &ancestors {
            let ancestor = self
                .entries
                .get_mut(ancestor_id)
                .ok_or(MempoolError::TxNotFound(*ancestor_id))?;
            entry.count_with_ancestors += 1;
            entry.size_with_ancestors += ancestor.tx_size();
            entry.mod_fees_with_ancestors += ancestor.modified_fee();
            entry.sigop_cost_with_ancestors += ancestor.sigop_cost();

            ancestor.count_with_descendants += 1;
            ancestor.size_with_descendants += entry.tx_size();
            ancestor.mod_fees_with_descendants += entry.modified_fee();
        }
        for parent in &parents {
            if let Some(parent_entry) = self.entries.get_mut(parent) {
                parent_entry.children.insert(txid);
            }
        }
        for funding in entry.tx().spent_txids() {
            self.spent_by.entry(*funding).or_default().insert(txid);
        }
        entry.parents = parents;

        debug!(
            %txid,
            fee = entry.fee(),
            vsize = entry.tx_size(),
            ancestors = entry.count_with_ancestors() - 1,
            "added transaction to mempool"
        );
        self.by_ancestor_score.insert(entry.score_key());
        self.entries.insert(txid, entry);
        Ok(())
    }

    /// Removes a transaction and all of its in-pool descendants.
    /// returns: the removed transactions
    pub fn remove_recursive(&mut self, txid: &Txid) -> Vec<Transaction> {
        if !self.entries.contains_key(txid) {
            return Vec::new();
        }
        let mut stage = HashSet::new();
        self.calculate_descendants(txid, &mut stage);

        // ancestors outside the removed set lose the removed descendants
        for removed_id in &stage {
            let Some(removed) = self.entries.get(removed_id) else {
                continue;
            };
            let (size, fee) = (removed.tx_size(), removed.modified_fee());
            let ancestors = self
                .ancestors_from_parents(&removed.parents, AncestorLimits::unlimited(), 0)
                .unwrap_or_default();
            for ancestor_id in ancestors.iter().filter(|a| !stage.contains(*a)) {
                if let Some(ancestor) = self.entries.get_mut(ancestor_id) {
                    ancestor.count_with_descendants -= 1;
                    ancestor.size_with_descendants -= size;
                    ancestor.mod_fees_with_descendants -= fee;
                }
            }
        }

        let mut removed_txs = Vec::with_capacity(stage.len());
        for removed_id in &stage {
            let Some(removed) = self.entries.remove(removed_id) else {
                continue;
            };
            self.by_ancestor_score.remove(&removed.score_key());
            for parent in &removed.parents {
                if let Some(parent_entry) = self.entries.get_mut(parent) {
                    parent_entry.children.remove(removed_id);
                }
            }
            for funding in removed.tx().spent_txids() {
                if let Some(spenders) = self.spent_by.get_mut(funding) {
                    spenders.remove(removed_id);
                    if spenders.is_empty() {
                        self.spent_by.remove(funding);
                    }
                }
            }
            removed_txs.push(removed.tx().clone());
        }
        debug!(%txid, removed = removed_txs.len(), "removed transaction and descendants");
        removed_txs
    }

    /// Adjusts the modified fee of a transaction, updating the aggregate
    /// state of its ancestors and descendants.
    pub fn prioritise_transaction(
        &mut self,
        txid: &Txid,
        fee_delta: Amount,
    ) -> Result<(), MempoolError> {
        let entry = self.entry(txid)?;
        let ancestors =
            self.ancestors_from_parents(&entry.parents, AncestorLimits::unlimited(), 0)?;
        let mut descendants = HashSet::new();
        self.calculate_descendants(txid, &mut descendants);
        descendants.remove(txid);

        self.rekey(txid, |entry| entry.apply_fee_delta(fee_delta));
        for ancestor_id in &ancestors {
            if let Some(ancestor) = self.entries.get_mut(ancestor_id) {
                ancestor.mod_fees_with_descendants += fee_delta;
            }
        }
        for descendant_id in &descendants {
            self.rekey(descendant_id, |entry| entry.mod_fees_with_ancestors += fee_delta);
        }
        debug!(%txid, fee_delta, "prioritised transaction");
        Ok(())
    }

    // mutates an entry while keeping the score index consistent
    fn rekey(&mut self, txid: &Txid, update: impl FnOnce(&mut MempoolEntry)) {
        if let Some(entry) = self.entries.get_mut(txid) {
            self.by_ancestor_score.remove(&entry.score_key());
            update(entry);
            self.by_ancestor_score.insert(entry.score_key());
        }
    }

    /// In-pool ancestors of `txid`, excluding itself, bounded by `limits`.
    pub fn calculate_ancestors(
        &self,
        txid: &Txid,
        limits: AncestorLimits,
    ) -> Result<HashSet<Txid>, MempoolError> {
        let entry = self.entry(txid)?;
        if entry.count_with_descendants() > limits.descendant_count {
            return Err(MempoolError::LimitsExceeded(format!(
                "{txid} has too many descendants"
            )));
        }
        self.ancestors_from_parents(&entry.parents, limits, entry.tx_size())
    }

    fn ancestors_from_parents(
        &self,
        parents: &BTreeSet<Txid>,
        limits: AncestorLimits,
        own_size: u64,
    ) -> Result<HashSet<Txid>, MempoolError> {
        let mut ancestors: HashSet<Txid> = HashSet::new();
        let mut queue: VecDeque<Txid> = parents.iter().copied().collect();
        let mut total_size = own_size;

        while let Some(next) = queue.pop_front() {
            if !ancestors.insert(next) {
                continue;
            }
            let ancestor = self.entry(&next)?;
            total_size = total_size.saturating_add(ancestor.tx_size());

            if ancestor.size_with_descendants().saturating_add(own_size) > limits.descendant_size {
                return Err(MempoolError::LimitsExceeded(format!(
                    "exceeds descendant size limit for tx {next}"
                )));
            }
            if ancestor.count_with_descendants().saturating_add(1) > limits.descendant_count {
                return Err(MempoolError::LimitsExceeded(format!(
                    "too many descendants for tx {next}"
                )));
            }
            if total_size > limits.ancestor_size {
                return Err(MempoolError::LimitsExceeded(
                    "exceeds ancestor size limit".to_string(),
                ));
            }
            if ancestors.len() as u64 + 1 > limits.ancestor_count {
                return Err(MempoolError::LimitsExceeded(
                    "too many unconfirmed ancestors".to_string(),
                ));
            }
            queue.extend(ancestor.parents.iter().copied());
        }
        Ok(ancestors)
    }

    /// Adds `txid` and all of its in-pool descendants to `descendants`.
    /// Entries already in the set are assumed to have had their descendants
    /// walked.
    pub fn calculate_descendants(&self, txid: &Txid, descendants: &mut HashSet<Txid>) {
        let mut stage = vec![*txid];
        while let Some(next) = stage.pop() {
            if !descendants.insert(next) {
                continue;
            }
            if let Some(entry) = self.entries.get(&next) {
                stage.extend(entry.children.iter().filter(|c| !descendants.contains(*c)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{chain_tx, TxBuilder};

    #[test]
    fn ancestor_state_accumulates_along_chain() {
        let a = TxBuilder::new(1).fee(1000).weight(400).build();
        let b = chain_tx(2, &a, 500, 400);
        let c = chain_tx(3, &b, 300, 400);
        let pool = TxMemPool::from_transactions(vec![c.clone(), a.clone(), b.clone()]);

        let c_entry = pool.get(&c.meta.txid).unwrap();
        assert_eq!(c_entry.count_with_ancestors(), 3);
        assert_eq!(c_entry.size_with_ancestors(), 300);
        assert_eq!(c_entry.mod_fees_with_ancestors(), 1800);

        let a_entry = pool.get(&a.meta.txid).unwrap();
        assert_eq!(a_entry.count_with_descendants(), 3);
        assert_eq!(a_entry.children().len(), 1);

        let ancestors = pool
            .calculate_ancestors(&c.meta.txid, AncestorLimits::unlimited())
            .unwrap();
        assert_eq!(ancestors.len(), 2);
        assert!(pool
            .calculate_ancestors(
                &c.meta.txid,
                AncestorLimits {
                    ancestor_count: 2,
                    ..AncestorLimits::unlimited()
                }
            )
            .is_err());
    }

    #[test]
    fn score_index_orders_by_package_feerate() {
        let rich = TxBuilder::new(1).fee(5000).weight(400).build();
        let poor_parent = TxBuilder::new(2).fee(100).weight(400).build();
        let rich_child = chain_tx(3, &poor_parent, 9000, 400);
        let pool = TxMemPool::from_transactions(vec![
            rich.clone(),
            poor_parent.clone(),
            rich_child.clone(),
        ]);
        let order: Vec<Txid> = pool.iter_by_ancestor_score().map(|e| e.txid()).collect();
        // the child package (9100 over 200 vB) ranks below 5000 over 100 vB
        assert_eq!(order[0], rich.meta.txid);
        assert_eq!(order[1], rich_child.meta.txid);
        assert_eq!(order[2], poor_parent.meta.txid);
    }

    #[test]
    fn remove_recursive_drops_descendants_and_updates_ancestors() {
        let a = TxBuilder::new(1).fee(1000).weight(400).build();
        let b = chain_tx(2, &a, 500, 400);
        let c = chain_tx(3, &b, 300, 400);
        let mut pool = TxMemPool::from_transactions(vec![a.clone(), b.clone(), c.clone()]);

        let removed = pool.remove_recursive(&b.meta.txid);
        assert_eq!(removed.len(), 2);
        assert_eq!(pool.len(), 1);
        let a_entry = pool.get(&a.meta.txid).unwrap();
        assert_eq!(a_entry.count_with_descendants(), 1);
        assert!(a_entry.children().is_empty());
        assert_eq!(pool.iter_by_ancestor_score().count(), 1);
    }

    #[test]
    fn prioritise_rekeys_descendants() {
        let a = TxBuilder::new(1).fee(100).weight(400).build();
        let b = chain_tx(2, &a, 100, 400);
        let other = TxBuilder::new(3).fee(1000).weight(400).build();
        let mut pool = TxMemPool::from_transactions(vec![a.clone(), b.clone(), other.clone()]);

        pool.prioritise_transaction(&a.meta.txid, 10_000).unwrap();
        let b_entry = pool.get(&b.meta.txid).unwrap();
        assert_eq!(b_entry.mod_fees_with_ancestors(), 10_200);
        let first = pool.iter_by_ancestor_score().next().unwrap();
        assert_eq!(first.txid(), a.meta.txid);
    }

    #[test]
    fn rejects_duplicates_and_children_added_before_parents() {
        let a = TxBuilder::new(1).fee(100).weight(400).build();
        let b = chain_tx(2, &a, 100, 400);
        let mut pool = TxMemPool::new();
        pool.add_unchecked(b).unwrap();
        assert!(matches!(
            pool.add_unchecked(a.clone()),
            Err(MempoolError::ChildAddedBeforeParent { .. })
        ));
        let mut pool = TxMemPool::new();
        pool.add_unchecked(a.clone()).unwrap();
        assert_eq!(
            pool.add_unchecked(a.clone()),
            Err(MempoolError::TxAlreadyExists(a.meta.txid))
        );
    }
}
