use block_template_builder::parsing::transaction_structs::{Transaction, Txid};
use std::collections::{HashMap, HashSet};

// Converts a Vec<Transaction> to HashMap<Txid, Transaction>
pub fn convert_to_hashmap(transactions: Vec<Transaction>) -> HashMap<Txid, Transaction> {
    let mut txid_tx_map = HashMap::new();

    for transaction in transactions {
        txid_tx_map.insert(transaction.meta.txid, transaction);
    }
    txid_tx_map
}

// Returns the passed Vec<Transaction> with all transactions in invalid_transactions
// and all of their in-mempool descendants removed
pub fn remove_invalid_transactions(
    transactions: Vec<Transaction>,
    mut invalid_transactions: HashSet<Txid>,
) -> Vec<Transaction> {
    let mut transactions = convert_to_hashmap(transactions);
    let mut nothing_removed: bool = false;

    while !nothing_removed {
        nothing_removed = true;

        for (txid, tx) in transactions.iter() {
            if tx
                .spent_txids()
                .any(|parent| invalid_transactions.contains(parent))
            {
                // also remove transactions with invalid, unconfirmed (mempool) parents
                invalid_transactions.insert(*txid);
            }
        }

        for invalid_txid in &invalid_transactions {
            if transactions.remove(invalid_txid).is_some() {
                nothing_removed = false;
            };
        }
    }
    transactions.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use block_template_builder::testing::{chain_tx, TxBuilder};

    #[test]
    fn removes_descendants_of_invalid_transactions() {
        let parent = TxBuilder::new(1).build();
        let child = chain_tx(2, &parent, 100, 400);
        let grandchild = chain_tx(3, &child, 100, 400);
        let unrelated = TxBuilder::new(4).build();

        let kept = remove_invalid_transactions(
            vec![parent.clone(), child, grandchild, unrelated.clone()],
            [parent.meta.txid].into_iter().collect(),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].meta.txid, unrelated.meta.txid);
    }
}
