use super::block::Block;
use super::coinbase::{block_merkle_root, MAX_COINBASE_SCRIPTSIG_SIZE};
use crate::chain::{BlockIndex, BlockValidator, ChainParams, ValidationFailure};
use crate::parsing::transaction_structs::Txid;
use crate::validation::finality::is_final_tx;
use std::collections::HashSet;

/// Context-free block checks plus the ones that only need the previous block:
/// coinbase placement, resource limits, transaction order, finality and the
/// merkle root. Scripts and inputs are not looked at.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl BlockValidator for StructuralValidator {
    fn test_block_validity(
        &self,
        params: &ChainParams,
        block: &Block,
        prev: &BlockIndex,
    ) -> Result<(), ValidationFailure> {
        if block.header.prev_block_hash != prev.hash {
            return Err(ValidationFailure::new("bad-prevblk"));
        }
        let coinbase = block
            .coinbase()
            .filter(|tx| tx.is_coinbase())
            .ok_or_else(|| ValidationFailure::new("bad-cb-missing"))?;
        let script_len = coinbase.vin[0].scriptsig.len();
        if !(2..=MAX_COINBASE_SCRIPTSIG_SIZE).contains(&script_len) {
            return Err(ValidationFailure::new("bad-cb-length")
                .with_debug(format!("scriptSig of {script_len} bytes")));
        }
        if block.vtx.iter().skip(1).any(|tx| tx.is_coinbase()) {
            return Err(ValidationFailure::new("bad-cb-multiple"));
        }

        let weight = block.weight();
        if weight > params.max_block_weight {
            return Err(ValidationFailure::new("bad-blk-weight")
                .with_debug(format!("weight {weight} over {}", params.max_block_weight)));
        }
        let sigops = block.sigop_cost();
        if sigops > params.max_block_sigops_cost {
            return Err(ValidationFailure::new("bad-blk-sigops")
                .with_debug(format!("sigop cost {sigops}")));
        }

        let height = prev.height + 1;
        let lock_time_cutoff = if params.locktime_median_time_past {
            prev.median_time_past
        } else {
            block.header.time as i64
        };
        let block_txids: HashSet<Txid> = block.vtx.iter().map(|tx| tx.meta.txid).collect();
        if block_txids.len() != block.vtx.len() {
            return Err(ValidationFailure::new("bad-txns-duplicate"));
        }
        let mut seen: HashSet<Txid> = HashSet::with_capacity(block.vtx.len());
        for tx in &block.vtx {
            let txid = tx.meta.txid;
            if !tx.is_coinbase() {
                // in-block parents must come first
                if let Some(parent) = tx
                    .spent_txids()
                    .find(|parent| block_txids.contains(*parent) && !seen.contains(*parent))
                {
                    return Err(ValidationFailure::new("bad-txns-inputs-missingorspent")
                        .with_debug(format!("{txid} spends {parent} before it is included")));
                }
            }
            if !is_final_tx(tx, height, lock_time_cutoff) {
                return Err(ValidationFailure::new("bad-txns-nonfinal")
                    .with_debug(format!("{txid} is not final at height {height}")));
            }
            seen.insert(txid);
        }

        if block.header.merkle_root != block_merkle_root(block) {
            return Err(ValidationFailure::new("bad-txnmrklroot"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::block::BlockHeader;
    use crate::mining::coinbase::{empty_output, new_coinbase, pow_script_sig};
    use crate::parsing::transaction_structs::Transaction;
    use crate::testing::{chain_tx, TxBuilder};
    use std::sync::Arc;

    fn prev() -> BlockIndex {
        BlockIndex {
            hash: [3u8; 32],
            height: 10,
            time: 1_000,
            median_time_past: 1_000,
            bits: 0x207fffff,
        }
    }

    fn block(txs: Vec<Transaction>) -> Block {
        let coinbase = new_coinbase(pow_script_sig(11), vec![empty_output()]).unwrap();
        let mut vtx = vec![Arc::new(coinbase)];
        vtx.extend(txs.into_iter().map(Arc::new));
        let mut block = Block {
            header: BlockHeader {
                prev_block_hash: prev().hash,
                time: 1_001,
                ..BlockHeader::default()
            },
            vtx,
        };
        block.header.merkle_root = block_merkle_root(&block);
        block
    }

    fn check(block: &Block) -> Result<(), ValidationFailure> {
        StructuralValidator.test_block_validity(&ChainParams::default(), block, &prev())
    }

    #[test]
    fn accepts_ordered_block() {
        let parent = TxBuilder::new(1).build();
        let child = chain_tx(2, &parent, 100, 400);
        assert_eq!(check(&block(vec![parent, child])), Ok(()));
    }

    #[test]
    fn rejects_child_before_parent() {
        let parent = TxBuilder::new(1).build();
        let child = chain_tx(2, &parent, 100, 400);
        let failure = check(&block(vec![child, parent])).unwrap_err();
        assert_eq!(failure.reason, "bad-txns-inputs-missingorspent");
    }

    #[test]
    fn rejects_stale_merkle_root_and_wrong_prev() {
        let mut stale = block(vec![TxBuilder::new(1).build()]);
        stale.vtx.push(Arc::new(TxBuilder::new(2).build()));
        assert_eq!(check(&stale).unwrap_err().reason, "bad-txnmrklroot");

        let mut other_tip = block(vec![]);
        other_tip.header.prev_block_hash = [0u8; 32];
        assert_eq!(check(&other_tip).unwrap_err().reason, "bad-prevblk");
    }

    #[test]
    fn rejects_non_final_and_overweight() {
        let locked = TxBuilder::new(1).locktime(50, 0).build();
        assert_eq!(check(&block(vec![locked])).unwrap_err().reason, "bad-txns-nonfinal");

        let heavy = TxBuilder::new(2).weight(4_000_000).build();
        assert_eq!(check(&block(vec![heavy])).unwrap_err().reason, "bad-blk-weight");
    }
}
