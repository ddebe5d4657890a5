use super::block::Block;
use crate::error::AssemblyError;
use crate::parsing::transaction_structs::{InputType, Transaction, TxIn, TxOut, Txid};
use crate::validation::utils::{double_hash, push_int, OP_0};
use crate::validation::weight_calculation::is_segwit;
use hex_literal::hex as hexlit;
use std::sync::Arc;

pub const MAX_COINBASE_SCRIPTSIG_SIZE: usize = 100;
pub const WITNESS_RESERVED_VALUE: [u8; 32] = [0u8; 32];
// OP_RETURN + push 36 + commitment header
const WITNESS_COMMITMENT_HEADER: [u8; 6] = hexlit!("6a24aa21a9ed");

// calculates the HASH256 merkle root of a list of natural byte order hashes,
// duplicating the last entry of odd levels
// returns: root hash, all zero for an empty list
pub fn get_merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    let mut merkle_tree: Vec<[u8; 32]> = leaves.to_vec();
    if merkle_tree.is_empty() {
        return [0u8; 32];
    }

    while merkle_tree.len() > 1 {
        if merkle_tree.len() % 2 != 0 {
            let last = merkle_tree[merkle_tree.len() - 1];
            merkle_tree.push(last);
        }

        let mut next_stage: Vec<[u8; 32]> = Vec::with_capacity(merkle_tree.len() / 2);
        for pair in merkle_tree.chunks_exact(2) {
            let mut concat = pair[0].to_vec();
            concat.extend(pair[1]);
            next_stage.push(double_hash(&concat));
        }
        merkle_tree = next_stage;
    }
    merkle_tree[0]
}

pub fn block_merkle_root(block: &Block) -> [u8; 32] {
    let txids: Vec<[u8; 32]> = block
        .vtx
        .iter()
        .map(|tx| tx.meta.txid.to_natural_bytes())
        .collect();
    get_merkle_root(&txids)
}

// witness merkle root with the coinbase wtxid replaced by zeros
pub fn block_witness_merkle_root(block: &Block) -> [u8; 32] {
    let mut wtxids: Vec<[u8; 32]> = vec![[0u8; 32]];
    wtxids.extend(
        block
            .vtx
            .iter()
            .skip(1)
            .map(|tx| tx.meta.wtxid.to_natural_bytes()),
    );
    get_merkle_root(&wtxids)
}

// assembles the scriptpubkey of the witness commitment output:
// OP_RETURN header followed by HASH256(witness root || reserved value)
pub fn witness_commitment_script(witness_root: &[u8; 32]) -> Vec<u8> {
    let mut preimage = witness_root.to_vec();
    preimage.extend(WITNESS_RESERVED_VALUE);
    let mut script = WITNESS_COMMITMENT_HEADER.to_vec();
    script.extend(double_hash(&preimage));
    script
}

/// Adds the segwit commitment output and reserved value to the coinbase when
/// any other transaction in the block carries witness data.
/// returns: the commitment scriptpubkey, empty when no commitment is needed
pub fn generate_coinbase_commitment(block: &mut Block) -> Result<Vec<u8>, AssemblyError> {
    let has_witness = block.vtx.iter().skip(1).any(|tx| is_segwit(tx));
    if !has_witness {
        return Ok(Vec::new());
    }
    let script = witness_commitment_script(&block_witness_merkle_root(block));

    let coinbase = block.vtx.first_mut().ok_or(AssemblyError::MissingCoinbase)?;
    let mut updated: Transaction = coinbase.as_ref().clone();
    updated.vout.push(TxOut {
        scriptpubkey: script.clone(),
        scriptpubkey_type: "op_return".to_string(),
        value: 0,
    });
    if let Some(input) = updated.vin.first_mut() {
        input.witness = Some(vec![WITNESS_RESERVED_VALUE.to_vec()]);
    }
    updated.refresh_metadata();
    *coinbase = Arc::new(updated);
    Ok(script)
}

// <height> followed by raw extra bytes (coinbase flags or OP_0)
pub fn coinbase_script_sig(height: u32, extra: &[u8]) -> Vec<u8> {
    let mut script_sig = Vec::new();
    push_int(&mut script_sig, height as i64);
    script_sig.extend_from_slice(extra);
    script_sig
}

// proof-of-work coinbase scriptSig: <height> OP_0
pub fn pow_script_sig(height: u32) -> Vec<u8> {
    coinbase_script_sig(height, &[OP_0])
}

/// Builds a coinbase transaction spending the null outpoint.
pub fn new_coinbase(script_sig: Vec<u8>, outputs: Vec<TxOut>) -> Result<Transaction, AssemblyError> {
    if script_sig.len() > MAX_COINBASE_SCRIPTSIG_SIZE {
        return Err(AssemblyError::CoinbaseScriptTooLarge(script_sig.len()));
    }
    let mut coinbase = Transaction {
        meta: Default::default(),
        version: 1,
        locktime: 0,
        vin: vec![TxIn {
            in_type: InputType::UNKNOWN("coinbase".to_string()),
            txid: Txid::ZERO,
            vout: u32::MAX,
            scriptsig: script_sig,
            prevout: None,
            witness: None,
            is_coinbase: true,
            sequence: u32::MAX,
        }],
        vout: outputs,
    };
    coinbase.refresh_metadata();
    Ok(coinbase)
}

// the single empty output of a proof-of-stake coinbase
pub fn empty_output() -> TxOut {
    TxOut {
        scriptpubkey: Vec::new(),
        scriptpubkey_type: "nonstandard".to_string(),
        value: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TxBuilder;
    use crate::validation::sigops::legacy_sigop_count;

    fn block_with(coinbase: Transaction, txs: Vec<Transaction>) -> Block {
        let mut vtx = vec![Arc::new(coinbase)];
        vtx.extend(txs.into_iter().map(Arc::new));
        Block {
            vtx,
            ..Block::default()
        }
    }

    #[test]
    fn merkle_root_of_single_leaf_is_the_leaf() {
        let leaf = [7u8; 32];
        assert_eq!(get_merkle_root(&[leaf]), leaf);
    }

    #[test]
    fn odd_levels_duplicate_last_leaf() {
        let (a, b, c) = ([1u8; 32], [2u8; 32], [3u8; 32]);
        let pair = |x: [u8; 32], y: [u8; 32]| {
            let mut concat = x.to_vec();
            concat.extend(y);
            double_hash(&concat)
        };
        let expected = pair(pair(a, b), pair(c, c));
        assert_eq!(get_merkle_root(&[a, b, c]), expected);
    }

    #[test]
    fn pow_script_sig_pushes_height_then_op0() {
        assert_eq!(pow_script_sig(5), vec![0x55, 0x00]);
        // 840_000 = 0x0cd140, three byte push
        assert_eq!(pow_script_sig(840_000), vec![0x03, 0x40, 0xd1, 0x0c, 0x00]);
    }

    #[test]
    fn coinbase_is_recognised_and_oversized_scripts_rejected() {
        let coinbase = new_coinbase(pow_script_sig(1), vec![empty_output()]).unwrap();
        assert!(coinbase.is_coinbase());
        assert_eq!(legacy_sigop_count(&coinbase), 0);
        assert!(matches!(
            new_coinbase(vec![0x51; 101], vec![]),
            Err(AssemblyError::CoinbaseScriptTooLarge(101))
        ));
    }

    #[test]
    fn commitment_only_added_for_witness_blocks() {
        let coinbase = new_coinbase(pow_script_sig(1), vec![empty_output()]).unwrap();
        let mut legacy = block_with(coinbase.clone(), vec![TxBuilder::new(1).build()]);
        assert!(generate_coinbase_commitment(&mut legacy).unwrap().is_empty());
        assert_eq!(legacy.vtx[0].vout.len(), 1);

        let mut segwit = block_with(coinbase, vec![TxBuilder::new(2).witness().build()]);
        let script = generate_coinbase_commitment(&mut segwit).unwrap();
        assert_eq!(script.len(), 38);
        assert_eq!(&script[..6], &WITNESS_COMMITMENT_HEADER);
        let updated = &segwit.vtx[0];
        assert_eq!(updated.vout.last().unwrap().scriptpubkey, script);
        assert_eq!(
            updated.vin[0].witness,
            Some(vec![WITNESS_RESERVED_VALUE.to_vec()])
        );
    }
}
