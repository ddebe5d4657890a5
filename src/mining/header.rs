use super::block::{Block, BlockHeader};
use super::coinbase::{block_merkle_root, MAX_COINBASE_SCRIPTSIG_SIZE};
use crate::chain::{adjusted_time, BlockHash, BlockIndex, ChainParams, WorkOracle};
use crate::error::AssemblyError;
use crate::validation::utils::{encode_num, push_data, push_int};
use std::sync::Arc;
use tracing::trace;

// moves the header time forward to max(median time past + 1, now). On chains
// allowing min difficulty blocks the required work depends on the time, so
// the bits are re-queried.
// returns: the number of seconds the time moved
pub fn update_time_at(
    header: &mut BlockHeader,
    params: &ChainParams,
    prev: &BlockIndex,
    work: &dyn WorkOracle,
    proof_of_stake: bool,
    now: i64,
) -> i64 {
    let old_time = header.time as i64;
    let new_time = (prev.median_time_past + 1).max(now);
    if old_time < new_time {
        header.time = new_time.clamp(0, u32::MAX as i64) as u32;
    }
    if params.pow_allow_min_difficulty_blocks {
        header.bits = work.next_work_required(prev, header, params, proof_of_stake);
    }
    new_time - old_time
}

pub fn update_time(
    header: &mut BlockHeader,
    params: &ChainParams,
    prev: &BlockIndex,
    work: &dyn WorkOracle,
    proof_of_stake: bool,
) -> i64 {
    update_time_at(header, params, prev, work, proof_of_stake, adjusted_time())
}

/// Extra nonce counter, restarted whenever the block builds on a new tip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraNonce {
    pub hash_prev_block: BlockHash,
    pub value: u32,
}

/// Bumps the extra nonce, rewrites the coinbase scriptSig as
/// `<height> <extra nonce> COINBASE_FLAGS` and recomputes the merkle root.
pub fn increment_extra_nonce(
    block: &mut Block,
    prev: &BlockIndex,
    params: &ChainParams,
    extra_nonce: &mut ExtraNonce,
) -> Result<(), AssemblyError> {
    if extra_nonce.hash_prev_block != block.header.prev_block_hash {
        extra_nonce.value = 0;
        extra_nonce.hash_prev_block = block.header.prev_block_hash;
    }
    extra_nonce.value += 1;
    let height = prev.height + 1;

    let mut script_sig = Vec::new();
    push_int(&mut script_sig, height as i64);
    push_data(&mut script_sig, &encode_num(extra_nonce.value as i64));
    script_sig.extend_from_slice(&params.coinbase_flags);
    if script_sig.len() > MAX_COINBASE_SCRIPTSIG_SIZE {
        return Err(AssemblyError::CoinbaseScriptTooLarge(script_sig.len()));
    }

    let coinbase = block.vtx.first_mut().ok_or(AssemblyError::MissingCoinbase)?;
    let mut updated = coinbase.as_ref().clone();
    let input = updated.vin.first_mut().ok_or(AssemblyError::MissingCoinbase)?;
    input.scriptsig = script_sig;
    updated.refresh_metadata();
    *coinbase = Arc::new(updated);

    block.header.merkle_root = block_merkle_root(block);
    trace!(extra_nonce = extra_nonce.value, height, "incremented extra nonce");
    Ok(())
}
