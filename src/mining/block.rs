// Block, header and template data structures

use crate::chain::BlockHash;
use crate::parsing::transaction_structs::Transaction;
use crate::policy::Amount;
use crate::validation::utils::{double_hash, varint};
use crate::validation::weight_calculation::WITNESS_SCALE_FACTOR;
use byteorder::{LittleEndian, WriteBytesExt};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block_hash: BlockHash,
    pub merkle_root: [u8; 32],
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    // serializes the header in the 80 byte wire layout
    pub fn serialize(&self) -> Vec<u8> {
        let mut block_header: Vec<u8> = Vec::with_capacity(80);
        // writes into a Vec<u8> cannot fail
        let _ = block_header.write_i32::<LittleEndian>(self.version);
        block_header.extend(self.prev_block_hash); // natural byte order
        block_header.extend(self.merkle_root);
        let _ = block_header.write_u32::<LittleEndian>(self.time);
        let _ = block_header.write_u32::<LittleEndian>(self.bits);
        let _ = block_header.write_u32::<LittleEndian>(self.nonce);
        block_header
    }

    pub fn hash(&self) -> BlockHash {
        double_hash(&self.serialize())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub header: BlockHeader,
    pub vtx: Vec<Arc<Transaction>>,
}

impl Block {
    // header and transaction count are non-witness data
    pub fn weight(&self) -> u64 {
        let overhead = 80 + varint(self.vtx.len() as u64).len() as u64;
        overhead * WITNESS_SCALE_FACTOR + self.vtx.iter().map(|tx| tx.meta.weight).sum::<u64>()
    }

    pub fn sigop_cost(&self) -> u64 {
        self.vtx.iter().map(|tx| tx.meta.sigop_cost).sum()
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.vtx.first().map(|tx| tx.as_ref())
    }
}

/// Counters of one assembly pass, reported alongside the template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub packages_selected: usize,
    pub descendants_updated: usize,
    /// Selected transactions, coinbase and coinstake excluded.
    pub block_tx_count: usize,
    /// Running block weight including the coinbase reservation.
    pub block_weight: u64,
    pub block_sigops_cost: u64,
    pub fees: Amount,
    pub capacity_rejections: usize,
    pub policy_rejections: usize,
}

/// A candidate block plus the per-transaction fee and sigop arrays. Index 0 of
/// both arrays belongs to the coinbase.
#[derive(Debug, Clone, Default)]
pub struct BlockTemplate {
    pub block: Block,
    pub tx_fees: Vec<Amount>,
    pub tx_sigops_cost: Vec<i64>,
    pub coinbase_commitment: Vec<u8>,
    pub stats: AssemblyStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_serializes_to_80_bytes() {
        let header = BlockHeader {
            version: 0x20000000,
            prev_block_hash: [0x11; 32],
            merkle_root: [0x22; 32],
            time: 1_700_000_000,
            bits: 0x1f00ffff,
            nonce: 7,
        };
        let bytes = header.serialize();
        assert_eq!(bytes.len(), 80);
        assert_eq!(&bytes[..4], &[0x00, 0x00, 0x00, 0x20]);
        assert_eq!(&bytes[4..36], &[0x11; 32]);
        assert_eq!(&bytes[76..], &7u32.to_le_bytes());
        assert_eq!(header.hash(), double_hash(&bytes));
    }

    #[test]
    fn empty_block_weight_counts_header() {
        assert_eq!(Block::default().weight(), 81 * 4);
    }
}
