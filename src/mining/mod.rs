pub mod assembler;
pub mod block;
pub mod coinbase;
pub mod header;
pub mod modified_entry;
pub mod rewards;
pub mod stake;
pub mod validity;

pub use self::assembler::{AssemblyServices, BlockAssembler, MAX_CONSECUTIVE_FAILURES};
pub use self::block::{AssemblyStats, Block, BlockHeader, BlockTemplate};
pub use self::header::{increment_extra_nonce, update_time, ExtraNonce};
pub use self::rewards::{MemoryLedger, UplineLedger, WalletSelector};
pub use self::stake::{StakeProvider, StakeReward};
pub use self::validity::StructuralValidator;

use crate::validation::validate_parsing::serialize_transaction;
use crate::validation::weight_calculation::is_segwit;

/// Hex encoded parts of a template, as written by the driver binary.
pub struct EncodedBlock {
    pub header_hex: String,
    pub coinbase_tx_hex: String,
    pub txids_hex: Vec<String>,
}

// hex encodes header and coinbase tx and lists the txids of all transactions,
// coinbase included, in block order
pub fn encode_block(block: &Block) -> EncodedBlock {
    let header_hex = hex::encode(block.header.serialize());
    let coinbase_tx_hex = block
        .coinbase()
        .map(|coinbase| hex::encode(serialize_transaction(coinbase, is_segwit(coinbase))))
        .unwrap_or_default();
    let txids_hex = block.vtx.iter().map(|tx| tx.meta.txid.to_string()).collect();
    EncodedBlock {
        header_hex,
        coinbase_tx_hex,
        txids_hex,
    }
}
