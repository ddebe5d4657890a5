mod utils_main;

use block_template_builder::chain::{
    BlockIndex, ChainParams, ChainState, FixedWork, HalvingSchedule, NodeState,
};
use block_template_builder::config::AssemblerOptions;
use block_template_builder::mempool::TxMemPool;
use block_template_builder::mining::{
    encode_block, AssemblyServices, BlockAssembler, EncodedBlock, MemoryLedger,
    StructuralValidator,
};
use block_template_builder::parsing::parse_transactions_from_dir;
use block_template_builder::parsing::transaction_structs::{Transaction, Txid};
use block_template_builder::validation::ValidationResult;
use clap::Parser;
use hex_literal::hex as hexlit;
use std::collections::HashSet;
use std::fs::File;
use std::io::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use utils_main::remove_invalid_transactions;

// previous block and target of the exercise chain
const PREV_BLOCK_HASH: [u8; 32] =
    hexlit!("00000000000000000001901b9f3b6c7a0c34b20b29b950d0d8ffa36c63979c1c");
const TARGET_BITS: u32 = 0x1f00ffff;

/// Builds a block template from a directory of mempool transactions.
#[derive(Parser, Debug)]
#[command(name = "block-template-builder", version)]
struct Args {
    /// Directory holding one JSON transaction per file
    #[arg(long, default_value = "../mempool")]
    mempool: PathBuf,
    /// Where the header, coinbase and txids are written
    #[arg(long, default_value = "../../output.txt")]
    output: PathBuf,
    /// JSON file with assembler options
    #[arg(long)]
    options: Option<PathBuf>,
    /// JSON file with the upline ledger
    #[arg(long)]
    ledger: Option<PathBuf>,
    /// Wallet selector, "ok" or "<capabilities>**<wallet>"
    #[arg(long, default_value = "ok")]
    selector: String,
    /// Hex scriptpubkey paid when the wallet has no ledger key
    #[arg(long, default_value = "001435f6de260c9f3bdee47524c473a6016c0c055cb9")]
    script_pubkey: String,
    /// Height of the block being built on
    #[arg(long, default_value_t = 839_652)]
    tip_height: u32,
}

fn install_tracing() {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .expect("valid default log filter");
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(false))
        .init();
}

// writes header hex, coinbase hex and one txid per line to output_path
fn output_block(mined_block: &EncodedBlock, output_path: &Path) {
    let mut output_file = File::create(output_path).expect("Unable to create output file");

    writeln!(output_file, "{}", mined_block.header_hex).expect("Unable to write to file");
    writeln!(output_file, "{}", mined_block.coinbase_tx_hex).expect("Unable to write to file");

    let len = mined_block.txids_hex.len();
    for (index, tx) in mined_block.txids_hex.iter().enumerate() {
        if index < len - 1 {
            writeln!(output_file, "{}", tx).expect("Unable to write to file");
        } else {
            write!(output_file, "{}", tx).expect("Unable to write to file");
        }
    }
}

// calls validate() on each Transaction in the passed Vec of Transaction
// returns: HashSet of the txids of all invalid transactions
fn validate_transactions(parsed_transactions: &mut [Transaction]) -> HashSet<Txid> {
    let mut invalid_transactions = HashSet::new();

    for tx in parsed_transactions {
        match tx.validate() {
            ValidationResult::Valid => {}
            ValidationResult::Invalid(reason) => {
                warn!(txid = %tx.meta.txid, %reason, "dropping transaction");
                invalid_transactions.insert(tx.meta.txid);
            }
        }
    }
    invalid_transactions
}

fn main() {
    install_tracing();
    let args = Args::parse();

    // parses all json transactions in a Vec of Transaction structs
    let mut parsed_transactions =
        parse_transactions_from_dir(&args.mempool).expect("Unable to read mempool directory");

    // txids of all transactions failing the sanity checks
    let invalid_transactions = validate_transactions(&mut parsed_transactions);
    let valid_transactions = remove_invalid_transactions(parsed_transactions, invalid_transactions);

    let options = match &args.options {
        Some(path) => AssemblerOptions::from_file(path).expect("Unable to load options"),
        None => AssemblerOptions::default(),
    };
    let ledger = match &args.ledger {
        Some(path) => MemoryLedger::from_file(path).expect("Unable to load ledger"),
        None => MemoryLedger::default(),
    };
    let script_pubkey = hex::decode(&args.script_pubkey).expect("script pubkey is not hex");

    // block hashes are displayed byte reversed
    let mut prev_hash = PREV_BLOCK_HASH;
    prev_hash.reverse();
    let tip = BlockIndex {
        hash: prev_hash,
        height: args.tip_height,
        time: 0,
        median_time_past: 0,
        bits: TARGET_BITS,
    };
    let node = NodeState::new(
        ChainState::new(tip),
        TxMemPool::from_transactions(valid_transactions),
    );

    let params = ChainParams::default();
    let work = FixedWork(TARGET_BITS);
    let schedule = HalvingSchedule::default();
    let assembler = BlockAssembler::new(
        &params,
        options,
        AssemblyServices {
            work: &work,
            rewards: &schedule,
            validator: &StructuralValidator,
        },
    );
    let template = assembler
        .create_new_block(&node, &script_pubkey, &args.selector, &ledger)
        .expect("block assembly failed");

    output_block(&encode_block(&template.block), &args.output);
    info!(
        transactions = template.stats.block_tx_count,
        fees = template.stats.fees,
        output = %args.output.display(),
        "done"
    );
}
