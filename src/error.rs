//! Error types for mempool bookkeeping, template assembly and mempool loading.

use crate::parsing::transaction_structs::Txid;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the dependency graph view.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction {0} already in mempool")]
    TxAlreadyExists(Txid),

    #[error("transaction {0} not found in mempool")]
    TxNotFound(Txid),

    #[error("{child} spends {parent} but was added first")]
    ChildAddedBeforeParent { parent: Txid, child: Txid },

    /// Ancestor or descendant limits were exceeded while walking the graph.
    #[error("package limits exceeded: {0}")]
    LimitsExceeded(String),
}

/// Fatal block construction errors. Recoverable rejections (capacity, policy)
/// never surface here; they are counted in the assembly statistics.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A missing, malformed or self-owned entry in the upline reward chain.
    #[error("invalid upline tree: {0}")]
    InvalidTree(String),

    #[error("malformed capability selector `{0}`")]
    InvalidSelector(String),

    #[error("no chain tip available")]
    MissingTip,

    #[error("TestBlockValidity failed: {0}")]
    BlockValidity(String),

    #[error("proof-of-stake not started yet (block time {block_time}, start {start_time})")]
    StakingNotStarted { block_time: u32, start_time: u32 },

    #[error("block has no coinbase transaction")]
    MissingCoinbase,

    #[error("coinbase scriptSig too large ({0} bytes)")]
    CoinbaseScriptTooLarge(usize),

    #[error(transparent)]
    Mempool(#[from] MempoolError),
}

/// Errors while loading mempool transactions from disk.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json content in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
