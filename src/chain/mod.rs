pub mod oracles;
pub mod params;

pub use self::oracles::{
    BlockValidator, FixedWork, HalvingSchedule, RewardOracle, ValidationFailure, WorkOracle,
};
pub use self::params::ChainParams;

use crate::mempool::TxMemPool;
use parking_lot::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// Block hash in natural (internal) byte order.
pub type BlockHash = [u8; 32];

/// The parts of a chain tip block assembly builds on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIndex {
    pub hash: BlockHash,
    pub height: u32,
    pub time: u32,
    pub median_time_past: i64,
    pub bits: u32,
}

#[derive(Debug, Default, Clone)]
pub struct ChainState {
    tip: Option<BlockIndex>,
}

impl ChainState {
    pub fn new(tip: BlockIndex) -> Self {
        ChainState { tip: Some(tip) }
    }

    pub fn tip(&self) -> Option<&BlockIndex> {
        self.tip.as_ref()
    }

    pub fn set_tip(&mut self, tip: BlockIndex) {
        self.tip = Some(tip);
    }
}

/// Chain state and mempool behind one lock order: chain first, then mempool.
/// Every path that needs both goes through [`NodeState::lock_chain_and_pool`].
#[derive(Debug, Default)]
pub struct NodeState {
    chain: Mutex<ChainState>,
    mempool: Mutex<TxMemPool>,
}

/// Both guards, released together when dropped.
pub struct ChainAndPool<'a> {
    pub chain: MutexGuard<'a, ChainState>,
    pub mempool: MutexGuard<'a, TxMemPool>,
}

impl NodeState {
    pub fn new(chain: ChainState, mempool: TxMemPool) -> Self {
        NodeState {
            chain: Mutex::new(chain),
            mempool: Mutex::new(mempool),
        }
    }

    pub fn lock_chain_and_pool(&self) -> ChainAndPool<'_> {
        let chain = self.chain.lock();
        let mempool = self.mempool.lock();
        ChainAndPool { chain, mempool }
    }

    /// Mempool alone; must not be held while calling `lock_chain_and_pool`.
    pub fn lock_mempool(&self) -> MutexGuard<'_, TxMemPool> {
        self.mempool.lock()
    }
}

/// Current unix time in seconds.
pub fn adjusted_time() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TxBuilder;

    #[test]
    fn chain_and_pool_lock_together() {
        let node = NodeState::default();
        {
            let mut locked = node.lock_chain_and_pool();
            assert!(locked.chain.tip().is_none());
            locked.chain.set_tip(BlockIndex {
                hash: [2u8; 32],
                height: 5,
                time: 10,
                median_time_past: 9,
                bits: 0x207fffff,
            });
            locked.mempool.add_unchecked(TxBuilder::new(1).build()).unwrap();
        }
        assert_eq!(node.lock_mempool().len(), 1);
        let locked = node.lock_chain_and_pool();
        assert_eq!(locked.chain.tip().map(|tip| tip.height), Some(5));
    }
}
