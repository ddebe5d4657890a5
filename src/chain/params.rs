use serde::Deserialize;
use serde_with::{hex::Hex, serde_as};

pub const MAX_BLOCK_WEIGHT: u64 = 4_000_000;
pub const MAX_BLOCK_SIGOPS_COST: u64 = 80_000;

/// Consensus constants and activation times consumed by block assembly.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    pub max_block_weight: u64,
    pub max_block_sigops_cost: u64,
    /// Appended to the height (and extra nonce) in coinbase scriptSigs.
    #[serde_as(as = "Hex")]
    pub coinbase_flags: Vec<u8>,
    pub block_version: i32,
    pub difficulty_adjustment_interval: u32,
    /// Testnet rule: updating the time may change the required work.
    pub pow_allow_min_difficulty_blocks: bool,
    /// Regtest: the configured block version override is honoured.
    pub mine_blocks_on_demand: bool,
    /// Lock time finality is judged against the tip's median time past.
    pub locktime_median_time_past: bool,
    /// First block time at which staking is allowed.
    pub pos_start_time: u32,
    /// From this block time on, retarget heights must be proof-of-work.
    pub pow_retarget_rule_time: Option<u32>,
    /// From this block time on, the upline reward scheme is no longer paid.
    pub upline_sunset_time: Option<u32>,
}

impl Default for ChainParams {
    fn default() -> Self {
        ChainParams {
            max_block_weight: MAX_BLOCK_WEIGHT,
            max_block_sigops_cost: MAX_BLOCK_SIGOPS_COST,
            coinbase_flags: Vec::new(),
            block_version: 0x20000000,
            difficulty_adjustment_interval: 2016,
            pow_allow_min_difficulty_blocks: false,
            mine_blocks_on_demand: false,
            locktime_median_time_past: true,
            pos_start_time: 0,
            pow_retarget_rule_time: None,
            upline_sunset_time: None,
        }
    }
}

impl ChainParams {
    pub fn regtest() -> Self {
        ChainParams {
            pow_allow_min_difficulty_blocks: true,
            mine_blocks_on_demand: true,
            difficulty_adjustment_interval: 150,
            ..ChainParams::default()
        }
    }

    pub fn upline_active(&self, block_time: u32) -> bool {
        self.upline_sunset_time.map_or(true, |sunset| block_time < sunset)
    }
}
