//! Services block assembly consumes but does not implement: difficulty,
//! subsidy schedule and full block validation.

use super::params::ChainParams;
use super::BlockIndex;
use crate::mining::block::{Block, BlockHeader};
use crate::policy::{Amount, COIN};
use std::fmt;

pub trait WorkOracle {
    /// Compact difficulty bits the block built on `prev` must carry.
    fn next_work_required(
        &self,
        prev: &BlockIndex,
        header: &BlockHeader,
        params: &ChainParams,
        proof_of_stake: bool,
    ) -> u32;
}

pub trait RewardOracle {
    fn block_subsidy(&self, height: u32) -> Amount;

    /// Part of the subsidy paid to masternodes/stakers instead of the miner.
    fn masternode_reward(&self, height: u32, subsidy: Amount) -> Amount;
}

/// Structured reason a block failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub reason: String,
    pub debug_message: Option<String>,
}

impl ValidationFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        ValidationFailure {
            reason: reason.into(),
            debug_message: None,
        }
    }

    pub fn with_debug(mut self, message: impl Into<String>) -> Self {
        self.debug_message = Some(message.into());
        self
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.debug_message {
            Some(debug) => write!(f, "{}, {}", self.reason, debug),
            None => f.write_str(&self.reason),
        }
    }
}

pub trait BlockValidator {
    fn test_block_validity(
        &self,
        params: &ChainParams,
        block: &Block,
        prev: &BlockIndex,
    ) -> Result<(), ValidationFailure>;
}

/// Always returns the same bits.
#[derive(Debug, Clone, Copy)]
pub struct FixedWork(pub u32);

impl WorkOracle for FixedWork {
    fn next_work_required(&self, _: &BlockIndex, _: &BlockHeader, _: &ChainParams, _: bool) -> u32 {
        self.0
    }
}

/// Subsidy halving every `halving_interval` blocks, with a fixed percentage of
/// the subsidy going to masternodes.
#[derive(Debug, Clone, Copy)]
pub struct HalvingSchedule {
    pub initial_subsidy: Amount,
    pub halving_interval: u32,
    pub masternode_percent: Amount,
}

impl Default for HalvingSchedule {
    fn default() -> Self {
        HalvingSchedule {
            initial_subsidy: 50 * COIN,
            halving_interval: 210_000,
            masternode_percent: 0,
        }
    }
}

impl RewardOracle for HalvingSchedule {
    fn block_subsidy(&self, height: u32) -> Amount {
        let halvings = height / self.halving_interval.max(1);
        if halvings >= 64 {
            return 0;
        }
        self.initial_subsidy >> halvings
    }

    fn masternode_reward(&self, _height: u32, subsidy: Amount) -> Amount {
        subsidy * self.masternode_percent / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsidy_halves() {
        let schedule = HalvingSchedule::default();
        assert_eq!(schedule.block_subsidy(0), 50 * COIN);
        assert_eq!(schedule.block_subsidy(210_000), 25 * COIN);
        assert_eq!(schedule.block_subsidy(840_000), 625_000_000);
        assert_eq!(schedule.block_subsidy(64 * 210_000), 0);
    }

    #[test]
    fn masternode_share_is_percentage() {
        let schedule = HalvingSchedule {
            masternode_percent: 40,
            ..HalvingSchedule::default()
        };
        assert_eq!(schedule.masternode_reward(1, 10 * COIN), 4 * COIN);
    }
}
