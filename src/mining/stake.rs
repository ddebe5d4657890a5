use super::block::Block;
use crate::parsing::transaction_structs::Transaction;
use crate::policy::Amount;

/// Amounts the coinstake may claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeReward {
    pub fees: Amount,
    pub subsidy: Amount,
    pub masternode_reward: Amount,
}

/// Wallet side of staking: finds a kernel and signs the coinstake for the
/// block assembled so far. Called after transaction selection.
pub trait StakeProvider {
    /// returns: None when no stake could be found for this time slot
    fn create_coinstake(&self, block: &Block, reward: &StakeReward) -> Option<Transaction>;
}
