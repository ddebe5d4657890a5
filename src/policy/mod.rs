pub mod fee_rate;

pub use self::fee_rate::{ancestor_score, Amount, FeeRate, PackageFeeRate, COIN};

/// Default minimum feerate for transactions to be mined, in sat/kvB.
pub const DEFAULT_BLOCK_MIN_TX_FEE: Amount = 1000;
/// Default block weight target when no explicit limit is configured.
pub const DEFAULT_BLOCK_MAX_WEIGHT: u64 = 3_996_000;
