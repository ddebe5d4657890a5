use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;

/// Amount in satoshi. Signed because prioritisation deltas may push a
/// modified fee below zero.
pub type Amount = i64;

pub const COIN: Amount = 100_000_000;

/// Minimum relay/mining fee policy, expressed in satoshi per 1000 virtual bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct FeeRate {
    sat_per_kvb: Amount,
}

impl FeeRate {
    pub const fn from_sat_per_kvb(sat_per_kvb: Amount) -> Self {
        FeeRate { sat_per_kvb }
    }

    /// Rate paid by `fee` over `size` virtual bytes.
    pub fn from_fee_and_size(fee: Amount, size: u64) -> Self {
        if size == 0 {
            return FeeRate::default();
        }
        let sat_per_kvb = fee as i128 * 1000 / size as i128;
        FeeRate {
            sat_per_kvb: sat_per_kvb.clamp(Amount::MIN as i128, Amount::MAX as i128) as Amount,
        }
    }

    pub fn sat_per_kvb(&self) -> Amount {
        self.sat_per_kvb
    }

    /// Fee required for `size` virtual bytes at this rate. A non-zero rate
    /// never rounds a non-empty size down to a zero fee.
    pub fn get_fee(&self, size: u64) -> Amount {
        let fee = self.sat_per_kvb as i128 * size as i128 / 1000;
        let fee = fee.clamp(Amount::MIN as i128, Amount::MAX as i128) as Amount;
        if fee == 0 && size != 0 {
            return self.sat_per_kvb.signum();
        }
        fee
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:08} BTC/kvB",
            self.sat_per_kvb / COIN,
            (self.sat_per_kvb % COIN).abs()
        )
    }
}

/// Fee and size of a package, ordered by feerate without division.
#[derive(Clone, Copy, Debug, Eq)]
pub struct PackageFeeRate {
    pub fee: Amount,
    pub size: u64,
}

impl PackageFeeRate {
    pub fn new(fee: Amount, size: u64) -> Self {
        PackageFeeRate { fee, size }
    }
}

impl Ord for PackageFeeRate {
    fn cmp(&self, other: &Self) -> Ordering {
        // (self.fee / self.size) > (other.fee / other.size) ==>
        // (self.fee * other.size) > (other.fee * self.size)
        let lhs = self.fee as i128 * other.size as i128;
        let rhs = other.fee as i128 * self.size as i128;
        lhs.cmp(&rhs)
    }
}

impl PartialEq for PackageFeeRate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl PartialOrd for PackageFeeRate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Selection score of a transaction: the lower of its own feerate and the
/// feerate of its ancestor package.
pub fn ancestor_score(
    modified_fee: Amount,
    tx_size: u64,
    fees_with_ancestors: Amount,
    size_with_ancestors: u64,
) -> PackageFeeRate {
    let own = PackageFeeRate::new(modified_fee, tx_size);
    let package = PackageFeeRate::new(fees_with_ancestors, size_with_ancestors);
    // a tie keeps the package values, matching the mempool index
    if own < package {
        own
    } else {
        package
    }
}
