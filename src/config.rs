use crate::chain::params::MAX_BLOCK_WEIGHT;
use crate::error::ParseError;
use crate::policy::{FeeRate, DEFAULT_BLOCK_MAX_WEIGHT, DEFAULT_BLOCK_MIN_TX_FEE};
use serde::Deserialize;
use std::path::Path;

// weight kept free for the header and the coinbase
const MIN_BLOCK_WEIGHT_MARGIN: u64 = 4000;

/// Block assembly knobs, the equivalents of `-blockmintxfee`,
/// `-blockmaxweight`, `-printpriority` and `-blockversion`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AssemblerOptions {
    /// Packages paying less than this (sat per 1000 vbytes) end selection.
    pub block_min_fee_rate: FeeRate,
    pub block_max_weight: u64,
    pub print_priority: bool,
    pub include_witness: bool,
    /// Fixed block time instead of the adjusted clock.
    pub block_time: Option<u32>,
    /// Honoured only on chains that mine blocks on demand.
    pub block_version: Option<i32>,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        AssemblerOptions {
            block_min_fee_rate: FeeRate::from_sat_per_kvb(DEFAULT_BLOCK_MIN_TX_FEE),
            block_max_weight: DEFAULT_BLOCK_MAX_WEIGHT,
            print_priority: false,
            include_witness: true,
            block_time: None,
            block_version: None,
        }
    }
}

impl AssemblerOptions {
    pub fn from_file(path: &Path) -> Result<Self, ParseError> {
        let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ParseError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    // limit weight to between 4K and MAX_BLOCK_WEIGHT-4K for sanity
    pub fn clamped(mut self) -> Self {
        self.block_max_weight = self
            .block_max_weight
            .clamp(MIN_BLOCK_WEIGHT_MARGIN, MAX_BLOCK_WEIGHT - MIN_BLOCK_WEIGHT_MARGIN);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_is_clamped() {
        let low = AssemblerOptions {
            block_max_weight: 10,
            ..AssemblerOptions::default()
        };
        assert_eq!(low.clamped().block_max_weight, 4000);
        let high = AssemblerOptions {
            block_max_weight: 10_000_000,
            ..AssemblerOptions::default()
        };
        assert_eq!(high.clamped().block_max_weight, 3_996_000);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let options: AssemblerOptions =
            serde_json::from_str(r#"{"block_min_fee_rate": 5000, "print_priority": true}"#).unwrap();
        assert_eq!(options.block_min_fee_rate.sat_per_kvb(), 5000);
        assert!(options.print_priority);
        assert!(options.include_witness);
        assert_eq!(options.block_max_weight, DEFAULT_BLOCK_MAX_WEIGHT);
    }
}
