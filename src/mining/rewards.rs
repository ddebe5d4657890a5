//! Coinbase reward outputs, including the upline distribution that pays ten
//! levels of sponsors recorded in a side ledger.

use crate::error::{AssemblyError, ParseError};
use crate::parsing::transaction_structs::TxOut;
use crate::policy::Amount;
use crate::validation::utils::p2pkh_script;
use secp256k1::PublicKey;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Number of sponsor levels paid by the upline scheme.
pub const UPLINE_DEPTH: usize = 10;
// share of the subsidy distributed to the upline, in basis points (33.34%)
const UPLINE_SHARE_BPS: Amount = 3334;
const DEFAULT_SELECTOR: &str = "ok";
const SELECTOR_SEPARATOR: &str = "**";

/// Which wallet the miner's own key is looked up under. `"ok"` selects the
/// default wallet, anything else must read `<capabilities>**<wallet name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSelector {
    pub capabilities: String,
    pub wallet_name: String,
}

impl FromStr for WalletSelector {
    type Err = AssemblyError;

    fn from_str(selector: &str) -> Result<Self, Self::Err> {
        if selector == DEFAULT_SELECTOR {
            return Ok(WalletSelector::default());
        }
        let (capabilities, wallet_name) = selector
            .split_once(SELECTOR_SEPARATOR)
            .ok_or_else(|| AssemblyError::InvalidSelector(selector.to_string()))?;
        Ok(WalletSelector {
            capabilities: capabilities.to_string(),
            wallet_name: wallet_name.to_string(),
        })
    }
}

/// Read access to the sponsor ledger and the wallet's key ownership.
pub trait UplineLedger {
    /// Key registered for a wallet; `""` names the default wallet.
    fn own_key(&self, wallet_name: &str) -> Option<String>;

    /// Sponsor recorded for a key.
    fn sponsor_of(&self, key: &str) -> Option<String>;

    fn is_mine(&self, wallet_name: &str, key: &str) -> bool;
}

/// Ledger held in memory, loadable from a JSON document:
/// `{"own_keys": {...}, "sponsors": {...}, "wallet_keys": {...}}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoryLedger {
    pub own_keys: HashMap<String, String>,
    pub sponsors: HashMap<String, String>,
    pub wallet_keys: HashMap<String, BTreeSet<String>>,
}

impl MemoryLedger {
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
}

impl UplineLedger for MemoryLedger {
    fn own_key(&self, wallet_name: &str) -> Option<String> {
        self.own_keys.get(wallet_name).cloned()
    }

    fn sponsor_of(&self, key: &str) -> Option<String> {
        self.sponsors.get(key).cloned()
    }

    fn is_mine(&self, wallet_name: &str, key: &str) -> bool {
        self.own_keys.get(wallet_name).is_some_and(|own| own == key)
            || self
                .wallet_keys
                .get(wallet_name)
                .is_some_and(|keys| keys.contains(key))
    }
}

/// The miner's key and the sponsors found above it, nearest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UplineChain {
    pub own_key: Option<String>,
    pub hops: Vec<String>,
}

/// Follows sponsor pointers from the miner's own key for at most
/// [`UPLINE_DEPTH`] hops, stopping at the first empty hop.
pub fn walk_upline(ledger: &dyn UplineLedger, selector: &WalletSelector) -> UplineChain {
    let Some(own_key) = ledger
        .own_key(&selector.wallet_name)
        .filter(|key| !key.is_empty())
    else {
        return UplineChain::default();
    };
    let mut hops = Vec::with_capacity(UPLINE_DEPTH);
    let mut current = own_key.clone();
    while hops.len() < UPLINE_DEPTH {
        match ledger.sponsor_of(&current) {
            Some(sponsor) if !sponsor.is_empty() => {
                hops.push(sponsor.clone());
                current = sponsor;
            }
            _ => break,
        }
    }
    debug!(own_key = %own_key, hops = hops.len(), "walked upline");
    UplineChain {
        own_key: Some(own_key),
        hops,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardSplit {
    pub miner: Amount,
    pub upline_each: Amount,
}

impl RewardSplit {
    /// Miner keeps fees and the subsidy minus the upline share, which is
    /// split evenly across the ten levels.
    pub fn with_upline(fees: Amount, subsidy: Amount) -> Self {
        let distribution = subsidy * UPLINE_SHARE_BPS / 10_000;
        RewardSplit {
            miner: fees + subsidy - distribution,
            upline_each: distribution / UPLINE_DEPTH as Amount,
        }
    }

    pub fn without_upline(fees: Amount, subsidy: Amount, masternode_reward: Amount) -> Self {
        RewardSplit {
            miner: fees + subsidy - masternode_reward,
            upline_each: 0,
        }
    }
}

fn parse_pubkey(key: &str) -> Result<Vec<u8>, AssemblyError> {
    PublicKey::from_str(key)
        .map(|pubkey| pubkey.serialize().to_vec())
        .map_err(|err| AssemblyError::InvalidTree(format!("{key} is not a public key: {err}")))
}

fn payout(script: Vec<u8>, script_type: &str, value: Amount) -> Result<TxOut, AssemblyError> {
    let value = u64::try_from(value)
        .map_err(|_| AssemblyError::InvalidTree(format!("negative reward {value}")))?;
    Ok(TxOut {
        scriptpubkey: script,
        scriptpubkey_type: script_type.to_string(),
        value,
    })
}

/// Inputs of the proof-of-work coinbase payout.
#[derive(Debug, Clone, Copy)]
pub struct RewardInputs<'a> {
    pub fees: Amount,
    pub subsidy: Amount,
    pub masternode_reward: Amount,
    /// Paid when the wallet has no registered key.
    pub fallback_script: &'a [u8],
    pub upline_active: bool,
}

/// Coinbase outputs with the miner at index 0, followed by one output per
/// upline level while the scheme is active and the miner has a key.
pub fn coinbase_outputs(
    ledger: &dyn UplineLedger,
    selector: &WalletSelector,
    inputs: RewardInputs<'_>,
) -> Result<Vec<TxOut>, AssemblyError> {
    let chain = walk_upline(ledger, selector);
    let Some(own_key) = chain.own_key else {
        let split = RewardSplit::without_upline(inputs.fees, inputs.subsidy, inputs.masternode_reward);
        return Ok(vec![payout(inputs.fallback_script.to_vec(), "unknown", split.miner)?]);
    };
    let miner_script = p2pkh_script(&parse_pubkey(&own_key)?);

    if !inputs.upline_active {
        let split = RewardSplit::without_upline(inputs.fees, inputs.subsidy, inputs.masternode_reward);
        return Ok(vec![payout(miner_script, "p2pkh", split.miner)?]);
    }

    if chain.hops.len() < UPLINE_DEPTH {
        return Err(AssemblyError::InvalidTree(format!(
            "upline of {own_key} breaks after {} of {UPLINE_DEPTH} levels",
            chain.hops.len()
        )));
    }
    let split = RewardSplit::with_upline(inputs.fees, inputs.subsidy);
    let mut outputs = Vec::with_capacity(UPLINE_DEPTH + 1);
    outputs.push(payout(miner_script, "p2pkh", split.miner)?);
    for (level, hop) in chain.hops.iter().enumerate() {
        if ledger.is_mine(&selector.wallet_name, hop) {
            return Err(AssemblyError::InvalidTree(format!(
                "level {} sponsor {hop} belongs to the mining wallet",
                level + 1
            )));
        }
        outputs.push(payout(p2pkh_script(&parse_pubkey(hop)?), "p2pkh", split.upline_each)?);
    }
    Ok(outputs)
}
