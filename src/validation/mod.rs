pub mod finality;
pub mod sigops;
pub mod utils;
pub mod validate_parsing;
pub mod validate_values;
pub mod weight_calculation;

use self::sigops::transaction_sigop_cost;
use self::validate_parsing::set_txid_and_wtxid;
use self::validate_values::{validate_feerate, validate_values_and_set_fee};
use self::weight_calculation::calculate_weight;
use crate::parsing::transaction_structs::Transaction;

// largest weight a single non-coinbase transaction may have, leaving some space
// for header and coinbase tx
pub const MAX_STANDARD_TX_WEIGHT: u64 = 400_000;

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String), // String = reason
}

// Sanity checks to sort out impossible transactions before admitting them
// to the mempool. Gets called on each Transaction.
// Also sets txid, weight, fee and sigop cost in the Transaction while
// calculating it for the checks. Script and signature validity are left to
// the node's consensus code.
// returns: ValidationResult
fn sanity_checks(tx: &mut Transaction) -> ValidationResult {
    if tx.is_coinbase() {
        return ValidationResult::Invalid("Coinbase outside of a block.".to_string());
    }
    if !validate_values_and_set_fee(tx) {
        return ValidationResult::Invalid("Values don't add up.".to_string());
    }
    set_txid_and_wtxid(tx);
    tx.meta.weight = calculate_weight(tx);
    if tx.meta.weight > MAX_STANDARD_TX_WEIGHT {
        return ValidationResult::Invalid("Transaction weight too high!".to_string());
    }
    if !validate_feerate(tx) {
        return ValidationResult::Invalid("too low feerate".to_string());
    }
    tx.meta.sigop_cost = transaction_sigop_cost(tx);
    ValidationResult::Valid
}

// implements validate function that fills the metadata and does sanity checks
// returns: ValidationResult enum either ::Valid or ::Invalid(reason String)
impl Transaction {
    pub fn validate(&mut self) -> ValidationResult {
        sanity_checks(self)
    }

    // computes txid, weight and sigop cost without policy checks,
    // used for transactions the miner builds itself
    pub fn refresh_metadata(&mut self) {
        set_txid_and_wtxid(self);
        self.meta.weight = calculate_weight(self);
        self.meta.sigop_cost = transaction_sigop_cost(self);
    }
}
