use crate::parsing::transaction_structs::Transaction;
use crate::validation::utils::varint;
use crate::validation::validate_parsing::{serialize_input, serialize_output};

pub const WITNESS_SCALE_FACTOR: u64 = 4;
// policy weight charged per signature operation when computing virtual size
pub const DEFAULT_BYTES_PER_SIGOP: u64 = 20;

// Weight multipliers for calculation of weight units from bytes:
// -------------------
// Field	Multiplier
// version	x4
// marker	x1
// flag		x1
// input	x4
// output	x4
// witness	x1
// locktime	x4

// returns: true if any &Transaction input contains a witness field
pub fn is_segwit(tx: &Transaction) -> bool {
    tx.vin
        .iter()
        .any(|txin| txin.witness.as_ref().is_some_and(|w| !w.is_empty()))
}

// returns: size of the complete input part of the transaction
fn input_weight_sum(tx: &Transaction) -> u64 {
    let mut input_weight_sum = varint(tx.vin.len() as u64).len() as u64;
    for txin in &tx.vin {
        input_weight_sum += serialize_input(txin).len() as u64;
    }
    input_weight_sum
}

// returns: size of the complete output part of the transaction
fn output_weight_sum(tx: &Transaction) -> u64 {
    let mut output_weight_sum = varint(tx.vout.len() as u64).len() as u64;
    for txout in &tx.vout {
        output_weight_sum += serialize_output(txout).len() as u64;
    }
    output_weight_sum
}

// returns: size in bytes of all witnesses contained in a transaction including
// the stack item counts and element length prefixes
fn witness_weight_sum(tx: &Transaction) -> u64 {
    let mut witness_weight_sum = 0;
    for txin in &tx.vin {
        match &txin.witness {
            Some(stack) => {
                witness_weight_sum += varint(stack.len() as u64).len() as u64;
                for element in stack {
                    witness_weight_sum +=
                        varint(element.len() as u64).len() as u64 + element.len() as u64;
                }
            }
            None => witness_weight_sum += 1,
        };
    }
    witness_weight_sum
}

// calls the functions to calculate the weight of the different components
// of the transactions. Multiplies and sums them.
// returns: tx weight
pub fn calculate_weight(tx: &Transaction) -> u64 {
    let mut weight: u64 = 4 * WITNESS_SCALE_FACTOR; // Version: 4 bytes x 4
    if is_segwit(tx) {
        weight += 2; // marker 1 byte + flag 1 byte
        weight += witness_weight_sum(tx); // weight of all witnesses in tx
    };
    weight += input_weight_sum(tx) * WITNESS_SCALE_FACTOR;
    weight += output_weight_sum(tx) * WITNESS_SCALE_FACTOR;
    weight += 4 * WITNESS_SCALE_FACTOR; // 4 bytes locktime * 4
    weight
}

// virtual size in vbytes, rounded up, with the sigop cost charged at
// DEFAULT_BYTES_PER_SIGOP when it dominates the weight
pub fn virtual_size(weight: u64, sigop_cost: u64) -> u64 {
    let adjusted = weight.max(sigop_cost * DEFAULT_BYTES_PER_SIGOP);
    (adjusted + WITNESS_SCALE_FACTOR - 1) / WITNESS_SCALE_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_json;
    use crate::validation::validate_parsing::serialize_transaction;

    #[test]
    fn witness_bytes_count_once() {
        let json = r#"{
            "version": 2, "locktime": 0,
            "vin": [{"txid": "0000000000000000000000000000000000000000000000000000000000000002",
                     "vout": 1, "scriptsig": "", "witness": ["aaaa", "bb"], "sequence": 0,
                     "prevout": {"scriptpubkey": "00", "scriptpubkey_type": "v0_p2wpkh", "value": 10}}],
            "vout": [{"scriptpubkey": "51", "value": 5}]
        }"#;
        let tx = parse_json(json).unwrap();
        let stripped = serialize_transaction(&tx, false).len() as u64;
        let full = serialize_transaction(&tx, true).len() as u64;
        assert_eq!(calculate_weight(&tx), stripped * 3 + full);
    }

    #[test]
    fn virtual_size_rounds_up_and_respects_sigops() {
        assert_eq!(virtual_size(401, 0), 101);
        assert_eq!(virtual_size(400, 100), 500);
    }
}
