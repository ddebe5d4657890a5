use crate::parsing::transaction_structs::Transaction;

// 21 million coins in satoshi
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

// checks the input sum of the passed &mut Transaction against the output sum
// to prevent money creation. Also checks if there are inputs and outputs.
// Sets the delta between input and output as fee (in satoshi) in the &mut Transaction.
// returns: true if valid
pub fn validate_values_and_set_fee(tx: &mut Transaction) -> bool {
    if tx.vin.is_empty() || tx.vout.is_empty() {
        // no in or outputs
        return false;
    }
    let mut input_sum: u64 = 0;
    for txin in &tx.vin {
        match &txin.prevout {
            Some(prevout) => input_sum = input_sum.saturating_add(prevout.value),
            None => return false, // unknown spent value
        }
    }
    let output_sum = tx
        .vout
        .iter()
        .fold(0u64, |sum, txout| sum.saturating_add(txout.value));
    if input_sum < output_sum {
        // no inflation!
        return false;
    }
    if input_sum > MAX_MONEY || output_sum > MAX_MONEY {
        return false;
    };
    tx.meta.fee = input_sum - output_sum;
    true
}

// checks if feerate is below 1sat/vbyte which is not being relayed (standard)
// returns: true if >= 1 sat/vbyte
pub fn validate_feerate(tx: &Transaction) -> bool {
    let vbyte_size: u64 = (tx.meta.weight / 4).max(1);
    tx.meta.fee / vbyte_size >= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_json;

    fn tx_with_values(input: u64, output: u64) -> Transaction {
        parse_json(&format!(
            r#"{{"version": 1, "locktime": 0,
                "vin": [{{"txid": "0000000000000000000000000000000000000000000000000000000000000001",
                         "vout": 0, "sequence": 0,
                         "prevout": {{"scriptpubkey": "51", "scriptpubkey_type": "x", "value": {input}}}}}],
                "vout": [{{"scriptpubkey": "51", "value": {output}}}]}}"#
        ))
        .unwrap()
    }

    #[test]
    fn fee_is_input_minus_output() {
        let mut tx = tx_with_values(1000, 600);
        assert!(validate_values_and_set_fee(&mut tx));
        assert_eq!(tx.meta.fee, 400);
    }

    #[test]
    fn rejects_inflation() {
        let mut tx = tx_with_values(600, 1000);
        assert!(!validate_values_and_set_fee(&mut tx));
    }
}
