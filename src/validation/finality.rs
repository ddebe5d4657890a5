use crate::parsing::transaction_structs::Transaction;

// locktimes below this are block heights, at or above it unix timestamps
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

// A transaction is final when its locktime is unset, already in the past
// relative to the candidate block height (or lock time cutoff), or when all
// inputs opted out of locktime through a final sequence number.
pub fn is_final_tx(tx: &Transaction, block_height: u32, block_time: i64) -> bool {
    if tx.locktime == 0 {
        return true;
    }
    let lock_limit = if tx.locktime < LOCKTIME_THRESHOLD {
        block_height as i64
    } else {
        block_time
    };
    if (tx.locktime as i64) < lock_limit {
        return true;
    }
    tx.vin.iter().all(|txin| txin.sequence == SEQUENCE_FINAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_json;

    fn tx(locktime: u32, sequence: u32) -> Transaction {
        parse_json(&format!(
            r#"{{"version": 1, "locktime": {locktime},
                "vin": [{{"txid": "0000000000000000000000000000000000000000000000000000000000000001",
                         "vout": 0, "sequence": {sequence}}}],
                "vout": [{{"scriptpubkey": "51", "value": 1}}]}}"#
        ))
        .unwrap()
    }

    #[test]
    fn height_locktime() {
        assert!(is_final_tx(&tx(0, 0), 100, 0));
        assert!(is_final_tx(&tx(99, 0), 100, 0));
        assert!(!is_final_tx(&tx(100, 0), 100, 0));
        assert!(is_final_tx(&tx(100, SEQUENCE_FINAL), 100, 0));
    }

    #[test]
    fn time_locktime_uses_cutoff() {
        let locked = tx(LOCKTIME_THRESHOLD + 10, 0);
        assert!(!is_final_tx(&locked, 1, (LOCKTIME_THRESHOLD + 10) as i64));
        assert!(is_final_tx(&locked, 1, (LOCKTIME_THRESHOLD + 11) as i64));
    }
}
