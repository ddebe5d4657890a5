use super::utils::*;
use super::weight_calculation::is_segwit;
use crate::parsing::transaction_structs::{Transaction, TxIn, TxOut, Txid};
use byteorder::{LittleEndian, WriteBytesExt};
use hex_literal::hex as hexlit;

// returns: txid of the double sha256 digest of bytes passed as argument
pub fn get_txid(preimage: &[u8]) -> Txid {
    Txid::from_natural_bytes(&double_hash(preimage))
}

// serialize given &TxIn to a byte-Vec<u8> for later use in assembling the full transaction
// used for calculation of txid
// returns: Vec<u8> of the byte serialized &TxIn
pub fn serialize_input(input: &TxIn) -> Vec<u8> {
    let mut serialized_input = get_outpoint(input);
    serialized_input.extend(varint(input.scriptsig.len() as u64));
    serialized_input.extend(&input.scriptsig);
    serialized_input.extend_from_slice(&input.sequence.to_le_bytes());
    serialized_input
}

// serialize given &TxOut to a byte-Vec<u8> for later use in assembling the full transaction
// used for calculation of the txid
// returns: Vec<u8> of the byte serialized &TxOut
pub fn serialize_output(output: &TxOut) -> Vec<u8> {
    let mut serialized_output: Vec<u8> = Vec::new();
    serialized_output.extend_from_slice(&output.value.to_le_bytes());
    serialized_output.extend(varint(output.scriptpubkey.len() as u64));
    serialized_output.extend(&output.scriptpubkey);
    serialized_output
}

// byte-serializes all witnesses in the given &Transaction
// returns: Vec<u8> of the byte representation of all witnesses in the transaction
fn serialize_witnesses(tx: &Transaction) -> Vec<u8> {
    let mut witnesses: Vec<u8> = Vec::new();

    for input in &tx.vin {
        if let Some(witness_stack) = input.witness.as_ref() {
            witnesses.extend(varint(witness_stack.len() as u64));
            for witness_element in witness_stack {
                witnesses.extend(varint(witness_element.len() as u64));
                witnesses.extend(witness_element);
            }
        } else {
            witnesses.extend(hexlit!("00")); // non witness inputs
        };
    }
    witnesses
}

// assembles/serializes the transaction according to the reference.
// includes witness, marker and flag if argument witness is true for wtxid calculation
// if witness argument is false the returned bytes represent the data to hash for the txid
// returns: Vec<u8> of assembled transaction byte, either for txid or wtxid
pub fn serialize_transaction(tx: &Transaction, witness: bool) -> Vec<u8> {
    let mut preimage: Vec<u8> = Vec::new();
    // writes into a Vec<u8> cannot fail
    let _ = preimage.write_i32::<LittleEndian>(tx.version);
    if witness {
        preimage.extend(hexlit!("0001"))
    };
    preimage.extend(varint(tx.vin.len() as u64));
    for tx_in in &tx.vin {
        preimage.extend(serialize_input(tx_in));
    }
    preimage.extend(varint(tx.vout.len() as u64));
    for tx_out in &tx.vout {
        preimage.extend(serialize_output(tx_out));
    }
    if witness {
        preimage.extend(serialize_witnesses(tx));
    };
    let _ = preimage.write_u32::<LittleEndian>(tx.locktime);
    preimage
}

// calculates txid and wtxid of the passed Transaction and stores them in
// the &mut Transaction for further use.
pub fn set_txid_and_wtxid(tx: &mut Transaction) {
    let txid = get_txid(&serialize_transaction(tx, false));
    let wtxid = if is_segwit(tx) {
        get_txid(&serialize_transaction(tx, true))
    } else {
        txid
    };
    tx.meta.txid = txid;
    tx.meta.wtxid = wtxid;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_json;

    #[test]
    fn legacy_txid_matches_serialization_hash() {
        let json = r#"{
            "version": 1, "locktime": 0,
            "vin": [{"txid": "0000000000000000000000000000000000000000000000000000000000000001",
                     "vout": 0, "scriptsig": "51", "sequence": 4294967295,
                     "prevout": {"scriptpubkey": "51", "scriptpubkey_type": "unknown", "value": 10}}],
            "vout": [{"scriptpubkey": "51", "value": 5}]
        }"#;
        let mut tx = parse_json(json).unwrap();
        set_txid_and_wtxid(&mut tx);
        let raw = serialize_transaction(&tx, false);
        assert_eq!(raw.len(), 4 + 1 + 36 + 1 + 1 + 4 + 1 + 8 + 1 + 1 + 4);
        assert_eq!(tx.meta.txid, get_txid(&raw));
        assert_eq!(tx.meta.txid, tx.meta.wtxid);
    }

    #[test]
    fn witness_changes_wtxid_only() {
        let json = r#"{
            "version": 2, "locktime": 0,
            "vin": [{"txid": "0000000000000000000000000000000000000000000000000000000000000002",
                     "vout": 1, "scriptsig": "", "witness": ["aa", "bb"], "sequence": 0,
                     "prevout": {"scriptpubkey": "0014f8d9f2203c6f0773983392a487d45c0c818f9573",
                                 "scriptpubkey_type": "v0_p2wpkh", "value": 10}}],
            "vout": [{"scriptpubkey": "51", "value": 5}]
        }"#;
        let mut tx = parse_json(json).unwrap();
        set_txid_and_wtxid(&mut tx);
        assert_ne!(tx.meta.txid, tx.meta.wtxid);
        assert_eq!(tx.meta.txid, get_txid(&serialize_transaction(&tx, false)));
    }
}
