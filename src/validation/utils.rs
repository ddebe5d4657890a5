use crate::parsing::transaction_structs::TxIn;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
pub const OP_CHECKMULTISIG: u8 = 0xae;
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;

// returns: outpoint (natural txid bytes + index) of TxIn as serialized byte Vec<u8>
pub fn get_outpoint(input: &TxIn) -> Vec<u8> {
    let mut outpoint: Vec<u8> = input.txid.to_natural_bytes().to_vec();
    outpoint.extend_from_slice(&input.vout.to_le_bytes());
    outpoint
}

// returns: sha256 digest of passed byte slice
pub fn hash_sha256(preimage: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(preimage);
    hasher.finalize().into()
}

// Hashes byte slice argument bytes twice
// returns: the second hash bytes
pub fn double_hash(preimage: &[u8]) -> [u8; 32] {
    hash_sha256(&hash_sha256(preimage))
}

// applies sha256 and ripemd160 hash on passed byte slice
// returns: 20 byte hash
pub fn hash160(preimage: &[u8]) -> [u8; 20] {
    let preimage = hash_sha256(preimage);
    let mut hasher = Ripemd160::new();
    hasher.update(preimage);
    hasher.finalize().into()
}

// converts a given integer to a little endian Vec<u8>
// with variable size as used for bitcoin compact size fields
pub fn varint(n: u64) -> Vec<u8> {
    if n <= 252 {
        vec![n as u8]
    } else if n <= 0xffff {
        let mut bytes = vec![0xfd];
        bytes.extend(&(n as u16).to_le_bytes());
        bytes
    } else if n <= 0xffffffff {
        let mut bytes = vec![0xfe];
        bytes.extend(&(n as u32).to_le_bytes());
        bytes
    } else {
        let mut bytes = vec![0xff];
        bytes.extend(&n.to_le_bytes());
        bytes
    }
}

// When used as numbers, byte vectors are interpreted as little-endian variable-length integers with the most significant
// bit determining the sign of the integer. Thus 0x81 represents -1. 0x80 is another representation of zero
// (so called negative 0). Positive 0 is represented by a null-length vector.
// returns: None if the number does not fit an i128
pub fn decode_num(number: &[u8]) -> Option<i128> {
    if number.is_empty() {
        return Some(0);
    }
    let mut magnitude = number.to_vec();
    let last = magnitude.len() - 1;
    let negative = magnitude[last] & 0x80 != 0;
    magnitude[last] &= 0x7f;
    let value = BigInt::from_bytes_le(num_bigint::Sign::Plus, &magnitude);
    let value = if negative { -value } else { value };
    value.to_i128()
}

// minimal sign-magnitude encoding of a script number (inverse of decode_num)
pub fn encode_num(n: i64) -> Vec<u8> {
    let value = BigInt::from(n);
    if value.is_zero() {
        return Vec::new();
    }
    let mut bytes = value.magnitude().to_bytes_le();
    let last = bytes.len() - 1;
    if bytes[last] & 0x80 != 0 {
        bytes.push(if n < 0 { 0x80 } else { 0x00 });
    } else if n < 0 {
        bytes[last] |= 0x80;
    }
    bytes
}

// appends a data push with the smallest fitting push opcode
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= 0xffff {
        script.push(OP_PUSHDATA2);
        script.extend((len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend((len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

// appends an integer push: OP_0, OP_1NEGATE and OP_1..OP_16 for small values,
// a script number push otherwise
pub fn push_int(script: &mut Vec<u8>, n: i64) {
    match n {
        0 => script.push(OP_0),
        -1 => script.push(OP_1NEGATE),
        1..=16 => script.push(OP_1 + (n as u8) - 1),
        _ => push_data(script, &encode_num(n)),
    }
}

// returns: p2pkh scriptpubkey paying to the hash160 of the passed public key
pub fn p2pkh_script(pubkey: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_DUP, OP_HASH160];
    push_data(&mut script, &hash160(pubkey));
    script.extend([OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex as hexlit;

    #[test]
    fn varint_boundaries() {
        assert_eq!(varint(252), vec![252]);
        assert_eq!(varint(253), vec![0xfd, 253, 0]);
        assert_eq!(varint(0x10000), vec![0xfe, 0, 0, 1, 0]);
    }

    #[test]
    fn script_numbers_match_consensus_encoding() {
        assert_eq!(encode_num(0), Vec::<u8>::new());
        assert_eq!(encode_num(-1), vec![0x81]);
        assert_eq!(encode_num(128), vec![0x80, 0x00]);
        assert_eq!(encode_num(-128), vec![0x80, 0x80]);
        assert_eq!(encode_num(839653), hexlit!("e5cf0c").to_vec());
        for n in [1i64, 127, 255, 256, -255, 500_000, -8_388_608] {
            assert_eq!(decode_num(&encode_num(n)), Some(n as i128));
        }
    }

    #[test]
    fn small_ints_use_opcodes() {
        let mut script = Vec::new();
        push_int(&mut script, 0);
        push_int(&mut script, 16);
        push_int(&mut script, 17);
        assert_eq!(script, vec![OP_0, OP_16, 0x01, 17]);
    }

    #[test]
    fn double_hash_of_empty_input() {
        assert_eq!(
            double_hash(&[]),
            hexlit!("5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456")
        );
    }
}
