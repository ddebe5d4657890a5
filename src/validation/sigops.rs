use super::utils::{
    OP_0, OP_1, OP_16, OP_CHECKMULTISIG, OP_CHECKMULTISIGVERIFY, OP_CHECKSIG, OP_CHECKSIGVERIFY,
    OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4,
};
use super::weight_calculation::WITNESS_SCALE_FACTOR;
use crate::parsing::transaction_structs::{InputType, Transaction, TxIn};
use byteorder::{ByteOrder, LittleEndian};

// Signature operation counting over serialized scripts.
// Legacy counting charges 20 for every multisig, accurate counting uses the
// OP_n key count preceding it (P2SH redeem scripts and witness scripts).

const MAX_PUBKEYS_PER_MULTISIG: u64 = 20;

// one parsed script element: the opcode and, for pushes, the pushed bytes
struct ScriptOp<'a> {
    opcode: u8,
    data: Option<&'a [u8]>,
}

// iterates the opcodes of a script, stopping at the first malformed push
struct ScriptOps<'a> {
    script: &'a [u8],
    pos: usize,
}

impl<'a> ScriptOps<'a> {
    fn new(script: &'a [u8]) -> Self {
        ScriptOps { script, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.script.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }
}

impl<'a> Iterator for ScriptOps<'a> {
    type Item = ScriptOp<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let opcode = *self.script.get(self.pos)?;
        self.pos += 1;
        let push_len = match opcode {
            0x01..=0x4b => opcode as usize,
            OP_PUSHDATA1 => self.take(1)?[0] as usize,
            OP_PUSHDATA2 => LittleEndian::read_u16(self.take(2)?) as usize,
            OP_PUSHDATA4 => LittleEndian::read_u32(self.take(4)?) as usize,
            _ => {
                return Some(ScriptOp { opcode, data: None });
            }
        };
        let data = self.take(push_len);
        if data.is_none() {
            // truncated push ends parsing
            self.pos = self.script.len();
            return None;
        }
        Some(ScriptOp { opcode, data })
    }
}

fn decode_op_n(opcode: u8) -> Option<u64> {
    match opcode {
        OP_0 => Some(0),
        OP_1..=OP_16 => Some((opcode - OP_1 + 1) as u64),
        _ => None,
    }
}

// returns: number of signature operations in the script
pub fn count_script_sigops(script: &[u8], accurate: bool) -> u64 {
    let mut count = 0;
    let mut last_opcode: Option<u8> = None;
    for op in ScriptOps::new(script) {
        match op.opcode {
            OP_CHECKSIG | OP_CHECKSIGVERIFY => count += 1,
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                let keys = last_opcode
                    .filter(|_| accurate)
                    .and_then(decode_op_n)
                    .filter(|n| *n > 0);
                count += keys.unwrap_or(MAX_PUBKEYS_PER_MULTISIG);
            }
            _ => {}
        }
        last_opcode = Some(op.opcode);
    }
    count
}

// returns: legacy sigop count of all scriptsigs and output scriptpubkeys
pub fn legacy_sigop_count(tx: &Transaction) -> u64 {
    let inputs: u64 = tx
        .vin
        .iter()
        .map(|txin| count_script_sigops(&txin.scriptsig, false))
        .sum();
    let outputs: u64 = tx
        .vout
        .iter()
        .map(|txout| count_script_sigops(&txout.scriptpubkey, false))
        .sum();
    inputs + outputs
}

// the last push of a push-only scriptsig is the redeem script
fn p2sh_redeem_script(scriptsig: &[u8]) -> Option<&[u8]> {
    let mut redeem_script = None;
    for op in ScriptOps::new(scriptsig) {
        if op.opcode > OP_16 {
            return None;
        }
        redeem_script = op.data;
    }
    redeem_script
}

fn p2sh_sigop_count(txin: &TxIn) -> u64 {
    if txin.in_type != InputType::P2SH {
        return 0;
    }
    p2sh_redeem_script(&txin.scriptsig).map_or(0, |redeem| count_script_sigops(redeem, true))
}

// (version, program) of a native witness program scriptpubkey
fn witness_program(script: &[u8]) -> Option<(u8, &[u8])> {
    if script.len() < 4 || script.len() > 42 {
        return None;
    }
    let version = decode_op_n(script[0])?;
    if script[1] as usize + 2 != script.len() {
        return None;
    }
    Some((version as u8, &script[2..]))
}

fn witness_sigop_count(txin: &TxIn) -> u64 {
    let Some(prevout) = &txin.prevout else {
        return 0;
    };
    // nested segwit carries the program as the redeem script
    let program_script = if txin.in_type == InputType::P2SH {
        match p2sh_redeem_script(&txin.scriptsig) {
            Some(redeem) => redeem,
            None => return 0,
        }
    } else {
        prevout.scriptpubkey.as_slice()
    };
    let empty = Vec::new();
    let witness = txin.witness.as_ref().unwrap_or(&empty);
    match witness_program(program_script) {
        Some((0, program)) if program.len() == 20 => 1,
        Some((0, program)) if program.len() == 32 => witness
            .last()
            .map_or(0, |witness_script| count_script_sigops(witness_script, true)),
        _ => 0,
    }
}

// total signature operation cost of a transaction:
// legacy and p2sh sigops are scaled by the witness factor, witness sigops are not
pub fn transaction_sigop_cost(tx: &Transaction) -> u64 {
    let mut cost = legacy_sigop_count(tx) * WITNESS_SCALE_FACTOR;
    if tx.is_coinbase() {
        return cost;
    }
    cost += tx.vin.iter().map(p2sh_sigop_count).sum::<u64>() * WITNESS_SCALE_FACTOR;
    cost += tx.vin.iter().map(witness_sigop_count).sum::<u64>();
    cost
}
