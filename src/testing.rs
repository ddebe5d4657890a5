//! Builders for synthetic mempool transactions used by unit and integration
//! tests. Metadata (fee, weight, sigop cost) is set directly instead of being
//! derived from scripts so that scenarios can be expressed in round numbers.

use crate::parsing::transaction_structs::{InputType, Prevout, Transaction, TxIn, TxOut, Txid};
use crate::validation::utils::hash_sha256;
use crate::validation::validate_parsing::set_txid_and_wtxid;

#[derive(Debug, Clone)]
pub struct TxBuilder {
    seed: u64,
    inputs: Vec<(Txid, u32)>,
    fee: u64,
    weight: u64,
    sigop_cost: u64,
    locktime: u32,
    sequence: u32,
    witness: bool,
}

impl TxBuilder {
    pub fn new(seed: u64) -> Self {
        TxBuilder {
            seed,
            inputs: Vec::new(),
            fee: 1000,
            weight: 400,
            sigop_cost: 4,
            locktime: 0,
            sequence: u32::MAX,
            witness: false,
        }
    }

    pub fn spends(mut self, parent: Txid, vout: u32) -> Self {
        self.inputs.push((parent, vout));
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn weight(mut self, weight: u64) -> Self {
        self.weight = weight;
        self
    }

    pub fn sigop_cost(mut self, sigop_cost: u64) -> Self {
        self.sigop_cost = sigop_cost;
        self
    }

    pub fn locktime(mut self, locktime: u32, sequence: u32) -> Self {
        self.locktime = locktime;
        self.sequence = sequence;
        self
    }

    pub fn witness(mut self) -> Self {
        self.witness = true;
        self
    }

    pub fn build(self) -> Transaction {
        let mut inputs = self.inputs.clone();
        if inputs.is_empty() {
            // confirmed funding outpoint unique to the seed
            let funding = Txid::from_display_bytes(hash_sha256(&self.seed.to_le_bytes()));
            inputs.push((funding, 0));
        }
        let vin = inputs
            .into_iter()
            .map(|(txid, vout)| TxIn {
                in_type: InputType::P2WPKH,
                txid,
                vout,
                scriptsig: Vec::new(),
                prevout: Some(Prevout {
                    scriptpubkey: vec![0x00, 0x14],
                    scriptpubkey_type: "v0_p2wpkh".to_string(),
                    value: 100_000 + self.fee,
                }),
                witness: self.witness.then(|| vec![vec![0x30; 72], vec![0x02; 33]]),
                is_coinbase: false,
                sequence: self.sequence,
            })
            .collect();
        let mut tx = Transaction {
            meta: Default::default(),
            version: 2,
            locktime: self.locktime,
            vin,
            vout: vec![
                TxOut {
                    scriptpubkey: vec![0x51],
                    scriptpubkey_type: "unknown".to_string(),
                    value: 100_000,
                },
                // seed commitment keeps txids distinct for identical shapes
                TxOut {
                    scriptpubkey: self.seed.to_le_bytes().to_vec(),
                    scriptpubkey_type: "unknown".to_string(),
                    value: 0,
                },
            ],
        };
        set_txid_and_wtxid(&mut tx);
        tx.meta.fee = self.fee;
        tx.meta.weight = self.weight;
        tx.meta.sigop_cost = self.sigop_cost;
        tx
    }
}

/// Child of `parent` spending its first output.
pub fn chain_tx(seed: u64, parent: &Transaction, fee: u64, weight: u64) -> Transaction {
    TxBuilder::new(seed)
        .spends(parent.meta.txid, 0)
        .fee(fee)
        .weight(weight)
        .build()
}
