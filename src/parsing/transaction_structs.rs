// Definition of data structures to hold a mempool transaction and relevant metadata

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{hex::Hex, serde_as};
use std::fmt;
use std::str::FromStr;

// 32 byte transaction id, stored in display (reversed) byte order so that
// Display and FromStr are plain hex
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Txid([u8; 32]);

impl Txid {
    pub const ZERO: Txid = Txid([0u8; 32]);

    pub fn from_display_bytes(bytes: [u8; 32]) -> Self {
        Txid(bytes)
    }

    // internal byte order as used in outpoints and merkle trees
    pub fn from_natural_bytes(bytes: &[u8; 32]) -> Self {
        let mut display = *bytes;
        display.reverse();
        Txid(display)
    }

    pub fn to_natural_bytes(&self) -> [u8; 32] {
        let mut natural = self.0;
        natural.reverse();
        natural
    }

    pub fn as_display_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({})", self)
    }
}

impl FromStr for Txid {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Txid(bytes))
    }
}

impl Serialize for Txid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Txid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Txid::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[serde_as]
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TxOut {
    #[serde_as(as = "Hex")]
    #[serde(default)]
    pub scriptpubkey: Vec<u8>,
    #[serde(default)]
    pub scriptpubkey_type: String,
    pub value: u64,
}

// the output spent by an input, as reported alongside the mempool transaction
#[serde_as]
#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct Prevout {
    #[serde_as(as = "Hex")]
    pub scriptpubkey: Vec<u8>,
    pub scriptpubkey_type: String,
    pub value: u64,
}

#[serde_as]
#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct TxIn {
    #[serde(skip_deserializing)]
    pub in_type: InputType,
    pub txid: Txid,
    pub vout: u32,
    #[serde_as(as = "Hex")]
    #[serde(default)]
    pub scriptsig: Vec<u8>,
    #[serde(default)]
    pub prevout: Option<Prevout>,
    #[serde_as(as = "Option<Vec<Hex>>")]
    #[serde(default)]
    pub witness: Option<Vec<Vec<u8>>>,
    #[serde(default)]
    pub is_coinbase: bool,
    pub sequence: u32,
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct TxMetadata {
    pub txid: Txid,
    pub wtxid: Txid,
    pub weight: u64,
    pub fee: u64,
    pub sigop_cost: u64,
}

// main Transaction struct, containing all other transaction (meta-)data
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    #[serde(skip_deserializing)]
    pub meta: TxMetadata,
    pub version: i32,
    pub locktime: u32,
    pub vin: Vec<TxIn>,
    pub vout: Vec<TxOut>,
}

impl Transaction {
    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].is_coinbase
    }

    // txids of all transactions this one spends from
    pub fn spent_txids(&self) -> impl Iterator<Item = &Txid> {
        self.vin.iter().map(|txin| &txin.txid)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum InputType {
    P2TR,
    P2PKH,
    P2SH,
    P2WPKH,
    P2WSH,
    UNKNOWN(String),
}

impl Default for InputType {
    fn default() -> Self {
        InputType::UNKNOWN("notSerialized".to_string())
    }
}

impl InputType {
    // can be applied on TxIn to set the according InputType
    pub fn fetch_type(txin: &mut TxIn) {
        let type_string = match &txin.prevout {
            Some(prevout) => prevout.scriptpubkey_type.as_str(),
            None => "",
        };
        txin.in_type = match type_string {
            "v1_p2tr" => InputType::P2TR,
            "v0_p2wpkh" => InputType::P2WPKH,
            "v0_p2wsh" => InputType::P2WSH,
            "p2sh" => InputType::P2SH,
            "p2pkh" => InputType::P2PKH,
            _ => InputType::UNKNOWN(type_string.to_string()),
        };
    }
}
