//! Transaction data as the wallet sees it.
//!
//! These types mirror what a node hands the wallet for one transaction:
//! transparent inputs and outputs, the shielded transfer descriptors with
//! their two public pool amounts, and the wallet-side note data recording
//! which shielded outputs it could decrypt.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Signed amount in base units. Debits are negative.
pub type Amount = i64;

/// Largest amount any single value or transparent total may carry.
pub const MAX_MONEY: Amount = 21_000_000 * 100_000_000;

pub fn money_range(value: Amount) -> bool {
    (0..=MAX_MONEY).contains(&value)
}

/// Adds `value` to a running total, refusing anything that leaves the money
/// range.
pub(crate) fn add_money(total: Amount, value: Amount) -> Option<Amount> {
    if !money_range(value) {
        return None;
    }
    total.checked_add(value).filter(|sum| money_range(*sum))
}

/// Content hash identifying a transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for TxHash {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        if hex_str.len() != 64 {
            return Err(LedgerError::ParseHash(format!(
                "expected 64 hex chars, got {}",
                hex_str.len()
            )));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|e| LedgerError::ParseHash(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for TxHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct HashVisitor;

        impl serde::de::Visitor<'_> for HashVisitor {
            type Value = TxHash;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a 32-byte hex string (with or without 0x prefix)")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HashVisitor)
    }
}

/// Reference to an output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxHash,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: TxHash, index: u32) -> Self {
        Self { txid, index }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// Transparent input spending a previous output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
}

/// Locking script of a transparent output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutputScript {
    /// Standard script whose destination decodes to an address.
    PayToAddress(String),
    /// Anything else (multisig, data carriers, bare scripts).
    NonStandard(Vec<u8>),
}

/// Transparent output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxOut {
    pub value: Amount,
    pub script: OutputScript,
}

impl TxOut {
    pub fn to_address(value: Amount, address: impl Into<String>) -> Self {
        Self {
            value,
            script: OutputScript::PayToAddress(address.into()),
        }
    }

    /// Decoded destination address, if the script is standard.
    pub fn destination(&self) -> Option<&str> {
        match &self.script {
            OutputScript::PayToAddress(addr) => Some(addr.as_str()),
            OutputScript::NonStandard(_) => None,
        }
    }
}

/// Shielded transfer descriptor.
///
/// Only the two pool-crossing amounts are public; the notes themselves are
/// encrypted and opaque at this layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldedDescriptor {
    /// Value entering the shielded pool from the transparent side.
    pub value_in: Amount,
    /// Value leaving the shielded pool to the transparent side.
    pub value_out: Amount,
    /// Encrypted note ciphertexts.
    #[serde(default)]
    pub ciphertexts: Vec<Vec<u8>>,
}

/// Position of a shielded output the wallet was able to decrypt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteLocator {
    pub descriptor: u32,
    pub output: u8,
}

/// A transaction as handed to the wallet by the node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub hash: TxHash,
    #[serde(default)]
    pub inputs: Vec<TxIn>,
    #[serde(default)]
    pub outputs: Vec<TxOut>,
    #[serde(default)]
    pub shielded: Vec<ShieldedDescriptor>,
    /// Wallet-side note data: shielded outputs of this transaction the wallet
    /// decrypted.
    #[serde(default)]
    pub note_data: Vec<NoteLocator>,
    #[serde(default)]
    pub is_coinbase: bool,
    #[serde(default)]
    pub lock_time: u32,
    /// Wall-clock receipt time, unix seconds.
    pub time_received: u32,
    /// Wallet annotations (`"from"`, `"to"`) for non-standard counterparts.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RawTransaction {
    pub fn has_shielded(&self) -> bool {
        !self.shielded.is_empty()
    }

    pub fn has_note_data(&self) -> bool {
        !self.note_data.is_empty()
    }

    /// Sum of all transparent output values.
    pub fn value_out(&self) -> Amount {
        self.outputs.iter().map(|out| out.value).sum()
    }

    /// Sum of the public amounts entering the shielded pool.
    pub fn pool_value_in(&self) -> Amount {
        self.shielded.iter().map(|d| d.value_in).sum()
    }

    /// Sum of the public amounts leaving the shielded pool.
    pub fn pool_value_out(&self) -> Amount {
        self.shielded.iter().map(|d| d.value_out).sum()
    }

    /// Rejects negative or oversized output and pool amounts, and totals
    /// that would overflow. The sums above are exact once this passes.
    pub fn check_amounts(&self) -> LedgerResult<()> {
        self.money_total(self.outputs.iter().map(|out| out.value))?;
        self.money_total(self.shielded.iter().map(|d| d.value_in))?;
        self.money_total(self.shielded.iter().map(|d| d.value_out))?;
        Ok(())
    }

    fn money_total(&self, values: impl IntoIterator<Item = Amount>) -> LedgerResult<Amount> {
        values.into_iter().try_fold(0, |total, value| {
            add_money(total, value).ok_or(LedgerError::AmountOutOfRange {
                tx: self.hash,
                value,
            })
        })
    }

    pub fn metadata_value(&self, key: &str) -> String {
        self.metadata.get(key).cloned().unwrap_or_default()
    }
}

/// How much of a transparent input or output the wallet controls.
///
/// Ordered so that the minimum over a set gives "all of them are at least".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    #[default]
    NotMine,
    WatchOnly,
    Spendable,
}

impl Ownership {
    pub fn is_mine(self) -> bool {
        self != Ownership::NotMine
    }

    pub fn is_watch_only(self) -> bool {
        self == Ownership::WatchOnly
    }
}

/// One entry of the wallet's received-note history for a shielded address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEntry {
    /// Transaction that created the note.
    pub txid: TxHash,
    pub amount: Amount,
    pub address: String,
}
