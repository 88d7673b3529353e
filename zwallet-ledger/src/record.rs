//! Ledger records: the wallet-facing view of one transaction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::oracle::ChainView;
use crate::types::{Amount, RawTransaction, TxHash};

/// Counterpart shown when the wallet paid into a shielded address it does
/// not own.
pub const UNKNOWN_SHIELDED_ADDRESS: &str = "shielded address not in wallet";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Received on a transparent address of this wallet.
    ReceivedTransparent,
    /// Received through a non-standard script.
    ReceivedFromUnknown,
    /// Paid to a transparent address, or into the shielded pool.
    SentTransparent,
    /// Paid through a non-standard script.
    SentToUnknown,
    SelfTransfer,
    ShieldedReceive,
    ShieldedSend,
    /// Transparent funds moved into the wallet's own shielded note.
    ShieldedPool,
    /// Coinbase reward.
    Generated,
    /// Partly ours; payees cannot be broken out.
    Mixed,
}

impl RecordKind {
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::ReceivedTransparent => "received",
            RecordKind::ReceivedFromUnknown => "received from",
            RecordKind::SentTransparent => "sent",
            RecordKind::SentToUnknown => "sent to",
            RecordKind::SelfTransfer => "payment to self",
            RecordKind::ShieldedReceive => "shielded receive",
            RecordKind::ShieldedSend => "shielded send",
            RecordKind::ShieldedPool => "shielding",
            RecordKind::Generated => "mined",
            RecordKind::Mixed => "mixed",
        }
    }

    pub fn is_generated(self) -> bool {
        self == RecordKind::Generated
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One line of the wallet's ledger.
///
/// Identified by `(hash, index)`. Records are never mutated: classifying a
/// transaction again produces a fresh sequence that replaces the old one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub hash: TxHash,
    /// Position within the records of `hash`.
    pub index: u32,
    /// Unix seconds the wallet received the transaction.
    pub time: u32,
    pub kind: RecordKind,
    /// Counterpart address, empty when there is none to show.
    pub address: String,
    /// Value leaving the wallet, zero or negative.
    pub debit: Amount,
    pub credit: Amount,
    /// Network fee attributed to this record.
    #[serde(default)]
    pub fee: Amount,
    pub involves_watch_only: bool,
}

impl LedgerRecord {
    pub fn new(tx: &RawTransaction, index: u32, kind: RecordKind) -> Self {
        Self {
            hash: tx.hash,
            index,
            time: tx.time_received,
            kind,
            address: String::new(),
            debit: 0,
            credit: 0,
            fee: 0,
            involves_watch_only: false,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_amounts(mut self, debit: Amount, credit: Amount) -> Self {
        self.debit = debit;
        self.credit = credit;
        self
    }

    pub fn with_fee(mut self, fee: Amount) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_watch_only(mut self, involves_watch_only: bool) -> Self {
        self.involves_watch_only = involves_watch_only;
        self
    }

    /// Change in wallet value attributed to this record.
    pub fn net(&self) -> Amount {
        self.credit + self.debit
    }

    pub fn tx_id(&self) -> String {
        self.hash.to_hex()
    }

    pub fn output_index(&self) -> u32 {
        self.index
    }
}

/// Whether a transaction belongs in the ledger at all. Coinbase transactions
/// are hidden until their block is on the best chain.
pub fn show_transaction<C: ChainView + ?Sized>(tx: &RawTransaction, chain: &C) -> bool {
    !tx.is_coinbase || chain.is_in_best_chain(tx)
}
