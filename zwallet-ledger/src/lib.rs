//! Wallet Ledger Records
//!
//! Turns raw transactions into the rows of a wallet's transaction history
//! and tracks each row through its confirmation lifecycle.
//!
//! # Flow
//!
//! ```text
//! RawTransaction ──classify──▶ [LedgerRecord] ──update_status──▶ TransactionStatus
//!        │                          ▲
//!        └── ShieldedResolver ──────┘   (owned note amounts)
//! ```
//!
//! A transaction may move value through transparent outputs, through the
//! shielded pool, or both. The classifier reconciles the two models so the
//! records of one transaction sum to the wallet's net change in value, with
//! no double counting between a transparent leg and its shielded counterpart.
//!
//! # Collaborators
//!
//! Chain state, key ownership and relay state live outside this crate and
//! are read through [`ChainView`], [`OwnershipOracle`] and
//! [`BroadcastVisibility`]. The [`snapshot`] module provides in-memory
//! implementations loadable from JSON.
//!
//! Everything here is synchronous and free of shared mutable state; one
//! [`ConsensusParams`] value is passed explicitly into each call.

pub mod bundle;
pub mod classify;
pub mod error;
pub mod oracle;
pub mod params;
pub mod record;
pub mod shielded;
pub mod snapshot;
pub mod status;
pub mod types;

pub use bundle::{LedgerBundle, LedgerEntry, LedgerReport, TxNotice};
pub use classify::{classify, classify_detailed, Classification, ClassifyNotice, TxShape};
pub use error::{LedgerError, LedgerResult};
pub use oracle::{BlockRef, BroadcastVisibility, ChainView, OwnershipOracle};
pub use params::{ConsensusParams, Network};
pub use record::{show_transaction, LedgerRecord, RecordKind, UNKNOWN_SHIELDED_ADDRESS};
pub use shielded::{ShieldedMatches, ShieldedResolver};
pub use status::{status_update_needed, update_status, SortKey, TransactionStatus, TxState};
pub use types::{
    money_range, Amount, NoteEntry, NoteLocator, OutPoint, OutputScript, Ownership,
    RawTransaction, ShieldedDescriptor, TxHash, TxIn, TxOut, MAX_MONEY,
};
