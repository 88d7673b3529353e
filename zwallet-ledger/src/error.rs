//! Error types for ledger classification and status derivation.
//!
//! Unrecognized transaction shapes are not errors: they degrade to a `Mixed`
//! record. Errors here mean a collaborator contradicted itself, and the
//! caller must not trust any amounts computed from that snapshot.

use thiserror::Error;

use crate::types::{Amount, OutPoint, TxHash};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("owned input spends {0} but the wallet has no record of that output")]
    MissingPrevout(OutPoint),

    #[error("transaction {0} is reported in the best chain but has no block index entry")]
    MissingBlockIndex(TxHash),

    #[error("transaction {tx} carries amount {value} outside the money range")]
    AmountOutOfRange { tx: TxHash, value: Amount },

    #[error("invalid consensus parameters: {0}")]
    InvalidParams(String),

    #[error("invalid transaction hash: {0}")]
    ParseHash(String),
}

impl LedgerError {
    /// True for collaborator inconsistencies, as opposed to bad input.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            LedgerError::MissingPrevout(_) | LedgerError::MissingBlockIndex(_)
        )
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
