//! Confirmation lifecycle of a ledger record.
//!
//! Status is derived, never stored: [`update_status`] recomputes it from the
//! chain view on every call, and [`status_update_needed`] tells the caller
//! when the tip has moved since the last computation.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::oracle::{BroadcastVisibility, ChainView};
use crate::params::ConsensusParams;
use crate::record::{LedgerRecord, RecordKind};
use crate::types::RawTransaction;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    /// Not final until the chain reaches a height.
    OpenUntilBlock,
    /// Not final until a unix timestamp.
    OpenUntilDate,
    /// Coinbase reward still inside its maturity window.
    Immature,
    /// Immature and nobody on the network has asked for it; likely orphaned.
    MaturesWarning,
    /// Immature and its block is not on the best chain.
    NotAccepted,
    /// A conflicting transaction was mined instead.
    Conflicted,
    /// Unmined, stale and never requested by a peer.
    Offline,
    Unconfirmed,
    Confirming,
    Confirmed,
}

impl TxState {
    pub fn label(self) -> &'static str {
        match self {
            TxState::OpenUntilBlock => "open until block",
            TxState::OpenUntilDate => "open until date",
            TxState::Immature => "immature",
            TxState::MaturesWarning => "not broadcast, may not mature",
            TxState::NotAccepted => "not accepted",
            TxState::Conflicted => "conflicted",
            TxState::Offline => "offline",
            TxState::Unconfirmed => "unconfirmed",
            TxState::Confirming => "confirming",
            TxState::Confirmed => "confirmed",
        }
    }

    pub fn is_confirmed(self) -> bool {
        self == TxState::Confirmed
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Total order over records. Field order is the comparison order; unmined
/// transactions take `i32::MAX` as height and sort after everything mined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub height: i32,
    pub coinbase: bool,
    pub time_received: u32,
    pub index: u32,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:010}-{}-{:010}-{:03}",
            self.height,
            u8::from(self.coinbase),
            self.time_received,
            self.index
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub state: TxState,
    pub sort_key: SortKey,
    pub depth: i32,
    /// Blocks until a coinbase reward matures; only set while its block is
    /// on the best chain.
    pub matures_in: i32,
    /// Blocks remaining for `OpenUntilBlock`, the unlock timestamp for
    /// `OpenUntilDate`, zero otherwise.
    pub open_for: i64,
    /// Trusted and past any maturity window.
    pub counts_for_balance: bool,
    /// Chain height this status was computed at.
    pub cur_num_blocks: i32,
}

/// Derive the status of `record`, whose parent transaction is `tx`.
pub fn update_status<C, B>(
    record: &LedgerRecord,
    tx: &RawTransaction,
    chain: &C,
    broadcast: &B,
    params: &ConsensusParams,
) -> LedgerResult<TransactionStatus>
where
    C: ChainView + ?Sized,
    B: BroadcastVisibility + ?Sized,
{
    let depth = chain.confirmation_depth(tx);
    let in_best_chain = chain.is_in_best_chain(tx);
    let block = chain.block_containing(tx);
    if block.is_none() && (in_best_chain || depth > 0) {
        return Err(LedgerError::MissingBlockIndex(tx.hash));
    }

    let tip = chain.height();
    let to_maturity = chain.blocks_to_maturity(tx, params.coinbase_maturity);

    let mut status = TransactionStatus {
        state: TxState::Unconfirmed,
        sort_key: SortKey {
            height: block.map_or(i32::MAX, |b| b.height),
            coinbase: tx.is_coinbase,
            time_received: tx.time_received,
            index: record.index,
        },
        depth,
        matures_in: 0,
        open_for: 0,
        counts_for_balance: chain.is_trusted(tx, params.lock_time_threshold) && to_maturity == 0,
        cur_num_blocks: tip,
    };

    let stale = broadcast.seconds_since_receipt(tx) > params.stale_window_secs
        && broadcast.request_count(tx) == 0;

    status.state = if !chain.is_final(tx, params.lock_time_threshold) {
        if params.is_height_lock(tx.lock_time) {
            status.open_for = i64::from(tx.lock_time) - i64::from(tip);
            TxState::OpenUntilBlock
        } else {
            status.open_for = i64::from(tx.lock_time);
            TxState::OpenUntilDate
        }
    } else if record.kind == RecordKind::Generated {
        if to_maturity == 0 {
            TxState::Confirmed
        } else if !in_best_chain {
            TxState::NotAccepted
        } else {
            status.matures_in = to_maturity;
            if stale {
                TxState::MaturesWarning
            } else {
                TxState::Immature
            }
        }
    } else if depth < 0 {
        TxState::Conflicted
    } else if depth == 0 {
        if stale {
            TxState::Offline
        } else {
            TxState::Unconfirmed
        }
    } else if depth < params.recommended_confirmations {
        TxState::Confirming
    } else {
        TxState::Confirmed
    };

    debug!(
        tx = %tx.hash,
        index = record.index,
        state = %status.state,
        depth,
        tip,
        "status updated"
    );
    Ok(status)
}

/// Whether the chain tip moved since `status` was computed.
pub fn status_update_needed<C: ChainView + ?Sized>(status: &TransactionStatus, chain: &C) -> bool {
    status.cur_num_blocks != chain.height()
}
