//! Interfaces to the collaborators this crate reads from.
//!
//! Implementations must answer from one consistent point-in-time snapshot
//! for the duration of a call. Nothing here is retained between calls, so a
//! caller holding an external lock only needs it for the call itself.

use serde::{Deserialize, Serialize};

use crate::types::{NoteEntry, OutPoint, Ownership, RawTransaction, TxIn, TxOut};

/// Block containing a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub height: i32,
}

/// Read-only view of the chain.
pub trait ChainView {
    /// Height of the current tip.
    fn height(&self) -> i32;

    /// Whether the transaction is final at the current tip. Lock times below
    /// `lock_time_threshold` are heights, the rest timestamps.
    fn is_final(&self, tx: &RawTransaction, lock_time_threshold: u32) -> bool;

    fn block_containing(&self, tx: &RawTransaction) -> Option<BlockRef>;

    /// Blocks on top of the containing block, counting it. Zero when not
    /// mined, negative when a conflicting transaction was mined instead.
    fn confirmation_depth(&self, tx: &RawTransaction) -> i32;

    fn is_in_best_chain(&self, tx: &RawTransaction) -> bool;

    /// Blocks left before a coinbase transaction's outputs mature.
    fn blocks_to_maturity(&self, tx: &RawTransaction, coinbase_maturity: i32) -> i32 {
        if !tx.is_coinbase {
            return 0;
        }
        (coinbase_maturity + 1 - self.confirmation_depth(tx)).max(0)
    }

    /// Whether the wallet may count this transaction's outputs as spendable.
    fn is_trusted(&self, tx: &RawTransaction, lock_time_threshold: u32) -> bool {
        self.is_final(tx, lock_time_threshold) && self.confirmation_depth(tx) >= 1
    }
}

/// The wallet's knowledge of which transparent scripts and shielded keys it
/// owns.
pub trait OwnershipOracle {
    fn input_ownership(&self, input: &TxIn) -> Ownership;

    fn output_ownership(&self, output: &TxOut) -> Ownership;

    /// Owned output paying back to an address the user never handed out.
    fn is_change(&self, output: &TxOut) -> bool;

    /// Output spent by an owned input.
    fn previous_output(&self, outpoint: &OutPoint) -> Option<TxOut>;

    /// Shielded addresses the wallet holds a spending key for, in a stable
    /// order.
    fn spending_addresses(&self) -> Vec<String>;

    /// Received-note history of one shielded address, restricted to notes
    /// whose depth lies in `min_depth..=max_depth`.
    fn received_notes(&self, address: &str, min_depth: i32, max_depth: i32) -> Vec<NoteEntry>;
}

/// How far the transaction has propagated through the network.
pub trait BroadcastVisibility {
    /// -1 when unknown, 0 when no peer asked for it, otherwise the number of
    /// peers that did.
    fn request_count(&self, tx: &RawTransaction) -> i32;

    fn seconds_since_receipt(&self, tx: &RawTransaction) -> i64;
}
