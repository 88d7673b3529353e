//! In-memory, serde-loadable collaborator snapshots.
//!
//! A snapshot is one frozen view of chain, wallet and relay state. It
//! implements the collaborator traits so the classifier and status engine
//! can run against saved data (the CLI) or hand-built state (tests).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::oracle::{BlockRef, BroadcastVisibility, ChainView, OwnershipOracle};
use crate::types::{
    Amount, NoteEntry, OutPoint, OutputScript, Ownership, RawTransaction, TxHash, TxIn, TxOut,
};

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN
// ═══════════════════════════════════════════════════════════════════════════════

/// Where one transaction sits relative to the chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Height of the containing block, if mined.
    #[serde(default)]
    pub block_height: Option<i32>,
    /// Whether the containing block is on the best chain.
    #[serde(default = "bool_true")]
    pub in_best_chain: bool,
    /// Depth of the conflicting transaction that displaced this one.
    #[serde(default)]
    pub conflict_depth: Option<i32>,
    /// Explicit maturity countdown, overriding the depth-derived value.
    #[serde(default)]
    pub blocks_to_maturity: Option<i32>,
}

fn bool_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub height: i32,
    /// Median time past of the tip, compared against timestamp lock times.
    #[serde(default)]
    pub median_time_past: u32,
    #[serde(default)]
    pub transactions: BTreeMap<TxHash, ChainEntry>,
}

impl ChainSnapshot {
    pub fn at_height(height: i32) -> Self {
        Self {
            height,
            median_time_past: 0,
            transactions: BTreeMap::new(),
        }
    }

    /// Record `txid` as mined at `block_height` on the best chain.
    pub fn mine(&mut self, txid: TxHash, block_height: i32) -> &mut ChainEntry {
        let entry = self.transactions.entry(txid).or_default();
        entry.block_height = Some(block_height);
        entry.in_best_chain = true;
        entry.conflict_depth = None;
        entry
    }

    /// Record `txid` as displaced by a conflict `depth` blocks deep.
    pub fn conflict(&mut self, txid: TxHash, depth: i32) -> &mut ChainEntry {
        let entry = self.transactions.entry(txid).or_default();
        entry.block_height = None;
        entry.in_best_chain = false;
        entry.conflict_depth = Some(depth);
        entry
    }

    pub fn entry(&self, txid: &TxHash) -> Option<&ChainEntry> {
        self.transactions.get(txid)
    }
}

impl ChainView for ChainSnapshot {
    fn height(&self) -> i32 {
        self.height
    }

    fn is_final(&self, tx: &RawTransaction, lock_time_threshold: u32) -> bool {
        if tx.lock_time == 0 {
            return true;
        }
        let cutoff = if tx.lock_time < lock_time_threshold {
            i64::from(self.height) + 1
        } else {
            i64::from(self.median_time_past)
        };
        i64::from(tx.lock_time) < cutoff
    }

    fn block_containing(&self, tx: &RawTransaction) -> Option<BlockRef> {
        self.entry(&tx.hash)
            .and_then(|e| e.block_height)
            .map(|height| BlockRef { height })
    }

    fn confirmation_depth(&self, tx: &RawTransaction) -> i32 {
        match self.entry(&tx.hash) {
            Some(ChainEntry {
                conflict_depth: Some(depth),
                ..
            }) => -depth,
            Some(ChainEntry {
                block_height: Some(block_height),
                in_best_chain: true,
                ..
            }) => self.height - block_height + 1,
            _ => 0,
        }
    }

    fn is_in_best_chain(&self, tx: &RawTransaction) -> bool {
        self.entry(&tx.hash).is_some_and(|e| {
            e.in_best_chain && e.block_height.is_some() && e.conflict_depth.is_none()
        })
    }

    fn blocks_to_maturity(&self, tx: &RawTransaction, coinbase_maturity: i32) -> i32 {
        if !tx.is_coinbase {
            return 0;
        }
        match self.entry(&tx.hash).and_then(|e| e.blocks_to_maturity) {
            Some(remaining) => remaining.max(0),
            None => (coinbase_maturity + 1 - self.confirmation_depth(tx)).max(0),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WALLET
// ═══════════════════════════════════════════════════════════════════════════════

/// Output the wallet has seen before, spendable by later inputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownOutput {
    pub outpoint: OutPoint,
    pub output: TxOut,
}

/// Note in an address's received history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNote {
    pub txid: TxHash,
    pub amount: Amount,
    /// Confirmation depth of the creating transaction.
    #[serde(default)]
    pub depth: i32,
}

impl StoredNote {
    pub fn new(txid: TxHash, amount: Amount, depth: i32) -> Self {
        Self { txid, amount, depth }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    /// Ownership of transparent addresses.
    #[serde(default)]
    pub addresses: BTreeMap<String, Ownership>,
    /// Ownership of non-standard scripts, keyed by hex encoding.
    #[serde(default)]
    pub raw_scripts: BTreeMap<String, Ownership>,
    /// Owned addresses used for change.
    #[serde(default)]
    pub change_addresses: BTreeSet<String>,
    #[serde(default)]
    pub known_outputs: Vec<KnownOutput>,
    /// Shielded addresses with a spending key.
    #[serde(default)]
    pub spending_keys: BTreeSet<String>,
    /// Received-note history per shielded address.
    #[serde(default)]
    pub notes: BTreeMap<String, Vec<StoredNote>>,
}

impl WalletSnapshot {
    pub fn own_address(&mut self, address: impl Into<String>, ownership: Ownership) -> &mut Self {
        self.addresses.insert(address.into(), ownership);
        self
    }

    pub fn own_change_address(&mut self, address: impl Into<String>) -> &mut Self {
        let address = address.into();
        self.addresses.insert(address.clone(), Ownership::Spendable);
        self.change_addresses.insert(address);
        self
    }

    pub fn own_raw_script(&mut self, script: &[u8], ownership: Ownership) -> &mut Self {
        self.raw_scripts.insert(hex::encode(script), ownership);
        self
    }

    pub fn add_known_output(&mut self, outpoint: OutPoint, output: TxOut) -> &mut Self {
        self.known_outputs.push(KnownOutput { outpoint, output });
        self
    }

    /// Add a note under an address the wallet can spend from.
    pub fn add_note(&mut self, address: impl Into<String>, note: StoredNote) -> &mut Self {
        let address = address.into();
        self.spending_keys.insert(address.clone());
        self.notes.entry(address).or_default().push(note);
        self
    }

    /// Add a note under an address the wallet can only view.
    pub fn add_viewing_only_note(&mut self, address: impl Into<String>, note: StoredNote) -> &mut Self {
        self.notes.entry(address.into()).or_default().push(note);
        self
    }
}

impl OwnershipOracle for WalletSnapshot {
    fn input_ownership(&self, input: &TxIn) -> Ownership {
        self.previous_output(&input.prevout)
            .map(|prev| self.output_ownership(&prev))
            .unwrap_or(Ownership::NotMine)
    }

    fn output_ownership(&self, output: &TxOut) -> Ownership {
        let found = match &output.script {
            OutputScript::PayToAddress(address) => self.addresses.get(address),
            OutputScript::NonStandard(script) => self.raw_scripts.get(&hex::encode(script)),
        };
        found.copied().unwrap_or(Ownership::NotMine)
    }

    fn is_change(&self, output: &TxOut) -> bool {
        output
            .destination()
            .is_some_and(|address| self.change_addresses.contains(address))
    }

    fn previous_output(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.known_outputs
            .iter()
            .find(|known| known.outpoint == *outpoint)
            .map(|known| known.output.clone())
    }

    fn spending_addresses(&self) -> Vec<String> {
        self.spending_keys.iter().cloned().collect()
    }

    fn received_notes(&self, address: &str, min_depth: i32, max_depth: i32) -> Vec<NoteEntry> {
        self.notes
            .get(address)
            .into_iter()
            .flatten()
            .filter(|note| note.depth >= min_depth && note.depth <= max_depth)
            .map(|note| NoteEntry {
                txid: note.txid,
                amount: note.amount,
                address: address.to_string(),
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RELAY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastSnapshot {
    /// Adjusted network time, unix seconds.
    pub now: i64,
    /// Peer request counts; transactions absent here report -1.
    #[serde(default)]
    pub requests: BTreeMap<TxHash, i32>,
}

impl BroadcastSnapshot {
    pub fn at(now: i64) -> Self {
        Self {
            now,
            requests: BTreeMap::new(),
        }
    }

    pub fn set_requests(&mut self, txid: TxHash, count: i32) -> &mut Self {
        self.requests.insert(txid, count);
        self
    }
}

impl BroadcastVisibility for BroadcastSnapshot {
    fn request_count(&self, tx: &RawTransaction) -> i32 {
        self.requests.get(&tx.hash).copied().unwrap_or(-1)
    }

    fn seconds_since_receipt(&self, tx: &RawTransaction) -> i64 {
        self.now - i64::from(tx.time_received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::LOCKTIME_THRESHOLD;

    fn tx(hash: u8, lock_time: u32, coinbase: bool) -> RawTransaction {
        RawTransaction {
            hash: TxHash([hash; 32]),
            inputs: vec![],
            outputs: vec![],
            shielded: vec![],
            note_data: vec![],
            is_coinbase: coinbase,
            lock_time,
            time_received: 1_700_000_000,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn depth_counts_containing_block() {
        let mut chain = ChainSnapshot::at_height(109);
        let t = tx(1, 0, false);
        chain.mine(t.hash, 100);
        assert_eq!(chain.confirmation_depth(&t), 10);
        assert!(chain.is_in_best_chain(&t));
        assert_eq!(chain.block_containing(&t), Some(BlockRef { height: 100 }));
    }

    #[test]
    fn conflicted_depth_is_negative() {
        let mut chain = ChainSnapshot::at_height(50);
        let t = tx(2, 0, false);
        chain.conflict(t.hash, 2);
        assert_eq!(chain.confirmation_depth(&t), -2);
        assert!(!chain.is_in_best_chain(&t));
    }

    #[test]
    fn height_lock_finality() {
        let chain = ChainSnapshot::at_height(99);
        assert!(chain.is_final(&tx(3, 0, false), LOCKTIME_THRESHOLD));
        assert!(chain.is_final(&tx(3, 99, false), LOCKTIME_THRESHOLD));
        assert!(!chain.is_final(&tx(3, 100, false), LOCKTIME_THRESHOLD));
    }

    #[test]
    fn time_lock_finality() {
        let mut chain = ChainSnapshot::at_height(10);
        chain.median_time_past = 1_700_000_000;
        assert!(chain.is_final(&tx(4, 1_600_000_000, false), LOCKTIME_THRESHOLD));
        assert!(!chain.is_final(&tx(4, 1_800_000_000, false), LOCKTIME_THRESHOLD));
    }

    #[test]
    fn lowered_threshold_reads_lock_as_timestamp() {
        let mut chain = ChainSnapshot::at_height(10);
        chain.median_time_past = 5_000;
        let locked = tx(7, 2_000, false);
        assert!(!chain.is_final(&locked, LOCKTIME_THRESHOLD));
        assert!(chain.is_final(&locked, 1_000));
    }

    #[test]
    fn coinbase_maturity_from_depth_or_override() {
        let mut chain = ChainSnapshot::at_height(109);
        let t = tx(5, 0, true);
        chain.mine(t.hash, 100);
        assert_eq!(chain.blocks_to_maturity(&t, 100), 91);
        chain.mine(t.hash, 100).blocks_to_maturity = Some(0);
        assert_eq!(chain.blocks_to_maturity(&t, 100), 0);
        assert_eq!(chain.blocks_to_maturity(&tx(6, 0, false), 100), 0);
    }

    #[test]
    fn wallet_input_ownership_follows_previous_output() {
        let mut wallet = WalletSnapshot::default();
        wallet.own_address("t1mine", Ownership::WatchOnly);
        let outpoint = OutPoint::new(TxHash([7; 32]), 0);
        wallet.add_known_output(outpoint, TxOut::to_address(40, "t1mine"));
        let input = TxIn { prevout: outpoint };
        assert_eq!(wallet.input_ownership(&input), Ownership::WatchOnly);
        let stranger = TxIn { prevout: OutPoint::new(TxHash([8; 32]), 1) };
        assert_eq!(wallet.input_ownership(&stranger), Ownership::NotMine);
    }

    #[test]
    fn received_notes_respect_depth_window() {
        let mut wallet = WalletSnapshot::default();
        wallet.add_note("zaddr", StoredNote::new(TxHash([1; 32]), 5, 0));
        wallet.add_note("zaddr", StoredNote::new(TxHash([2; 32]), 6, 4));
        assert_eq!(wallet.received_notes("zaddr", 0, i32::MAX).len(), 2);
        assert_eq!(wallet.received_notes("zaddr", 1, i32::MAX).len(), 1);
        assert!(wallet.received_notes("unknown", 0, i32::MAX).is_empty());
    }

    #[test]
    fn snapshots_load_from_json() {
        let hash = "11".repeat(32);
        let json = format!(
            r#"{{"height": 120, "transactions": {{"{hash}": {{"block_height": 100}}}}}}"#
        );
        let chain: ChainSnapshot = serde_json::from_str(&json).unwrap();
        let t = tx(0x11, 0, false);
        assert_eq!(chain.confirmation_depth(&t), 21);

        let relay: BroadcastSnapshot =
            serde_json::from_str(&format!(r#"{{"now": 10, "requests": {{"{hash}": 3}}}}"#))
                .unwrap();
        assert_eq!(relay.request_count(&t), 3);
    }
}
