//! Recover the wallet's own shielded value in a transaction.
//!
//! Shielded amounts are not visible in the transaction itself. The only way
//! to learn what this wallet received is to walk the received-note history
//! of every address it holds a spending key for and pick the notes created
//! by the transaction in question. That walk is O(addresses × notes).

use tracing::debug;

use crate::oracle::OwnershipOracle;
use crate::types::{Amount, NoteEntry, TxHash};

/// Notes of one transaction owned by the wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShieldedMatches {
    None,
    Single(NoteEntry),
    /// Several owned notes, e.g. a payment plus a change note. Kept in
    /// address order, then history order.
    Multiple(Vec<NoteEntry>),
}

impl ShieldedMatches {
    fn from_notes(mut notes: Vec<NoteEntry>) -> Self {
        match notes.len() {
            0 => ShieldedMatches::None,
            1 => ShieldedMatches::Single(notes.remove(0)),
            _ => ShieldedMatches::Multiple(notes),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ShieldedMatches::None)
    }

    pub fn len(&self) -> usize {
        match self {
            ShieldedMatches::None => 0,
            ShieldedMatches::Single(_) => 1,
            ShieldedMatches::Multiple(notes) => notes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<&NoteEntry> {
        self.notes().first()
    }

    pub fn notes(&self) -> &[NoteEntry] {
        match self {
            ShieldedMatches::None => &[],
            ShieldedMatches::Single(note) => std::slice::from_ref(note),
            ShieldedMatches::Multiple(notes) => notes,
        }
    }

    pub fn total(&self) -> Amount {
        self.notes().iter().map(|n| n.amount).sum()
    }
}

/// Resolver over an ownership oracle.
pub struct ShieldedResolver<'a, O: ?Sized> {
    oracle: &'a O,
}

impl<'a, O: OwnershipOracle + ?Sized> ShieldedResolver<'a, O> {
    pub fn new(oracle: &'a O) -> Self {
        Self { oracle }
    }

    /// All owned notes created by `txid`.
    pub fn resolve(&self, txid: &TxHash) -> ShieldedMatches {
        let mut found = Vec::new();
        for address in self.oracle.spending_addresses() {
            found.extend(
                self.oracle
                    .received_notes(&address, 0, i32::MAX)
                    .into_iter()
                    .filter(|note| note.txid == *txid)
                    .map(|note| NoteEntry { address: address.clone(), ..note }),
            );
        }
        debug!(tx = %txid, matches = found.len(), "resolved shielded notes");
        ShieldedMatches::from_notes(found)
    }

    /// First owned note created by `txid`, ignoring any others.
    pub fn resolve_first(&self, txid: &TxHash) -> Option<NoteEntry> {
        self.oracle.spending_addresses().into_iter().find_map(|address| {
            self.oracle
                .received_notes(&address, 0, i32::MAX)
                .into_iter()
                .find(|note| note.txid == *txid)
                .map(|note| NoteEntry { address, ..note })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{StoredNote, WalletSnapshot};

    fn hash(byte: u8) -> TxHash {
        TxHash([byte; 32])
    }

    fn wallet() -> WalletSnapshot {
        let mut wallet = WalletSnapshot::default();
        wallet.add_note("zaddr1", StoredNote::new(hash(1), 250_000, 3));
        wallet.add_note("zaddr1", StoredNote::new(hash(2), 10, 1));
        wallet.add_note("zaddr2", StoredNote::new(hash(2), 20, 1));
        wallet.add_note("zaddr2", StoredNote::new(hash(2), 30, 1));
        wallet
    }

    #[test]
    fn single_match_reports_owning_address() {
        let wallet = wallet();
        let resolver = ShieldedResolver::new(&wallet);
        match resolver.resolve(&hash(1)) {
            ShieldedMatches::Single(note) => {
                assert_eq!(note.amount, 250_000);
                assert_eq!(note.address, "zaddr1");
            }
            other => panic!("expected single match, got {other:?}"),
        }
    }

    #[test]
    fn every_match_is_collected() {
        let wallet = wallet();
        let matches = ShieldedResolver::new(&wallet).resolve(&hash(2));
        assert_eq!(matches.len(), 3);
        assert_eq!(matches.total(), 60);
        let addresses: Vec<_> = matches.notes().iter().map(|n| n.address.as_str()).collect();
        assert_eq!(addresses, ["zaddr1", "zaddr2", "zaddr2"]);
    }

    #[test]
    fn first_match_drops_the_rest() {
        let wallet = wallet();
        let first = ShieldedResolver::new(&wallet).resolve_first(&hash(2)).unwrap();
        assert_eq!(first.amount, 10);
        assert_eq!(first.address, "zaddr1");
    }

    #[test]
    fn unknown_transaction_has_no_match() {
        let wallet = wallet();
        let resolver = ShieldedResolver::new(&wallet);
        assert!(resolver.resolve(&hash(9)).is_none());
        assert!(resolver.resolve_first(&hash(9)).is_none());
    }

    #[test]
    fn addresses_without_spending_key_are_skipped() {
        let mut wallet = wallet();
        wallet.add_viewing_only_note("zview", StoredNote::new(hash(1), 5, 1));
        let matches = ShieldedResolver::new(&wallet).resolve(&hash(1));
        assert_eq!(matches.len(), 1);
    }
}
