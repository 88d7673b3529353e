//! Property-based tests for ledger classification and status derivation.
//!
//! Uses proptest to generate plain transparent transactions and chain
//! positions, and checks the invariants every ledger must keep.

use proptest::prelude::*;
use zwallet_ledger::snapshot::{BroadcastSnapshot, ChainSnapshot, WalletSnapshot};
use zwallet_ledger::{
    classify, classify_detailed, status_update_needed, update_status, Amount, ConsensusParams,
    LedgerRecord, Ownership, RawTransaction, RecordKind, TxOut,
};
use zwallet_test_fixtures::{outpoint, TxBuilder, RECEIVED_AT};

const DESTINATIONS: [&str; 4] = ["t1mine", "t1change", "t1watch", "t1stranger"];

// =============================================================================
// PROPTEST STRATEGIES
// =============================================================================

/// A valid plain transaction: transparent outputs never exceed inputs.
#[derive(Clone, Debug)]
struct PlainTx {
    /// (owned, value) per input.
    inputs: Vec<(bool, Amount)>,
    /// (destination index, value) per output.
    outputs: Vec<(usize, Amount)>,
}

fn plain_tx() -> impl Strategy<Value = PlainTx> {
    (
        prop::collection::vec((any::<bool>(), 1_000i64..10_000_000), 1..5),
        prop::collection::vec((0usize..DESTINATIONS.len(), 1i64..100), 1..6),
        0i64..50,
    )
        .prop_map(|(inputs, weights, fee_weight)| {
            let total_in: Amount = inputs.iter().map(|(_, v)| v).sum();
            let total_weight: Amount = weights.iter().map(|(_, w)| w).sum::<Amount>() + fee_weight;
            let outputs = weights
                .into_iter()
                .map(|(dest, w)| (dest, total_in * w / total_weight))
                .collect();
            PlainTx { inputs, outputs }
        })
}

fn wallet() -> WalletSnapshot {
    let mut wallet = WalletSnapshot::default();
    wallet
        .own_address("t1mine", Ownership::Spendable)
        .own_change_address("t1change")
        .own_address("t1watch", Ownership::WatchOnly);
    wallet
}

/// Materialize a generated transaction and the wallet that funded it.
fn materialize(plain: &PlainTx) -> (RawTransaction, WalletSnapshot, Amount, Amount) {
    let mut wallet = wallet();
    let mut builder = TxBuilder::new("generated");
    let mut debit = 0;
    for (i, &(owned, value)) in plain.inputs.iter().enumerate() {
        let i = i as u32;
        if owned {
            let prevout = outpoint("funding", i);
            wallet.add_known_output(prevout, TxOut::to_address(value, "t1mine"));
            builder = builder.spend(prevout);
            debit += value;
        } else {
            builder = builder.spend(outpoint("stranger", i));
        }
    }
    let mut credit = 0;
    for &(dest, value) in &plain.outputs {
        builder = builder.pay(value, DESTINATIONS[dest]);
        if dest < 3 {
            credit += value;
        }
    }
    (builder.build(), wallet, debit, credit)
}

fn net(records: &[LedgerRecord]) -> Amount {
    records.iter().map(LedgerRecord::net).sum()
}

// =============================================================================
// CLASSIFICATION PROPERTIES
// =============================================================================

proptest! {
    /// Property: records of a transaction sum to the wallet's net change.
    #[test]
    fn records_conserve_value(plain in plain_tx()) {
        let (tx, wallet, debit, credit) = materialize(&plain);
        let records = classify(&tx, &wallet, &ConsensusParams::default()).unwrap();
        prop_assert_eq!(net(&records), credit - debit);
    }

    /// Property: debits are never positive and indices follow emission order.
    #[test]
    fn records_are_well_formed(plain in plain_tx()) {
        let (tx, wallet, _, _) = materialize(&plain);
        let records = classify(&tx, &wallet, &ConsensusParams::default()).unwrap();
        for (i, record) in records.iter().enumerate() {
            prop_assert!(record.debit <= 0, "{:?}", record);
            prop_assert_eq!(record.index as usize, i);
            prop_assert_eq!(record.hash, tx.hash);
        }
    }

    /// Property: a transaction touching nothing owned yields no records.
    #[test]
    fn foreign_transactions_are_skipped(plain in plain_tx()) {
        let foreign = PlainTx {
            inputs: plain.inputs.iter().map(|&(_, v)| (false, v)).collect(),
            outputs: plain.outputs.iter().map(|&(_, v)| (3, v)).collect(),
        };
        let (tx, wallet, _, _) = materialize(&foreign);
        prop_assert!(classify(&tx, &wallet, &ConsensusParams::default()).unwrap().is_empty());
    }

    /// Property: classification is a pure function of its inputs.
    #[test]
    fn classification_is_deterministic(plain in plain_tx()) {
        let (tx, wallet, _, _) = materialize(&plain);
        let params = ConsensusParams::default();
        let first = classify_detailed(&tx, &wallet, &params).unwrap();
        let second = classify_detailed(&tx, &wallet, &params).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Property: fully owned spends never degrade to a mixed record.
    #[test]
    fn owned_spends_are_broken_out(plain in plain_tx()) {
        let owned = PlainTx {
            inputs: plain.inputs.iter().map(|&(_, v)| (true, v)).collect(),
            outputs: plain.outputs.clone(),
        };
        let (tx, wallet, _, _) = materialize(&owned);
        let records = classify(&tx, &wallet, &ConsensusParams::default()).unwrap();
        prop_assert!(records.iter().all(|r| r.kind != RecordKind::Mixed));
    }
}

// =============================================================================
// STATUS PROPERTIES
// =============================================================================

proptest! {
    /// Property: recomputing at an unchanged tip gives an identical status.
    #[test]
    fn status_is_idempotent(
        tip in 1i32..1_000_000,
        mined_back in prop::option::of(0i32..200),
        requests in -1i32..3,
        age in 0i64..1_000,
    ) {
        let tx = TxBuilder::new("status").pay(1, "t1mine").build();
        let mut chain = ChainSnapshot::at_height(tip);
        if let Some(back) = mined_back {
            chain.mine(tx.hash, (tip - back).max(0));
        }
        let mut relay = BroadcastSnapshot::at(i64::from(RECEIVED_AT) + age);
        relay.set_requests(tx.hash, requests);

        let params = ConsensusParams::default();
        let record = classify(&tx, &wallet(), &params).unwrap().remove(0);
        let a = update_status(&record, &tx, &chain, &relay, &params).unwrap();
        let b = update_status(&record, &tx, &chain, &relay, &params).unwrap();
        prop_assert!(!status_update_needed(&a, &chain));
        prop_assert_eq!(a, b);
    }

    /// Property: deeper blocks sort before shallower ones, unmined last.
    #[test]
    fn sort_key_follows_height(low in 0i32..500_000, gap in 1i32..500_000) {
        let a = TxBuilder::new("a").pay(1, "t1mine").build();
        let b = TxBuilder::new("b").pay(1, "t1mine").build();
        let pending = TxBuilder::new("pending").pay(1, "t1mine").build();
        let mut chain = ChainSnapshot::at_height(low + gap);
        chain.mine(a.hash, low);
        chain.mine(b.hash, low + gap);

        let params = ConsensusParams::default();
        let relay = BroadcastSnapshot::at(i64::from(RECEIVED_AT));
        let key = |tx: &RawTransaction| {
            let record = classify(tx, &wallet(), &params).unwrap().remove(0);
            update_status(&record, tx, &chain, &relay, &params).unwrap().sort_key
        };
        let (ka, kb, kp) = (key(&a), key(&b), key(&pending));
        prop_assert!(ka < kb);
        prop_assert!(kb < kp);
    }
}
