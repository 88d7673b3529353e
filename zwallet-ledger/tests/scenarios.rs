//! End-to-end ledger scenarios: classification plus status against the
//! shared fixture wallet.

use zwallet_ledger::{
    classify, classify_detailed, update_status, ConsensusParams, LedgerRecord, Network,
    RecordKind, TransactionStatus, TxState,
};
use zwallet_test_fixtures::{
    canonical_bundle, fixtures, sample_conflicted, sample_immature_coinbase,
    sample_mature_coinbase, sample_self_transfer, sample_shielded_receive, sample_shielded_send,
    sample_shielding, sample_transparent_receive, txid, Scenario,
};

// === Helpers ===

fn records(scenario: &Scenario) -> Vec<LedgerRecord> {
    classify(&scenario.tx, &scenario.wallet, &ConsensusParams::default()).unwrap()
}

fn status(scenario: &Scenario, record: &LedgerRecord) -> TransactionStatus {
    update_status(
        record,
        &scenario.tx,
        &scenario.chain,
        &scenario.broadcast,
        &ConsensusParams::default(),
    )
    .unwrap()
}

fn single(scenario: &Scenario) -> (LedgerRecord, TransactionStatus) {
    let mut records = records(scenario);
    assert_eq!(records.len(), 1, "{}: {records:?}", scenario.name);
    let record = records.remove(0);
    let status = status(scenario, &record);
    (record, status)
}

fn status_of(scenario: &Scenario) -> TransactionStatus {
    let record = records(scenario).remove(0);
    status(scenario, &record)
}

// === Classification + Status ===

#[test]
fn test_transparent_receive() {
    let (record, status) = single(&sample_transparent_receive());
    assert_eq!(record.kind, RecordKind::ReceivedTransparent);
    assert_eq!(record.address, "t1mine");
    assert_eq!(record.credit, 500_000);
    assert_eq!(record.debit, 0);
    assert_eq!(status.depth, 10);
    assert_eq!(status.state, TxState::Confirmed);
    assert!(status.counts_for_balance);
}

#[test]
fn test_self_transfer_with_fee() {
    let (record, status) = single(&sample_self_transfer());
    assert_eq!(record.kind, RecordKind::SelfTransfer);
    assert_eq!(record.debit, -300);
    assert_eq!(record.credit, 0);
    assert_eq!(record.net(), -300);
    assert_eq!(record.fee, 300);
    assert_eq!(status.state, TxState::Confirming);
}

#[test]
fn test_shielded_receive() {
    let (record, status) = single(&sample_shielded_receive());
    assert_eq!(record.kind, RecordKind::ShieldedReceive);
    assert_eq!(record.address, "zaddr1");
    assert_eq!(record.credit, 250_000);
    assert_eq!(record.debit, 0);
    assert_eq!(status.state, TxState::Unconfirmed);
    assert_eq!(status.sort_key.height, i32::MAX);
}

#[test]
fn test_shielded_send_to_transparent() {
    let (record, status) = single(&sample_shielded_send());
    assert_eq!(record.kind, RecordKind::ShieldedSend);
    assert_eq!(record.address, "t1payee");
    assert_eq!(record.debit, -100_000);
    assert_eq!(record.fee, 0);
    assert_eq!(status.depth, 1);
    assert_eq!(status.state, TxState::Confirming);
}

#[test]
fn test_shielding_own_coin() {
    let (record, status) = single(&sample_shielding());
    assert_eq!(record.kind, RecordKind::ShieldedPool);
    assert_eq!(record.address, "zaddr1");
    assert_eq!((record.debit, record.credit), (-60_000, 50_000));
    assert_eq!(status.state, TxState::Confirmed);
}

#[test]
fn test_coinbase_maturity() {
    let (record, status) = single(&sample_mature_coinbase());
    assert_eq!(record.kind, RecordKind::Generated);
    assert_eq!(status.depth, 10);
    assert_eq!(status.state, TxState::Confirmed);

    let (_, status) = single(&sample_immature_coinbase());
    assert_eq!(status.state, TxState::Immature);
    assert_eq!(status.matures_in, 40);
    assert!(!status.counts_for_balance);
}

#[test]
fn test_conflicted_regardless_of_age_or_requests() {
    let scenario = sample_conflicted();
    let (record, status) = single(&scenario);
    assert_eq!(record.kind, RecordKind::SentTransparent);
    assert_eq!(record.address, "t1alice");
    assert_eq!(record.debit, -101_000);
    assert_eq!(record.fee, 1_000);
    assert_eq!(status.depth, -2);
    assert_eq!(status.state, TxState::Conflicted);

    let mut requested = scenario.clone();
    requested.broadcast.set_requests(requested.tx.hash, 7);
    assert_eq!(status_of(&requested).state, TxState::Conflicted);
}

#[test]
fn test_network_profiles_coexist() {
    let scenario = sample_self_transfer();
    let record = records(&scenario).remove(0);
    for (network, expected) in [
        (Network::Main, TxState::Confirming),
        (Network::Regtest, TxState::Confirmed),
    ] {
        let params = ConsensusParams::for_network(network);
        let status =
            update_status(&record, &scenario.tx, &scenario.chain, &scenario.broadcast, &params)
                .unwrap();
        assert_eq!(status.state, expected, "{network}");
    }
}

#[test]
fn test_shielded_notices_are_quiet_for_single_notes() {
    for scenario in [sample_shielded_receive(), sample_shielded_send(), sample_shielding()] {
        let c = classify_detailed(&scenario.tx, &scenario.wallet, &ConsensusParams::default())
            .unwrap();
        assert!(c.notices.is_empty(), "{}: {:?}", scenario.name, c.notices);
    }
}

// === Bundle Report ===

#[test]
fn test_canonical_report_is_newest_first() {
    let bundle = fixtures().bundle();
    let report = bundle.report(&ConsensusParams::default()).unwrap();
    assert_eq!(report.entries.len(), bundle.transactions.len());
    assert!(report.notices.is_empty());

    let order: Vec<_> = report.entries.iter().map(|e| e.record.hash).collect();
    assert_eq!(order[0], txid("shielded-receive"));
    assert_eq!(order[1], txid("conflicted"));
    assert_eq!(order[2], txid("shielded-send"));
    assert_eq!(order.last(), Some(&txid("transparent-receive")));

    let keys: Vec<_> = report.entries.iter().map(|e| e.status.sort_key).collect();
    assert!(keys.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_report_hides_orphaned_coinbase() {
    let mut bundle = canonical_bundle(ConsensusParams::default());
    let reward = txid("coinbase-mature");
    bundle.chain.transactions.remove(&reward);
    let report = bundle.report(&ConsensusParams::default()).unwrap();
    assert_eq!(report.entries.len(), bundle.transactions.len() - 1);
    assert!(report.entries.iter().all(|e| e.record.hash != reward));
}

#[test]
fn test_forgotten_coins_are_not_debited() {
    let mut bundle = canonical_bundle(ConsensusParams::default());
    bundle.wallet.known_outputs.clear();
    // inputs whose previous outputs are unknown no longer count as owned
    let report = bundle.report(&ConsensusParams::default()).unwrap();
    let moved = report
        .entries
        .iter()
        .find(|e| e.record.hash == txid("self-transfer"))
        .unwrap();
    assert_eq!(moved.record.kind, RecordKind::ReceivedTransparent);
    assert_eq!((moved.record.debit, moved.record.credit), (0, 1_000_000));
}
