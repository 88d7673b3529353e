//! One wallet view per ledger scenario.
//!
//! Every scenario starts from [`sample_wallet`] and a chain at
//! [`TIP_HEIGHT`], then adds the one transaction it is about.

use zwallet_ledger::snapshot::{BroadcastSnapshot, ChainSnapshot, StoredNote, WalletSnapshot};
use zwallet_ledger::{ConsensusParams, LedgerBundle, Ownership, RawTransaction, TxOut};

use crate::{outpoint, TxBuilder, RECEIVED_AT, TIP_HEIGHT};

/// Adjusted network time of every scenario's relay view.
pub const NOW: i64 = RECEIVED_AT as i64 + 30;

#[derive(Clone, Debug)]
pub struct Scenario {
    pub name: &'static str,
    pub tx: RawTransaction,
    pub wallet: WalletSnapshot,
    pub chain: ChainSnapshot,
    pub broadcast: BroadcastSnapshot,
}

impl Scenario {
    fn new(name: &'static str, tx: RawTransaction) -> Self {
        Self {
            name,
            tx,
            wallet: sample_wallet(),
            chain: ChainSnapshot::at_height(TIP_HEIGHT),
            broadcast: BroadcastSnapshot::at(NOW),
        }
    }

    /// Mine the scenario transaction so it has `depth` confirmations.
    fn mined_at_depth(mut self, depth: i32) -> Self {
        self.chain.mine(self.tx.hash, TIP_HEIGHT - depth + 1);
        self
    }

    fn requested(mut self, count: i32) -> Self {
        self.broadcast.set_requests(self.tx.hash, count);
        self
    }

    fn with_note(mut self, address: &str, amount: i64, depth: i32) -> Self {
        self.wallet
            .add_note(address, StoredNote::new(self.tx.hash, amount, depth));
        self
    }

    /// Single-transaction bundle.
    pub fn bundle(&self, params: ConsensusParams) -> LedgerBundle {
        LedgerBundle {
            params: Some(params),
            chain: self.chain.clone(),
            wallet: self.wallet.clone(),
            broadcast: self.broadcast.clone(),
            transactions: vec![self.tx.clone()],
        }
    }
}

/// Owns `t1mine`, change address `t1change` and watch-only `t1watch`, and
/// holds three coins from the `funding` transaction.
pub fn sample_wallet() -> WalletSnapshot {
    let mut wallet = WalletSnapshot::default();
    wallet
        .own_address("t1mine", Ownership::Spendable)
        .own_change_address("t1change")
        .own_address("t1watch", Ownership::WatchOnly);
    wallet
        .add_known_output(outpoint("funding", 0), TxOut::to_address(1_000_300, "t1mine"))
        .add_known_output(outpoint("funding", 1), TxOut::to_address(150_000, "t1mine"))
        .add_known_output(outpoint("funding", 2), TxOut::to_address(60_000, "t1mine"));
    wallet
}

/// A stranger pays 500_000 to `t1mine`; ten confirmations.
pub fn sample_transparent_receive() -> Scenario {
    let tx = TxBuilder::new("transparent-receive")
        .spend(outpoint("stranger", 0))
        .pay(500_000, "t1mine")
        .build();
    Scenario::new("transparent-receive", tx)
        .mined_at_depth(10)
        .requested(3)
}

/// Moves a 1_000_300 coin to the change address, paying 300 in fees; three
/// confirmations.
pub fn sample_self_transfer() -> Scenario {
    let tx = TxBuilder::new("self-transfer")
        .spend(outpoint("funding", 0))
        .pay(1_000_000, "t1change")
        .build();
    Scenario::new("self-transfer", tx).mined_at_depth(3)
}

/// Fully shielded payment of 250_000 to `zaddr1`; in the mempool.
pub fn sample_shielded_receive() -> Scenario {
    let tx = TxBuilder::new("shielded-receive")
        .shielded(0, 0)
        .decrypted(0, 0)
        .build();
    Scenario::new("shielded-receive", tx)
        .with_note("zaddr1", 250_000, 0)
        .requested(1)
}

/// Pays 100_000 from shielded funds to `t1payee`, keeping a 5_000 change
/// note; one confirmation.
pub fn sample_shielded_send() -> Scenario {
    let tx = TxBuilder::new("shielded-send")
        .shielded(0, 110_000)
        .pay(100_000, "t1payee")
        .decrypted(0, 1)
        .build();
    Scenario::new("shielded-send", tx)
        .with_note("zaddr1", 5_000, 1)
        .mined_at_depth(1)
}

/// Shields a 60_000 coin into a 50_000 note of `zaddr1`; six confirmations.
pub fn sample_shielding() -> Scenario {
    let tx = TxBuilder::new("shielding")
        .spend(outpoint("funding", 2))
        .shielded(60_000, 0)
        .decrypted(0, 0)
        .build();
    Scenario::new("shielding", tx)
        .with_note("zaddr1", 50_000, 6)
        .mined_at_depth(6)
}

/// Mined reward ten blocks deep whose maturity window has passed.
pub fn sample_mature_coinbase() -> Scenario {
    coinbase_with_maturity("coinbase-mature", 0)
}

/// Mined reward ten blocks deep with 40 blocks of maturity left.
pub fn sample_immature_coinbase() -> Scenario {
    coinbase_with_maturity("coinbase-immature", 40)
}

fn coinbase_with_maturity(name: &'static str, remaining: i32) -> Scenario {
    let tx = TxBuilder::new(name)
        .coinbase()
        .pay(625_000_000, "t1mine")
        .build();
    let mut scenario = Scenario::new(name, tx).mined_at_depth(10);
    scenario
        .chain
        .mine(scenario.tx.hash, TIP_HEIGHT - 9)
        .blocks_to_maturity = Some(remaining);
    scenario
}

/// An hour-old payment to `t1alice` displaced by a conflict two blocks deep
/// and never requested by a peer.
pub fn sample_conflicted() -> Scenario {
    let tx = TxBuilder::new("conflicted")
        .spend(outpoint("funding", 1))
        .pay(100_000, "t1alice")
        .pay(49_000, "t1change")
        .received_at(RECEIVED_AT - 3_600)
        .build();
    let mut scenario = Scenario::new("conflicted", tx).requested(0);
    scenario.chain.conflict(scenario.tx.hash, 2);
    scenario
}

pub fn all_scenarios() -> Vec<Scenario> {
    vec![
        sample_transparent_receive(),
        sample_self_transfer(),
        sample_shielded_receive(),
        sample_shielded_send(),
        sample_shielding(),
        sample_mature_coinbase(),
        sample_immature_coinbase(),
        sample_conflicted(),
    ]
}

/// Every scenario merged into one wallet view.
pub fn canonical_bundle(params: ConsensusParams) -> LedgerBundle {
    let mut bundle = LedgerBundle {
        params: Some(params),
        chain: ChainSnapshot::at_height(TIP_HEIGHT),
        wallet: sample_wallet(),
        broadcast: BroadcastSnapshot::at(NOW),
        transactions: Vec::new(),
    };
    for scenario in all_scenarios() {
        bundle.chain.transactions.extend(scenario.chain.transactions);
        bundle.broadcast.requests.extend(scenario.broadcast.requests);
        bundle.wallet.spending_keys.extend(scenario.wallet.spending_keys);
        for (address, notes) in scenario.wallet.notes {
            bundle.wallet.notes.entry(address).or_default().extend(notes);
        }
        bundle.transactions.push(scenario.tx);
    }
    bundle
}
