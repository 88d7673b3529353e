//! Deterministic transactions and canonical wallet views shared by tests.

pub mod scenarios;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use zwallet_ledger::{
    Amount, ConsensusParams, LedgerBundle, NoteLocator, OutPoint, OutputScript, RawTransaction,
    ShieldedDescriptor, TxHash, TxIn, TxOut,
};

pub use scenarios::*;

/// Chain tip every scenario is evaluated at.
pub const TIP_HEIGHT: i32 = 1_000;
/// Receipt time of every scenario transaction.
pub const RECEIVED_AT: u32 = 1_700_000_000;

static FIXTURES: OnceCell<LedgerFixtures> = OnceCell::new();

/// The canonical bundle holding every scenario, plus its JSON encoding.
pub struct LedgerFixtures {
    bundle: LedgerBundle,
    bundle_json: String,
}

impl LedgerFixtures {
    pub fn bundle(&self) -> &LedgerBundle {
        &self.bundle
    }

    pub fn bundle_json(&self) -> &str {
        &self.bundle_json
    }
}

/// Return lazily constructed fixtures shared across crates.
pub fn fixtures() -> &'static LedgerFixtures {
    FIXTURES.get_or_init(|| build_fixtures().expect("failed to build zwallet test fixtures"))
}

fn build_fixtures() -> Result<LedgerFixtures> {
    let bundle = canonical_bundle(ConsensusParams::default());
    let bundle_json = serde_json::to_string_pretty(&bundle).context("encode canonical bundle")?;
    Ok(LedgerFixtures {
        bundle,
        bundle_json,
    })
}

/// Deterministic id for a labelled transaction.
pub fn txid(label: &str) -> TxHash {
    TxHash(*blake3::hash(label.as_bytes()).as_bytes())
}

/// Outpoint `index` of the labelled transaction.
pub fn outpoint(label: &str, index: u32) -> OutPoint {
    OutPoint::new(txid(label), index)
}

/// Builds a [`RawTransaction`] whose hash is derived from its label.
#[derive(Clone, Debug)]
pub struct TxBuilder {
    tx: RawTransaction,
}

impl TxBuilder {
    pub fn new(label: &str) -> Self {
        Self {
            tx: RawTransaction {
                hash: txid(label),
                inputs: Vec::new(),
                outputs: Vec::new(),
                shielded: Vec::new(),
                note_data: Vec::new(),
                is_coinbase: false,
                lock_time: 0,
                time_received: RECEIVED_AT,
                metadata: BTreeMap::new(),
            },
        }
    }

    pub fn spend(mut self, prevout: OutPoint) -> Self {
        self.tx.inputs.push(TxIn { prevout });
        self
    }

    pub fn pay(mut self, value: Amount, address: &str) -> Self {
        self.tx.outputs.push(TxOut::to_address(value, address));
        self
    }

    pub fn pay_script(mut self, value: Amount, script: &[u8]) -> Self {
        self.tx.outputs.push(TxOut {
            value,
            script: OutputScript::NonStandard(script.to_vec()),
        });
        self
    }

    /// Add a shielded descriptor moving `value_in` into and `value_out` out
    /// of the pool.
    pub fn shielded(mut self, value_in: Amount, value_out: Amount) -> Self {
        self.tx.shielded.push(ShieldedDescriptor {
            value_in,
            value_out,
            ciphertexts: vec![vec![0u8; 52]; 2],
        });
        self
    }

    /// Mark shielded output `output` of descriptor `descriptor` as decrypted
    /// by the wallet.
    pub fn decrypted(mut self, descriptor: u32, output: u8) -> Self {
        self.tx.note_data.push(NoteLocator { descriptor, output });
        self
    }

    pub fn coinbase(mut self) -> Self {
        self.tx.is_coinbase = true;
        self
    }

    pub fn lock_time(mut self, lock_time: u32) -> Self {
        self.tx.lock_time = lock_time;
        self
    }

    pub fn received_at(mut self, time: u32) -> Self {
        self.tx.time_received = time;
        self
    }

    pub fn annotate(mut self, key: &str, value: &str) -> Self {
        self.tx.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> RawTransaction {
        self.tx
    }
}
