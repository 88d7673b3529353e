//! A complete saved wallet view and the ledger derived from it.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classify::{classify_detailed, ClassifyNotice};
use crate::error::LedgerResult;
use crate::params::ConsensusParams;
use crate::record::{show_transaction, LedgerRecord};
use crate::snapshot::{BroadcastSnapshot, ChainSnapshot, WalletSnapshot};
use crate::status::{update_status, TransactionStatus};
use crate::types::{RawTransaction, TxHash};

/// Chain, wallet and relay snapshots plus the wallet's transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBundle {
    /// Parameters the bundle was captured under; callers may override.
    #[serde(default)]
    pub params: Option<ConsensusParams>,
    pub chain: ChainSnapshot,
    #[serde(default)]
    pub wallet: WalletSnapshot,
    #[serde(default)]
    pub broadcast: BroadcastSnapshot,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

/// One record with its current status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub record: LedgerRecord,
    pub status: TransactionStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxNotice {
    pub tx: TxHash,
    #[serde(flatten)]
    pub notice: ClassifyNotice,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReport {
    /// Newest first: unmined transactions, then by descending block height.
    pub entries: Vec<LedgerEntry>,
    pub notices: Vec<TxNotice>,
}

impl LedgerBundle {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Classify every visible transaction and attach statuses.
    pub fn report(&self, params: &ConsensusParams) -> LedgerResult<LedgerReport> {
        let mut report = LedgerReport::default();
        let mut hidden = 0usize;
        for tx in &self.transactions {
            if !show_transaction(tx, &self.chain) {
                hidden += 1;
                continue;
            }
            let classification = classify_detailed(tx, &self.wallet, params)?;
            report.notices.extend(
                classification
                    .notices
                    .into_iter()
                    .map(|notice| TxNotice { tx: tx.hash, notice }),
            );
            for record in classification.records {
                let status = update_status(&record, tx, &self.chain, &self.broadcast, params)?;
                report.entries.push(LedgerEntry { record, status });
            }
        }
        report
            .entries
            .sort_by(|a, b| b.status.sort_key.cmp(&a.status.sort_key));
        info!(
            transactions = self.transactions.len(),
            records = report.entries.len(),
            hidden,
            "ledger report built"
        );
        Ok(report)
    }
}
