//! Decompose one transaction into ledger records.
//!
//! The transaction's shape is fixed once from which transparent sides are
//! present and whether it carries shielded descriptors. That shape, crossed
//! with what the shielded resolver found, picks exactly one decomposition
//! rule through a single exhaustive `match`; shapes no rule claims go through
//! the transparent decomposition.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::oracle::OwnershipOracle;
use crate::params::ConsensusParams;
use crate::record::{LedgerRecord, RecordKind, UNKNOWN_SHIELDED_ADDRESS};
use crate::shielded::{ShieldedMatches, ShieldedResolver};
use crate::types::{add_money, Amount, NoteEntry, Ownership, RawTransaction};

/// Structural shape of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxShape {
    /// No shielded descriptors.
    Plain,
    /// Shielded descriptors with transparent inputs only.
    ShieldedIn,
    /// Shielded descriptors with transparent outputs only.
    ShieldedOut,
    /// Shielded descriptors with transparent inputs and outputs.
    ShieldedBoth,
    /// Shielded descriptors and nothing transparent.
    ShieldedNone,
}

impl TxShape {
    pub fn of(tx: &RawTransaction) -> Self {
        if !tx.has_shielded() {
            return TxShape::Plain;
        }
        match (!tx.inputs.is_empty(), !tx.outputs.is_empty()) {
            (true, true) => TxShape::ShieldedBoth,
            (true, false) => TxShape::ShieldedIn,
            (false, true) => TxShape::ShieldedOut,
            (false, false) => TxShape::ShieldedNone,
        }
    }
}

/// Something about the decomposition the caller may want to surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum ClassifyNotice {
    /// Payees could not be broken out; only the aggregate net is recorded.
    DegradedToMixed { net: Amount },
    /// Several owned shielded notes came from this transaction; one record
    /// was emitted per note.
    MultipleShieldedCandidates { count: usize },
    /// Nothing in the transaction belongs to the wallet.
    NotRelevant,
}

/// Records for one transaction plus how they were derived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub shape: TxShape,
    pub records: Vec<LedgerRecord>,
    #[serde(default)]
    pub notices: Vec<ClassifyNotice>,
}

/// Decompose `tx` into ledger records.
pub fn classify<O: OwnershipOracle + ?Sized>(
    tx: &RawTransaction,
    oracle: &O,
    params: &ConsensusParams,
) -> LedgerResult<Vec<LedgerRecord>> {
    classify_detailed(tx, oracle, params).map(|c| c.records)
}

/// Like [`classify`], also reporting the shape and any fidelity notices.
pub fn classify_detailed<O: OwnershipOracle + ?Sized>(
    tx: &RawTransaction,
    oracle: &O,
    params: &ConsensusParams,
) -> LedgerResult<Classification> {
    tx.check_amounts()?;
    let shape = TxShape::of(tx);
    let totals = Totals::collect(tx, oracle)?;
    let resolution = if shape == TxShape::Plain {
        Resolution::Unmatched
    } else {
        Resolution::from_matches(ShieldedResolver::new(oracle).resolve(&tx.hash), tx)
    };

    let mut out = Decomposition::new(tx, shape);

    let relevant = totals.any_mine || tx.has_note_data() || resolution.is_owned();
    if !relevant {
        debug!(tx = %tx.hash, ?shape, "transaction does not involve the wallet");
        out.notices.push(ClassifyNotice::NotRelevant);
        return Ok(out.finish());
    }

    debug!(tx = %tx.hash, ?shape, resolution = resolution.label(), "classifying transaction");

    match (shape, resolution) {
        (TxShape::Plain, _) => out.transparent(&totals),
        (TxShape::ShieldedBoth, Resolution::Owned(notes)) => {
            // Transparent spend with a shielded note to this wallet.
            out.note_receipt(
                RecordKind::ReceivedTransparent,
                &notes,
                -(totals.debit - totals.change),
                totals.change,
            );
        }
        (TxShape::ShieldedOut, Resolution::Owned(notes)) => {
            out.note_count(notes.len());
            out.shielded_send(params);
        }
        (TxShape::ShieldedNone, Resolution::Owned(notes)) => {
            out.note_receipt(RecordKind::ShieldedReceive, &notes, 0, totals.change);
        }
        (TxShape::ShieldedIn, Resolution::Owned(notes)) => {
            out.note_receipt(RecordKind::ShieldedPool, &notes, -totals.debit, 0);
        }
        (TxShape::ShieldedBoth, Resolution::Counterpart) if totals.all_from_me.is_mine() => {
            out.pool_deposit(&totals, params);
        }
        (TxShape::ShieldedOut, Resolution::Counterpart) => {
            out.pool_withdrawal(&totals);
        }
        (
            TxShape::ShieldedIn | TxShape::ShieldedBoth | TxShape::ShieldedNone,
            Resolution::Counterpart,
        )
        | (_, Resolution::Unmatched) => {
            debug!(tx = %tx.hash, ?shape, "no shielded rule applies, using transparent decomposition");
            out.transparent(&totals);
        }
    }

    Ok(out.finish())
}

/// What the shielded resolver says about the wallet's part in a transaction.
enum Resolution {
    /// The wallet holds note data and owns at least one note of this
    /// transaction.
    Owned(Vec<NoteEntry>),
    /// No owned notes: the wallet can only be a transparent counterpart.
    Counterpart,
    /// Resolver outcome and note data disagree, or the transaction is plain.
    Unmatched,
}

impl Resolution {
    fn from_matches(matches: ShieldedMatches, tx: &RawTransaction) -> Self {
        match (matches, tx.has_note_data()) {
            (ShieldedMatches::None, false) => Resolution::Counterpart,
            (ShieldedMatches::Single(note), true) => Resolution::Owned(vec![note]),
            (ShieldedMatches::Multiple(notes), true) => Resolution::Owned(notes),
            (ShieldedMatches::None, true)
            | (ShieldedMatches::Single(_), false)
            | (ShieldedMatches::Multiple(_), false) => Resolution::Unmatched,
        }
    }

    fn is_owned(&self) -> bool {
        matches!(self, Resolution::Owned(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Resolution::Owned(_) => "owned",
            Resolution::Counterpart => "counterpart",
            Resolution::Unmatched => "unmatched",
        }
    }
}

/// Wallet-relative aggregates over the transparent side of a transaction.
struct Totals {
    /// Value of owned inputs.
    debit: Amount,
    /// Value of owned outputs.
    credit: Amount,
    /// Value of owned change outputs.
    change: Amount,
    involves_watch_only: bool,
    any_mine: bool,
    /// Weakest ownership over the inputs; `NotMine` when there are none.
    all_from_me: Ownership,
    /// Weakest ownership over the outputs; `Spendable` when there are none.
    all_to_me: Ownership,
    /// Ownership of each output, in output order.
    owned_outputs: Vec<Ownership>,
}

impl Totals {
    fn collect<O: OwnershipOracle + ?Sized>(tx: &RawTransaction, oracle: &O) -> LedgerResult<Self> {
        let mut totals = Totals {
            debit: 0,
            credit: 0,
            change: 0,
            involves_watch_only: false,
            any_mine: false,
            all_from_me: if tx.inputs.is_empty() {
                Ownership::NotMine
            } else {
                Ownership::Spendable
            },
            all_to_me: Ownership::Spendable,
            owned_outputs: Vec::with_capacity(tx.outputs.len()),
        };

        for input in &tx.inputs {
            let mine = oracle.input_ownership(input);
            totals.note_ownership(mine);
            totals.all_from_me = totals.all_from_me.min(mine);
            if mine.is_mine() {
                let prev = oracle
                    .previous_output(&input.prevout)
                    .ok_or(LedgerError::MissingPrevout(input.prevout))?;
                totals.debit = add_money(totals.debit, prev.value).ok_or(
                    LedgerError::AmountOutOfRange {
                        tx: tx.hash,
                        value: prev.value,
                    },
                )?;
            }
        }

        for output in &tx.outputs {
            let mine = oracle.output_ownership(output);
            totals.note_ownership(mine);
            totals.all_to_me = totals.all_to_me.min(mine);
            totals.owned_outputs.push(mine);
            if mine.is_mine() {
                totals.credit += output.value;
                if oracle.is_change(output) {
                    totals.change += output.value;
                }
            }
        }

        Ok(totals)
    }

    fn note_ownership(&mut self, mine: Ownership) {
        self.any_mine |= mine.is_mine();
        self.involves_watch_only |= mine.is_watch_only();
    }

    fn net(&self) -> Amount {
        self.credit - self.debit
    }
}

/// Value the transparent side leaves behind as a fee. Pool crossings count
/// as spends and receipts of the transparent side.
fn observed_fee(tx: &RawTransaction, totals: &Totals) -> Amount {
    totals.debit + tx.pool_value_out() - tx.value_out() - tx.pool_value_in()
}

/// Accumulates the records of one transaction in emission order.
struct Decomposition<'a> {
    tx: &'a RawTransaction,
    shape: TxShape,
    records: Vec<LedgerRecord>,
    notices: Vec<ClassifyNotice>,
}

impl<'a> Decomposition<'a> {
    fn new(tx: &'a RawTransaction, shape: TxShape) -> Self {
        Self {
            tx,
            shape,
            records: Vec::new(),
            notices: Vec::new(),
        }
    }

    fn finish(self) -> Classification {
        Classification {
            shape: self.shape,
            records: self.records,
            notices: self.notices,
        }
    }

    fn next_record(&self, kind: RecordKind) -> LedgerRecord {
        LedgerRecord::new(self.tx, self.records.len() as u32, kind)
    }

    fn push(&mut self, record: LedgerRecord) {
        self.records.push(record);
    }

    fn note_count(&mut self, count: usize) {
        if count > 1 {
            warn!(tx = %self.tx.hash, count, "multiple owned shielded notes in one transaction");
            self.notices
                .push(ClassifyNotice::MultipleShieldedCandidates { count });
        }
    }

    /// One record per owned note. The first carries the shape's debit and
    /// the change adjustment; later ones carry only their own note.
    fn note_receipt(
        &mut self,
        kind: RecordKind,
        notes: &[NoteEntry],
        first_debit: Amount,
        change: Amount,
    ) {
        self.note_count(notes.len());
        for (i, note) in notes.iter().enumerate() {
            let (debit, credit) = if i == 0 {
                (first_debit, note.amount - change)
            } else {
                (0, note.amount)
            };
            let record = self
                .next_record(kind)
                .with_address(note.address.clone())
                .with_amounts(debit, credit);
            self.push(record);
        }
    }

    /// Shielded funds leaving the pool to transparent outputs.
    fn shielded_send(&mut self, params: &ConsensusParams) {
        let tx = self.tx;
        let paid = tx.value_out();
        let address = tx
            .outputs
            .iter()
            .rev()
            .find_map(|out| out.destination())
            .unwrap_or_default()
            .to_string();
        let leftover = tx.pool_value_out() - paid;
        let fee = params.per_operation_fee - leftover;
        let record = self
            .next_record(RecordKind::ShieldedSend)
            .with_address(address)
            .with_amounts(-paid, 0)
            .with_fee(fee);
        self.push(record);
    }

    /// Transparent funds this wallet sent into a shielded address it does
    /// not own.
    fn pool_deposit(&mut self, totals: &Totals, params: &ConsensusParams) {
        let fee = params.per_operation_fee - totals.change;
        let record = self
            .next_record(RecordKind::SentTransparent)
            .with_address(UNKNOWN_SHIELDED_ADDRESS)
            .with_amounts(-self.tx.pool_value_in(), totals.change)
            .with_fee(fee);
        self.push(record);
    }

    /// Transparent funds this wallet received out of the shielded pool.
    fn pool_withdrawal(&mut self, totals: &Totals) {
        let address = self
            .tx
            .outputs
            .iter()
            .zip(&totals.owned_outputs)
            .rev()
            .filter(|(_, mine)| mine.is_mine())
            .find_map(|(out, _)| out.destination())
            .unwrap_or_default()
            .to_string();
        let record = self
            .next_record(RecordKind::ReceivedTransparent)
            .with_address(address)
            .with_amounts(0, totals.credit)
            .with_watch_only(totals.involves_watch_only);
        self.push(record);
    }

    fn transparent(&mut self, totals: &Totals) {
        if totals.net() > 0 || self.tx.is_coinbase {
            self.transparent_credit(totals);
        } else if totals.all_from_me.is_mine() && totals.all_to_me.is_mine() {
            self.self_transfer(totals);
        } else if totals.all_from_me.is_mine() {
            self.transparent_debit(totals);
        } else {
            self.mixed(totals);
        }
    }

    fn transparent_credit(&mut self, totals: &Totals) {
        let tx = self.tx;
        for (output, &mine) in tx.outputs.iter().zip(&totals.owned_outputs) {
            if !mine.is_mine() {
                continue;
            }
            let (kind, address) = match (tx.is_coinbase, output.destination()) {
                (true, address) => (RecordKind::Generated, address.unwrap_or_default().to_string()),
                (false, Some(address)) => (RecordKind::ReceivedTransparent, address.to_string()),
                (false, None) => (RecordKind::ReceivedFromUnknown, tx.metadata_value("from")),
            };
            // A partial spend of our own coins rides on the first credit so
            // the records sum to the wallet's net change.
            let debit = if self.records.is_empty() { -totals.debit } else { 0 };
            let record = self
                .next_record(kind)
                .with_address(address)
                .with_amounts(debit, output.value)
                .with_watch_only(mine.is_watch_only());
            self.push(record);
        }
    }

    fn self_transfer(&mut self, totals: &Totals) {
        let fee = observed_fee(self.tx, totals);
        let record = self
            .next_record(RecordKind::SelfTransfer)
            .with_amounts(-(totals.debit - totals.change), totals.credit - totals.change)
            .with_fee(fee)
            .with_watch_only(totals.involves_watch_only);
        self.push(record);
    }

    fn transparent_debit(&mut self, totals: &Totals) {
        let tx = self.tx;
        let mut fee = observed_fee(tx, totals);
        for (output, mine) in tx.outputs.iter().zip(&totals.owned_outputs) {
            if mine.is_mine() {
                // Paid back to ourselves, usually change.
                continue;
            }
            let (kind, address) = match output.destination() {
                Some(address) => (RecordKind::SentTransparent, address.to_string()),
                None => (RecordKind::SentToUnknown, tx.metadata_value("to")),
            };
            let mut value = output.value;
            let mut record_fee = 0;
            if fee > 0 {
                value += fee;
                record_fee = fee;
                fee = 0;
            }
            let record = self
                .next_record(kind)
                .with_address(address)
                .with_amounts(-value, 0)
                .with_fee(record_fee)
                .with_watch_only(totals.involves_watch_only);
            self.push(record);
        }
        // Value moved into the pool goes to an address we cannot name.
        let deposited = tx.pool_value_in() - tx.pool_value_out();
        if deposited > 0 {
            let fee = fee.max(0);
            let record = self
                .next_record(RecordKind::SentTransparent)
                .with_address(UNKNOWN_SHIELDED_ADDRESS)
                .with_amounts(-(deposited + fee), 0)
                .with_fee(fee)
                .with_watch_only(totals.involves_watch_only);
            self.push(record);
        }
    }

    fn mixed(&mut self, totals: &Totals) {
        let net = totals.net();
        warn!(tx = %self.tx.hash, net, "cannot break out payees, recording net value only");
        self.notices.push(ClassifyNotice::DegradedToMixed { net });
        let record = self
            .next_record(RecordKind::Mixed)
            .with_amounts(net, 0)
            .with_watch_only(totals.involves_watch_only);
        self.push(record);
    }
}
