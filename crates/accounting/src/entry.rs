use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schoolbooks_core::{AccountId, EntryId, InvoiceId, Money, PaymentId};

/// Classification of a ledger entry by the billing event that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    TuitionFee,
    EnrollmentFeeCharged,
    PaymentReceived,
    PenaltyAssessed,
    DiscountApplied,
    GeneralJournal,
}

/// One side of a balanced double-entry posting (immutable once appended).
///
/// Exactly one of `debit`/`credit` is positive; the other is zero. This is
/// the journal of record: entries are append-only and never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub debit: Money,
    pub credit: Money,
    pub posted_at: DateTime<Utc>,
    pub description: String,
    pub entry_type: EntryType,
    pub invoice_id: Option<InvoiceId>,
    pub payment_id: Option<PaymentId>,
}

impl LedgerEntry {
    /// Build the debit half of a posting.
    pub fn debit(
        account_id: AccountId,
        amount: Money,
        posted_at: DateTime<Utc>,
        description: impl Into<String>,
        entry_type: EntryType,
        invoice_id: Option<InvoiceId>,
        payment_id: Option<PaymentId>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            account_id,
            debit: amount,
            credit: Money::ZERO,
            posted_at,
            description: description.into(),
            entry_type,
            invoice_id,
            payment_id,
        }
    }

    /// Build the credit half of a posting.
    pub fn credit(
        account_id: AccountId,
        amount: Money,
        posted_at: DateTime<Utc>,
        description: impl Into<String>,
        entry_type: EntryType,
        invoice_id: Option<InvoiceId>,
        payment_id: Option<PaymentId>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            account_id,
            debit: Money::ZERO,
            credit: amount,
            posted_at,
            description: description.into(),
            entry_type,
            invoice_id,
            payment_id,
        }
    }

    /// Signed contribution of this entry to a debit-normal balance.
    pub fn debit_minus_credit(&self) -> Money {
        self.debit.saturating_sub(self.credit)
    }
}
