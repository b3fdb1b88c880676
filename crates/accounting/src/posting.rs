//! Ledger posting engine: balanced double-entry appends.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use schoolbooks_core::{AccountId, DomainError, DomainResult, InvoiceId, Money, PaymentId};

use crate::entry::{EntryType, LedgerEntry};
use crate::registry::AccountRegistry;
use crate::store::LedgerStore;

/// A posting request: one money-moving event, to be recorded as a matched
/// debit/credit pair.
#[derive(Debug, Clone)]
pub struct Posting {
    pub invoice_id: Option<InvoiceId>,
    pub payment_id: Option<PaymentId>,
    pub debit_account: AccountId,
    pub credit_account: AccountId,
    pub amount: Money,
    pub posted_at: DateTime<Utc>,
    pub description: String,
    pub entry_type: EntryType,
}

/// Appends balanced transactions to the journal and refreshes the cached
/// balances of both touched accounts.
///
/// Either both entries and both balance refreshes happen, or none do: the
/// pair append is atomic in the store, and refreshes can only fail for
/// accounts the engine has already resolved.
pub struct PostingEngine {
    ledger: Arc<dyn LedgerStore>,
    registry: Arc<AccountRegistry>,
}

impl PostingEngine {
    pub fn new(ledger: Arc<dyn LedgerStore>, registry: Arc<AccountRegistry>) -> Self {
        Self { ledger, registry }
    }

    /// Record a balanced transaction.
    ///
    /// Each precondition is a distinct validation failure, rejected before
    /// any write. On success returns the (debit, credit) entry pair sharing
    /// timestamp, description, entry type, and optional invoice/payment refs.
    pub fn post(&self, posting: Posting) -> DomainResult<(LedgerEntry, LedgerEntry)> {
        if posting.debit_account == posting.credit_account {
            return Err(DomainError::validation(
                "debit and credit accounts must differ",
            ));
        }
        if !posting.amount.is_positive() {
            return Err(DomainError::validation("amount must be positive"));
        }
        if posting.description.trim().is_empty() {
            return Err(DomainError::validation("description must not be blank"));
        }
        // Resolving up front also guarantees the refreshes below cannot fail
        // with NotFound after entries were appended.
        self.registry.balance_of(posting.debit_account).map_err(|_| {
            DomainError::validation(format!("unknown debit account {}", posting.debit_account))
        })?;
        self.registry.balance_of(posting.credit_account).map_err(|_| {
            DomainError::validation(format!("unknown credit account {}", posting.credit_account))
        })?;

        let debit = LedgerEntry::debit(
            posting.debit_account,
            posting.amount,
            posting.posted_at,
            posting.description.clone(),
            posting.entry_type,
            posting.invoice_id,
            posting.payment_id,
        );
        let credit = LedgerEntry::credit(
            posting.credit_account,
            posting.amount,
            posting.posted_at,
            posting.description,
            posting.entry_type,
            posting.invoice_id,
            posting.payment_id,
        );

        self.ledger.append_pair(debit.clone(), credit.clone())?;
        self.registry.refresh_cached_balance(posting.debit_account)?;
        self.registry.refresh_cached_balance(posting.credit_account)?;

        debug!(
            debit_account = %debit.account_id,
            credit_account = %credit.account_id,
            amount = debit.debit.cents(),
            entry_type = ?debit.entry_type,
            "posted transaction"
        );

        Ok((debit, credit))
    }
}
