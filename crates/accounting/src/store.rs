//! Store boundaries for the chart of accounts and the journal,
//! plus in-memory implementations for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;

use schoolbooks_core::{AccountId, DomainError, DomainResult, InvoiceId, Money, PaymentId, ResponsibleId};

use crate::account::{Account, AccountKind};
use crate::entry::{EntryType, LedgerEntry};

/// Chart-of-accounts persistence boundary.
pub trait AccountStore: Send + Sync {
    fn find(&self, id: AccountId) -> Option<Account>;

    /// Lookup by (kind, name) for general accounts, (kind, owner, name) for
    /// per-responsible accounts.
    fn find_named(
        &self,
        kind: AccountKind,
        name: &str,
        owner: Option<ResponsibleId>,
    ) -> Option<Account>;

    fn save(&self, account: Account);
}

/// Journal persistence boundary (append-only).
pub trait LedgerStore: Send + Sync {
    /// Append a matched debit/credit pair atomically.
    ///
    /// Enforces the uniqueness of (payment id, PAYMENT_RECEIVED): a second
    /// pair for the same payment fails with `Conflict`, which callers treat
    /// as "already processed". This is what makes the payment idempotency
    /// guard race-safe.
    fn append_pair(&self, debit: LedgerEntry, credit: LedgerEntry) -> DomainResult<()>;

    fn sum_debits(&self, account_id: AccountId) -> Money;

    fn sum_credits(&self, account_id: AccountId) -> Money;

    /// Σdebits over entries matching (account, invoice, entry type).
    fn sum_debits_for_invoice(
        &self,
        account_id: AccountId,
        invoice_id: InvoiceId,
        entry_type: EntryType,
    ) -> Money;

    /// Σcredits over entries matching (account, invoice, entry type).
    fn sum_credits_for_invoice(
        &self,
        account_id: AccountId,
        invoice_id: InvoiceId,
        entry_type: EntryType,
    ) -> Money;

    /// Ledger balance scoped to one invoice on one account
    /// (Σdebits − Σcredits over entries tagged with the invoice id).
    ///
    /// This is what the status state machine reads; the receivable is an
    /// asset account, so debit-minus-credit is its normal balance.
    fn balance_for_invoice(&self, account_id: AccountId, invoice_id: InvoiceId) -> Money;

    /// Whether an entry for (payment, entry type) already exists.
    fn exists_payment_entry(&self, payment_id: PaymentId, entry_type: EntryType) -> bool;
}

/// In-memory chart of accounts.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn find(&self, id: AccountId) -> Option<Account> {
        let map = self.accounts.read().ok()?;
        map.get(&id).cloned()
    }

    fn find_named(
        &self,
        kind: AccountKind,
        name: &str,
        owner: Option<ResponsibleId>,
    ) -> Option<Account> {
        let map = self.accounts.read().ok()?;
        map.values()
            .find(|a| a.kind == kind && a.name == name && a.owner == owner)
            .cloned()
    }

    fn save(&self, account: Account) {
        if let Ok(mut map) = self.accounts.write() {
            map.insert(account.id, account);
        }
    }
}

/// In-memory journal.
///
/// A single write lock makes `append_pair` atomic and serializes the
/// existence check with the insert, standing in for the storage-level
/// uniqueness constraint a SQL backend would use.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    entries: RwLock<Vec<LedgerEntry>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the journal, for tests and reconciliation checks.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        match self.entries.read() {
            Ok(entries) => entries.clone(),
            Err(_) => Vec::new(),
        }
    }

    fn sum(&self, filter: impl Fn(&LedgerEntry) -> bool, side: impl Fn(&LedgerEntry) -> Money) -> Money {
        let entries = match self.entries.read() {
            Ok(e) => e,
            Err(_) => return Money::ZERO,
        };

        entries
            .iter()
            .filter(|e| filter(e))
            .fold(Money::ZERO, |acc, e| acc.saturating_add(side(e)))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append_pair(&self, debit: LedgerEntry, credit: LedgerEntry) -> DomainResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| DomainError::invariant("ledger store lock poisoned"))?;

        for entry in [&debit, &credit] {
            if entry.entry_type == EntryType::PaymentReceived {
                if let Some(payment_id) = entry.payment_id {
                    let duplicate = entries.iter().any(|e| {
                        e.entry_type == EntryType::PaymentReceived
                            && e.payment_id == Some(payment_id)
                    });
                    if duplicate {
                        return Err(DomainError::conflict(format!(
                            "payment {payment_id} already posted"
                        )));
                    }
                }
            }
        }

        entries.push(debit);
        entries.push(credit);
        Ok(())
    }

    fn sum_debits(&self, account_id: AccountId) -> Money {
        self.sum(|e| e.account_id == account_id, |e| e.debit)
    }

    fn sum_credits(&self, account_id: AccountId) -> Money {
        self.sum(|e| e.account_id == account_id, |e| e.credit)
    }

    fn sum_debits_for_invoice(
        &self,
        account_id: AccountId,
        invoice_id: InvoiceId,
        entry_type: EntryType,
    ) -> Money {
        self.sum(
            |e| {
                e.account_id == account_id
                    && e.invoice_id == Some(invoice_id)
                    && e.entry_type == entry_type
            },
            |e| e.debit,
        )
    }

    fn sum_credits_for_invoice(
        &self,
        account_id: AccountId,
        invoice_id: InvoiceId,
        entry_type: EntryType,
    ) -> Money {
        self.sum(
            |e| {
                e.account_id == account_id
                    && e.invoice_id == Some(invoice_id)
                    && e.entry_type == entry_type
            },
            |e| e.credit,
        )
    }

    fn balance_for_invoice(&self, account_id: AccountId, invoice_id: InvoiceId) -> Money {
        self.sum(
            |e| e.account_id == account_id && e.invoice_id == Some(invoice_id),
            |e| e.debit_minus_credit(),
        )
    }

    fn exists_payment_entry(&self, payment_id: PaymentId, entry_type: EntryType) -> bool {
        let entries = match self.entries.read() {
            Ok(e) => e,
            Err(_) => return false,
        };

        entries
            .iter()
            .any(|e| e.payment_id == Some(payment_id) && e.entry_type == entry_type)
    }
}
