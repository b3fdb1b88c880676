//! Account registry: lazy creation and lookup of ledger accounts.

use std::sync::Arc;

use tracing::debug;

use schoolbooks_core::{AccountId, DomainError, DomainResult, Money, ResponsibleId};
use schoolbooks_parties::ResponsibleDirectory;

use crate::account::{Account, AccountKind};
use crate::store::{AccountStore, LedgerStore};

/// Deterministic name for a responsible's receivable account.
pub fn receivable_account_name(responsible_id: ResponsibleId) -> String {
    format!("Accounts Receivable / {responsible_id}")
}

/// Owns the chart of accounts.
///
/// Accounts are created lazily on first reference and never deleted. The
/// cached balance on each account is derivative: `balance_of` always
/// recomputes from the journal.
pub struct AccountRegistry {
    accounts: Arc<dyn AccountStore>,
    ledger: Arc<dyn LedgerStore>,
    responsibles: Arc<dyn ResponsibleDirectory>,
}

impl AccountRegistry {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        ledger: Arc<dyn LedgerStore>,
        responsibles: Arc<dyn ResponsibleDirectory>,
    ) -> Self {
        Self {
            accounts,
            ledger,
            responsibles,
        }
    }

    /// Return the account matching (kind, name) or (kind, owner, name),
    /// creating it with a zero balance if none exists.
    pub fn find_or_create(
        &self,
        name: &str,
        kind: AccountKind,
        owner: Option<ResponsibleId>,
    ) -> DomainResult<Account> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("account name must not be blank"));
        }

        if let Some(existing) = self.accounts.find_named(kind, name, owner) {
            return Ok(existing);
        }

        let account = Account::new(name, kind, owner);
        debug!(account_id = %account.id, name, kind = ?kind, "created account");
        self.accounts.save(account.clone());
        Ok(account)
    }

    /// The responsible's receivable account (ASSET, owned, deterministic name).
    pub fn find_or_create_receivable(
        &self,
        responsible_id: ResponsibleId,
    ) -> DomainResult<Account> {
        self.responsibles
            .find(responsible_id)
            .ok_or_else(|| DomainError::not_found(format!("responsible {responsible_id}")))?;

        self.find_or_create(
            &receivable_account_name(responsible_id),
            AccountKind::Asset,
            Some(responsible_id),
        )
    }

    /// Recompute the account balance from the journal, applying the kind's
    /// sign convention. Missing sums are zero.
    pub fn balance_of(&self, account_id: AccountId) -> DomainResult<Money> {
        let account = self
            .accounts
            .find(account_id)
            .ok_or_else(|| DomainError::not_found(format!("account {account_id}")))?;

        let debits = self.ledger.sum_debits(account_id);
        let credits = self.ledger.sum_credits(account_id);
        Ok(account.kind.signed_balance(debits, credits))
    }

    /// Recompute and persist the cached balance, writing only on change.
    pub fn refresh_cached_balance(&self, account_id: AccountId) -> DomainResult<()> {
        let mut account = self
            .accounts
            .find(account_id)
            .ok_or_else(|| DomainError::not_found(format!("account {account_id}")))?;

        let recomputed = account
            .kind
            .signed_balance(self.ledger.sum_debits(account_id), self.ledger.sum_credits(account_id));

        if recomputed != account.balance {
            account.balance = recomputed;
            self.accounts.save(account);
        }

        Ok(())
    }
}
