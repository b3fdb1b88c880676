use serde::{Deserialize, Serialize};

use schoolbooks_core::{AccountId, Money, ResponsibleId};

/// High-level account kind (determines normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Revenue,
    Expense,
    Liability,
}

impl AccountKind {
    /// Apply the kind's sign convention to journal sums.
    ///
    /// Asset/Expense accounts carry a debit-normal balance (Σdebits − Σcredits);
    /// Revenue/Liability accounts carry a credit-normal balance.
    pub fn signed_balance(self, debits: Money, credits: Money) -> Money {
        match self {
            AccountKind::Asset | AccountKind::Expense => debits.saturating_sub(credits),
            AccountKind::Revenue | AccountKind::Liability => credits.saturating_sub(debits),
        }
    }
}

/// A ledger account: general, or per-responsible (receivables).
///
/// `balance` is a cache; the journal is the source of truth and the balance
/// is always recomputable from it. Accounts are created lazily on first
/// reference and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub kind: AccountKind,
    /// Set for per-responsible receivable accounts, absent for general ones.
    pub owner: Option<ResponsibleId>,
    pub balance: Money,
}

impl Account {
    pub fn new(name: impl Into<String>, kind: AccountKind, owner: Option<ResponsibleId>) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            kind,
            owner,
            balance: Money::ZERO,
        }
    }
}
