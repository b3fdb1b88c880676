//! Accounting module (double-entry ledger).
//!
//! Owns the chart of accounts and the journal of record. Pure domain logic
//! plus the store boundaries it is defined against: no HTTP, no SQL.

pub mod account;
pub mod entry;
pub mod posting;
pub mod registry;
pub mod store;

pub use account::{Account, AccountKind};
pub use entry::{EntryType, LedgerEntry};
pub use posting::{Posting, PostingEngine};
pub use registry::{receivable_account_name, AccountRegistry};
pub use store::{AccountStore, InMemoryAccountStore, InMemoryLedgerStore, LedgerStore};
