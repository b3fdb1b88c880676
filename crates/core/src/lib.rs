//! `schoolbooks-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;

pub use error::{DomainError, DomainResult};
pub use id::{
    AccountId, EnrollmentId, EntryId, InvoiceId, PaymentId, ResponsibleId, StudentId,
};
pub use money::Money;
