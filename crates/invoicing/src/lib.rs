//! Invoicing domain module.
//!
//! The billable entities (invoices, items, payments) and their store
//! boundaries. Invoices are passive data holders here: the status field is
//! mutated only by the billing status engine, and the net amount is fixed at
//! creation from the items.

pub mod invoice;
pub mod payment;
pub mod store;

pub use invoice::{Invoice, InvoiceItem, InvoiceStatus, ItemKind, ReferenceMonth};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use store::{InMemoryInvoiceStore, InMemoryPaymentStore, InvoiceStore, Page, PaymentStore};
