//! Billing service layer: event projectors, the invoice status state
//! machine, and the periodic batch/sweep drivers.
//!
//! Everything here is wired against the store and sink boundaries; there is
//! no IO of its own. The ledger is the source of truth: projectors turn
//! domain events into balanced postings, and the status engine derives what
//! an invoice displays purely from ledger facts.

pub mod batch;
pub mod config;
pub mod events;
pub mod handlers;
pub mod status;
pub mod sweep;

#[cfg(test)]
mod integration_tests;

pub use batch::{BatchSummary, MonthlyInvoiceBatch};
pub use config::BillingConfig;
pub use events::BillingEvent;
pub use handlers::{
    LedgerProjector, PenaltyAssessment, CLEARING_ACCOUNT, ENROLLMENT_FEE_REVENUE_ACCOUNT,
    PENALTY_REVENUE_ACCOUNT, TUITION_REVENUE_ACCOUNT,
};
pub use status::StatusEngine;
pub use sweep::{OverdueSweep, SweepSummary};
