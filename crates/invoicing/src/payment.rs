use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schoolbooks_core::{InvoiceId, Money, PaymentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
    Failed,
    PendingConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Other,
}

/// A payment against an invoice.
///
/// Immutable after creation except for its own status. `paid_at` may be
/// absent (e.g. a method without a settlement timestamp); the ledger
/// projector falls back to the processing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub paid_at: Option<DateTime<Utc>>,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
}

impl Payment {
    pub fn new(
        invoice_id: InvoiceId,
        amount: Money,
        paid_at: Option<DateTime<Utc>>,
        method: PaymentMethod,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            invoice_id,
            amount,
            paid_at,
            method,
            status: PaymentStatus::Completed,
        }
    }
}
