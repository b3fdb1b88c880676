//! Events the billing core emits outward.
//!
//! Consumed by notification/reporting collaborators behind the event sink;
//! the core never reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schoolbooks_core::{InvoiceId, Money, PaymentId, ResponsibleId};
use schoolbooks_events::Event;
use schoolbooks_invoicing::{InvoiceStatus, ReferenceMonth};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingEvent {
    InvoiceCreated {
        invoice_id: InvoiceId,
        responsible_id: ResponsibleId,
        net_amount: Money,
        occurred_at: DateTime<Utc>,
    },
    PaymentProcessed {
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        responsible_id: ResponsibleId,
        amount: Money,
        occurred_at: DateTime<Utc>,
    },
    PenaltyAssessed {
        invoice_id: InvoiceId,
        responsible_id: ResponsibleId,
        amount: Money,
        occurred_at: DateTime<Utc>,
    },
    InvoiceStatusChanged {
        invoice_id: InvoiceId,
        responsible_id: ResponsibleId,
        old_status: InvoiceStatus,
        new_status: InvoiceStatus,
        occurred_at: DateTime<Utc>,
    },
    BatchInvoicesGenerated {
        responsible_id: ResponsibleId,
        invoice_ids: Vec<InvoiceId>,
        reference_month: ReferenceMonth,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for BillingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BillingEvent::InvoiceCreated { .. } => "billing.invoice.created",
            BillingEvent::PaymentProcessed { .. } => "billing.payment.processed",
            BillingEvent::PenaltyAssessed { .. } => "billing.penalty.assessed",
            BillingEvent::InvoiceStatusChanged { .. } => "billing.invoice.status_changed",
            BillingEvent::BatchInvoicesGenerated { .. } => "billing.batch.invoices_generated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BillingEvent::InvoiceCreated { occurred_at, .. }
            | BillingEvent::PaymentProcessed { occurred_at, .. }
            | BillingEvent::PenaltyAssessed { occurred_at, .. }
            | BillingEvent::InvoiceStatusChanged { occurred_at, .. }
            | BillingEvent::BatchInvoicesGenerated { occurred_at, .. } => *occurred_at,
        }
    }
}
