//! Invoice status state machine.
//!
//! Status is derived on demand from ledger facts, never from cached invoice
//! fields. Re-evaluation runs even for invoices already PAID or OVERDUE: a
//! reversal can reopen a balance, and a correcting entry or an extended due
//! date can drop an invoice back to PENDING.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;

use schoolbooks_accounting::{AccountRegistry, LedgerStore};
use schoolbooks_core::{DomainError, DomainResult, InvoiceId};
use schoolbooks_events::EventSink;
use schoolbooks_invoicing::{InvoiceStatus, InvoiceStore};

use crate::events::BillingEvent;

pub struct StatusEngine {
    invoices: Arc<dyn InvoiceStore>,
    registry: Arc<AccountRegistry>,
    ledger: Arc<dyn LedgerStore>,
    sink: Arc<dyn EventSink<BillingEvent>>,
}

impl StatusEngine {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        registry: Arc<AccountRegistry>,
        ledger: Arc<dyn LedgerStore>,
        sink: Arc<dyn EventSink<BillingEvent>>,
    ) -> Self {
        Self {
            invoices,
            registry,
            ledger,
            sink,
        }
    }

    /// Re-derive the invoice status from its ledger balance and due date.
    ///
    /// Persists and emits `InvoiceStatusChanged` only when the computed
    /// status differs from the stored one. CANCELLED is terminal: it returns
    /// unchanged without touching the ledger.
    pub fn reevaluate(&self, invoice_id: InvoiceId, today: NaiveDate) -> DomainResult<InvoiceStatus> {
        let mut invoice = self
            .invoices
            .find(invoice_id)
            .ok_or_else(|| DomainError::not_found(format!("invoice {invoice_id}")))?;

        if invoice.is_cancelled() {
            return Ok(InvoiceStatus::Cancelled);
        }

        let receivable = self.registry.find_or_create_receivable(invoice.responsible_id)?;
        let balance = self.ledger.balance_for_invoice(receivable.id, invoice_id);

        let computed = if !balance.is_positive() {
            InvoiceStatus::Paid
        } else if invoice.due_date < today {
            InvoiceStatus::Overdue
        } else {
            InvoiceStatus::Pending
        };

        if computed != invoice.status {
            let old_status = invoice.status;
            invoice.status = computed;
            self.invoices.save(invoice.clone());

            info!(
                invoice_id = %invoice_id,
                old_status = ?old_status,
                new_status = ?computed,
                balance = balance.cents(),
                "invoice status changed"
            );
            self.sink.publish(BillingEvent::InvoiceStatusChanged {
                invoice_id,
                responsible_id: invoice.responsible_id,
                old_status,
                new_status: computed,
                occurred_at: Utc::now(),
            });
        }

        Ok(computed)
    }
}
