//! Daily overdue sweep.
//!
//! Walks open invoices past their due date in pages, lets the status engine
//! flip PENDING invoices to OVERDUE, and assesses the configured late
//! penalty exactly once, on that first transition. Invoices already OVERDUE
//! are re-evaluated (a back-dated payment may have settled them) but never
//! penalized again.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use schoolbooks_core::DomainResult;
use schoolbooks_invoicing::{Invoice, InvoiceStatus, InvoiceStore, Page};

use crate::config::BillingConfig;
use crate::handlers::{LedgerProjector, PenaltyAssessment};
use crate::status::StatusEngine;

/// Per-run counters, logged when the sweep finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub processed: usize,
    /// Invoices whose re-evaluation or penalty failed; the next run retries
    /// them.
    pub failed: usize,
}

pub struct OverdueSweep {
    invoices: Arc<dyn InvoiceStore>,
    projector: Arc<LedgerProjector>,
    status: Arc<StatusEngine>,
    config: BillingConfig,
}

impl OverdueSweep {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        projector: Arc<LedgerProjector>,
        status: Arc<StatusEngine>,
        config: BillingConfig,
    ) -> Self {
        Self {
            invoices,
            projector,
            status,
            config,
        }
    }

    /// Sweep every open invoice due strictly before `today`.
    pub fn run(&self, today: NaiveDate) -> SweepSummary {
        let statuses = [InvoiceStatus::Pending, InvoiceStatus::Overdue];
        let mut summary = SweepSummary::default();
        let mut page = Page::first(self.config.sweep_page_size);

        loop {
            let batch = self.invoices.find_due_before(&statuses, today, page);
            if batch.is_empty() {
                break;
            }
            let fetched = batch.len();

            // Invoices that resolve to PAID drop out of the status filter and
            // shrink the matching set mid-run. Advance the offset only by the
            // invoices that stayed in the filter, so whatever slid into the
            // vacated slots is fetched by the next page.
            let mut retained = 0;
            for invoice in batch {
                match self.process_one(&invoice, today) {
                    Ok(status) => {
                        summary.processed += 1;
                        if statuses.contains(&status) {
                            retained += 1;
                        }
                    }
                    Err(err) => {
                        warn!(
                            invoice_id = %invoice.id,
                            error = %err,
                            "sweep failed for invoice, continuing"
                        );
                        summary.failed += 1;
                        let still_open = self
                            .invoices
                            .find(invoice.id)
                            .is_some_and(|inv| statuses.contains(&inv.status));
                        if still_open {
                            retained += 1;
                        }
                    }
                }
            }

            if fetched < page.limit {
                break;
            }
            page = Page::new(page.offset + retained, page.limit);
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            "overdue sweep finished"
        );
        summary
    }

    fn process_one(&self, invoice: &Invoice, today: NaiveDate) -> DomainResult<InvoiceStatus> {
        let was_pending = invoice.status == InvoiceStatus::Pending;
        let now = self.status.reevaluate(invoice.id, today)?;

        if was_pending && now == InvoiceStatus::Overdue {
            self.projector.on_penalty_assessed(PenaltyAssessment {
                invoice_id: invoice.id,
                responsible_id: invoice.responsible_id,
                amount: self.config.penalty_amount,
            })?;
            return self.status.reevaluate(invoice.id, today);
        }
        Ok(now)
    }
}
