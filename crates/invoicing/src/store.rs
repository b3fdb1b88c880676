//! Invoice/payment store boundaries and in-memory implementations.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;

use schoolbooks_core::{EnrollmentId, InvoiceId, PaymentId, ResponsibleId};

use crate::invoice::{Invoice, InvoiceStatus, ReferenceMonth};
use crate::payment::Payment;

/// Offset/limit page cursor for sweep pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn next(self) -> Page {
        Page {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

/// Invoice persistence boundary.
pub trait InvoiceStore: Send + Sync {
    fn save(&self, invoice: Invoice);

    fn find(&self, id: InvoiceId) -> Option<Invoice>;

    /// Invoices in any of `statuses` whose due date is strictly before
    /// `before`, paginated in a stable order.
    fn find_due_before(
        &self,
        statuses: &[InvoiceStatus],
        before: NaiveDate,
        page: Page,
    ) -> Vec<Invoice>;

    /// De-duplication probe for monthly generation: does an invoice already
    /// exist for (responsible, reference month) covering this enrollment?
    fn exists_for(
        &self,
        responsible_id: ResponsibleId,
        reference_month: ReferenceMonth,
        enrollment_id: EnrollmentId,
    ) -> bool;
}

/// Payment persistence boundary.
pub trait PaymentStore: Send + Sync {
    fn save(&self, payment: Payment);
    fn find(&self, id: PaymentId) -> Option<Payment>;
}

/// In-memory invoice store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    invoices: RwLock<HashMap<InvoiceId, Invoice>>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InvoiceStore for InMemoryInvoiceStore {
    fn save(&self, invoice: Invoice) {
        if let Ok(mut map) = self.invoices.write() {
            map.insert(invoice.id, invoice);
        }
    }

    fn find(&self, id: InvoiceId) -> Option<Invoice> {
        let map = self.invoices.read().ok()?;
        map.get(&id).cloned()
    }

    fn find_due_before(
        &self,
        statuses: &[InvoiceStatus],
        before: NaiveDate,
        page: Page,
    ) -> Vec<Invoice> {
        let map = match self.invoices.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        let mut matching: Vec<_> = map
            .values()
            .filter(|inv| statuses.contains(&inv.status) && inv.due_date < before)
            .cloned()
            .collect();

        // Stable order so the page cursor is resumable.
        matching.sort_by_key(|inv| (inv.due_date, *inv.id.as_uuid()));
        matching.into_iter().skip(page.offset).take(page.limit).collect()
    }

    fn exists_for(
        &self,
        responsible_id: ResponsibleId,
        reference_month: ReferenceMonth,
        enrollment_id: EnrollmentId,
    ) -> bool {
        let map = match self.invoices.read() {
            Ok(m) => m,
            Err(_) => return false,
        };

        map.values().any(|inv| {
            inv.responsible_id == responsible_id
                && inv.reference_month == reference_month
                && inv.covers_enrollment(enrollment_id)
        })
    }
}

/// In-memory payment store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPaymentStore {
    payments: RwLock<HashMap<PaymentId, Payment>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaymentStore for InMemoryPaymentStore {
    fn save(&self, payment: Payment) {
        if let Ok(mut map) = self.payments.write() {
            map.insert(payment.id, payment);
        }
    }

    fn find(&self, id: PaymentId) -> Option<Payment> {
        let map = self.payments.read().ok()?;
        map.get(&id).cloned()
    }
}
