//! Monthly invoice generation.
//!
//! One consolidated invoice per responsible per reference month, one tuition
//! item per billable enrollment. The batch is rerunnable: enrollments already
//! covered by an invoice for the month are skipped, so a crashed or repeated
//! run only fills the gaps.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use schoolbooks_core::{DomainError, DomainResult, ResponsibleId};
use schoolbooks_events::EventSink;
use schoolbooks_invoicing::{Invoice, InvoiceItem, InvoiceStore, ItemKind, ReferenceMonth};
use schoolbooks_parties::{Enrollment, EnrollmentStore, Student, StudentDirectory};

use crate::config::BillingConfig;
use crate::events::BillingEvent;
use crate::handlers::LedgerProjector;

/// Per-run counters, logged when the batch finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Invoices created and posted.
    pub generated: usize,
    /// Enrollments skipped (not billable, unresolvable, or already invoiced).
    pub skipped: usize,
    /// Responsibles whose invoice failed; their enrollments stay uninvoiced
    /// and a rerun picks them up.
    pub failed: usize,
}

/// The due date for a reference month.
///
/// Falls due on `due_day` of the reference month, unless the run happens
/// after that day has already passed in the current month, in which case the
/// invoice falls due on `due_day` of the following month.
pub fn due_date_for(
    reference: ReferenceMonth,
    today: NaiveDate,
    due_day: u32,
) -> DomainResult<NaiveDate> {
    let month = if today.day() > due_day {
        reference.next()
    } else {
        reference
    };
    month.day(due_day).ok_or_else(|| {
        DomainError::validation(format!("day {due_day} does not exist in {month}"))
    })
}

pub struct MonthlyInvoiceBatch {
    enrollments: Arc<dyn EnrollmentStore>,
    students: Arc<dyn StudentDirectory>,
    invoices: Arc<dyn InvoiceStore>,
    projector: Arc<LedgerProjector>,
    sink: Arc<dyn EventSink<BillingEvent>>,
    config: BillingConfig,
}

impl MonthlyInvoiceBatch {
    pub fn new(
        enrollments: Arc<dyn EnrollmentStore>,
        students: Arc<dyn StudentDirectory>,
        invoices: Arc<dyn InvoiceStore>,
        projector: Arc<LedgerProjector>,
        sink: Arc<dyn EventSink<BillingEvent>>,
        config: BillingConfig,
    ) -> Self {
        Self {
            enrollments,
            students,
            invoices,
            projector,
            sink,
            config,
        }
    }

    /// Generate invoices for every billable enrollment in `reference`.
    ///
    /// A failure for one responsible is counted and logged; the run
    /// continues with the rest.
    pub fn generate(&self, reference: ReferenceMonth, today: NaiveDate) -> DomainResult<BatchSummary> {
        let due_date = due_date_for(reference, today, self.config.due_day)?;
        let mut summary = BatchSummary::default();

        let mut per_responsible: HashMap<ResponsibleId, Vec<(Enrollment, Student)>> = HashMap::new();
        for enrollment in self.enrollments.list_active() {
            if enrollment.billable_fee().is_none() {
                summary.skipped += 1;
                continue;
            }
            let student = match self.students.find(enrollment.student_id) {
                Some(s) => s,
                None => {
                    warn!(enrollment_id = %enrollment.id, "enrollment has no resolvable student, skipping");
                    summary.skipped += 1;
                    continue;
                }
            };
            let responsible_id = match student.responsible_id {
                Some(id) => id,
                None => {
                    info!(student_id = %student.id, "student has no responsible, skipping");
                    summary.skipped += 1;
                    continue;
                }
            };
            if self.invoices.exists_for(responsible_id, reference, enrollment.id) {
                info!(
                    enrollment_id = %enrollment.id,
                    reference_month = %reference,
                    "enrollment already invoiced for the month, skipping"
                );
                summary.skipped += 1;
                continue;
            }
            per_responsible
                .entry(responsible_id)
                .or_default()
                .push((enrollment, student));
        }

        // Deterministic run order (HashMap iteration is not).
        let mut groups: Vec<_> = per_responsible.into_iter().collect();
        groups.sort_by_key(|(id, _)| *id.as_uuid());

        // Events go out only after the whole period has been generated, so a
        // mid-run failure never notifies for a partially generated period.
        let mut generated: Vec<(ResponsibleId, schoolbooks_core::InvoiceId)> = Vec::new();
        for (responsible_id, group) in groups {
            match self.invoice_group(responsible_id, &group, reference, today, due_date) {
                Ok(invoice_id) => {
                    summary.generated += 1;
                    generated.push((responsible_id, invoice_id));
                }
                Err(err) => {
                    warn!(
                        responsible_id = %responsible_id,
                        error = %err,
                        "invoice generation failed for responsible, continuing"
                    );
                    summary.failed += 1;
                }
            }
        }

        for (responsible_id, invoice_id) in generated {
            self.sink.publish(BillingEvent::BatchInvoicesGenerated {
                responsible_id,
                invoice_ids: vec![invoice_id],
                reference_month: reference,
                occurred_at: Utc::now(),
            });
        }

        info!(
            reference_month = %reference,
            generated = summary.generated,
            skipped = summary.skipped,
            failed = summary.failed,
            "monthly invoice batch finished"
        );
        Ok(summary)
    }

    fn invoice_group(
        &self,
        responsible_id: ResponsibleId,
        group: &[(Enrollment, Student)],
        reference: ReferenceMonth,
        today: NaiveDate,
        due_date: NaiveDate,
    ) -> DomainResult<schoolbooks_core::InvoiceId> {
        let mut items = Vec::with_capacity(group.len());
        for (enrollment, student) in group {
            let fee = enrollment
                .billable_fee()
                .ok_or_else(|| DomainError::invariant("grouped enrollment lost its billable fee"))?;
            items.push(InvoiceItem {
                description: format!(
                    "tuition {reference} - {} ({})",
                    student.name, enrollment.classroom
                ),
                amount: fee,
                kind: ItemKind::Tuition,
                enrollment_id: Some(enrollment.id),
            });
        }

        let invoice = Invoice::new(responsible_id, reference, items, today, due_date)?;
        let invoice_id = invoice.id;
        self.invoices.save(invoice);
        self.projector.on_invoice_created(invoice_id)?;
        Ok(invoice_id)
    }
}
