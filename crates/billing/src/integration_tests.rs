//! Full-stack billing cycle tests: batch generation through settlement,
//! wired against the in-memory stores.

use std::sync::Arc;
use std::thread;

use chrono::{Datelike, Duration, NaiveDate, Utc};

use schoolbooks_accounting::{EntryType, LedgerStore};
use schoolbooks_core::Money;
use schoolbooks_invoicing::{
    InvoiceStatus, InvoiceStore, Page, Payment, PaymentMethod, PaymentStore, ReferenceMonth,
};
use schoolbooks_parties::{Enrollment, Responsible, Student};

use crate::batch::MonthlyInvoiceBatch;
use crate::config::BillingConfig;
use crate::handlers::tests::{fixture, Fixture};
use crate::sweep::OverdueSweep;

/// A reference month roughly two months back, so its 10th-of-month due date
/// is always in the past no matter when the suite runs.
fn past_reference() -> (ReferenceMonth, NaiveDate) {
    let anchor = Utc::now().date_naive() - Duration::days(60);
    let reference = ReferenceMonth::new(anchor.year(), anchor.month()).unwrap();
    let run_day = reference.day(1).unwrap();
    (reference, run_day)
}

fn enroll(fx: &Fixture, responsible: &Responsible, student_name: &str, fee_cents: i64) {
    let student = Student::new(student_name, Some(responsible.id));
    let enrollment = Enrollment::new(student.id, "1A", Some(Money::from_cents(fee_cents)));
    fx.directory.add_student(student);
    fx.directory.add_enrollment(enrollment);
}

fn open_invoices(fx: &Fixture) -> Vec<schoolbooks_invoicing::Invoice> {
    fx.invoices.find_due_before(
        &[InvoiceStatus::Pending, InvoiceStatus::Overdue],
        NaiveDate::MAX,
        Page::first(100),
    )
}

fn pay(fx: &Fixture, invoice_id: schoolbooks_core::InvoiceId, cents: i64) {
    let payment = Payment::new(
        invoice_id,
        Money::from_cents(cents),
        Some(Utc::now()),
        PaymentMethod::BankTransfer,
    );
    fx.payments.save(payment.clone());
    fx.projector.on_payment_processed(payment.id).unwrap();
}

#[test]
fn monthly_cycle_generates_sweeps_and_settles() {
    schoolbooks_observability::init();
    let fx = fixture();
    let config = BillingConfig::default();

    let other = Responsible::new("Elena");
    fx.directory.add_responsible(other.clone());

    enroll(&fx, &fx.responsible, "Ana", 30_000);
    enroll(&fx, &fx.responsible, "Bruno", 30_000);
    enroll(&fx, &other, "Caio", 45_000);

    let (reference, run_day) = past_reference();
    let batch = MonthlyInvoiceBatch::new(
        fx.directory.clone(),
        fx.directory.clone(),
        fx.invoices.clone(),
        fx.projector.clone(),
        fx.sink.clone(),
        config.clone(),
    );
    let summary = batch.generate(reference, run_day).unwrap();
    assert_eq!(summary.generated, 2);
    assert_eq!(summary.failed, 0);

    // One consolidated invoice per responsible.
    let mut invoices = open_invoices(&fx);
    assert_eq!(invoices.len(), 2);
    invoices.sort_by_key(|inv| inv.net_amount.cents());
    let (siblings, single) = (invoices.pop().unwrap(), invoices.pop().unwrap());
    assert_eq!(siblings.net_amount, Money::from_cents(60_000));
    assert_eq!(siblings.responsible_id, fx.responsible.id);
    assert_eq!(single.net_amount, Money::from_cents(45_000));
    assert_eq!(single.responsible_id, other.id);

    // The single-student invoice settles in full before the sweep.
    pay(&fx, single.id, 45_000);
    assert_eq!(fx.invoices.find(single.id).unwrap().status, InvoiceStatus::Paid);

    // The sweep penalizes only the still-open invoice, exactly once.
    let sweep = OverdueSweep::new(
        fx.invoices.clone(),
        fx.projector.clone(),
        fx.status.clone(),
        config.clone(),
    );
    let today = Utc::now().date_naive();
    sweep.run(today);
    sweep.run(today);

    assert_eq!(
        fx.invoices.find(siblings.id).unwrap().status,
        InvoiceStatus::Overdue
    );
    let receivable = fx.registry.find_or_create_receivable(fx.responsible.id).unwrap();
    assert_eq!(
        fx.ledger.balance_for_invoice(receivable.id, siblings.id),
        Money::from_cents(61_000)
    );

    // Settling principal plus penalty closes the cycle.
    pay(&fx, siblings.id, 61_000);
    assert_eq!(
        fx.invoices.find(siblings.id).unwrap().status,
        InvoiceStatus::Paid
    );

    // Double entry holds across the whole run.
    let entries = fx.ledger.entries();
    let debits: i64 = entries.iter().map(|e| e.debit.cents()).sum();
    let credits: i64 = entries.iter().map(|e| e.credit.cents()).sum();
    assert_eq!(debits, credits);

    // Both receivables are settled.
    assert_eq!(fx.registry.balance_of(receivable.id).unwrap(), Money::ZERO);
    let other_receivable = fx.registry.find_or_create_receivable(other.id).unwrap();
    assert_eq!(fx.registry.balance_of(other_receivable.id).unwrap(), Money::ZERO);
}

#[test]
fn concurrent_duplicate_payment_events_post_once() {
    schoolbooks_observability::init();
    let fx = fixture();

    enroll(&fx, &fx.responsible, "Ana", 30_000);
    let (reference, run_day) = past_reference();
    MonthlyInvoiceBatch::new(
        fx.directory.clone(),
        fx.directory.clone(),
        fx.invoices.clone(),
        fx.projector.clone(),
        fx.sink.clone(),
        BillingConfig::default(),
    )
    .generate(reference, run_day)
    .unwrap();

    let invoice = open_invoices(&fx).pop().unwrap();
    let payment = Payment::new(
        invoice.id,
        Money::from_cents(30_000),
        Some(Utc::now()),
        PaymentMethod::Card,
    );
    fx.payments.save(payment.clone());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let projector = Arc::clone(&fx.projector);
            let payment_id = payment.id;
            thread::spawn(move || projector.on_payment_processed(payment_id))
        })
        .collect();
    // Every loser of the append race reports the duplicate as a skip, even
    // when it observes the invoice already PAID.
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let received: Vec<_> = fx
        .ledger
        .entries()
        .into_iter()
        .filter(|e| e.entry_type == EntryType::PaymentReceived)
        .collect();
    assert_eq!(received.len(), 2, "one balanced pair, not one per event");
    assert_eq!(
        fx.invoices.find(invoice.id).unwrap().status,
        InvoiceStatus::Paid
    );
}
