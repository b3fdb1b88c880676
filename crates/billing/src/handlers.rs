//! Billing event handlers: idempotent projectors from domain events to
//! ledger postings.
//!
//! Each handler resolves the entities an event references, then calls the
//! posting engine at most once. Handlers are safe to retry: the payment
//! projector is guarded by the journal's (payment id, PAYMENT_RECEIVED)
//! uniqueness, and the others post amounts derived from immutable facts.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use schoolbooks_accounting::{
    AccountKind, AccountRegistry, EntryType, LedgerStore, Posting, PostingEngine,
};
use schoolbooks_core::{DomainError, DomainResult, InvoiceId, Money, PaymentId, ResponsibleId};
use schoolbooks_events::EventSink;
use schoolbooks_invoicing::{
    Invoice, InvoiceStatus, InvoiceStore, ItemKind, PaymentStatus, PaymentStore,
};

use crate::events::BillingEvent;
use crate::status::StatusEngine;

pub const TUITION_REVENUE_ACCOUNT: &str = "Tuition Revenue";
pub const ENROLLMENT_FEE_REVENUE_ACCOUNT: &str = "Enrollment Fee Revenue";
pub const PENALTY_REVENUE_ACCOUNT: &str = "Penalty Revenue";
pub const CLEARING_ACCOUNT: &str = "Cash and Bank Clearing";

/// Priority-ordered classification of an invoice's single revenue posting.
///
/// First item kind present on the invoice wins; an invoice with any
/// enrollment-fee item books its whole net amount as enrollment revenue even
/// when tuition items coexist (one posting per invoice, by the source
/// system's rule). Tuition revenue is the fallback.
const REVENUE_CLASSIFICATION: &[(ItemKind, &str, EntryType)] = &[
    (
        ItemKind::EnrollmentFee,
        ENROLLMENT_FEE_REVENUE_ACCOUNT,
        EntryType::EnrollmentFeeCharged,
    ),
    (ItemKind::Tuition, TUITION_REVENUE_ACCOUNT, EntryType::TuitionFee),
];

fn classify_revenue(invoice: &Invoice) -> (&'static str, EntryType) {
    for (kind, account_name, entry_type) in REVENUE_CLASSIFICATION {
        if invoice.items.iter().any(|item| item.kind == *kind) {
            return (account_name, *entry_type);
        }
    }
    (TUITION_REVENUE_ACCOUNT, EntryType::TuitionFee)
}

/// A penalty assessment: transient, consumed once by the projector.
#[derive(Debug, Clone)]
pub struct PenaltyAssessment {
    pub invoice_id: InvoiceId,
    pub responsible_id: ResponsibleId,
    pub amount: Money,
}

pub struct LedgerProjector {
    posting: Arc<PostingEngine>,
    registry: Arc<AccountRegistry>,
    ledger: Arc<dyn LedgerStore>,
    invoices: Arc<dyn InvoiceStore>,
    payments: Arc<dyn PaymentStore>,
    status: Arc<StatusEngine>,
    sink: Arc<dyn EventSink<BillingEvent>>,
}

impl LedgerProjector {
    pub fn new(
        posting: Arc<PostingEngine>,
        registry: Arc<AccountRegistry>,
        ledger: Arc<dyn LedgerStore>,
        invoices: Arc<dyn InvoiceStore>,
        payments: Arc<dyn PaymentStore>,
        status: Arc<StatusEngine>,
        sink: Arc<dyn EventSink<BillingEvent>>,
    ) -> Self {
        Self {
            posting,
            registry,
            ledger,
            invoices,
            payments,
            status,
            sink,
        }
    }

    /// Project an invoice-created event: one charge posting for the net
    /// amount, classified by the invoice's items.
    ///
    /// Skips (without posting) invoices with no items, an unknown
    /// responsible, or a non-positive net amount.
    pub fn on_invoice_created(&self, invoice_id: InvoiceId) -> DomainResult<()> {
        let invoice = self
            .invoices
            .find(invoice_id)
            .ok_or_else(|| DomainError::not_found(format!("invoice {invoice_id}")))?;

        if invoice.items.is_empty() {
            info!(invoice_id = %invoice_id, "invoice has no items, skipping charge posting");
            return Ok(());
        }

        let receivable = match self.registry.find_or_create_receivable(invoice.responsible_id) {
            Ok(account) => account,
            Err(DomainError::NotFound(_)) => {
                warn!(invoice_id = %invoice_id, "invoice has no resolvable responsible, skipping");
                return Ok(());
            }
            Err(other) => return Err(other),
        };

        if !invoice.net_amount.is_positive() {
            warn!(
                invoice_id = %invoice_id,
                net_amount = invoice.net_amount.cents(),
                "invoice net amount is not positive, skipping charge posting"
            );
            return Ok(());
        }

        let (revenue_name, entry_type) = classify_revenue(&invoice);
        let revenue = self
            .registry
            .find_or_create(revenue_name, AccountKind::Revenue, None)?;

        self.posting.post(Posting {
            invoice_id: Some(invoice_id),
            payment_id: None,
            debit_account: receivable.id,
            credit_account: revenue.id,
            amount: invoice.net_amount,
            posted_at: Utc::now(),
            description: format!(
                "charges for invoice {invoice_id} ({})",
                invoice.reference_month
            ),
            entry_type,
        })?;

        self.sink.publish(BillingEvent::InvoiceCreated {
            invoice_id,
            responsible_id: invoice.responsible_id,
            net_amount: invoice.net_amount,
            occurred_at: Utc::now(),
        });
        Ok(())
    }

    /// Project a payment-processed event: debit the clearing account, credit
    /// the responsible's receivable.
    ///
    /// Idempotent: a payment already present in the journal is an
    /// informational skip, not an error — including the case where a
    /// concurrent handler wins the append race. Resolution failures
    /// propagate so the caller's unit of work rolls back and redelivers.
    pub fn on_payment_processed(&self, payment_id: PaymentId) -> DomainResult<()> {
        if self
            .ledger
            .exists_payment_entry(payment_id, EntryType::PaymentReceived)
        {
            info!(payment_id = %payment_id, "payment already posted, skipping");
            return Ok(());
        }

        let payment = self
            .payments
            .find(payment_id)
            .ok_or_else(|| DomainError::not_found(format!("payment {payment_id}")))?;
        let invoice = self
            .invoices
            .find(payment.invoice_id)
            .ok_or_else(|| DomainError::not_found(format!("invoice {}", payment.invoice_id)))?;

        if payment.status == PaymentStatus::Failed {
            return Err(DomainError::business_rule(format!(
                "payment {payment_id} failed and cannot be posted"
            )));
        }
        if matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
            // The invoice may be PAID because a concurrent handler posted
            // this very payment after the guard above ran. That duplicate is
            // a skip, not a rejection.
            if self
                .ledger
                .exists_payment_entry(payment_id, EntryType::PaymentReceived)
            {
                info!(payment_id = %payment_id, "payment already posted, skipping");
                return Ok(());
            }
            return Err(DomainError::business_rule(format!(
                "invoice {} is {:?} and does not accept payments",
                invoice.id, invoice.status
            )));
        }

        let receivable = self.registry.find_or_create_receivable(invoice.responsible_id)?;
        let clearing = self
            .registry
            .find_or_create(CLEARING_ACCOUNT, AccountKind::Asset, None)?;

        let posted_at = payment.paid_at.unwrap_or_else(Utc::now);
        let posted = self.posting.post(Posting {
            invoice_id: Some(invoice.id),
            payment_id: Some(payment_id),
            debit_account: clearing.id,
            credit_account: receivable.id,
            amount: payment.amount,
            posted_at,
            description: format!("payment {payment_id} for invoice {}", invoice.id),
            entry_type: EntryType::PaymentReceived,
        });

        match posted {
            Ok(_) => {}
            // Lost the race against a concurrent handler for the same
            // payment: the journal already holds the posting.
            Err(DomainError::Conflict(_)) => {
                info!(payment_id = %payment_id, "payment posted concurrently, skipping");
                return Ok(());
            }
            Err(other) => return Err(other),
        }

        self.status.reevaluate(invoice.id, Utc::now().date_naive())?;

        self.sink.publish(BillingEvent::PaymentProcessed {
            payment_id,
            invoice_id: invoice.id,
            responsible_id: invoice.responsible_id,
            amount: payment.amount,
            occurred_at: posted_at,
        });
        Ok(())
    }

    /// Project a penalty assessment: debit the receivable, credit penalty
    /// revenue.
    pub fn on_penalty_assessed(&self, penalty: PenaltyAssessment) -> DomainResult<()> {
        let invoice = self
            .invoices
            .find(penalty.invoice_id)
            .ok_or_else(|| DomainError::not_found(format!("invoice {}", penalty.invoice_id)))?;

        let today = Utc::now().date_naive();
        if invoice.status == InvoiceStatus::Pending && invoice.due_date >= today {
            return Err(DomainError::business_rule(format!(
                "invoice {} is not past due, penalty not applicable",
                invoice.id
            )));
        }
        if invoice.is_cancelled() {
            return Err(DomainError::business_rule(format!(
                "invoice {} is cancelled, penalty not applicable",
                invoice.id
            )));
        }

        let receivable = self.registry.find_or_create_receivable(penalty.responsible_id)?;
        let penalty_revenue = self
            .registry
            .find_or_create(PENALTY_REVENUE_ACCOUNT, AccountKind::Revenue, None)?;

        self.posting.post(Posting {
            invoice_id: Some(invoice.id),
            payment_id: None,
            debit_account: receivable.id,
            credit_account: penalty_revenue.id,
            amount: penalty.amount,
            posted_at: Utc::now(),
            description: format!("late penalty for invoice {}", invoice.id),
            entry_type: EntryType::PenaltyAssessed,
        })?;

        self.status.reevaluate(invoice.id, today)?;

        self.sink.publish(BillingEvent::PenaltyAssessed {
            invoice_id: invoice.id,
            responsible_id: penalty.responsible_id,
            amount: penalty.amount,
            occurred_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use schoolbooks_accounting::{InMemoryAccountStore, InMemoryLedgerStore};
    use schoolbooks_events::RecordingEventSink;
    use schoolbooks_invoicing::{
        InMemoryInvoiceStore, InMemoryPaymentStore, InvoiceItem, Payment, PaymentMethod,
        ReferenceMonth,
    };
    use schoolbooks_parties::{InMemoryDirectory, Responsible};

    pub(crate) struct Fixture {
        pub projector: Arc<LedgerProjector>,
        pub registry: Arc<AccountRegistry>,
        pub ledger: Arc<InMemoryLedgerStore>,
        pub invoices: Arc<InMemoryInvoiceStore>,
        pub payments: Arc<InMemoryPaymentStore>,
        pub directory: Arc<InMemoryDirectory>,
        pub status: Arc<StatusEngine>,
        pub sink: Arc<RecordingEventSink<BillingEvent>>,
        pub responsible: Responsible,
    }

    pub(crate) fn fixture() -> Fixture {
        let accounts = Arc::new(InMemoryAccountStore::new());
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let invoices = Arc::new(InMemoryInvoiceStore::new());
        let payments = Arc::new(InMemoryPaymentStore::new());
        let sink = Arc::new(RecordingEventSink::new());

        let responsible = Responsible::new("Diego");
        directory.add_responsible(responsible.clone());

        let registry = Arc::new(AccountRegistry::new(
            accounts,
            ledger.clone(),
            directory.clone(),
        ));
        let posting = Arc::new(PostingEngine::new(ledger.clone(), registry.clone()));
        let status = Arc::new(StatusEngine::new(
            invoices.clone(),
            registry.clone(),
            ledger.clone(),
            sink.clone(),
        ));
        let projector = Arc::new(LedgerProjector::new(
            posting,
            registry.clone(),
            ledger.clone(),
            invoices.clone(),
            payments.clone(),
            status.clone(),
            sink.clone(),
        ));

        Fixture {
            projector,
            registry,
            ledger,
            invoices,
            payments,
            directory,
            status,
            sink,
            responsible,
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn item(kind: ItemKind, cents: i64) -> InvoiceItem {
        InvoiceItem {
            description: "item".to_string(),
            amount: Money::from_cents(cents),
            kind,
            enrollment_id: None,
        }
    }

    fn save_invoice(fx: &Fixture, items: Vec<InvoiceItem>, due_date: NaiveDate) -> Invoice {
        let invoice = Invoice::new(
            fx.responsible.id,
            ReferenceMonth::new(2026, 3).unwrap(),
            items,
            due_date,
            due_date,
        )
        .unwrap();
        fx.invoices.save(invoice.clone());
        invoice
    }

    #[test]
    fn invoice_created_posts_tuition_charge() {
        let fx = fixture();
        let invoice = save_invoice(&fx, vec![item(ItemKind::Tuition, 30_000)], today() + Duration::days(10));

        fx.projector.on_invoice_created(invoice.id).unwrap();

        let receivable = fx.registry.find_or_create_receivable(fx.responsible.id).unwrap();
        assert_eq!(
            fx.ledger.balance_for_invoice(receivable.id, invoice.id),
            Money::from_cents(30_000)
        );
        let entries = fx.ledger.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.entry_type == EntryType::TuitionFee));
    }

    #[test]
    fn any_enrollment_fee_item_classifies_the_whole_invoice() {
        let fx = fixture();
        let invoice = save_invoice(
            &fx,
            vec![item(ItemKind::Tuition, 30_000), item(ItemKind::EnrollmentFee, 15_000)],
            today() + Duration::days(10),
        );

        fx.projector.on_invoice_created(invoice.id).unwrap();

        let entries = fx.ledger.entries();
        assert_eq!(entries.len(), 2);
        // One posting for the full net amount, classified as enrollment revenue.
        assert!(entries
            .iter()
            .all(|e| e.entry_type == EntryType::EnrollmentFeeCharged));
        assert_eq!(entries[0].debit.saturating_add(entries[1].debit), Money::from_cents(45_000));
    }

    #[test]
    fn other_items_fall_back_to_tuition_revenue() {
        let fx = fixture();
        let invoice = save_invoice(&fx, vec![item(ItemKind::Other, 5_000)], today() + Duration::days(10));

        fx.projector.on_invoice_created(invoice.id).unwrap();

        let entries = fx.ledger.entries();
        assert!(entries.iter().all(|e| e.entry_type == EntryType::TuitionFee));
    }

    #[test]
    fn invoice_without_items_is_skipped() {
        let fx = fixture();
        let invoice = save_invoice(&fx, vec![], today() + Duration::days(10));

        fx.projector.on_invoice_created(invoice.id).unwrap();
        assert!(fx.ledger.entries().is_empty());
        assert!(fx.sink.events().is_empty());
    }

    #[test]
    fn payment_settles_invoice_to_paid() {
        let fx = fixture();
        let invoice = save_invoice(&fx, vec![item(ItemKind::Tuition, 30_000)], today() + Duration::days(10));
        fx.projector.on_invoice_created(invoice.id).unwrap();

        let payment = Payment::new(
            invoice.id,
            Money::from_cents(30_000),
            Some(Utc::now()),
            PaymentMethod::BankTransfer,
        );
        fx.payments.save(payment.clone());

        fx.projector.on_payment_processed(payment.id).unwrap();

        let receivable = fx.registry.find_or_create_receivable(fx.responsible.id).unwrap();
        assert_eq!(
            fx.ledger.balance_for_invoice(receivable.id, invoice.id),
            Money::ZERO
        );
        assert_eq!(
            fx.invoices.find(invoice.id).unwrap().status,
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn duplicate_payment_event_is_an_informational_skip() {
        let fx = fixture();
        let invoice = save_invoice(&fx, vec![item(ItemKind::Tuition, 20_000)], today() + Duration::days(10));
        fx.projector.on_invoice_created(invoice.id).unwrap();

        let payment = Payment::new(
            invoice.id,
            Money::from_cents(20_000),
            Some(Utc::now()),
            PaymentMethod::Cash,
        );
        fx.payments.save(payment.clone());

        fx.projector.on_payment_processed(payment.id).unwrap();
        fx.projector.on_payment_processed(payment.id).unwrap();

        let received: Vec<_> = fx
            .ledger
            .entries()
            .into_iter()
            .filter(|e| e.entry_type == EntryType::PaymentReceived)
            .collect();
        // One posting pair for the payment, not two.
        assert_eq!(received.len(), 2);
    }

    #[test]
    fn missing_payment_or_invoice_is_fatal() {
        let fx = fixture();

        let err = fx.projector.on_payment_processed(PaymentId::new()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        let orphan = Payment::new(
            InvoiceId::new(),
            Money::from_cents(100),
            None,
            PaymentMethod::Card,
        );
        fx.payments.save(orphan.clone());
        let err = fx.projector.on_payment_processed(orphan.id).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn failed_payment_is_rejected_before_posting() {
        let fx = fixture();
        let invoice = save_invoice(&fx, vec![item(ItemKind::Tuition, 10_000)], today() + Duration::days(10));
        fx.projector.on_invoice_created(invoice.id).unwrap();

        let mut payment = Payment::new(
            invoice.id,
            Money::from_cents(10_000),
            Some(Utc::now()),
            PaymentMethod::Card,
        );
        payment.status = PaymentStatus::Failed;
        fx.payments.save(payment.clone());

        let err = fx.projector.on_payment_processed(payment.id).unwrap_err();
        assert!(matches!(err, DomainError::BusinessRule(_)));
        assert!(!fx
            .ledger
            .exists_payment_entry(payment.id, EntryType::PaymentReceived));
    }

    #[test]
    fn payment_against_cancelled_invoice_violates_business_rule() {
        let fx = fixture();
        let mut invoice = save_invoice(&fx, vec![item(ItemKind::Tuition, 10_000)], today() + Duration::days(10));
        invoice.cancel();
        fx.invoices.save(invoice.clone());

        let payment = Payment::new(
            invoice.id,
            Money::from_cents(10_000),
            None,
            PaymentMethod::Cash,
        );
        fx.payments.save(payment.clone());

        let err = fx.projector.on_payment_processed(payment.id).unwrap_err();
        assert!(matches!(err, DomainError::BusinessRule(_)));
        assert!(fx.ledger.entries().is_empty());
    }

    #[test]
    fn penalty_on_overdue_invoice_increases_balance() {
        let fx = fixture();
        let invoice = save_invoice(&fx, vec![item(ItemKind::Tuition, 20_000)], today() - Duration::days(1));
        fx.projector.on_invoice_created(invoice.id).unwrap();

        let receivable = fx.registry.find_or_create_receivable(fx.responsible.id).unwrap();
        let before = fx.ledger.balance_for_invoice(receivable.id, invoice.id);

        fx.projector
            .on_penalty_assessed(PenaltyAssessment {
                invoice_id: invoice.id,
                responsible_id: fx.responsible.id,
                amount: Money::from_cents(1_000),
            })
            .unwrap();

        let after = fx.ledger.balance_for_invoice(receivable.id, invoice.id);
        assert_eq!(after, before.saturating_add(Money::from_cents(1_000)));
        assert_eq!(
            fx.ledger
                .sum_credits_for_invoice(receivable.id, invoice.id, EntryType::PenaltyAssessed),
            Money::ZERO
        );
        assert_eq!(
            fx.ledger
                .sum_debits_for_invoice(receivable.id, invoice.id, EntryType::PenaltyAssessed),
            Money::from_cents(1_000)
        );
        assert_eq!(
            fx.invoices.find(invoice.id).unwrap().status,
            InvoiceStatus::Overdue
        );
    }

    #[test]
    fn penalty_on_pending_invoice_before_due_date_is_rejected() {
        let fx = fixture();
        let invoice = save_invoice(&fx, vec![item(ItemKind::Tuition, 20_000)], today() + Duration::days(10));
        fx.projector.on_invoice_created(invoice.id).unwrap();

        let err = fx
            .projector
            .on_penalty_assessed(PenaltyAssessment {
                invoice_id: invoice.id,
                responsible_id: fx.responsible.id,
                amount: Money::from_cents(1_000),
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::BusinessRule(_)));
    }
}
