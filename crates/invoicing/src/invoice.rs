use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use schoolbooks_core::{DomainError, DomainResult, EnrollmentId, InvoiceId, Money, ResponsibleId};

/// Invoice status lifecycle.
///
/// PENDING is initial; CANCELLED is terminal. The displayed status is always
/// derived from ledger facts by the status engine, never set ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Overdue,
    Paid,
    Cancelled,
}

/// What an invoice item bills for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Tuition,
    EnrollmentFee,
    Discount,
    Other,
}

/// One line on an invoice. `amount` is signed: discounts are negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub amount: Money,
    pub kind: ItemKind,
    /// Links the item to a student/classroom, for display only.
    pub enrollment_id: Option<EnrollmentId>,
}

/// A billing period (calendar month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferenceMonth {
    pub year: i32,
    pub month: u32,
}

impl ReferenceMonth {
    pub fn new(year: i32, month: u32) -> DomainResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!(
                "month must be 1..=12, got {month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// The month after this one.
    pub fn next(self) -> ReferenceMonth {
        if self.month == 12 {
            ReferenceMonth {
                year: self.year + 1,
                month: 1,
            }
        } else {
            ReferenceMonth {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// A specific day within this month, if valid.
    pub fn day(self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }
}

impl core::fmt::Display for ReferenceMonth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The billable entity: one consolidated invoice per responsible per period.
///
/// Never physically deleted; CANCELLED is a terminal marker. The balance the
/// status engine reads is derived from ledger entries scoped to this
/// invoice, not from any field stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub responsible_id: ResponsibleId,
    pub reference_month: ReferenceMonth,
    pub items: Vec<InvoiceItem>,
    /// Sum of item amounts (itemized discounts included), fixed at creation.
    pub net_amount: Money,
    pub issued_on: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
}

impl Invoice {
    pub fn new(
        responsible_id: ResponsibleId,
        reference_month: ReferenceMonth,
        items: Vec<InvoiceItem>,
        issued_on: NaiveDate,
        due_date: NaiveDate,
    ) -> DomainResult<Self> {
        let mut net = Money::ZERO;
        for item in &items {
            net = net
                .checked_add(item.amount)
                .ok_or_else(|| DomainError::invariant("invoice net amount overflow"))?;
        }

        Ok(Self {
            id: InvoiceId::new(),
            responsible_id,
            reference_month,
            items,
            net_amount: net,
            issued_on,
            due_date,
            status: InvoiceStatus::Pending,
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == InvoiceStatus::Cancelled
    }

    /// Mark the invoice cancelled (terminal, no further transitions).
    pub fn cancel(&mut self) {
        self.status = InvoiceStatus::Cancelled;
    }

    /// Whether any item links to the given enrollment.
    pub fn covers_enrollment(&self, enrollment_id: EnrollmentId) -> bool {
        self.items
            .iter()
            .any(|item| item.enrollment_id == Some(enrollment_id))
    }
}
