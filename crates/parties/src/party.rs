use serde::{Deserialize, Serialize};

use schoolbooks_core::{EnrollmentId, Money, ResponsibleId, StudentId};

/// The guardian/payer associated with one or more students.
///
/// Owner of a per-responsible receivable account in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responsible {
    pub id: ResponsibleId,
    pub name: String,
}

impl Responsible {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ResponsibleId::new(),
            name: name.into(),
        }
    }
}

/// A student, optionally linked to the responsible who pays for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    /// Students without a responsible are skipped by invoice generation.
    pub responsible_id: Option<ResponsibleId>,
}

impl Student {
    pub fn new(name: impl Into<String>, responsible_id: Option<ResponsibleId>) -> Self {
        Self {
            id: StudentId::new(),
            name: name.into(),
            responsible_id,
        }
    }
}

/// A student's enrollment in a classroom, carrying the billable monthly fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub classroom: String,
    /// Unset or non-positive fees are not billable.
    pub monthly_fee: Option<Money>,
    pub active: bool,
}

impl Enrollment {
    pub fn new(student_id: StudentId, classroom: impl Into<String>, monthly_fee: Option<Money>) -> Self {
        Self {
            id: EnrollmentId::new(),
            student_id,
            classroom: classroom.into(),
            monthly_fee,
            active: true,
        }
    }

    /// Whether monthly invoice generation should bill this enrollment.
    pub fn billable_fee(&self) -> Option<Money> {
        self.monthly_fee.filter(|fee| fee.is_positive())
    }
}
