//! School parties: responsibles (guardians/payers), students, enrollments.
//!
//! Pure domain data plus the directory traits the billing core consumes.

pub mod directory;
pub mod party;

pub use directory::{EnrollmentStore, InMemoryDirectory, ResponsibleDirectory, StudentDirectory};
pub use party::{Enrollment, Responsible, Student};
