//! Directory traits the billing core consumes, plus an in-memory impl.

use std::collections::HashMap;
use std::sync::RwLock;

use schoolbooks_core::{EnrollmentId, ResponsibleId, StudentId};

use crate::party::{Enrollment, Responsible, Student};

/// Lookup of responsibles by id.
pub trait ResponsibleDirectory: Send + Sync {
    fn find(&self, id: ResponsibleId) -> Option<Responsible>;
}

/// Lookup of students by id.
pub trait StudentDirectory: Send + Sync {
    fn find(&self, id: StudentId) -> Option<Student>;
}

/// Access to enrollments for the monthly billing batch.
pub trait EnrollmentStore: Send + Sync {
    fn find(&self, id: EnrollmentId) -> Option<Enrollment>;
    fn list_active(&self) -> Vec<Enrollment>;
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    responsibles: RwLock<HashMap<ResponsibleId, Responsible>>,
    students: RwLock<HashMap<StudentId, Student>>,
    enrollments: RwLock<HashMap<EnrollmentId, Enrollment>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_responsible(&self, responsible: Responsible) {
        if let Ok(mut map) = self.responsibles.write() {
            map.insert(responsible.id, responsible);
        }
    }

    pub fn add_student(&self, student: Student) {
        if let Ok(mut map) = self.students.write() {
            map.insert(student.id, student);
        }
    }

    pub fn add_enrollment(&self, enrollment: Enrollment) {
        if let Ok(mut map) = self.enrollments.write() {
            map.insert(enrollment.id, enrollment);
        }
    }
}

impl ResponsibleDirectory for InMemoryDirectory {
    fn find(&self, id: ResponsibleId) -> Option<Responsible> {
        let map = self.responsibles.read().ok()?;
        map.get(&id).cloned()
    }
}

impl StudentDirectory for InMemoryDirectory {
    fn find(&self, id: StudentId) -> Option<Student> {
        let map = self.students.read().ok()?;
        map.get(&id).cloned()
    }
}

impl EnrollmentStore for InMemoryDirectory {
    fn find(&self, id: EnrollmentId) -> Option<Enrollment> {
        let map = self.enrollments.read().ok()?;
        map.get(&id).cloned()
    }

    fn list_active(&self) -> Vec<Enrollment> {
        let map = match self.enrollments.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        let mut active: Vec<_> = map.values().filter(|e| e.active).cloned().collect();
        // Deterministic iteration order for the batch (HashMap order is not).
        active.sort_by_key(|e| *e.id.as_uuid());
        active
    }
}
