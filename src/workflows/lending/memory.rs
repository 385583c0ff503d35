use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use super::domain::{
    ActivityEvent, BlacklistEntry, EquipmentId, EquipmentItem, Loan, LoanId, Student, StudentId,
};
use super::repository::{ActivityError, ActivityRecorder, LendingRepository, RepositoryError};

/// In-memory store backing the demo server and tests. The production design
/// assumes a single local embedded database with one writer, which this
/// mirrors: a mutex per process, atomic single-record updates, no
/// cross-process coordination.
#[derive(Default, Clone)]
pub struct MemoryLendingRepository {
    inner: Arc<Mutex<Store>>,
}

#[derive(Default)]
struct Store {
    students: HashMap<StudentId, Student>,
    equipment: HashMap<EquipmentId, EquipmentItem>,
    loans: HashMap<LoanId, Loan>,
    blacklist: Vec<BlacklistEntry>,
}

impl MemoryLendingRepository {
    pub fn insert_student(&self, student: Student) -> Result<(), RepositoryError> {
        let mut store = self.inner.lock().expect("repository mutex poisoned");
        if store.students.contains_key(&student.id) {
            return Err(RepositoryError::Conflict);
        }
        store.students.insert(student.id.clone(), student);
        Ok(())
    }

    pub fn insert_equipment(&self, item: EquipmentItem) -> Result<(), RepositoryError> {
        let mut store = self.inner.lock().expect("repository mutex poisoned");
        if store.equipment.contains_key(&item.id) {
            return Err(RepositoryError::Conflict);
        }
        store.equipment.insert(item.id.clone(), item);
        Ok(())
    }

    pub fn insert_loan(&self, loan: Loan) -> Result<(), RepositoryError> {
        let mut store = self.inner.lock().expect("repository mutex poisoned");
        if store.loans.contains_key(&loan.id) {
            return Err(RepositoryError::Conflict);
        }
        store.loans.insert(loan.id.clone(), loan);
        Ok(())
    }

    /// Snapshot of the append-only suspension audit trail.
    pub fn blacklist_entries(&self) -> Vec<BlacklistEntry> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        store.blacklist.clone()
    }
}

impl LendingRepository for MemoryLendingRepository {
    fn student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        Ok(store.students.get(id).cloned())
    }

    fn update_student(&self, student: Student) -> Result<(), RepositoryError> {
        let mut store = self.inner.lock().expect("repository mutex poisoned");
        if !store.students.contains_key(&student.id) {
            return Err(RepositoryError::NotFound);
        }
        store.students.insert(student.id.clone(), student);
        Ok(())
    }

    fn equipment(&self, id: &EquipmentId) -> Result<Option<EquipmentItem>, RepositoryError> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        Ok(store.equipment.get(id).cloned())
    }

    fn update_equipment(&self, item: EquipmentItem) -> Result<(), RepositoryError> {
        let mut store = self.inner.lock().expect("repository mutex poisoned");
        if !store.equipment.contains_key(&item.id) {
            return Err(RepositoryError::NotFound);
        }
        store.equipment.insert(item.id.clone(), item);
        Ok(())
    }

    fn loan(&self, id: &LoanId) -> Result<Option<Loan>, RepositoryError> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        Ok(store.loans.get(id).cloned())
    }

    fn update_loan(&self, loan: Loan) -> Result<(), RepositoryError> {
        let mut store = self.inner.lock().expect("repository mutex poisoned");
        if !store.loans.contains_key(&loan.id) {
            return Err(RepositoryError::NotFound);
        }
        store.loans.insert(loan.id.clone(), loan);
        Ok(())
    }

    fn unreturned_loans(&self) -> Result<Vec<Loan>, RepositoryError> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        Ok(store
            .loans
            .values()
            .filter(|loan| loan.returned_at.is_none())
            .cloned()
            .collect())
    }

    fn returned_loans_for_student(&self, id: &StudentId) -> Result<Vec<Loan>, RepositoryError> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        let mut loans: Vec<Loan> = store
            .loans
            .values()
            .filter(|loan| &loan.student_id == id && loan.returned_at.is_some())
            .cloned()
            .collect();
        loans.sort_by_key(|loan| loan.returned_at);
        Ok(loans)
    }

    fn all_students(&self) -> Result<Vec<Student>, RepositoryError> {
        let store = self.inner.lock().expect("repository mutex poisoned");
        Ok(store.students.values().cloned().collect())
    }

    fn append_blacklist_entry(&self, entry: BlacklistEntry) -> Result<(), RepositoryError> {
        let mut store = self.inner.lock().expect("repository mutex poisoned");
        store.blacklist.push(entry);
        Ok(())
    }
}

/// Activity recorder that emits structured log events instead of persisting.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivityLog;

impl ActivityRecorder for TracingActivityLog {
    fn record(&self, event: ActivityEvent) -> Result<(), ActivityError> {
        info!(
            action = %event.action,
            entity = ?event.entity,
            entity_id = %event.entity_id,
            detail = %event.detail,
            "activity"
        );
        Ok(())
    }
}
