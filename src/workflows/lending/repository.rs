use chrono::{DateTime, Utc};

use super::domain::{
    ActivityEvent, BlacklistEntry, EquipmentId, EquipmentItem, Loan, LoanId, Student, StudentId,
};

/// Storage abstraction so the lending service can be exercised in isolation.
/// The engine requires atomic single-record update semantics; it holds no
/// state between invocations and always re-reads before writing.
pub trait LendingRepository: Send + Sync {
    fn student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError>;
    fn update_student(&self, student: Student) -> Result<(), RepositoryError>;

    fn equipment(&self, id: &EquipmentId) -> Result<Option<EquipmentItem>, RepositoryError>;
    fn update_equipment(&self, item: EquipmentItem) -> Result<(), RepositoryError>;

    fn loan(&self, id: &LoanId) -> Result<Option<Loan>, RepositoryError>;
    fn update_loan(&self, loan: Loan) -> Result<(), RepositoryError>;

    /// All open loans, for overdue sweeps.
    fn unreturned_loans(&self) -> Result<Vec<Loan>, RepositoryError>;

    /// A student's closed loans ordered by return date, oldest first.
    fn returned_loans_for_student(&self, id: &StudentId) -> Result<Vec<Loan>, RepositoryError>;

    fn all_students(&self) -> Result<Vec<Student>, RepositoryError>;

    fn append_blacklist_entry(&self, entry: BlacklistEntry) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Time source seam so overdue and suspension-expiry logic is deterministic
/// under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outbound audit hook. Recording failures must not abort the mutation that
/// triggered them; the service logs and continues.
pub trait ActivityRecorder: Send + Sync {
    fn record(&self, event: ActivityEvent) -> Result<(), ActivityError>;
}

/// Audit dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("activity log transport unavailable: {0}")]
    Transport(String),
}
