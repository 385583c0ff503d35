//! Equipment lending kernel: loan lifecycle, trust scoring, and suspensions.
//!
//! The engine is stateless between invocations: every operation reads current
//! records through the repository seam, computes, and writes back. Concurrent
//! calls against the same loan must be serialized by the caller.

pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod status;
pub mod suspension;
pub mod trust;

#[cfg(test)]
mod tests;

pub use domain::{
    ActivityEvent, BlacklistEntry, EntityKind, EquipmentId, EquipmentItem, EquipmentStatus, Loan,
    LoanId, LoanStatus, ReturnOutcome, Student, StudentId, UserId,
};
pub use memory::{MemoryLendingRepository, TracingActivityLog};
pub use repository::{
    ActivityError, ActivityRecorder, Clock, LendingRepository, RepositoryError, SystemClock,
};
pub use router::lending_router;
pub use service::{LendingError, LendingService, LoanView, ReturnReceipt, StudentView};
pub use status::{resolve_status, LoanStatusResolution};
pub use suspension::{
    suspend, suspension_active, DAMAGED_SUSPENSION_DAYS, LOST_SUSPENSION_DAYS,
};
pub use trust::{apply_outcome, compute_trust_score, on_time, ReturnRecord, BASE_SCORE, MAX_SCORE};
