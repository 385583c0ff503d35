use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    ActivityEvent, EntityKind, EquipmentId, EquipmentStatus, Loan, LoanId, LoanStatus,
    ReturnOutcome, StudentId, UserId,
};
use super::repository::{ActivityRecorder, Clock, LendingRepository, RepositoryError};
use super::status::{resolve_status, LoanStatusResolution};
use super::suspension::{
    suspend, suspension_active, DAMAGED_SUSPENSION_DAYS, LOST_SUSPENSION_DAYS,
};
use super::trust::{apply_outcome, compute_trust_score, on_time, round_one_decimal, ReturnRecord};

/// Service composing the repository, audit recorder, and clock seams around
/// the loan lifecycle and trust score engine.
pub struct LendingService<R, A, C> {
    repository: Arc<R>,
    activity: Arc<A>,
    clock: Arc<C>,
}

/// Error raised by the lending service. None of these are retryable; they are
/// caller-input violations or concurrent-access races the caller must resolve.
#[derive(Debug, thiserror::Error)]
pub enum LendingError {
    #[error("loan '{0}' not found")]
    LoanNotFound(LoanId),
    #[error("equipment '{0}' not found")]
    EquipmentNotFound(EquipmentId),
    #[error("student '{0}' not found")]
    StudentNotFound(StudentId),
    #[error("loan '{0}' is already returned")]
    AlreadyReturned(LoanId),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Summary handed back to callers after a loan is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnReceipt {
    pub loan_id: LoanId,
    pub outcome: ReturnOutcome,
    pub returned_at: DateTime<Utc>,
    /// `None` when the loan carried no due date (excluded from scoring) or
    /// when a punitive lost/damaged override bypassed the lateness verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_on_time: Option<bool>,
    pub trust_score: f64,
    pub equipment_status: EquipmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspended_until: Option<DateTime<Utc>>,
}

/// Read-model for a loan with its resolver-classified status.
#[derive(Debug, Clone, Serialize)]
pub struct LoanView {
    pub loan_id: LoanId,
    pub student_id: StudentId,
    pub equipment_id: EquipmentId,
    pub status: &'static str,
    pub is_overdue: bool,
    pub borrowed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
}

/// Read-model for a student's trust and suspension state. `suspension_active`
/// is the read-time expiry check; the stored blacklist fields are surfaced
/// unmodified.
#[derive(Debug, Clone, Serialize)]
pub struct StudentView {
    pub student_id: StudentId,
    pub full_name: String,
    pub trust_score: f64,
    pub is_blacklisted: bool,
    pub suspension_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist_end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist_reason: Option<String>,
}

impl<R, A, C> LendingService<R, A, C>
where
    R: LendingRepository + 'static,
    A: ActivityRecorder + 'static,
    C: Clock + 'static,
{
    pub fn new(repository: Arc<R>, activity: Arc<A>, clock: Arc<C>) -> Self {
        Self {
            repository,
            activity,
            clock,
        }
    }

    /// Close a loan under the given outcome, applying every side effect as one
    /// logical unit: the loan is frozen terminal, the equipment status moves,
    /// the student's trust score adjusts, and lost/damaged outcomes add a
    /// time-boxed suspension. A loan may be closed exactly once; callers must
    /// serialize concurrent invocations against the same loan.
    pub fn process_return(
        &self,
        loan_id: &LoanId,
        outcome: ReturnOutcome,
        actor: Option<UserId>,
    ) -> Result<ReturnReceipt, LendingError> {
        let loan = self
            .repository
            .loan(loan_id)?
            .ok_or_else(|| LendingError::LoanNotFound(loan_id.clone()))?;
        if loan.is_closed() {
            return Err(LendingError::AlreadyReturned(loan_id.clone()));
        }

        let mut equipment = self
            .repository
            .equipment(&loan.equipment_id)?
            .ok_or_else(|| LendingError::EquipmentNotFound(loan.equipment_id.clone()))?;
        let mut student = self
            .repository
            .student(&loan.student_id)?
            .ok_or_else(|| LendingError::StudentNotFound(loan.student_id.clone()))?;

        let now = self.clock.now();

        // Every outcome closes the loan through the same terminal path.
        let closed_loan = Loan {
            returned_at: Some(now),
            status: LoanStatus::Returned,
            is_overdue: false,
            ..loan.clone()
        };

        let mut verdict = None;
        let mut blacklist_entry = None;

        match outcome {
            ReturnOutcome::Normal => {
                equipment.status = EquipmentStatus::Available;
                if let Some(due) = loan.due_at {
                    let returned_on_time = on_time(now, due);
                    student.trust_score = apply_outcome(student.trust_score, returned_on_time);
                    verdict = Some(returned_on_time);
                }
                // No due date: the return is excluded from scoring entirely.
            }
            ReturnOutcome::Lost | ReturnOutcome::Damaged => {
                equipment.status = match outcome {
                    ReturnOutcome::Lost => EquipmentStatus::Lost,
                    _ => EquipmentStatus::Damaged,
                };
                equipment.condition_notes = Some(format!(
                    "Marked as {} on {}",
                    outcome.label(),
                    now.format("%Y-%m-%d")
                ));

                // Punitive override: flat halving, independent of lateness.
                student.trust_score = round_one_decimal((student.trust_score * 0.5).max(0.0));

                let days = match outcome {
                    ReturnOutcome::Lost => LOST_SUSPENSION_DAYS,
                    _ => DAMAGED_SUSPENSION_DAYS,
                };
                let reason = match outcome {
                    ReturnOutcome::Lost => format!("Lost equipment: {}", equipment.name),
                    _ => format!("Damaged equipment: {}", equipment.name),
                };
                let (suspended, entry) = suspend(student, days, reason, actor.clone(), now);
                student = suspended;
                blacklist_entry = Some(entry);
            }
        }

        let equipment_status = equipment.status;
        let suspended_until = blacklist_entry.as_ref().map(|entry| entry.end_date);
        let trust_score = student.trust_score;

        self.repository.update_loan(closed_loan)?;
        self.repository.update_equipment(equipment)?;
        self.repository.update_student(student)?;
        if let Some(entry) = blacklist_entry {
            self.repository.append_blacklist_entry(entry)?;
        }

        self.record_activity(ActivityEvent {
            actor,
            action: format!("loan_closed_{}", outcome.label()),
            entity: EntityKind::Loan,
            entity_id: loan_id.0.clone(),
            detail: format!(
                "outcome {}, trust score {:.1}",
                outcome.label(),
                trust_score
            ),
            at: now,
        });

        info!(
            loan = %loan_id,
            outcome = outcome.label(),
            trust_score,
            "loan closed"
        );

        Ok(ReturnReceipt {
            loan_id: loan_id.clone(),
            outcome,
            returned_at: now,
            returned_on_time: verdict,
            trust_score,
            equipment_status,
            suspended_until,
        })
    }

    /// Suspend a student outside the return flow (manual discipline action).
    /// Overwrites any existing blacklist window; see `suspension::suspend`.
    pub fn suspend_student(
        &self,
        student_id: &StudentId,
        days: i64,
        reason: String,
        actor: Option<UserId>,
    ) -> Result<DateTime<Utc>, LendingError> {
        if days <= 0 {
            return Err(LendingError::Validation(
                "suspension must cover at least one day".to_string(),
            ));
        }

        let student = self
            .repository
            .student(student_id)?
            .ok_or_else(|| LendingError::StudentNotFound(student_id.clone()))?;

        let now = self.clock.now();
        let (student, entry) = suspend(student, days, reason, actor.clone(), now);
        let end_date = entry.end_date;

        self.repository.update_student(student)?;
        self.repository.append_blacklist_entry(entry)?;

        self.record_activity(ActivityEvent {
            actor,
            action: "student_suspended".to_string(),
            entity: EntityKind::Student,
            entity_id: student_id.0.clone(),
            detail: format!("suspended until {end_date}"),
            at: now,
        });

        Ok(end_date)
    }

    /// Persist the resolver's verdict for one loan (overdue sweep write path).
    pub fn refresh_loan_status(
        &self,
        loan_id: &LoanId,
    ) -> Result<LoanStatusResolution, LendingError> {
        let mut loan = self
            .repository
            .loan(loan_id)?
            .ok_or_else(|| LendingError::LoanNotFound(loan_id.clone()))?;

        let resolution = resolve_status(&loan, self.clock.now());
        loan.status = resolution.status;
        loan.is_overdue = resolution.is_overdue;
        self.repository.update_loan(loan)?;

        Ok(resolution)
    }

    /// Full chronological recompute of one student's trust score, persisted.
    /// Batch repair path; equivalent to replaying the incremental step over
    /// the same history.
    pub fn recalculate_trust(&self, student_id: &StudentId) -> Result<f64, LendingError> {
        let mut student = self
            .repository
            .student(student_id)?
            .ok_or_else(|| LendingError::StudentNotFound(student_id.clone()))?;

        let history = self.repository.returned_loans_for_student(student_id)?;
        let records: Vec<ReturnRecord> = history.iter().map(ReturnRecord::from).collect();
        let score = compute_trust_score(&records);

        student.trust_score = score;
        self.repository.update_student(student)?;

        Ok(score)
    }

    /// Recompute every student's trust score from history. Returns the number
    /// of students updated.
    pub fn recalculate_all_trust(&self) -> Result<usize, LendingError> {
        let students = self.repository.all_students()?;
        let mut updated = 0;
        for student in students {
            self.recalculate_trust(&student.id)?;
            updated += 1;
        }
        Ok(updated)
    }

    /// Read-only classification of a loan for display.
    pub fn loan_view(&self, loan_id: &LoanId) -> Result<LoanView, LendingError> {
        let loan = self
            .repository
            .loan(loan_id)?
            .ok_or_else(|| LendingError::LoanNotFound(loan_id.clone()))?;
        Ok(self.view_of(&loan))
    }

    /// Read-only trust and suspension state for a student.
    pub fn student_view(&self, student_id: &StudentId) -> Result<StudentView, LendingError> {
        let student = self
            .repository
            .student(student_id)?
            .ok_or_else(|| LendingError::StudentNotFound(student_id.clone()))?;
        let now = self.clock.now();

        Ok(StudentView {
            student_id: student.id.clone(),
            full_name: student.full_name.clone(),
            trust_score: student.trust_score,
            is_blacklisted: student.is_blacklisted,
            suspension_active: suspension_active(&student, now),
            blacklist_end_date: student.blacklist_end_date,
            blacklist_reason: student.blacklist_reason,
        })
    }

    /// Open loans past their due date, for dashboards and alert digests.
    pub fn overdue_loans(&self) -> Result<Vec<LoanView>, LendingError> {
        let now = self.clock.now();
        let views = self
            .repository
            .unreturned_loans()?
            .iter()
            .filter(|loan| resolve_status(loan, now).is_overdue)
            .map(|loan| self.view_with(loan, now))
            .collect();
        Ok(views)
    }

    fn view_of(&self, loan: &Loan) -> LoanView {
        self.view_with(loan, self.clock.now())
    }

    fn view_with(&self, loan: &Loan, now: DateTime<Utc>) -> LoanView {
        let resolution = resolve_status(loan, now);
        LoanView {
            loan_id: loan.id.clone(),
            student_id: loan.student_id.clone(),
            equipment_id: loan.equipment_id.clone(),
            status: resolution.status.label(),
            is_overdue: resolution.is_overdue,
            borrowed_at: loan.borrowed_at,
            due_at: loan.due_at,
            returned_at: loan.returned_at,
        }
    }

    fn record_activity(&self, event: ActivityEvent) {
        if let Err(err) = self.activity.record(event) {
            warn!(error = %err, "failed to record activity event");
        }
    }
}
