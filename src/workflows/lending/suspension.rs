use chrono::{DateTime, Duration, Utc};

use super::domain::{BlacklistEntry, Student, UserId};

/// Suspension window applied for each terminal outcome.
pub const LOST_SUSPENSION_DAYS: i64 = 14;
pub const DAMAGED_SUSPENSION_DAYS: i64 = 7;

/// Apply a time-boxed suspension to a student. A new suspension overwrites any
/// existing blacklist window and reason (last-write-wins); durations are never
/// stacked or merged. Returns the mutated student alongside the append-only
/// audit entry for the caller to persist together.
pub fn suspend(
    mut student: Student,
    days: i64,
    reason: String,
    actor: Option<UserId>,
    now: DateTime<Utc>,
) -> (Student, BlacklistEntry) {
    let end_date = now + Duration::days(days);

    student.is_blacklisted = true;
    student.blacklist_end_date = Some(end_date);
    student.blacklist_reason = Some(reason.clone());

    let entry = BlacklistEntry {
        student_id: student.id.clone(),
        recorded_by: actor,
        start_date: now,
        end_date,
        reason,
        is_active: true,
    };

    (student, entry)
}

/// Read-time expiry check. Nothing expires suspensions in the background; a
/// suspension is active only while the student's blacklist window covers `now`.
pub fn suspension_active(student: &Student, now: DateTime<Utc>) -> bool {
    student.is_blacklisted
        && student
            .blacklist_end_date
            .map(|end| now < end)
            .unwrap_or(false)
}
