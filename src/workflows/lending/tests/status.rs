use chrono::Duration;

use super::common::{fixed_now, open_loan};
use crate::workflows::lending::domain::LoanStatus;
use crate::workflows::lending::status::resolve_status;

#[test]
fn open_loan_before_due_date_is_active() {
    let now = fixed_now();
    let loan = open_loan("loan-1", "stu-1", "eq-1", Some(now + Duration::days(2)));

    let resolution = resolve_status(&loan, now);
    assert_eq!(resolution.status, LoanStatus::Active);
    assert!(!resolution.is_overdue);
}

#[test]
fn open_loan_past_due_date_is_overdue() {
    let now = fixed_now();
    let loan = open_loan("loan-1", "stu-1", "eq-1", Some(now - Duration::hours(1)));

    let resolution = resolve_status(&loan, now);
    assert_eq!(resolution.status, LoanStatus::Overdue);
    assert!(resolution.is_overdue);
}

#[test]
fn due_date_boundary_is_not_overdue() {
    let now = fixed_now();
    let loan = open_loan("loan-1", "stu-1", "eq-1", Some(now));

    let resolution = resolve_status(&loan, now);
    assert_eq!(resolution.status, LoanStatus::Active);
}

#[test]
fn loan_without_due_date_never_goes_overdue() {
    let now = fixed_now();
    let loan = open_loan("loan-1", "stu-1", "eq-1", None);

    let resolution = resolve_status(&loan, now + Duration::days(365));
    assert_eq!(resolution.status, LoanStatus::Active);
    assert!(!resolution.is_overdue);
}

#[test]
fn returned_loan_is_frozen_regardless_of_now() {
    let now = fixed_now();
    let mut loan = open_loan("loan-1", "stu-1", "eq-1", Some(now - Duration::days(3)));
    loan.returned_at = Some(now - Duration::days(1));
    loan.status = LoanStatus::Returned;

    // Even far in the future, a late-returned loan never resolves overdue.
    let resolution = resolve_status(&loan, now + Duration::days(100));
    assert_eq!(resolution.status, LoanStatus::Returned);
    assert!(!resolution.is_overdue);
}

#[test]
fn resolution_is_idempotent() {
    let now = fixed_now();
    let loan = open_loan("loan-1", "stu-1", "eq-1", Some(now - Duration::days(1)));

    let first = resolve_status(&loan, now);
    let second = resolve_status(&loan, now);
    assert_eq!(first, second);
}
