use chrono::{DateTime, Utc};

use super::domain::{Loan, LoanStatus};

/// Resolver verdict for a loan at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanStatusResolution {
    pub status: LoanStatus,
    pub is_overdue: bool,
}

/// Classify a loan against the current time. Returned loans are frozen to
/// `(Returned, false)` forever; lateness is consumed by the trust score at
/// close time and never retained as an overdue flag. Open loans are overdue
/// once their due date has passed; a loan with no due date is never overdue.
///
/// Side-effect free and idempotent, so read paths may call it arbitrarily
/// often; `LendingService::refresh_loan_status` persists the verdict when a
/// caller wants it durable.
pub fn resolve_status(loan: &Loan, now: DateTime<Utc>) -> LoanStatusResolution {
    if loan.returned_at.is_some() {
        return LoanStatusResolution {
            status: LoanStatus::Returned,
            is_overdue: false,
        };
    }

    let is_overdue = loan.due_at.map(|due| due < now).unwrap_or(false);
    LoanStatusResolution {
        status: if is_overdue {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        },
        is_overdue,
    }
}
