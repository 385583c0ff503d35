use chrono::{DateTime, Utc};

use super::domain::Loan;

/// Score assigned to a student with no returned-loan history.
pub const BASE_SCORE: f64 = 50.0;

/// Upper bound the score is capped at after an on-time reward.
pub const MAX_SCORE: f64 = 100.0;

/// Minimal slice of a loan consumed by the calculator. Entries missing either
/// date are excluded from scoring entirely rather than counted as late.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnRecord {
    pub returned_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
}

impl From<&Loan> for ReturnRecord {
    fn from(loan: &Loan) -> Self {
        Self {
            returned_at: loan.returned_at,
            due_at: loan.due_at,
        }
    }
}

/// Whether a closed loan came back on time.
pub fn on_time(returned_at: DateTime<Utc>, due_at: DateTime<Utc>) -> bool {
    returned_at <= due_at
}

/// One multiplicative step of the trust score: on-time returns multiply by 1.5
/// (capped at 100), late returns halve the score. The result is clamped at
/// zero and rounded to one decimal place at every step so that replaying a
/// history through this function matches the incrementally stored score
/// exactly.
pub fn apply_outcome(current: f64, on_time: bool) -> f64 {
    let next = if on_time {
        (current * 1.5).min(MAX_SCORE)
    } else {
        current * 0.5
    };
    round_one_decimal(next.max(0.0))
}

/// Full recompute: replay the returned-loan history in chronological order of
/// return date, folding `apply_outcome` from the base score. Used for batch
/// backfill/repair; the hot path applies single steps against the stored
/// score instead.
pub fn compute_trust_score(history: &[ReturnRecord]) -> f64 {
    let mut scored: Vec<(DateTime<Utc>, DateTime<Utc>)> = history
        .iter()
        .filter_map(|record| match (record.returned_at, record.due_at) {
            (Some(returned), Some(due)) => Some((returned, due)),
            _ => None,
        })
        .collect();
    scored.sort_by_key(|(returned, _)| *returned);

    scored.iter().fold(BASE_SCORE, |score, (returned, due)| {
        apply_outcome(score, on_time(*returned, *due))
    })
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
