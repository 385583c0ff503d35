use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for enrolled students.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for equipment inventory items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EquipmentId(pub String);

/// Identifier wrapper for loan records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanId(pub String);

/// Opaque identifier for the acting staff user, recorded on audit records only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Enrolled student with the mutable trust and suspension fields the engine manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    /// School-issued student number shown on badges; distinct from the record id.
    pub student_tag: String,
    pub full_name: String,
    pub year_group: String,
    /// 0.0-100.0, held to one decimal place.
    pub trust_score: f64,
    pub is_blacklisted: bool,
    pub blacklist_end_date: Option<DateTime<Utc>>,
    pub blacklist_reason: Option<String>,
}

/// Inventory status of a single equipment item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Available,
    Borrowed,
    Reserved,
    Repair,
    Lost,
    Damaged,
}

impl EquipmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EquipmentStatus::Available => "available",
            EquipmentStatus::Borrowed => "borrowed",
            EquipmentStatus::Reserved => "reserved",
            EquipmentStatus::Repair => "repair",
            EquipmentStatus::Lost => "lost",
            EquipmentStatus::Damaged => "damaged",
        }
    }
}

/// A single piece of lendable equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub id: EquipmentId,
    /// Inventory tag printed on the item.
    pub item_tag: String,
    pub name: String,
    pub category: String,
    pub status: EquipmentStatus,
    pub condition_notes: Option<String>,
}

/// Canonical loan status. `Overdue` is derived from the due date and only
/// applies while the loan is open; once returned the status is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Returned,
    Overdue,
}

impl LoanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
            LoanStatus::Overdue => "overdue",
        }
    }
}

/// One equipment item borrowed by one student for a bounded window.
///
/// Invariant: `returned_at` is `None` iff `status != Returned`. Once
/// `returned_at` is set the loan is never mutated again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub student_id: StudentId,
    pub equipment_id: EquipmentId,
    pub borrowed_by: Option<UserId>,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub is_overdue: bool,
}

impl Loan {
    /// A loan is closed exactly once; everything downstream keys off this.
    pub fn is_closed(&self) -> bool {
        self.returned_at.is_some()
    }
}

/// Terminal disposition of a loan at close time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnOutcome {
    Normal,
    Lost,
    Damaged,
}

impl ReturnOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            ReturnOutcome::Normal => "normal",
            ReturnOutcome::Lost => "lost",
            ReturnOutcome::Damaged => "damaged",
        }
    }
}

/// Append-only audit record of one suspension event. Entries are historical;
/// current enforcement reads the student's own blacklist fields instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub student_id: StudentId,
    pub recorded_by: Option<UserId>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: String,
    pub is_active: bool,
}

/// Entity kinds referenced by activity log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Student,
    Equipment,
    Loan,
}

/// Audit log event emitted for each engine mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub actor: Option<UserId>,
    pub action: String,
    pub entity: EntityKind,
    pub entity_id: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}
