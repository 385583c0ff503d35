use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::workflows::lending::domain::{
    ActivityEvent, EquipmentId, EquipmentItem, EquipmentStatus, Loan, LoanId, LoanStatus, Student,
    StudentId,
};
use crate::workflows::lending::memory::MemoryLendingRepository;
use crate::workflows::lending::repository::{ActivityError, ActivityRecorder, Clock};
use crate::workflows::lending::service::LendingService;

/// Deterministic "now" shared by the scenarios.
pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) struct FixedClock(pub(super) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryActivity {
    events: Arc<Mutex<Vec<ActivityEvent>>>,
}

impl MemoryActivity {
    pub(super) fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().expect("activity mutex poisoned").clone()
    }
}

impl ActivityRecorder for MemoryActivity {
    fn record(&self, event: ActivityEvent) -> Result<(), ActivityError> {
        self.events
            .lock()
            .expect("activity mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) fn student(id: &str, trust_score: f64) -> Student {
    Student {
        id: StudentId(id.to_string()),
        student_tag: format!("S-{id}"),
        full_name: "Jordan Blake".to_string(),
        year_group: "Year 10".to_string(),
        trust_score,
        is_blacklisted: false,
        blacklist_end_date: None,
        blacklist_reason: None,
    }
}

pub(super) fn equipment(id: &str, name: &str) -> EquipmentItem {
    EquipmentItem {
        id: EquipmentId(id.to_string()),
        item_tag: format!("T-{id}"),
        name: name.to_string(),
        category: "Basketball".to_string(),
        status: EquipmentStatus::Borrowed,
        condition_notes: None,
    }
}

pub(super) fn open_loan(
    id: &str,
    student_id: &str,
    equipment_id: &str,
    due_at: Option<DateTime<Utc>>,
) -> Loan {
    Loan {
        id: LoanId(id.to_string()),
        student_id: StudentId(student_id.to_string()),
        equipment_id: EquipmentId(equipment_id.to_string()),
        borrowed_by: None,
        borrowed_at: fixed_now() - Duration::days(5),
        due_at,
        returned_at: None,
        status: LoanStatus::Active,
        is_overdue: false,
    }
}

pub(super) type TestService = LendingService<MemoryLendingRepository, MemoryActivity, FixedClock>;

pub(super) fn build_service(
    now: DateTime<Utc>,
) -> (
    Arc<TestService>,
    Arc<MemoryLendingRepository>,
    Arc<MemoryActivity>,
) {
    let repository = Arc::new(MemoryLendingRepository::default());
    let activity = Arc::new(MemoryActivity::default());
    let service = Arc::new(LendingService::new(
        repository.clone(),
        activity.clone(),
        Arc::new(FixedClock(now)),
    ));
    (service, repository, activity)
}

/// Seed one student, one borrowed item, and one open loan due at `due_at`.
pub(super) fn seed_open_loan(
    repository: &MemoryLendingRepository,
    trust_score: f64,
    due_at: Option<DateTime<Utc>>,
) {
    repository
        .insert_student(student("stu-1", trust_score))
        .expect("insert student");
    repository
        .insert_equipment(equipment("eq-1", "Basketball"))
        .expect("insert equipment");
    repository
        .insert_loan(open_loan("loan-1", "stu-1", "eq-1", due_at))
        .expect("insert loan");
}
