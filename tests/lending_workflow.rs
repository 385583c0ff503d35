//! Integration scenarios for the loan lifecycle and trust score engine,
//! exercised through the public service facade and HTTP router.

mod common {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use equiploan::workflows::lending::{
        ActivityError, ActivityEvent, ActivityRecorder, Clock, EquipmentId, EquipmentItem,
        EquipmentStatus, LendingService, Loan, LoanId, LoanStatus, MemoryLendingRepository,
        Student, StudentId,
    };

    /// Clock whose current time can be advanced mid-scenario.
    #[derive(Clone)]
    pub struct SteppingClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl SteppingClock {
        pub fn starting_at(now: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut guard = self.now.lock().expect("clock mutex poisoned");
            *guard += by;
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().expect("clock mutex poisoned")
        }
    }

    #[derive(Default, Clone)]
    pub struct RecordedActivity {
        events: Arc<Mutex<Vec<ActivityEvent>>>,
    }

    impl RecordedActivity {
        pub fn events(&self) -> Vec<ActivityEvent> {
            self.events.lock().expect("activity mutex poisoned").clone()
        }
    }

    impl ActivityRecorder for RecordedActivity {
        fn record(&self, event: ActivityEvent) -> Result<(), ActivityError> {
            self.events
                .lock()
                .expect("activity mutex poisoned")
                .push(event);
            Ok(())
        }
    }

    pub fn term_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 12, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    pub type Service = LendingService<MemoryLendingRepository, RecordedActivity, SteppingClock>;

    pub fn build_engine() -> (
        Arc<Service>,
        Arc<MemoryLendingRepository>,
        Arc<RecordedActivity>,
        SteppingClock,
    ) {
        let repository = Arc::new(MemoryLendingRepository::default());
        let activity = Arc::new(RecordedActivity::default());
        let clock = SteppingClock::starting_at(term_start());
        let service = Arc::new(LendingService::new(
            repository.clone(),
            activity.clone(),
            Arc::new(clock.clone()),
        ));
        (service, repository, activity, clock)
    }

    pub fn enroll(repository: &MemoryLendingRepository, id: &str, name: &str) {
        repository
            .insert_student(Student {
                id: StudentId(id.to_string()),
                student_tag: format!("S-{id}"),
                full_name: name.to_string(),
                year_group: "Year 9".to_string(),
                trust_score: 50.0,
                is_blacklisted: false,
                blacklist_end_date: None,
                blacklist_reason: None,
            })
            .expect("enroll student");
    }

    pub fn stock(repository: &MemoryLendingRepository, id: &str, name: &str) {
        repository
            .insert_equipment(EquipmentItem {
                id: EquipmentId(id.to_string()),
                item_tag: format!("T-{id}"),
                name: name.to_string(),
                category: "Football".to_string(),
                status: EquipmentStatus::Borrowed,
                condition_notes: None,
            })
            .expect("stock equipment");
    }

    pub fn check_out(
        repository: &MemoryLendingRepository,
        loan_id: &str,
        student_id: &str,
        equipment_id: &str,
        borrowed_at: DateTime<Utc>,
        due_in_days: i64,
    ) {
        repository
            .insert_loan(Loan {
                id: LoanId(loan_id.to_string()),
                student_id: StudentId(student_id.to_string()),
                equipment_id: EquipmentId(equipment_id.to_string()),
                borrowed_by: None,
                borrowed_at,
                due_at: Some(borrowed_at + Duration::days(due_in_days)),
                returned_at: None,
                status: LoanStatus::Active,
                is_overdue: false,
            })
            .expect("check out loan");
    }
}

mod lifecycle {
    use super::common::*;
    use chrono::Duration;
    use equiploan::workflows::lending::{
        Clock, EquipmentId, EquipmentStatus, LendingError, LendingRepository, LoanId, LoanStatus,
        ReturnOutcome, StudentId,
    };

    #[test]
    fn full_term_of_returns_tracks_the_trust_ladder() {
        let (service, repository, _, clock) = build_engine();
        enroll(&repository, "stu-1", "Sam Okafor");
        stock(&repository, "eq-1", "Football");

        // Three loans returned in sequence: on time, on time, late.
        let expectations = [
            ("loan-1", 2i64, 1i64, 75.0),
            ("loan-2", 3, 2, 100.0),
            ("loan-3", 2, 4, 50.0),
        ];
        for (loan_id, due_in, returned_after, expected_score) in expectations {
            let borrowed_at = clock.now();
            check_out(&repository, loan_id, "stu-1", "eq-1", borrowed_at, due_in);
            clock.advance(Duration::days(returned_after));

            let receipt = service
                .process_return(&LoanId(loan_id.to_string()), ReturnOutcome::Normal, None)
                .expect("return succeeds");
            assert_eq!(receipt.trust_score, expected_score, "after {loan_id}");
        }

        // Full recompute over the same history agrees with the incremental path.
        let recomputed = service
            .recalculate_trust(&StudentId("stu-1".to_string()))
            .expect("recompute succeeds");
        assert_eq!(recomputed, 50.0);
    }

    #[test]
    fn overdue_loan_resolves_then_freezes_once_returned() {
        let (service, repository, _, clock) = build_engine();
        enroll(&repository, "stu-1", "Sam Okafor");
        stock(&repository, "eq-1", "Football");
        check_out(&repository, "loan-1", "stu-1", "eq-1", clock.now(), 2);

        clock.advance(Duration::days(3));
        let resolution = service
            .refresh_loan_status(&LoanId("loan-1".to_string()))
            .expect("refresh succeeds");
        assert_eq!(resolution.status, LoanStatus::Overdue);

        service
            .process_return(&LoanId("loan-1".to_string()), ReturnOutcome::Normal, None)
            .expect("return succeeds");

        // Late return: score halves, and the overdue flag never resurfaces.
        clock.advance(Duration::days(30));
        let view = service
            .loan_view(&LoanId("loan-1".to_string()))
            .expect("view succeeds");
        assert_eq!(view.status, "returned");
        assert!(!view.is_overdue);

        let student = repository
            .student(&StudentId("stu-1".to_string()))
            .expect("fetch")
            .expect("present");
        assert_eq!(student.trust_score, 25.0);
    }

    #[test]
    fn lost_equipment_cascades_and_suspension_expires_by_read_time() {
        let (service, repository, activity, clock) = build_engine();
        enroll(&repository, "stu-1", "Sam Okafor");
        stock(&repository, "eq-1", "Football");
        check_out(&repository, "loan-1", "stu-1", "eq-1", clock.now(), 7);

        service
            .process_return(&LoanId("loan-1".to_string()), ReturnOutcome::Lost, None)
            .expect("return succeeds");

        let item = repository
            .equipment(&EquipmentId("eq-1".to_string()))
            .expect("fetch")
            .expect("present");
        assert_eq!(item.status, EquipmentStatus::Lost);

        let view = service
            .student_view(&StudentId("stu-1".to_string()))
            .expect("view succeeds");
        assert_eq!(view.trust_score, 25.0);
        assert!(view.suspension_active);

        // The window lapses without any background job clearing state.
        clock.advance(Duration::days(15));
        let view = service
            .student_view(&StudentId("stu-1".to_string()))
            .expect("view succeeds");
        assert!(view.is_blacklisted);
        assert!(!view.suspension_active);

        assert_eq!(repository.blacklist_entries().len(), 1);
        assert_eq!(activity.events().len(), 1);
    }

    #[test]
    fn closing_twice_is_rejected_without_side_effects() {
        let (service, repository, _, _) = build_engine();
        enroll(&repository, "stu-1", "Sam Okafor");
        stock(&repository, "eq-1", "Football");
        check_out(&repository, "loan-1", "stu-1", "eq-1", term_start(), 7);

        service
            .process_return(&LoanId("loan-1".to_string()), ReturnOutcome::Normal, None)
            .expect("first return succeeds");

        match service.process_return(&LoanId("loan-1".to_string()), ReturnOutcome::Damaged, None) {
            Err(LendingError::AlreadyReturned(_)) => {}
            other => panic!("expected AlreadyReturned, got {other:?}"),
        }

        assert!(repository.blacklist_entries().is_empty());
        let student = repository
            .student(&StudentId("stu-1".to_string()))
            .expect("fetch")
            .expect("present");
        assert!(!student.is_blacklisted);
    }
}

mod routing {
    use super::common::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use equiploan::workflows::lending::{lending_router, Clock};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[tokio::test]
    async fn return_flow_round_trips_through_http() {
        let (service, repository, _, clock) = build_engine();
        enroll(&repository, "stu-1", "Sam Okafor");
        stock(&repository, "eq-1", "Football");
        check_out(&repository, "loan-1", "stu-1", "eq-1", clock.now(), 2);
        clock.advance(Duration::days(5));

        let router = lending_router(service);

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/loans/loan-1/return")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::to_vec(&json!({ "outcome": "damaged", "actor": "admin-7" }))
                            .expect("serialize request"),
                    ))
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(
            payload.get("equipment_status").and_then(Value::as_str),
            Some("damaged")
        );
        assert_eq!(
            payload.get("trust_score").and_then(Value::as_f64),
            Some(25.0)
        );
        assert!(payload.get("suspended_until").is_some());

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/students/stu-1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(
            payload.get("suspension_active").and_then(Value::as_bool),
            Some(true)
        );
        assert!(payload
            .get("blacklist_reason")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .contains("Damaged equipment"));
    }
}
