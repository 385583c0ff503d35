use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{LoanId, ReturnOutcome, StudentId, UserId};
use super::repository::{ActivityRecorder, Clock, LendingRepository};
use super::service::{LendingError, LendingService};

/// Router builder exposing HTTP endpoints for returns and read-path views.
pub fn lending_router<R, A, C>(service: Arc<LendingService<R, A, C>>) -> Router
where
    R: LendingRepository + 'static,
    A: ActivityRecorder + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route(
            "/api/v1/loans/:loan_id/return",
            post(return_handler::<R, A, C>),
        )
        .route("/api/v1/loans/:loan_id", get(loan_handler::<R, A, C>))
        .route(
            "/api/v1/students/:student_id",
            get(student_handler::<R, A, C>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReturnRequest {
    outcome: ReturnOutcome,
    #[serde(default)]
    actor: Option<String>,
}

pub(crate) async fn return_handler<R, A, C>(
    State(service): State<Arc<LendingService<R, A, C>>>,
    Path(loan_id): Path<String>,
    axum::Json(request): axum::Json<ReturnRequest>,
) -> Response
where
    R: LendingRepository + 'static,
    A: ActivityRecorder + 'static,
    C: Clock + 'static,
{
    let id = LoanId(loan_id);
    let actor = request.actor.map(UserId);
    match service.process_return(&id, request.outcome, actor) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn loan_handler<R, A, C>(
    State(service): State<Arc<LendingService<R, A, C>>>,
    Path(loan_id): Path<String>,
) -> Response
where
    R: LendingRepository + 'static,
    A: ActivityRecorder + 'static,
    C: Clock + 'static,
{
    let id = LoanId(loan_id);
    match service.loan_view(&id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn student_handler<R, A, C>(
    State(service): State<Arc<LendingService<R, A, C>>>,
    Path(student_id): Path<String>,
) -> Response
where
    R: LendingRepository + 'static,
    A: ActivityRecorder + 'static,
    C: Clock + 'static,
{
    let id = StudentId(student_id);
    match service.student_view(&id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: LendingError) -> Response {
    let status = match &err {
        LendingError::LoanNotFound(_)
        | LendingError::EquipmentNotFound(_)
        | LendingError::StudentNotFound(_) => StatusCode::NOT_FOUND,
        LendingError::AlreadyReturned(_) => StatusCode::CONFLICT,
        LendingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LendingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
