use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use equiploan::config::AppConfig;
use equiploan::error::AppError;
use equiploan::telemetry;
use equiploan::workflows::lending::{
    lending_router, trust, EquipmentId, EquipmentItem, EquipmentStatus, LendingError,
    LendingService, Loan, LoanId, LoanStatus, MemoryLendingRepository, ReturnRecord, Student,
    StudentId, SystemClock, TracingActivityLog,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Equipment Loan Desk",
    about = "Run the school equipment loan service or trust-score tooling from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Trust score maintenance tooling
    Trust {
        #[command(subcommand)]
        command: TrustCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Seed a small demo inventory so the API has data to serve
    #[arg(long)]
    demo: bool,
}

#[derive(Subcommand, Debug)]
enum TrustCommand {
    /// Replay a return-history CSV and print the score progression
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// CSV file with `returned_at,due_at` columns (RFC 3339 timestamps; rows
    /// with a blank cell are excluded from scoring)
    #[arg(long)]
    history: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ReplayRow {
    returned_at: Option<String>,
    due_at: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Trust {
            command: TrustCommand::Replay(args),
        } => run_trust_replay(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let repository = Arc::new(MemoryLendingRepository::default());
    if args.demo {
        seed_demo(&repository)?;
        info!("seeded demo inventory");
    }
    let service = Arc::new(LendingService::new(
        repository,
        Arc::new(TracingActivityLog),
        Arc::new(SystemClock),
    ));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .layer(prometheus_layer)
        .with_state(state)
        .merge(lending_router(service));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "equipment loan desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_trust_replay(args: ReplayArgs) -> Result<(), AppError> {
    let mut reader = csv::Reader::from_path(&args.history)?;

    let mut records = Vec::new();
    for row in reader.deserialize::<ReplayRow>() {
        let row = row?;
        records.push(ReturnRecord {
            returned_at: parse_timestamp(row.returned_at.as_deref())?,
            due_at: parse_timestamp(row.due_at.as_deref())?,
        });
    }

    let total = records.len();
    let mut scored: Vec<(DateTime<Utc>, DateTime<Utc>)> = records
        .iter()
        .filter_map(|record| match (record.returned_at, record.due_at) {
            (Some(returned), Some(due)) => Some((returned, due)),
            _ => None,
        })
        .collect();
    scored.sort_by_key(|(returned, _)| *returned);

    println!("Trust score replay");
    println!(
        "{} return(s) in history, {} scored (rows missing a date are excluded)",
        total,
        scored.len()
    );

    let mut score = trust::BASE_SCORE;
    println!("base score: {score:.1}");
    for (returned, due) in &scored {
        let on_time = trust::on_time(*returned, *due);
        score = trust::apply_outcome(score, on_time);
        let verdict = if on_time { "on time" } else { "late" };
        println!("- returned {returned} (due {due}): {verdict} -> {score:.1}");
    }

    let recomputed = trust::compute_trust_score(&records);
    println!("final score: {recomputed:.1}");

    Ok(())
}

fn parse_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = raw else { return Ok(None) };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|parsed| Some(parsed.with_timezone(&Utc)))
        .map_err(|err| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("failed to parse '{trimmed}' as an RFC 3339 timestamp ({err})"),
            ))
        })
}

fn seed_demo(repository: &MemoryLendingRepository) -> Result<(), AppError> {
    let now = Utc::now();

    let students = [
        ("stu-001", "S-1001", "Alex Morgan", "Year 10"),
        ("stu-002", "S-1002", "Priya Shah", "Year 11"),
    ];
    for (id, tag, name, year) in students {
        repository
            .insert_student(Student {
                id: StudentId(id.to_string()),
                student_tag: tag.to_string(),
                full_name: name.to_string(),
                year_group: year.to_string(),
                trust_score: trust::BASE_SCORE,
                is_blacklisted: false,
                blacklist_end_date: None,
                blacklist_reason: None,
            })
            .map_err(LendingError::from)?;
    }

    let items = [
        ("eq-001", "B-01", "Basketball", "Basketball"),
        ("eq-002", "T-04", "Tennis Racket", "Tennis"),
    ];
    for (id, tag, name, category) in items {
        repository
            .insert_equipment(EquipmentItem {
                id: EquipmentId(id.to_string()),
                item_tag: tag.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                status: EquipmentStatus::Borrowed,
                condition_notes: None,
            })
            .map_err(LendingError::from)?;
    }

    let loans = [
        ("loan-001", "stu-001", "eq-001", 3i64),
        ("loan-002", "stu-002", "eq-002", -1i64),
    ];
    for (id, student, equipment, due_in_days) in loans {
        repository
            .insert_loan(Loan {
                id: LoanId(id.to_string()),
                student_id: StudentId(student.to_string()),
                equipment_id: EquipmentId(equipment.to_string()),
                borrowed_by: None,
                borrowed_at: now - Duration::days(2),
                due_at: Some(now + Duration::days(due_in_days)),
                returned_at: None,
                status: LoanStatus::Active,
                is_overdue: false,
            })
            .map_err(LendingError::from)?;
    }

    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
