//! VitalRisk: health-risk scoring from vitals.
//!
//! Command-line entry point. Results are printed to stdout as JSON; logs go
//! to stderr or a file.

use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vitalrisk::adapters::sanitize::SanitizingMakeWriter;
use vitalrisk::adapters::{LinearSoftmaxClassifier, SqliteHistory};
use vitalrisk::config::{LogMode, ServiceConfig};
use vitalrisk::domain::{is_object_id, HistoricalSnapshot};
use vitalrisk::{PredictionRequest, PredictionService};

const EXIT_INTERNAL: u8 = 1;
const EXIT_INVALID: u8 = 2;

const USAGE: &str = "Usage:
  vitalrisk predict [<request.json>]
  vitalrisk health
  vitalrisk record <user_id> [<record.json>]

JSON inputs are read from stdin when no file is given.";

enum Command {
    Predict(Option<String>),
    Health,
    Record(String, Option<String>),
}

fn parse_args() -> Result<Command, String> {
    let mut args = std::env::args().skip(1);
    let command = match args.next().as_deref() {
        Some("predict") => Command::Predict(args.next()),
        Some("health") => Command::Health,
        Some("record") => {
            let user_id = args.next().ok_or_else(|| USAGE.to_string())?;
            Command::Record(user_id, args.next())
        }
        _ => return Err(USAGE.to_string()),
    };
    if args.next().is_some() {
        return Err(USAGE.to_string());
    }
    Ok(command)
}

fn init_logging(cfg: &ServiceConfig) -> Result<WorkerGuard> {
    let (writer, guard) = match cfg.log_mode {
        LogMode::File => {
            if let Some(parent) = cfg.log_file.parent() {
                // Best-effort: open() below reports the real failure.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&cfg.log_file)
                .with_context(|| format!("Failed to open log file {:?}", cfg.log_file))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}

fn read_json_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("Failed to read {p}")),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn invalid(errors: Vec<String>) -> Result<ExitCode> {
    print_json(&json!({ "errors": errors }))?;
    Ok(ExitCode::from(EXIT_INVALID))
}

fn open_history(cfg: &ServiceConfig) -> Result<Arc<SqliteHistory>> {
    if let Some(parent) = cfg.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {parent:?}"))?;
    }
    let history = SqliteHistory::new(&cfg.db_path)
        .with_context(|| format!("Failed to open record store {:?}", cfg.db_path))?;
    Ok(Arc::new(history))
}

type Service = PredictionService<LinearSoftmaxClassifier, SqliteHistory>;

fn build_service(cfg: &ServiceConfig) -> Result<Service> {
    let artifacts = cfg
        .artifact_loader()?
        .load()
        .with_context(|| format!("Failed to load model artifacts from {:?}", cfg.model_dir))?;
    let service = Service::from_artifacts(artifacts, open_history(cfg)?, cfg.history_days)?;
    Ok(service)
}

fn predict(cfg: &ServiceConfig, input: Option<&str>) -> Result<ExitCode> {
    let raw = read_json_input(input)?;
    let payload: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => return invalid(vec![format!("Invalid JSON: {e}")]),
    };
    let request = match PredictionRequest::from_json(payload) {
        Ok(r) => r,
        Err(e) => return invalid(vec![e]),
    };
    if let Err(errors) = request.validate() {
        return invalid(errors);
    }

    let service = build_service(cfg)?;
    let result = service.predict(&request.reading, request.user_id.as_deref())?;
    print_json(&result)?;
    Ok(ExitCode::SUCCESS)
}

fn health(cfg: &ServiceConfig) -> Result<ExitCode> {
    let service = build_service(cfg)?;
    print_json(&service.health())?;
    Ok(ExitCode::SUCCESS)
}

/// Capture time from the record's `date` field, else now.
fn record_time(document: &Value) -> DateTime<Utc> {
    document
        .get("date")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc))
}

fn record(cfg: &ServiceConfig, user_id: &str, input: Option<&str>) -> Result<ExitCode> {
    if !is_object_id(user_id) {
        return invalid(vec!["Invalid userId".to_string()]);
    }
    let raw = read_json_input(input)?;
    let document: Value = match serde_json::from_str(&raw) {
        Ok(v @ Value::Object(_)) => v,
        Ok(_) => return invalid(vec!["Record must be a JSON object".to_string()]),
        Err(e) => return invalid(vec![format!("Invalid JSON: {e}")]),
    };

    let snapshot = HistoricalSnapshot::new(record_time(&document), document);
    let history = open_history(cfg)?;
    let id = history.insert_record(user_id, &snapshot)?;
    tracing::info!("Stored health record {}", id);

    print_json(&json!({
        "id": id,
        "userId": user_id,
        "recorded_at": snapshot.recorded_at,
    }))?;
    Ok(ExitCode::SUCCESS)
}

fn run(cfg: &ServiceConfig, command: Command) -> Result<ExitCode> {
    match command {
        Command::Predict(input) => predict(cfg, input.as_deref()),
        Command::Health => health(cfg),
        Command::Record(user_id, input) => record(cfg, &user_id, input.as_deref()),
    }
}

fn main() -> ExitCode {
    let command = match parse_args() {
        Ok(c) => c,
        Err(usage) => {
            eprintln!("{usage}");
            return ExitCode::from(EXIT_INVALID);
        }
    };

    let cfg = ServiceConfig::from_env();
    let _guard = match init_logging(&cfg) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e:#}");
            return ExitCode::from(EXIT_INTERNAL);
        }
    };

    tracing::debug!("Model directory: {}", cfg.model_dir.display());

    match run(&cfg, command) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Request failed: {:#}", e);
            println!("{}", json!({ "error": "Internal server error" }));
            ExitCode::from(EXIT_INTERNAL)
        }
    }
}
