use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{ProjectionSummary, Scenario, YearRow, project_scenario, summarize};

/// Start years past this are rejected; anything beyond the horizon already
/// behaves like "never withdraw".
const MAX_WITHDRAW_START_YEAR: i64 = 1_000;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("--{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("--{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to encode projection: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliWithdrawType {
    Percent,
    Amount,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiWithdrawType {
    Percent,
    Amount,
}

impl From<ApiWithdrawType> for CliWithdrawType {
    fn from(value: ApiWithdrawType) -> Self {
        match value {
            ApiWithdrawType::Percent => CliWithdrawType::Percent,
            ApiWithdrawType::Amount => CliWithdrawType::Amount,
        }
    }
}

impl From<CliWithdrawType> for ApiWithdrawType {
    fn from(value: CliWithdrawType) -> Self {
        match value {
            CliWithdrawType::Percent => ApiWithdrawType::Percent,
            CliWithdrawType::Amount => ApiWithdrawType::Amount,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    initial_amount: Option<f64>,
    annual_return_rate: Option<f64>,
    annual_contribution: Option<f64>,
    withdraw_start_year: Option<i64>,
    withdraw_type: Option<ApiWithdrawType>,
    withdraw_percent: Option<f64>,
    withdraw_amount: Option<f64>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "fire-projection project",
    about = "Year-by-year balance projection with contributions, growth and withdrawals"
)]
struct Cli {
    #[arg(long, default_value_t = 100_000.0, allow_negative_numbers = true)]
    initial_amount: f64,
    #[arg(
        long,
        default_value_t = 7.0,
        allow_negative_numbers = true,
        help = "Annual return in percent"
    )]
    annual_return_rate: f64,
    #[arg(long, default_value_t = 10_000.0, allow_negative_numbers = true)]
    annual_contribution: f64,
    #[arg(
        long,
        default_value_t = 20,
        allow_negative_numbers = true,
        help = "0-based year in which withdrawals start and contributions stop"
    )]
    withdraw_start_year: i64,
    #[arg(long, value_enum, default_value_t = CliWithdrawType::Percent)]
    withdraw_type: CliWithdrawType,
    #[arg(long, default_value_t = 4.0, help = "Withdrawal in percent of balance")]
    withdraw_percent: f64,
    #[arg(long, default_value_t = 0.0, help = "Fixed yearly withdrawal for --withdraw-type amount")]
    withdraw_amount: f64,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    withdraw_type: ApiWithdrawType,
    scenario: Scenario,
    rows: Vec<YearRow>,
    summary: ProjectionSummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn require_finite(field: &'static str, value: f64) -> Result<f64, InputError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InputError::NonFinite { field })
    }
}

fn build_scenario(cli: &Cli) -> Result<Scenario, InputError> {
    let initial_amount = require_finite("initial-amount", cli.initial_amount)?;
    let annual_return_rate = require_finite("annual-return-rate", cli.annual_return_rate)?;
    let annual_contribution = require_finite("annual-contribution", cli.annual_contribution)?;
    let withdraw_percent = require_finite("withdraw-percent", cli.withdraw_percent)?;
    let withdraw_amount = require_finite("withdraw-amount", cli.withdraw_amount)?;

    if annual_return_rate <= -100.0 {
        return Err(InputError::OutOfRange {
            field: "annual-return-rate",
            expected: "greater than -100",
            value: annual_return_rate,
        });
    }

    if cli.withdraw_start_year > MAX_WITHDRAW_START_YEAR {
        return Err(InputError::OutOfRange {
            field: "withdraw-start-year",
            expected: "at most 1000",
            value: cli.withdraw_start_year as f64,
        });
    }
    // Every year satisfies `year >= start` for a negative start, same as 0.
    let withdraw_start_year = cli.withdraw_start_year.max(0) as u32;

    let withdraw_amount = match cli.withdraw_type {
        CliWithdrawType::Percent => {
            if !(0.0..=100.0).contains(&withdraw_percent) {
                return Err(InputError::OutOfRange {
                    field: "withdraw-percent",
                    expected: "between 0 and 100",
                    value: withdraw_percent,
                });
            }
            None
        }
        CliWithdrawType::Amount => {
            if withdraw_amount < 0.0 {
                return Err(InputError::OutOfRange {
                    field: "withdraw-amount",
                    expected: ">= 0",
                    value: withdraw_amount,
                });
            }
            Some(withdraw_amount)
        }
    };

    Ok(Scenario {
        initial_amount,
        annual_return_rate,
        annual_contribution,
        withdraw_start_year,
        // The form sends 0 for the hidden percent field in amount mode.
        withdraw_percent: if withdraw_amount.is_some() {
            0.0
        } else {
            withdraw_percent
        },
        withdraw_amount,
    })
}

/// Runs one projection from command-line flags and prints it to stdout.
///
/// `args` starts with the program name, as with [`Parser::parse_from`].
pub fn run_cli<I, T>(args: I) -> Result<(), CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let scenario = build_scenario(&cli)?;
    let response = build_project_response(cli.withdraw_type.into(), scenario);

    let output = match cli.format {
        OutputFormat::Table => render_table(&response.rows, &response.summary),
        OutputFormat::Json => serde_json::to_string_pretty(&response)?,
    };
    println!("{output}");
    Ok(())
}

fn render_table(rows: &[YearRow], summary: &ProjectionSummary) -> String {
    let header = format!(
        "{:>4} {:>16} {:>14} {:>14} {:>14} {:>16}",
        "year", "start_balance", "contribution", "withdrawal", "growth", "end_balance"
    );
    let body = rows.iter().map(|row| {
        format!(
            "{:>4} {:>16.2} {:>14.2} {:>14.2} {:>14.2} {:>16.2}",
            row.year,
            row.start_balance,
            row.contribution,
            row.withdrawal,
            row.growth,
            row.end_balance
        )
    });
    let outcome = match summary.depleted_year {
        Some(year) => format!("depleted in year {year}"),
        None => format!("{} years, balance remains", summary.years),
    };
    let footer = format!(
        "{outcome}; final {:.2}, contributed {:.2}, withdrawn {:.2}, growth {:.2}",
        summary.final_balance,
        summary.total_contributions,
        summary.total_withdrawals,
        summary.total_growth
    );

    std::iter::once(header)
        .chain(body)
        .chain(std::iter::once(footer))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    log::info!("projection HTTP API listening on http://{addr}");
    log::info!("local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler)
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let (withdraw_type, scenario) = match scenario_from_payload(payload) {
        Ok(request) => request,
        Err(err) => {
            log::warn!("rejected projection request: {err}");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let response = build_project_response(withdraw_type, scenario);
    log::info!(
        "projected {} years (depleted: {:?})",
        response.summary.years,
        response.summary.depleted_year
    );
    json_response(StatusCode::OK, response)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn scenario_from_json(json: &str) -> Result<(ApiWithdrawType, Scenario), String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    scenario_from_payload(payload).map_err(|e| e.to_string())
}

fn scenario_from_payload(
    payload: ProjectPayload,
) -> Result<(ApiWithdrawType, Scenario), InputError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.initial_amount {
        cli.initial_amount = v;
    }
    if let Some(v) = payload.annual_return_rate {
        cli.annual_return_rate = v;
    }
    if let Some(v) = payload.annual_contribution {
        cli.annual_contribution = v;
    }
    if let Some(v) = payload.withdraw_start_year {
        cli.withdraw_start_year = v;
    }
    if let Some(v) = payload.withdraw_type {
        cli.withdraw_type = v.into();
    }
    if let Some(v) = payload.withdraw_percent {
        cli.withdraw_percent = v;
    }
    if let Some(v) = payload.withdraw_amount {
        cli.withdraw_amount = v;
    }

    let scenario = build_scenario(&cli)?;
    Ok((cli.withdraw_type.into(), scenario))
}

fn default_cli_for_api() -> Cli {
    Cli {
        initial_amount: 100_000.0,
        annual_return_rate: 7.0,
        annual_contribution: 10_000.0,
        withdraw_start_year: 20,
        withdraw_type: CliWithdrawType::Percent,
        withdraw_percent: 4.0,
        withdraw_amount: 0.0,
        format: OutputFormat::Json,
    }
}

fn build_project_response(withdraw_type: ApiWithdrawType, scenario: Scenario) -> ProjectResponse {
    let rows = project_scenario(&scenario);
    let summary = summarize(scenario.initial_amount, &rows);
    ProjectResponse {
        withdraw_type,
        scenario,
        rows,
        summary,
    }
}
