use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AppreciationConvention, BreakEvenConfig, BreakEvenResult, ComparisonPoint, LoanParameters,
    MAX_TERM_YEARS, MarketParameters, MonthlyLedgerRow, Projection, ProjectionSummary,
    YearlyBuyRow, YearlyRentRow, project, solve_break_even_rent,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliAppreciationConvention {
    StartOfYear,
    EndOfYear,
}

impl From<CliAppreciationConvention> for AppreciationConvention {
    fn from(value: CliAppreciationConvention) -> Self {
        match value {
            CliAppreciationConvention::StartOfYear => AppreciationConvention::StartOfYear,
            CliAppreciationConvention::EndOfYear => AppreciationConvention::EndOfYear,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiAppreciationConvention {
    #[serde(alias = "startOfYear", alias = "start")]
    StartOfYear,
    #[serde(alias = "endOfYear", alias = "end")]
    EndOfYear,
}

impl From<ApiAppreciationConvention> for CliAppreciationConvention {
    fn from(value: ApiAppreciationConvention) -> Self {
        match value {
            ApiAppreciationConvention::StartOfYear => CliAppreciationConvention::StartOfYear,
            ApiAppreciationConvention::EndOfYear => CliAppreciationConvention::EndOfYear,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    home_value: Option<f64>,
    down_payment_percent: Option<f64>,
    hoa: Option<f64>,
    interest_percent: Option<f64>,
    term_years: Option<u32>,
    property_tax_percent: Option<f64>,
    insurance: Option<f64>,
    start_date: Option<NaiveDate>,

    appreciation_percent: Option<f64>,
    appreciation_convention: Option<ApiAppreciationConvention>,
    selling_fee_percent: Option<f64>,
    rent: Option<f64>,
    stock_growth_percent: Option<f64>,

    plot_years: Option<u32>,
    include_monthly: Option<bool>,

    rent_min: Option<f64>,
    rent_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "buyrent",
    about = "Buy vs rent projection: amortized mortgage against renting and investing the difference"
)]
pub struct Cli {
    #[arg(long, default_value_t = 1_500_000.0, help = "Purchase price of the home")]
    home_value: f64,
    #[arg(long, default_value_t = 20.0, help = "Down payment in percent of the price")]
    down_payment_percent: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly HOA dues")]
    hoa: f64,
    #[arg(long, default_value_t = 2.9, help = "Loan APR in percent")]
    interest_percent: f64,
    #[arg(long, default_value_t = 30, help = "Loan term in years")]
    term_years: u32,
    #[arg(
        long,
        default_value_t = 1.25,
        help = "Annual property tax in percent of the purchase price"
    )]
    property_tax_percent: f64,
    #[arg(long, default_value_t = 100.0, help = "Monthly home insurance")]
    insurance: f64,
    #[arg(
        long,
        default_value = "2021-01-01",
        help = "Date of the first mortgage payment (YYYY-MM-DD)"
    )]
    start_date: NaiveDate,
    #[arg(long, default_value_t = 5.0, help = "Yearly home appreciation in percent")]
    appreciation_percent: f64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliAppreciationConvention::StartOfYear,
        help = "Whether year 1 is valued at the purchase price or after one year of appreciation"
    )]
    appreciation_convention: CliAppreciationConvention,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Selling cost in percent of the sale price"
    )]
    selling_fee_percent: f64,
    #[arg(long, default_value_t = 4_000.0, help = "Monthly rent")]
    rent: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Yearly growth of the invested savings in percent"
    )]
    stock_growth_percent: f64,
    #[arg(long, default_value_t = 15, help = "Years to compare, at most the loan term")]
    plot_years: u32,
    #[arg(long, help = "Include the monthly amortization ledger in the output")]
    include_monthly: bool,
    #[arg(
        long,
        help = "Solve for the rent at which buying and renting break even at --plot-years"
    )]
    break_even: bool,
    #[arg(long, default_value_t = 0.0, help = "Lowest monthly rent to search")]
    rent_min: f64,
    #[arg(long, default_value_t = 20_000.0, help = "Highest monthly rent to search")]
    rent_max: f64,
    #[arg(long, default_value_t = 0.01, help = "Break-even rent tolerance")]
    tolerance: f64,
    #[arg(long, default_value_t = 60)]
    max_iterations: u32,
}

#[derive(Debug)]
struct ProjectRequest {
    loan: LoanParameters,
    market: MarketParameters,
    horizon_years: u32,
    include_monthly: bool,
    break_even: BreakEvenConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    appreciation_convention: AppreciationConvention,
    summary: ProjectionSummary,
    comparison: Vec<ComparisonPoint>,
    yearly_buy: Vec<YearlyBuyRow>,
    yearly_rent: Vec<YearlyRentRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    monthly: Option<Vec<MonthlyLedgerRow>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BreakEvenIterationResponse {
    iteration: u32,
    lower_bound: f64,
    upper_bound: f64,
    candidate_rent: f64,
    advantage: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BreakEvenResponse {
    horizon_years: u32,
    rent_min: f64,
    rent_max: f64,
    tolerance: f64,
    max_iterations: u32,
    buy_net: f64,
    solved_rent: Option<f64>,
    advantage_at_solution: Option<f64>,
    converged: bool,
    feasible: bool,
    message: String,
    iterations: Vec<BreakEvenIterationResponse>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli) -> Result<ProjectRequest, String> {
    if !cli.home_value.is_finite() || cli.home_value < 0.0 {
        return Err("--home-value must be >= 0".to_string());
    }

    if cli.term_years == 0 || cli.term_years > MAX_TERM_YEARS {
        return Err(format!("--term-years must be between 1 and {MAX_TERM_YEARS}"));
    }

    if cli.plot_years == 0 || cli.plot_years > cli.term_years {
        return Err("--plot-years must be between 1 and --term-years".to_string());
    }

    for (name, percent) in [
        ("--down-payment-percent", cli.down_payment_percent),
        ("--interest-percent", cli.interest_percent),
        ("--property-tax-percent", cli.property_tax_percent),
        ("--appreciation-percent", cli.appreciation_percent),
        ("--selling-fee-percent", cli.selling_fee_percent),
        ("--stock-growth-percent", cli.stock_growth_percent),
    ] {
        if !(0.0..=100.0).contains(&percent) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    for (name, amount) in [
        ("--hoa", cli.hoa),
        ("--insurance", cli.insurance),
        ("--rent", cli.rent),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if !cli.rent_min.is_finite() || cli.rent_min < 0.0 {
        return Err("--rent-min must be >= 0".to_string());
    }

    if !cli.rent_max.is_finite() || cli.rent_max <= cli.rent_min {
        return Err("--rent-max must be > --rent-min".to_string());
    }

    if !cli.tolerance.is_finite() || cli.tolerance <= 0.0 {
        return Err("--tolerance must be > 0".to_string());
    }

    if cli.max_iterations == 0 {
        return Err("--max-iterations must be > 0".to_string());
    }

    Ok(ProjectRequest {
        loan: LoanParameters {
            home_value: cli.home_value,
            down_payment_fraction: cli.down_payment_percent / 100.0,
            annual_rate: cli.interest_percent / 100.0,
            term_years: cli.term_years,
            monthly_hoa: cli.hoa,
            property_tax_rate: cli.property_tax_percent / 100.0,
            monthly_insurance: cli.insurance,
            start_date: cli.start_date,
        },
        market: MarketParameters {
            appreciation_rate: cli.appreciation_percent / 100.0,
            selling_fee: cli.selling_fee_percent / 100.0,
            monthly_rent: cli.rent,
            growth_rate: cli.stock_growth_percent / 100.0,
            appreciation_convention: cli.appreciation_convention.into(),
        },
        horizon_years: cli.plot_years,
        include_monthly: cli.include_monthly,
        break_even: BreakEvenConfig {
            horizon_years: cli.plot_years,
            search_min: cli.rent_min,
            search_max: cli.rent_max,
            tolerance: cli.tolerance,
            max_iterations: cli.max_iterations,
        },
    })
}

/// Runs one projection (or a break-even solve) and returns the JSON document to print.
pub fn run_cli(cli: Cli) -> Result<String, String> {
    let solve = cli.break_even;
    let request = build_request(cli)?;

    let json = if solve {
        let response = build_break_even_response(&request)?;
        serde_json::to_string_pretty(&response)
    } else {
        let response = build_project_response(&request)?;
        serde_json::to_string_pretty(&response)
    };
    json.map_err(|e| format!("Failed to serialize output: {e}"))
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/break-even",
            get(break_even_get_handler).post(break_even_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "buy vs rent HTTP API listening");
    tracing::info!("local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, router()).await
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

async fn break_even_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    break_even_handler_impl(payload)
}

async fn break_even_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    break_even_handler_impl(payload)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            tracing::warn!(error = %msg, "rejected projection request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match build_project_response(&request) {
        Ok(response) => {
            tracing::debug!(
                horizon_years = request.horizon_years,
                break_even_year = ?response.summary.break_even_year,
                "projection served"
            );
            json_response(StatusCode::OK, response)
        }
        Err(msg) => {
            tracing::warn!(error = %msg, "projection failed");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn break_even_handler_impl(payload: ProjectPayload) -> Response {
    let request = match request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            tracing::warn!(error = %msg, "rejected break-even request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match build_break_even_response(&request) {
        Ok(response) => {
            tracing::debug!(
                solved_rent = ?response.solved_rent,
                iterations = response.iterations.len(),
                "break-even rent served"
            );
            json_response(StatusCode::OK, response)
        }
        Err(msg) => {
            tracing::warn!(error = %msg, "break-even solve failed");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
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
fn request_from_json(json: &str) -> Result<ProjectRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    request_from_payload(payload)
}

fn request_from_payload(payload: ProjectPayload) -> Result<ProjectRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.home_value {
        cli.home_value = v;
    }
    if let Some(v) = payload.down_payment_percent {
        cli.down_payment_percent = v;
    }
    if let Some(v) = payload.hoa {
        cli.hoa = v;
    }
    if let Some(v) = payload.interest_percent {
        cli.interest_percent = v;
    }
    if let Some(v) = payload.term_years {
        cli.term_years = v;
    }
    if let Some(v) = payload.property_tax_percent {
        cli.property_tax_percent = v;
    }
    if let Some(v) = payload.insurance {
        cli.insurance = v;
    }
    if let Some(v) = payload.start_date {
        cli.start_date = v;
    }
    if let Some(v) = payload.appreciation_percent {
        cli.appreciation_percent = v;
    }
    if let Some(v) = payload.appreciation_convention {
        cli.appreciation_convention = v.into();
    }
    if let Some(v) = payload.selling_fee_percent {
        cli.selling_fee_percent = v;
    }
    if let Some(v) = payload.rent {
        cli.rent = v;
    }
    if let Some(v) = payload.stock_growth_percent {
        cli.stock_growth_percent = v;
    }
    if let Some(v) = payload.plot_years {
        cli.plot_years = v;
    }
    if let Some(v) = payload.include_monthly {
        cli.include_monthly = v;
    }
    if let Some(v) = payload.rent_min {
        cli.rent_min = v;
    }
    if let Some(v) = payload.rent_max {
        cli.rent_max = v;
    }
    if let Some(v) = payload.tolerance {
        cli.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        cli.max_iterations = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        home_value: 1_500_000.0,
        down_payment_percent: 20.0,
        hoa: 0.0,
        interest_percent: 2.9,
        term_years: 30,
        property_tax_percent: 1.25,
        insurance: 100.0,
        start_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
        appreciation_percent: 5.0,
        appreciation_convention: CliAppreciationConvention::StartOfYear,
        selling_fee_percent: 6.0,
        rent: 4_000.0,
        stock_growth_percent: 10.0,
        plot_years: 15,
        include_monthly: false,
        break_even: false,
        rent_min: 0.0,
        rent_max: 20_000.0,
        tolerance: 0.01,
        max_iterations: 60,
    }
}

fn build_project_response(request: &ProjectRequest) -> Result<ProjectResponse, String> {
    let projection = project(&request.loan, &request.market, request.horizon_years)
        .map_err(|e| e.to_string())?;
    Ok(project_response(
        projection,
        request.market.appreciation_convention,
        request.include_monthly,
    ))
}

fn project_response(
    projection: Projection,
    appreciation_convention: AppreciationConvention,
    include_monthly: bool,
) -> ProjectResponse {
    ProjectResponse {
        appreciation_convention,
        summary: projection.summary,
        comparison: projection.comparison,
        yearly_buy: projection.buy,
        yearly_rent: projection.rent,
        monthly: include_monthly.then_some(projection.ledger),
    }
}

fn build_break_even_response(request: &ProjectRequest) -> Result<BreakEvenResponse, String> {
    let result = solve_break_even_rent(&request.loan, &request.market, request.break_even)
        .map_err(|e| e.to_string())?;
    Ok(break_even_response(result))
}

fn break_even_response(result: BreakEvenResult) -> BreakEvenResponse {
    BreakEvenResponse {
        horizon_years: result.horizon_years,
        rent_min: result.search_min,
        rent_max: result.search_max,
        tolerance: result.tolerance,
        max_iterations: result.max_iterations,
        buy_net: result.buy_net,
        solved_rent: result.solved_rent,
        advantage_at_solution: result.advantage_at_solution,
        converged: result.converged,
        feasible: result.feasible,
        message: result.message,
        iterations: result
            .iterations
            .into_iter()
            .map(|it| BreakEvenIterationResponse {
                iteration: it.iteration,
                lower_bound: it.lower_bound,
                upper_bound: it.upper_bound,
                candidate_rent: it.candidate_rent,
                advantage: it.advantage,
            })
            .collect(),
    }
}
