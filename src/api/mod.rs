use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::core::{Assumptions, RequiredInputs, Verdict, YearSnapshot, find_breakevens, run_model};
use crate::export::{self, ExportError};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
    Csv,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    home_price: Option<f64>,
    monthly_rent: Option<f64>,
    mortgage_rate: Option<f64>,
    down_pct: Option<f64>,
    years: Option<u32>,

    term_years: Option<u32>,
    home_appreciation: Option<f64>,
    rent_inflation: Option<f64>,
    cost_inflation: Option<f64>,
    invest_return: Option<f64>,

    prop_tax_rate: Option<f64>,
    home_ins_rate: Option<f64>,
    pmi_rate: Option<f64>,
    maint_rate: Option<f64>,
    capex_rate: Option<f64>,

    buy_close_pct: Option<f64>,
    sell_close_pct: Option<f64>,
    util_buy: Option<f64>,
    util_rent: Option<f64>,
    renters_ins: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "buyvsrent",
    about = "Buy vs rent comparison: mortgage amortization against renting and investing the difference"
)]
struct Cli {
    #[arg(long)]
    home_price: f64,
    #[arg(long, help = "Monthly rent for a comparable home")]
    monthly_rent: f64,
    #[arg(long, help = "Mortgage rate in percent, e.g. 6.75")]
    mortgage_rate: f64,
    #[arg(long, help = "Down payment as percent of the purchase price, e.g. 10")]
    down_pct: f64,
    #[arg(long, help = "How many years you expect to stay")]
    years: u32,
    #[arg(long, default_value_t = 30, help = "Mortgage term in years")]
    term_years: u32,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Expected annual home appreciation in percent"
    )]
    home_appreciation: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Expected annual rent inflation in percent"
    )]
    rent_inflation: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Annual inflation for utilities and insurance in percent"
    )]
    cost_inflation: f64,
    #[arg(
        long,
        default_value_t = 7.0,
        help = "Expected annual return on invested cash in percent"
    )]
    invest_return: f64,
    #[arg(
        long,
        default_value_t = 1.1,
        help = "Annual property tax as percent of home value"
    )]
    prop_tax_rate: f64,
    #[arg(
        long,
        default_value_t = 0.35,
        help = "Annual homeowners insurance as percent of home value"
    )]
    home_ins_rate: f64,
    #[arg(
        long,
        default_value_t = 0.7,
        help = "Annual PMI as percent of the original loan, charged until 80% LTV"
    )]
    pmi_rate: f64,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Annual maintenance as percent of home value"
    )]
    maint_rate: f64,
    #[arg(
        long,
        default_value_t = 0.5,
        help = "Annual capital expenditure reserve as percent of home value"
    )]
    capex_rate: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Buyer closing costs as percent of the purchase price"
    )]
    buy_close_pct: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Selling costs as percent of the final home value"
    )]
    sell_close_pct: f64,
    #[arg(
        long,
        default_value_t = 250.0,
        help = "Extra monthly utilities paid as an owner"
    )]
    util_buy: f64,
    #[arg(
        long,
        default_value_t = 250.0,
        help = "Monthly utilities paid as a renter"
    )]
    util_rent: f64,
    #[arg(long, default_value_t = 15.0, help = "Monthly renters insurance")]
    renters_ins: f64,
    #[arg(
        long,
        value_enum,
        default_value_t = OutputFormat::Summary,
        help = "Output format: summary, json, or csv"
    )]
    output: OutputFormat,
}

/// A single rejected input, keyed by the camelCase field the API accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

impl Violation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every validation failure from one submission, reported together.
#[derive(Debug, Error)]
#[error("{}", .violations.iter().map(|v| v.message.as_str()).collect::<Vec<_>>().join(" "))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    recommendation: Verdict,
    final_difference: f64,
    years: u32,
    breakevens: Vec<f64>,
    rows: Vec<YearSnapshot>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    errors: Vec<Violation>,
}

/// Runs every input check and returns the full list of failures.
///
/// Rates here are fractions, not percents; the front ends divide by 100
/// before calling this.
pub fn validate(required: &RequiredInputs, assumptions: &Assumptions) -> Vec<Violation> {
    let mut violations = Vec::new();

    if !required.home_price.is_finite() || required.home_price <= 0.0 {
        violations.push(Violation::new("homePrice", "Home price must be > 0."));
    }
    if !required.monthly_rent.is_finite() || required.monthly_rent < 0.0 {
        violations.push(Violation::new("monthlyRent", "Monthly rent must be >= 0."));
    }
    if !required.mortgage_rate.is_finite() || required.mortgage_rate < 0.0 {
        violations.push(Violation::new(
            "mortgageRate",
            "Mortgage rate must be >= 0.",
        ));
    }
    if !(0.0..=1.0).contains(&required.down_pct) {
        violations.push(Violation::new(
            "downPct",
            "Down payment % must be between 0 and 100.",
        ));
    }
    if !(1..=50).contains(&required.years) {
        violations.push(Violation::new(
            "years",
            "Years lived must be between 1 and 50.",
        ));
    }
    if !(5..=40).contains(&assumptions.term_years) {
        violations.push(Violation::new(
            "termYears",
            "Mortgage term must be between 5 and 40 years.",
        ));
    }
    if !(0.0..=0.10).contains(&assumptions.prop_tax_rate) {
        violations.push(Violation::new(
            "propTaxRate",
            "Property tax rate must be between 0 and 10.",
        ));
    }
    if !(0.0..=0.20).contains(&assumptions.sell_close_pct) {
        violations.push(Violation::new(
            "sellClosePct",
            "Sale closing costs must be between 0 and 20.",
        ));
    }

    violations
}

fn build_inputs(cli: Cli) -> Result<(RequiredInputs, Assumptions), ValidationError> {
    let required = RequiredInputs {
        home_price: cli.home_price,
        monthly_rent: cli.monthly_rent,
        mortgage_rate: cli.mortgage_rate / 100.0,
        down_pct: cli.down_pct / 100.0,
        years: cli.years,
    };
    let assumptions = Assumptions {
        term_years: cli.term_years,
        home_appreciation: cli.home_appreciation / 100.0,
        rent_inflation: cli.rent_inflation / 100.0,
        cost_inflation: cli.cost_inflation / 100.0,
        invest_return: cli.invest_return / 100.0,
        prop_tax_rate: cli.prop_tax_rate / 100.0,
        home_ins_rate: cli.home_ins_rate / 100.0,
        pmi_rate: cli.pmi_rate / 100.0,
        maint_rate: cli.maint_rate / 100.0,
        capex_rate: cli.capex_rate / 100.0,
        buy_close_pct: cli.buy_close_pct / 100.0,
        sell_close_pct: cli.sell_close_pct / 100.0,
        util_buy: cli.util_buy,
        util_rent: cli.util_rent,
        renters_ins: cli.renters_ins,
    };

    let violations = validate(&required, &assumptions);
    if violations.is_empty() {
        Ok((required, assumptions))
    } else {
        Err(ValidationError { violations })
    }
}

/// Runs one comparison from command line flags and prints the chosen format.
pub fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();
    let output = cli.output;
    let (required, assumptions) = build_inputs(cli)?;

    let rows = run_model(&required, &assumptions);
    let breakevens = find_breakevens(&rows);

    match output {
        OutputFormat::Summary => print_summary(required.years, &rows, &breakevens),
        OutputFormat::Json => {
            let response = build_simulate_response(required.years, rows, breakevens);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Csv => print!("{}", export::write_csv(&rows)?),
    }

    Ok(())
}

fn print_summary(years: u32, rows: &[YearSnapshot], breakevens: &[f64]) {
    let last = rows[rows.len() - 1];

    match last.verdict {
        Verdict::Buy => println!(
            "Over {years} years, buying comes out ahead by {:.0}.",
            last.difference
        ),
        Verdict::Rent => println!(
            "Over {years} years, renting comes out ahead by {:.0}.",
            last.difference.abs()
        ),
        Verdict::Tie => println!("Over {years} years, buying and renting come out even."),
    }
    println!(
        "Buy net worth impact: {:.0} (equity {:.0}, out of pocket {:.0})",
        last.buy_net_worth_impact, last.buy_equity, last.buy_out_of_pocket
    );
    println!(
        "Rent net worth impact: {:.0} (equity {:.0}, out of pocket {:.0})",
        last.rent_net_worth_impact, last.rent_equity, last.rent_out_of_pocket
    );
    if breakevens.is_empty() {
        println!("Breakeven: the verdict never flips inside the horizon");
    } else {
        let points = breakevens
            .iter()
            .map(|year| format!("~year {year:.1}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Breakeven: {points}");
    }
}

/// Serves the JSON API until the process is stopped.
pub async fn run_http_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/simulate", get(simulate_get).post(simulate_post))
        .route(
            "/api/simulate.csv",
            get(simulate_csv_get).post(simulate_csv_post),
        )
        .fallback(not_found_handler);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("buy-vs-rent API listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn simulate_get(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_csv_get(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_csv_handler_impl(payload).await
}

async fn simulate_csv_post(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_csv_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let (required, assumptions) = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(err) => return validation_error_response(err),
    };

    let rows = run_model(&required, &assumptions);
    let breakevens = find_breakevens(&rows);
    debug!(
        "simulated {} years with {} breakeven crossings",
        required.years,
        breakevens.len()
    );
    json_response(
        StatusCode::OK,
        build_simulate_response(required.years, rows, breakevens),
    )
}

async fn simulate_csv_handler_impl(payload: SimulatePayload) -> Response {
    let (required, assumptions) = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(err) => return validation_error_response(err),
    };

    let rows = run_model(&required, &assumptions);
    match export::write_csv(&rows) {
        Ok(body) => csv_response(body),
        Err(err) => {
            error!("CSV export failed: {err}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to build the CSV export.",
            )
        }
    }
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found.")
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            errors: vec![Violation::new("request", msg)],
        },
    )
}

fn validation_error_response(err: ValidationError) -> Response {
    json_response(
        StatusCode::BAD_REQUEST,
        ErrorResponse {
            errors: err.violations,
        },
    )
}

fn csv_response(body: String) -> Response {
    with_cache_control((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"buy-vs-rent-results.csv\"",
            ),
        ],
        body,
    ))
}

#[cfg(test)]
fn inputs_from_json(json: &str) -> Result<(RequiredInputs, Assumptions), ValidationError> {
    let payload = serde_json::from_str::<SimulatePayload>(json).expect("test payload parses");
    inputs_from_payload(payload)
}

fn inputs_from_payload(
    payload: SimulatePayload,
) -> Result<(RequiredInputs, Assumptions), ValidationError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.home_price {
        cli.home_price = v;
    }
    if let Some(v) = payload.monthly_rent {
        cli.monthly_rent = v;
    }
    if let Some(v) = payload.mortgage_rate {
        cli.mortgage_rate = v;
    }
    if let Some(v) = payload.down_pct {
        cli.down_pct = v;
    }
    if let Some(v) = payload.years {
        cli.years = v;
    }

    if let Some(v) = payload.term_years {
        cli.term_years = v;
    }
    if let Some(v) = payload.home_appreciation {
        cli.home_appreciation = v;
    }
    if let Some(v) = payload.rent_inflation {
        cli.rent_inflation = v;
    }
    if let Some(v) = payload.cost_inflation {
        cli.cost_inflation = v;
    }
    if let Some(v) = payload.invest_return {
        cli.invest_return = v;
    }

    if let Some(v) = payload.prop_tax_rate {
        cli.prop_tax_rate = v;
    }
    if let Some(v) = payload.home_ins_rate {
        cli.home_ins_rate = v;
    }
    if let Some(v) = payload.pmi_rate {
        cli.pmi_rate = v;
    }
    if let Some(v) = payload.maint_rate {
        cli.maint_rate = v;
    }
    if let Some(v) = payload.capex_rate {
        cli.capex_rate = v;
    }

    if let Some(v) = payload.buy_close_pct {
        cli.buy_close_pct = v;
    }
    if let Some(v) = payload.sell_close_pct {
        cli.sell_close_pct = v;
    }
    if let Some(v) = payload.util_buy {
        cli.util_buy = v;
    }
    if let Some(v) = payload.util_rent {
        cli.util_rent = v;
    }
    if let Some(v) = payload.renters_ins {
        cli.renters_ins = v;
    }

    build_inputs(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        home_price: 450_000.0,
        monthly_rent: 2_600.0,
        mortgage_rate: 6.75,
        down_pct: 10.0,
        years: 10,
        term_years: 30,
        home_appreciation: 3.0,
        rent_inflation: 3.0,
        cost_inflation: 3.0,
        invest_return: 7.0,
        prop_tax_rate: 1.1,
        home_ins_rate: 0.35,
        pmi_rate: 0.7,
        maint_rate: 1.0,
        capex_rate: 0.5,
        buy_close_pct: 3.0,
        sell_close_pct: 6.0,
        util_buy: 250.0,
        util_rent: 250.0,
        renters_ins: 15.0,
        output: OutputFormat::Summary,
    }
}

fn build_simulate_response(
    years: u32,
    rows: Vec<YearSnapshot>,
    breakevens: Vec<f64>,
) -> SimulateResponse {
    let last = rows[rows.len() - 1];
    SimulateResponse {
        recommendation: last.verdict,
        final_difference: last.difference,
        years,
        breakevens,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_inputs_converts_percent_units() {
        let mut cli = sample_cli();
        cli.mortgage_rate = 6.75;
        cli.down_pct = 10.0;
        cli.prop_tax_rate = 1.1;
        cli.util_buy = 275.0;

        let (required, assumptions) = build_inputs(cli).expect("valid inputs");
        assert_approx(required.mortgage_rate, 0.0675);
        assert_approx(required.down_pct, 0.10);
        assert_approx(assumptions.prop_tax_rate, 0.011);
        assert_approx(assumptions.invest_return, 0.07);
        assert_approx(assumptions.util_buy, 275.0);
        assert_approx(assumptions.renters_ins, 15.0);
    }

    #[test]
    fn build_inputs_collects_every_violation() {
        let mut cli = sample_cli();
        cli.home_price = -1.0;
        cli.years = 0;
        cli.term_years = 50;
        cli.sell_close_pct = 25.0;

        let err = build_inputs(cli).expect_err("must reject bad inputs");
        let fields: Vec<&str> = err.violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, ["homePrice", "years", "termYears", "sellClosePct"]);
    }

    #[test]
    fn validate_rejects_non_finite_and_out_of_range_values() {
        let required = RequiredInputs {
            home_price: f64::NAN,
            monthly_rent: -1.0,
            mortgage_rate: -0.01,
            down_pct: 1.5,
            years: 10,
        };
        let assumptions = Assumptions {
            prop_tax_rate: 0.2,
            ..Assumptions::default()
        };

        let violations = validate(&required, &assumptions);
        let fields: Vec<&str> = violations.iter().map(|v| v.field).collect();
        assert_eq!(
            fields,
            ["homePrice", "monthlyRent", "mortgageRate", "downPct", "propTaxRate"]
        );
    }

    #[test]
    fn payload_overlay_maps_camel_case_keys() {
        let json = r#"{
          "homePrice": 500000,
          "monthlyRent": 2100,
          "mortgageRate": 5.5,
          "downPct": 20,
          "years": 8,
          "termYears": 15,
          "investReturn": 6,
          "sellClosePct": 8,
          "utilRent": 180
        }"#;
        let (required, assumptions) = inputs_from_json(json).expect("json should parse");

        assert_approx(required.home_price, 500_000.0);
        assert_approx(required.monthly_rent, 2_100.0);
        assert_approx(required.mortgage_rate, 0.055);
        assert_approx(required.down_pct, 0.20);
        assert_eq!(required.years, 8);
        assert_eq!(assumptions.term_years, 15);
        assert_approx(assumptions.invest_return, 0.06);
        assert_approx(assumptions.sell_close_pct, 0.08);
        assert_approx(assumptions.util_rent, 180.0);
        assert_approx(assumptions.util_buy, 250.0);
    }

    #[test]
    fn empty_payload_uses_the_api_defaults() {
        let (required, assumptions) = inputs_from_json("{}").expect("empty payload is valid");

        assert_approx(required.home_price, 450_000.0);
        assert_approx(required.monthly_rent, 2_600.0);
        assert_approx(required.mortgage_rate, 0.0675);
        assert_approx(required.down_pct, 0.10);
        assert_eq!(required.years, 10);
        assert_eq!(assumptions.term_years, 30);
        assert_approx(assumptions.home_appreciation, 0.03);
        assert_approx(assumptions.pmi_rate, 0.007);
        assert_approx(assumptions.renters_ins, 15.0);
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let (required, assumptions) = inputs_from_json("{}").expect("empty payload is valid");
        let rows = run_model(&required, &assumptions);
        let breakevens = find_breakevens(&rows);
        let response = build_simulate_response(required.years, rows, breakevens);

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"recommendation\""));
        assert!(json.contains("\"finalDifference\""));
        assert!(json.contains("\"breakevens\""));
        assert!(json.contains("\"rows\""));
        assert!(json.contains("\"buyNetWorthImpact\""));
        assert!(json.contains("\"years\":10"));
    }

    #[test]
    fn validation_error_display_joins_messages() {
        let err = ValidationError {
            violations: vec![
                Violation::new("homePrice", "Home price must be > 0."),
                Violation::new("years", "Years lived must be between 1 and 50."),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Home price must be > 0. Years lived must be between 1 and 50."
        );
    }

    #[test]
    fn default_inputs_produce_a_full_simulation() {
        let (required, assumptions) = build_inputs(sample_cli()).expect("defaults are valid");
        let rows = run_model(&required, &assumptions);

        assert_eq!(rows.len(), 11);
        assert_approx(rows[0].buy_out_of_pocket, 58_500.0);
        assert_approx(rows[0].buy_equity, 45_000.0);
    }
}
