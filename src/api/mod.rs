use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    AssetClass, DeploymentSchedule, InflationInputs, ProjectionInputs, ProjectionProfile,
    markdown_table, project_inflation, run_projection,
};

const MAX_HORIZON_YEARS: u32 = 100;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliProfile {
    Standard,
    RealEstate,
}

impl From<CliProfile> for ProjectionProfile {
    fn from(value: CliProfile) -> Self {
        match value {
            CliProfile::Standard => ProjectionProfile::Standard,
            CliProfile::RealEstate => ProjectionProfile::RealEstate,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiProfile {
    Standard,
    #[serde(alias = "realEstate", alias = "real_estate")]
    RealEstate,
}

impl From<ApiProfile> for CliProfile {
    fn from(value: ApiProfile) -> Self {
        match value {
            ApiProfile::Standard => CliProfile::Standard,
            ApiProfile::RealEstate => CliProfile::RealEstate,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "allocation",
    about = "Month-by-month portfolio projection with phased deployment of a starting lump sum"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project the portfolio month by month and print the trajectory
    Project(ProjectArgs),
    /// Amount needed to keep today's purchasing power
    Inflation(InflationArgs),
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
struct ProjectArgs {
    #[arg(long, help = "First simulated date (YYYY-MM-DD), defaults to today")]
    start_date: Option<NaiveDate>,
    #[arg(long, default_value_t = 500_000.0)]
    starting_cash: f64,
    #[arg(long, default_value_t = 2_000.0)]
    monthly_deposit: f64,
    #[arg(
        long = "deposit",
        value_name = "CLASS=PCT",
        value_parser = parse_class_percentage,
        help = "Share of the monthly deposit per asset class; must add up to 100"
    )]
    deposits: Vec<(AssetClass, f64)>,
    #[arg(
        long = "tranche",
        value_name = "CLASS=PCT",
        value_parser = parse_class_percentage,
        help = "Percent of the starting cash deployed up front, in order"
    )]
    tranches: Vec<(AssetClass, f64)>,
    #[arg(
        long = "monthly-deployment",
        value_name = "CLASS=PCT",
        value_parser = parse_class_percentage,
        help = "Percent of the starting cash deployed each month until it is drained"
    )]
    monthly_deployment: Vec<(AssetClass, f64)>,
    #[arg(
        long = "rate",
        value_name = "CLASS=PCT",
        value_parser = parse_class_percentage,
        help = "Override the expected annual return of an asset class, in percent"
    )]
    rates: Vec<(AssetClass, f64)>,
    #[arg(long, value_enum, default_value_t = CliProfile::Standard)]
    profile: CliProfile,
    #[arg(
        long,
        help = "Stop monthly deployment once the starting cash is drained; defaults per profile"
    )]
    gated: Option<bool>,
    #[arg(long, default_value_t = 25, help = "Projection horizon in years")]
    years: u32,
    #[arg(long = "checkpoint-year", help = "Report the allocation after this many years")]
    checkpoint_years: Vec<u32>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
struct InflationArgs {
    #[arg(long, default_value_t = 2.0, help = "Expected annual inflation in percent")]
    inflation_rate: f64,
    #[arg(long, default_value_t = 500_000.0)]
    initial_amount: f64,
    #[arg(long, default_value_t = 2_000.0)]
    monthly_deposit: f64,
    #[arg(long, default_value_t = 25)]
    years: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    start_date: Option<NaiveDate>,
    starting_cash: Option<f64>,
    monthly_deposit: Option<f64>,
    deposits: Option<String>,
    tranches: Option<String>,
    monthly_deployment: Option<String>,
    rates: Option<String>,
    profile: Option<ApiProfile>,
    gated: Option<bool>,
    years: Option<u32>,
    checkpoint_years: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InflationPayload {
    inflation_rate: Option<f64>,
    initial_amount: Option<f64>,
    monthly_deposit: Option<f64>,
    years: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    match cli.command {
        Command::Project(args) => {
            let format = args.format;
            let inputs = build_inputs(args)?;
            let result = run_projection(&inputs).map_err(|e| e.to_string())?;
            for checkpoint in &result.checkpoints {
                info!(
                    kind = ?checkpoint.kind,
                    date = %checkpoint.date,
                    total = checkpoint.total_worth,
                    "checkpoint"
                );
            }
            match format {
                OutputFormat::Markdown => print!("{}", markdown_table(&result.rows)),
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&result)
                        .map_err(|e| format!("Failed to serialize projection: {e}"))?;
                    println!("{json}");
                }
            }
        }
        Command::Inflation(args) => {
            let inputs = build_inflation_inputs(args)?;
            println!("{}", project_inflation(&inputs).summary());
        }
        Command::Serve { port } => {
            run_http_server(port)
                .await
                .map_err(|e| format!("Server error: {e}"))?;
        }
    }
    Ok(())
}

fn parse_class_percentage(raw: &str) -> Result<(AssetClass, f64), String> {
    let (class, percent) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CLASS=PCT, got '{raw}'"))?;
    let class = class.parse::<AssetClass>()?;
    let percent = percent
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid percentage in '{raw}': {e}"))?;
    Ok((class, percent))
}

fn parse_class_percentages(raw: &str) -> Result<Vec<(AssetClass, f64)>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_class_percentage)
        .collect()
}

fn parse_years(raw: &str) -> Result<Vec<u32>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map_err(|e| format!("invalid checkpoint year '{part}': {e}"))
        })
        .collect()
}

fn validate_percentages(name: &str, entries: &[(AssetClass, f64)]) -> Result<(), String> {
    for (class, percent) in entries {
        if !percent.is_finite() || !(0.0..=100.0).contains(percent) {
            return Err(format!(
                "{name} for {class} must be between 0 and 100, got {percent}"
            ));
        }
    }
    Ok(())
}

fn build_inputs(args: ProjectArgs) -> Result<ProjectionInputs, String> {
    if !args.starting_cash.is_finite() || args.starting_cash < 0.0 {
        return Err("--starting-cash must be >= 0".to_string());
    }

    if !args.monthly_deposit.is_finite() || args.monthly_deposit < 0.0 {
        return Err("--monthly-deposit must be >= 0".to_string());
    }

    if args.years == 0 || args.years > MAX_HORIZON_YEARS {
        return Err(format!("--years must be between 1 and {MAX_HORIZON_YEARS}"));
    }

    if let Some(year) = args
        .checkpoint_years
        .iter()
        .find(|y| **y == 0 || **y > args.years)
    {
        return Err(format!(
            "--checkpoint-year {year} must be between 1 and --years"
        ));
    }

    validate_percentages("--deposit", &args.deposits)?;
    validate_percentages("--tranche", &args.tranches)?;
    validate_percentages("--monthly-deployment", &args.monthly_deployment)?;

    for (class, rate) in &args.rates {
        if !rate.is_finite() || *rate <= -100.0 {
            return Err(format!("--rate for {class} must be > -100"));
        }
    }

    let profile = ProjectionProfile::from(args.profile);
    let mut rates = profile.rate_table();
    for (class, rate) in &args.rates {
        rates.set_rate(*class, *rate);
    }

    let default_schedule = profile.deployment_schedule();
    let schedule = DeploymentSchedule {
        monthly: if args.monthly_deployment.is_empty() {
            default_schedule.monthly
        } else {
            args.monthly_deployment
        },
        gated: args.gated.unwrap_or(default_schedule.gated),
    };

    Ok(ProjectionInputs {
        starting_date: args
            .start_date
            .unwrap_or_else(|| Local::now().date_naive()),
        starting_cash: args.starting_cash,
        monthly_deposit: args.monthly_deposit,
        deposit_plan: if args.deposits.is_empty() {
            profile.deposit_plan()
        } else {
            args.deposits
        },
        rates,
        upfront_tranches: if args.tranches.is_empty() {
            profile.upfront_tranches()
        } else {
            args.tranches
        },
        schedule,
        horizon_years: args.years,
        checkpoint_years: if args.checkpoint_years.is_empty() {
            profile.checkpoint_years()
        } else {
            args.checkpoint_years
        },
    })
}

fn build_inflation_inputs(args: InflationArgs) -> Result<InflationInputs, String> {
    if !args.inflation_rate.is_finite() || args.inflation_rate <= -100.0 {
        return Err("--inflation-rate must be > -100".to_string());
    }

    if !args.initial_amount.is_finite() || args.initial_amount < 0.0 {
        return Err("--initial-amount must be >= 0".to_string());
    }

    if !args.monthly_deposit.is_finite() || args.monthly_deposit < 0.0 {
        return Err("--monthly-deposit must be >= 0".to_string());
    }

    if args.years > MAX_HORIZON_YEARS {
        return Err(format!("--years must be <= {MAX_HORIZON_YEARS}"));
    }

    Ok(InflationInputs {
        annual_inflation_percent: args.inflation_rate,
        initial_amount: args.initial_amount,
        monthly_deposit: args.monthly_deposit,
        years: args.years,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "projection HTTP API listening");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/inflation",
            get(inflation_get_handler).post(inflation_post_handler),
        )
        .fallback(not_found_handler)
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

async fn inflation_get_handler(Query(payload): Query<InflationPayload>) -> Response {
    inflation_handler_impl(payload)
}

async fn inflation_post_handler(Json(payload): Json<InflationPayload>) -> Response {
    inflation_handler_impl(payload)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let inputs = match project_args_from_payload(payload).and_then(build_inputs) {
        Ok(inputs) => inputs,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match run_projection(&inputs) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn inflation_handler_impl(payload: InflationPayload) -> Response {
    match build_inflation_inputs(inflation_args_from_payload(payload)) {
        Ok(inputs) => json_response(StatusCode::OK, project_inflation(&inputs)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
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
fn project_args_from_json(json: &str) -> Result<ProjectArgs, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    project_args_from_payload(payload)
}

fn project_args_from_payload(payload: ProjectPayload) -> Result<ProjectArgs, String> {
    let mut args = default_project_args();

    if let Some(v) = payload.start_date {
        args.start_date = Some(v);
    }
    if let Some(v) = payload.starting_cash {
        args.starting_cash = v;
    }
    if let Some(v) = payload.monthly_deposit {
        args.monthly_deposit = v;
    }
    if let Some(v) = payload.deposits {
        args.deposits = parse_class_percentages(&v)?;
    }
    if let Some(v) = payload.tranches {
        args.tranches = parse_class_percentages(&v)?;
    }
    if let Some(v) = payload.monthly_deployment {
        args.monthly_deployment = parse_class_percentages(&v)?;
    }
    if let Some(v) = payload.rates {
        args.rates = parse_class_percentages(&v)?;
    }
    if let Some(v) = payload.profile {
        args.profile = v.into();
    }
    if let Some(v) = payload.gated {
        args.gated = Some(v);
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.checkpoint_years {
        args.checkpoint_years = parse_years(&v)?;
    }

    Ok(args)
}

fn inflation_args_from_payload(payload: InflationPayload) -> InflationArgs {
    let mut args = default_inflation_args();

    if let Some(v) = payload.inflation_rate {
        args.inflation_rate = v;
    }
    if let Some(v) = payload.initial_amount {
        args.initial_amount = v;
    }
    if let Some(v) = payload.monthly_deposit {
        args.monthly_deposit = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }

    args
}

fn default_project_args() -> ProjectArgs {
    ProjectArgs {
        start_date: None,
        starting_cash: 500_000.0,
        monthly_deposit: 2_000.0,
        deposits: Vec::new(),
        tranches: Vec::new(),
        monthly_deployment: Vec::new(),
        rates: Vec::new(),
        profile: CliProfile::Standard,
        gated: None,
        years: 25,
        checkpoint_years: Vec::new(),
        format: OutputFormat::Json,
    }
}

fn default_inflation_args() -> InflationArgs {
    InflationArgs {
        inflation_rate: 2.0,
        initial_amount: 500_000.0,
        monthly_deposit: 2_000.0,
        years: 25,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CheckpointKind, PlanError};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> ProjectArgs {
        let mut args = default_project_args();
        args.start_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        args
    }

    #[test]
    fn cli_parses_repeated_class_percentages() {
        let cli = Cli::try_parse_from([
            "allocation",
            "project",
            "--start-date",
            "2024-01-01",
            "--deposit",
            "etfs=60",
            "--deposit",
            "bonds=40",
            "--rate",
            "single_stocks=8.5",
            "--profile",
            "real-estate",
            "--checkpoint-year",
            "5",
        ])
        .expect("cli should parse");

        let Command::Project(args) = cli.command else {
            panic!("expected project subcommand");
        };
        assert_eq!(
            args.deposits,
            vec![(AssetClass::Etfs, 60.0), (AssetClass::Bonds, 40.0)]
        );
        assert_eq!(args.rates, vec![(AssetClass::SingleStocks, 8.5)]);
        assert_eq!(args.profile, CliProfile::RealEstate);
        assert_eq!(args.checkpoint_years, vec![5]);
        assert_eq!(args.format, OutputFormat::Markdown);
    }

    #[test]
    fn cli_rejects_unknown_asset_class() {
        let err = Cli::try_parse_from(["allocation", "project", "--deposit", "gold=100"])
            .expect_err("gold is not an asset class");
        assert!(err.to_string().contains("unknown asset class 'gold'"));
    }

    #[test]
    fn parse_class_percentage_requires_separator() {
        let err = parse_class_percentage("etfs50").expect_err("missing '='");
        assert!(err.contains("CLASS=PCT"));
        assert_eq!(
            parse_class_percentage(" Real_Estate = 5.8").expect("valid entry"),
            (AssetClass::RealEstate, 5.8)
        );
    }

    #[test]
    fn build_inputs_uses_profile_defaults() {
        let inputs = build_inputs(sample_args()).expect("valid inputs");

        assert_eq!(
            inputs.deposit_plan,
            vec![(AssetClass::Etfs, 50.0), (AssetClass::SingleStocks, 50.0)]
        );
        assert_eq!(
            inputs.upfront_tranches,
            vec![(AssetClass::Etfs, 33.0), (AssetClass::Bonds, 17.0)]
        );
        assert!(inputs.schedule.gated);
        assert_approx(inputs.schedule.monthly[0].1, 0.694);
        assert!(!inputs.rates.contains(AssetClass::RealEstate));
        assert_eq!(inputs.horizon_years, 25);
    }

    #[test]
    fn build_inputs_applies_rate_overrides_and_gating() {
        let mut args = sample_args();
        args.profile = CliProfile::RealEstate;
        args.rates = vec![(AssetClass::RealEstate, 3.0), (AssetClass::Cash, 1.0)];
        args.gated = Some(true);

        let inputs = build_inputs(args).expect("valid inputs");

        assert_eq!(inputs.rates.annual_rate(AssetClass::RealEstate), Some(3.0));
        assert_eq!(inputs.rates.annual_rate(AssetClass::Cash), Some(1.0));
        assert_eq!(inputs.rates.annual_rate(AssetClass::Etfs), Some(7.0));
        assert!(inputs.schedule.gated);
        assert_approx(inputs.schedule.monthly[0].1, 0.92);
        assert_eq!(inputs.checkpoint_years, vec![5, 25]);
    }

    #[test]
    fn build_inputs_rejects_negative_starting_cash() {
        let mut args = sample_args();
        args.starting_cash = -1.0;

        let err = build_inputs(args).expect_err("must reject negative cash");
        assert!(err.contains("--starting-cash"));
    }

    #[test]
    fn build_inputs_rejects_zero_years() {
        let mut args = sample_args();
        args.years = 0;

        let err = build_inputs(args).expect_err("must reject empty horizon");
        assert!(err.contains("--years"));
    }

    #[test]
    fn build_inputs_rejects_checkpoint_past_horizon() {
        let mut args = sample_args();
        args.years = 10;
        args.checkpoint_years = vec![5, 11];

        let err = build_inputs(args).expect_err("must reject checkpoint past horizon");
        assert!(err.contains("--checkpoint-year 11"));
    }

    #[test]
    fn build_inputs_rejects_tranche_over_100_percent() {
        let mut args = sample_args();
        args.tranches = vec![(AssetClass::Etfs, 120.0)];

        let err = build_inputs(args).expect_err("must reject 120% tranche");
        assert!(err.contains("--tranche for etfs"));
    }

    #[test]
    fn deposit_plan_sum_is_checked_by_the_projection() {
        let mut args = sample_args();
        args.deposits = vec![(AssetClass::Etfs, 50.0), (AssetClass::SingleStocks, 49.0)];

        let inputs = build_inputs(args).expect("per-entry ranges are valid");
        let err = run_projection(&inputs).expect_err("plan sums to 99");
        assert_eq!(err, PlanError::AllocationPlanInvalid { total: 99.0 });
    }

    #[test]
    fn project_args_from_json_parses_web_keys() {
        let json = r#"{
          "startDate": "2030-06-15",
          "startingCash": 250000,
          "monthlyDeposit": 1500,
          "deposits": "etfs=70, bonds=30",
          "tranches": "etfs=50",
          "monthlyDeployment": "single-stocks=1",
          "rates": "bonds=3.5",
          "profile": "realEstate",
          "gated": false,
          "years": 10,
          "checkpointYears": "5,10"
        }"#;
        let args = project_args_from_json(json).expect("json should parse");

        assert_eq!(args.start_date, NaiveDate::from_ymd_opt(2030, 6, 15));
        assert_approx(args.starting_cash, 250_000.0);
        assert_approx(args.monthly_deposit, 1_500.0);
        assert_eq!(
            args.deposits,
            vec![(AssetClass::Etfs, 70.0), (AssetClass::Bonds, 30.0)]
        );
        assert_eq!(args.tranches, vec![(AssetClass::Etfs, 50.0)]);
        assert_eq!(args.monthly_deployment, vec![(AssetClass::SingleStocks, 1.0)]);
        assert_eq!(args.rates, vec![(AssetClass::Bonds, 3.5)]);
        assert_eq!(args.profile, CliProfile::RealEstate);
        assert_eq!(args.gated, Some(false));
        assert_eq!(args.years, 10);
        assert_eq!(args.checkpoint_years, vec![5, 10]);
    }

    #[test]
    fn project_args_from_json_reports_bad_entries() {
        let err = project_args_from_json(r#"{"deposits": "etfs=abc"}"#)
            .expect_err("percentage must be numeric");
        assert!(err.contains("invalid percentage"));

        let err = project_args_from_json(r#"{"checkpointYears": "five"}"#)
            .expect_err("checkpoint year must be numeric");
        assert!(err.contains("invalid checkpoint year"));
    }

    #[test]
    fn inflation_payload_overlays_defaults() {
        let args = inflation_args_from_payload(InflationPayload {
            inflation_rate: Some(3.0),
            years: Some(10),
            ..InflationPayload::default()
        });
        let inputs = build_inflation_inputs(args).expect("valid inputs");

        assert_approx(inputs.annual_inflation_percent, 3.0);
        assert_approx(inputs.initial_amount, 500_000.0);
        assert_eq!(inputs.years, 10);
    }

    #[test]
    fn build_inflation_inputs_rejects_negative_deposit() {
        let mut args = default_inflation_args();
        args.monthly_deposit = -5.0;

        let err = build_inflation_inputs(args).expect_err("must reject negative deposit");
        assert!(err.contains("--monthly-deposit"));
    }

    #[test]
    fn projection_response_serialization_contains_expected_fields() {
        let mut args = sample_args();
        args.years = 4;
        args.checkpoint_years = vec![4];

        let inputs = build_inputs(args).expect("valid inputs");
        let result = run_projection(&inputs).expect("valid projection");
        assert!(matches!(
            result.checkpoints.last().map(|c| &c.kind),
            Some(CheckpointKind::HorizonYear { years: 4 })
        ));

        let json = serde_json::to_string(&result).expect("response should serialize");
        assert!(json.contains("\"deploymentCompletedOn\":\"2027-02-01\""));
        assert!(json.contains("\"monthsSimulated\":48"));
        assert!(json.contains("\"finalTotalWorth\""));
        assert!(json.contains("\"singleStocks\""));
        assert!(json.contains("\"kind\":\"deploymentComplete\""));
        assert!(json.contains("\"kind\":\"horizonYear\",\"years\":4"));
        assert!(json.contains("\"single-stocks\""));
        assert!(!json.contains("\"realEstate\""));
    }

    #[test]
    fn inflation_response_serialization_uses_camel_case() {
        let inputs = build_inflation_inputs(default_inflation_args()).expect("valid inputs");
        let json = serde_json::to_string(&project_inflation(&inputs)).expect("serializes");

        assert!(json.contains("\"requiredAmountRounded\":1597333"));
        assert!(json.contains("\"annualInflationPercent\":2.0"));
    }

    async fn send(
        request: axum::http::Request<axum::body::Body>,
    ) -> (StatusCode, Option<String>, serde_json::Value) {
        use tower::ServiceExt;

        let response = router().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let cache_control = response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        let body = serde_json::from_slice(&bytes).expect("body is JSON");
        (status, cache_control, body)
    }

    fn get_request(uri: &str) -> axum::http::Request<axum::body::Body> {
        axum::http::Request::builder()
            .uri(uri)
            .body(axum::body::Body::empty())
            .expect("valid request")
    }

    #[tokio::test]
    async fn unknown_route_returns_not_found() {
        let (status, cache_control, body) = send(get_request("/api/nope")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(cache_control.as_deref(), Some("no-store"));
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn project_rejects_negative_starting_cash_with_bad_request() {
        let (status, cache_control, body) =
            send(get_request("/api/project?startingCash=-1")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(cache_control.as_deref(), Some("no-store"));
        assert_eq!(body["error"], "--starting-cash must be >= 0");
    }

    #[tokio::test]
    async fn project_rejects_incomplete_deposit_plan_with_bad_request() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/project")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(
                r#"{"startDate":"2024-01-01","deposits":"etfs=50,bonds=49"}"#,
            ))
            .expect("valid request");
        let (status, _, body) = send(request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["error"].as_str().expect("error message");
        assert!(message.contains("only 99%"), "unexpected message: {message}");
    }

    #[tokio::test]
    async fn project_returns_rows_and_checkpoints() {
        let (status, cache_control, body) =
            send(get_request("/api/project?startDate=2024-01-01&years=1")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache_control.as_deref(), Some("no-store"));
        // Deployment runs past a one-year horizon.
        assert_eq!(body["rows"].as_array().map(Vec::len), Some(38));
        assert_eq!(body["checkpoints"][0]["kind"], "deploymentComplete");
        assert_eq!(body["checkpoints"][0]["date"], "2027-02-01");
    }

    #[tokio::test]
    async fn inflation_endpoint_serves_defaults() {
        let (status, cache_control, body) = send(get_request("/api/inflation")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache_control.as_deref(), Some("no-store"));
        assert_eq!(body["requiredAmountRounded"], 1_597_333);
    }
}
