mod error;

pub use error::{AppError, AppResult};

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Json, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cli::{AnalysisArgs, AnalyzeArgs, build_assumptions, build_inputs};
use crate::config::ServerConfig;
use crate::core::{
    Assumptions, Comparison, LookupTables, ReportColumn, ReportRow, SummaryRow, run_comparison,
    tables::DEFAULT_DATA_DIR,
};
use crate::export::{SPREADSHEET_CONTENT_TYPE, spreadsheet_file_name, spreadsheet_path, write_spreadsheet};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

/// Shared, read-only state for every request.
#[derive(Debug)]
pub struct AppState {
    pub assumptions: Assumptions,
    pub tables: LookupTables,
    pub output_dir: PathBuf,
}

/// Query/JSON parameters of `/analyze`. Any field left out takes the
/// companion page's default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalyzePayload {
    session_id: Option<String>,
    birthdate: Option<String>,
    age_model1: Option<u32>,
    age_model2: Option<u32>,
    fra_benefit: Option<f64>,
    inflation_rate_input: Option<f64>,
    investment_return_input: Option<f64>,
    filing_status: Option<String>,
    initial_401k_input: Option<f64>,
    other_non_retirement_savings_input: Option<f64>,
    target_income_input: Option<f64>,
    non_retirement_gain_percentage_input: Option<f64>,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    session_id: String,
    spreadsheet: String,
    download_url: String,
    #[serde(rename = "Model1")]
    model1: Vec<Map<String, Value>>,
    #[serde(rename = "Model2")]
    model2: Vec<Map<String, Value>>,
    #[serde(rename = "Summary")]
    summary: Vec<SummaryRow>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/health", get(health_handler))
        .route(
            "/analyze",
            get(analyze_get_handler).post(analyze_post_handler),
        )
        .route("/download/:session_id", get(download_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_http_server(config: &ServerConfig, state: AppState) -> std::io::Result<()> {
    let app = router(Arc::new(state));
    let listener = TcpListener::bind(config.bind_addr()).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, output_dir = %config.output_dir.display(), "claiming-strategy API listening");
    tracing::info!("local access: http://127.0.0.1:{}/", addr.port());

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    AppError::NotFound("no such route".to_string()).into_response()
}

async fn analyze_get_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Query<AnalyzePayload>, QueryRejection>,
) -> AppResult<Response> {
    let Query(payload) = payload?;
    analyze_handler_impl(state, payload).await
}

async fn analyze_post_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzePayload>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) = payload?;
    analyze_handler_impl(state, payload).await
}

async fn analyze_handler_impl(state: Arc<AppState>, payload: AnalyzePayload) -> AppResult<Response> {
    let args = analysis_args_from_payload(payload);
    let inputs = build_inputs(args, &state.assumptions).map_err(AppError::BadRequest)?;
    tracing::debug!(
        session_id = %inputs.session_id,
        current_age = inputs.current_age,
        claim_ages = ?inputs.claim_ages,
        "running comparison"
    );

    let task_state = Arc::clone(&state);
    let (session_id, comparison) = tokio::task::spawn_blocking(move || {
        let comparison = run_comparison(&inputs, &task_state.assumptions, &task_state.tables);
        write_spreadsheet(&comparison, &task_state.output_dir, &inputs.session_id)
            .map(|_| (inputs.session_id, comparison))
    })
    .await
    .map_err(|e| AppError::Internal(format!("analysis task failed: {e}")))??;

    let response = build_analyze_response(&session_id, &comparison)?;
    Ok(json_response(StatusCode::OK, response))
}

async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> AppResult<Response> {
    let path = spreadsheet_path(&state.output_dir, &session_id)?;
    let file_name = spreadsheet_file_name(&session_id)?;
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("no spreadsheet for session {session_id}")));
        }
        Err(e) => return Err(AppError::Internal(format!("failed to read {}: {e}", path.display()))),
    };

    Ok(with_cache_control((
        [
            (header::CONTENT_TYPE, SPREADSHEET_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

#[cfg(test)]
fn analysis_args_from_json(json: &str) -> Result<AnalysisArgs, String> {
    let payload = serde_json::from_str::<AnalyzePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    Ok(analysis_args_from_payload(payload))
}

fn analysis_args_from_payload(payload: AnalyzePayload) -> AnalysisArgs {
    let mut args = AnalysisArgs::default();

    if payload.session_id.is_some() {
        args.session_id = payload.session_id;
    }
    if let Some(v) = payload.birthdate {
        args.birthdate = v;
    }
    if let Some(v) = payload.age_model1 {
        args.age_model1 = v;
    }
    if let Some(v) = payload.age_model2 {
        args.age_model2 = v;
    }
    if let Some(v) = payload.fra_benefit {
        args.fra_benefit = v;
    }
    if let Some(v) = payload.inflation_rate_input {
        args.inflation_rate = v;
    }
    if let Some(v) = payload.investment_return_input {
        args.investment_return = v;
    }
    if let Some(v) = payload.filing_status {
        args.filing_status = v;
    }
    if let Some(v) = payload.initial_401k_input {
        args.initial_401k = v;
    }
    if let Some(v) = payload.other_non_retirement_savings_input {
        args.other_non_retirement_savings = v;
    }
    if let Some(v) = payload.target_income_input {
        args.target_income = v;
    }
    if let Some(v) = payload.non_retirement_gain_percentage_input {
        args.non_retirement_gain_percentage = v;
    }

    args
}

/// A master-table row keyed by column label, ages and years as integers.
fn row_record(row: &ReportRow, assumptions: &Assumptions) -> Map<String, Value> {
    ReportColumn::ALL
        .iter()
        .map(|column| {
            let value = row.value(*column);
            let json = if column.is_integer() {
                Value::from(value as i64)
            } else {
                Value::from(value)
            };
            (column.label(assumptions), json)
        })
        .collect()
}

fn build_analyze_response(session_id: &str, comparison: &Comparison) -> AppResult<AnalyzeResponse> {
    let [first, second] = &comparison.strategies;
    let final_record = |rows: &[ReportRow]| {
        rows.last()
            .map(|row| row_record(row, &comparison.assumptions))
            .into_iter()
            .collect::<Vec<_>>()
    };

    Ok(AnalyzeResponse {
        session_id: session_id.to_string(),
        spreadsheet: spreadsheet_file_name(session_id)?,
        download_url: format!("/download/{session_id}"),
        model1: final_record(&first.rows),
        model2: final_record(&second.rows),
        summary: vec![first.summary, second.summary],
    })
}

/// One-shot analysis for the command line: writes the spreadsheet and returns
/// the same JSON document `/analyze` would.
pub fn analyze_to_json(args: AnalyzeArgs) -> Result<String, String> {
    let assumptions = build_assumptions(&args.assumptions)?;
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let output_dir = args.output_dir.unwrap_or_else(|| PathBuf::from("."));
    let tables = LookupTables::load(&data_dir).map_err(|e| e.to_string())?;

    let inputs = build_inputs(args.analysis, &assumptions)?;
    let comparison = run_comparison(&inputs, &assumptions, &tables);
    let path =
        write_spreadsheet(&comparison, &output_dir, &inputs.session_id).map_err(|e| e.to_string())?;
    tracing::info!(path = %path.display(), "analysis complete");

    let response =
        build_analyze_response(&inputs.session_id, &comparison).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&response).map_err(|e| format!("failed to encode summary: {e}"))
}
