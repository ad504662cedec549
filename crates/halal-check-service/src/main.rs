use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use halal_check_api::{
    EngineConfig, EvaluateRequest, HalalCheckApi, KnowledgeBaseReport, ModifiersResult,
    RecipeRequest, ResolveResult, API_CONTRACT_VERSION,
};
use halal_check_core::{EvaluationResult, RecipeEvaluation};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const SERVICE_CONTRACT_VERSION: &str = "service.v1";
const OPENAPI_YAML: &str = include_str!("../../../openapi/openapi.yaml");

#[derive(Debug, Clone)]
struct ServiceState {
    api: HalalCheckApi,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceEnvelope<T>
where
    T: Serialize,
{
    service_contract_version: &'static str,
    api_contract_version: &'static str,
    data: T,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceError {
    service_contract_version: &'static str,
    error: String,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    fingerprint: String,
    records: usize,
}

#[derive(Debug, Parser)]
#[command(name = "halal-check-service")]
#[command(about = "Local HTTP service for halal ingredient evaluation")]
struct Args {
    /// Knowledge Base file (.json, .yaml or .yml).
    #[arg(long, conflicts_with = "config", required_unless_present = "config")]
    kb: Option<PathBuf>,
    /// YAML engine config naming the Knowledge Base.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:4010")]
    bind: SocketAddr,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = StatusCode::BAD_REQUEST;
        (status, Json(self)).into_response()
    }
}

impl ServiceState {
    fn error(message: impl Into<String>) -> ServiceError {
        ServiceError { service_contract_version: SERVICE_CONTRACT_VERSION, error: message.into() }
    }
}

fn envelope<T>(data: T) -> ServiceEnvelope<T>
where
    T: Serialize,
{
    ServiceEnvelope {
        service_contract_version: SERVICE_CONTRACT_VERSION,
        api_contract_version: API_CONTRACT_VERSION,
        data,
    }
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/openapi", get(openapi))
        .route("/v1/evaluate", post(evaluate))
        .route("/v1/modifiers", post(modifiers))
        .route("/v1/resolve", post(resolve))
        .route("/v1/recipe", post(recipe))
        .route("/v1/kb/report", get(kb_report))
        .with_state(state)
}

fn open_api(args: &Args) -> Result<HalalCheckApi> {
    match (&args.kb, &args.config) {
        (Some(kb), _) => HalalCheckApi::open(&EngineConfig::for_knowledge_base(kb.clone())),
        (None, Some(config)) => HalalCheckApi::open_config_file(config),
        (None, None) => {
            Err(anyhow::anyhow!("a knowledge base is required: pass --kb <file> or --config <file>"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();

    let args = Args::parse();
    let state = ServiceState { api: open_api(&args)? };
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(
        bind = %args.bind,
        fingerprint = state.api.fingerprint(),
        records = state.api.knowledge_base().len(),
        "halal-check service listening"
    );
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health(State(state): State<ServiceState>) -> Json<ServiceEnvelope<HealthResponse>> {
    Json(envelope(HealthResponse {
        status: "ok",
        fingerprint: state.api.fingerprint().to_string(),
        records: state.api.knowledge_base().len(),
    }))
}

async fn openapi() -> impl IntoResponse {
    (StatusCode::OK, [("content-type", "application/yaml; charset=utf-8")], OPENAPI_YAML)
}

async fn evaluate(
    State(state): State<ServiceState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<ServiceEnvelope<EvaluationResult>>, ServiceError> {
    let result = state.api.evaluate(&request).map_err(|err| ServiceState::error(err.to_string()))?;
    Ok(Json(envelope(result)))
}

async fn modifiers(
    State(state): State<ServiceState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<ServiceEnvelope<ModifiersResult>>, ServiceError> {
    let result =
        state.api.detect_modifiers(&request).map_err(|err| ServiceState::error(err.to_string()))?;
    Ok(Json(envelope(result)))
}

async fn resolve(
    State(state): State<ServiceState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<ServiceEnvelope<ResolveResult>>, ServiceError> {
    let result = state.api.resolve(&request).map_err(|err| ServiceState::error(err.to_string()))?;
    Ok(Json(envelope(result)))
}

async fn recipe(
    State(state): State<ServiceState>,
    Json(request): Json<RecipeRequest>,
) -> Result<Json<ServiceEnvelope<RecipeEvaluation>>, ServiceError> {
    let result =
        state.api.evaluate_recipe(&request).map_err(|err| ServiceState::error(err.to_string()))?;
    Ok(Json(envelope(result)))
}

async fn kb_report(State(state): State<ServiceState>) -> Json<ServiceEnvelope<KnowledgeBaseReport>> {
    Json(envelope(state.api.knowledge_base_report()))
}
