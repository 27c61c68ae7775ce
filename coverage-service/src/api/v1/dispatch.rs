use crate::api::{ApiError, ErrorResponse};
use crate::context::ServiceContext;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use coverage_db::validate_network;
use coverage_lib::{dispatch_all, plan_with, DispatchReport, PlanOptions, WorkerTaskSpec};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

pub fn router() -> Router<ServiceContext> {
    Router::new()
        .route("/dispatch", post(post_dispatch))
        .route("/dispatch/plan", get(get_plan))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PlanParams {
    pub from: u64,
    pub to: u64,
    pub workers: u32,
    pub force_mode: Option<bool>,
    /// Worker log level, `info` when omitted
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DispatchBody {
    pub network: String,
    pub from: u64,
    pub to: u64,
    pub workers: u32,
    #[serde(default)]
    pub force_mode: bool,
    pub log_level: Option<String>,
}

fn plan_tasks(
    context: &ServiceContext,
    from: u64,
    to: u64,
    workers: u32,
    force_mode: bool,
    log_level: Option<String>,
) -> Result<Vec<WorkerTaskSpec>, ApiError> {
    let max_workers = context.config().max_workers;
    if workers > max_workers {
        return Err(ApiError::bad_request(format!(
            "at most {max_workers} workers can be dispatched at once"
        )));
    }
    let options = PlanOptions::builder()
        .force_mode(force_mode)
        .maybe_log_level(log_level)
        .build();
    if options.log_level.parse::<tracing::Level>().is_err() {
        return Err(ApiError::bad_request(format!(
            "unsupported worker log level {:?}",
            options.log_level
        )));
    }
    Ok(plan_with(from, to, workers, &options)?)
}

#[utoipa::path(
    get,
    path = "/dispatch/plan",
    params(PlanParams),
    responses(
        (status = 200, description = "Worker tasks covering the range", body = [WorkerTaskSpec]),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub(crate) async fn get_plan(
    State(context): State<ServiceContext>,
    Query(params): Query<PlanParams>,
) -> Result<Json<Vec<WorkerTaskSpec>>, ApiError> {
    let tasks = plan_tasks(
        &context,
        params.from,
        params.to,
        params.workers,
        params.force_mode.unwrap_or_default(),
        params.log_level,
    )?;
    Ok(Json(tasks))
}

#[utoipa::path(
    post,
    path = "/dispatch",
    request_body = DispatchBody,
    responses(
        (status = 200, description = "Started and failed worker tasks", body = DispatchReport),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub(crate) async fn post_dispatch(
    State(context): State<ServiceContext>,
    Json(body): Json<DispatchBody>,
) -> Result<Json<DispatchReport>, ApiError> {
    validate_network(&body.network).map_err(|err| ApiError::bad_request(err.to_string()))?;
    let tasks = plan_tasks(
        &context,
        body.from,
        body.to,
        body.workers,
        body.force_mode,
        body.log_level,
    )?;
    let report = dispatch_all(context.task_sink(), &body.network, tasks).await;
    context
        .metrics()
        .add_dispatched(report.started.len() as u64, report.failed.len() as u64);
    info!(
        network = %body.network,
        started = report.started.len(),
        failed = report.failed.len(),
        "Dispatch finished"
    );
    Ok(Json(report))
}
