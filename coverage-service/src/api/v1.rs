use crate::api::ErrorResponse;
use crate::context::ServiceContext;
use crate::metrics::ServiceMetricsSnapshot;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use coverage_lib::dispatch::{FailedTask, StartedTask};
use coverage_lib::{BlockRange, DispatchReport, ReconciliationResult, TaskId, WorkerTaskSpec};
use futures_util::FutureExt;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod coverage;
pub mod dispatch;

#[derive(OpenApi)]
#[openapi(
    paths(
        coverage::get_coverage,
        dispatch::get_plan,
        dispatch::post_dispatch,
        get_metrics,
    ),
    components(
        schemas(
            coverage::CoverageResponse,
            dispatch::DispatchBody,
            ReconciliationResult,
            BlockRange,
            WorkerTaskSpec,
            DispatchReport,
            StartedTask,
            FailedTask,
            TaskId,
            ServiceMetricsSnapshot,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Block Coverage API", description = "Indexing coverage and worker dispatch")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct Api {
    context: ServiceContext,
}

impl Api {
    pub fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    pub async fn serve(
        self,
        bind_address: &str,
        shutdown: tokio::sync::oneshot::Receiver<()>,
    ) -> anyhow::Result<()> {
        let addr: SocketAddr = bind_address.parse()?;
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Starting API server on {}", addr);
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown.map(|v| {
                _ = v.inspect_err(|_err| error!("shutdown receive error"));
            }))
            .await?;
        Ok(())
    }

    pub(crate) fn router(&self) -> Router {
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .merge(coverage::router())
            .merge(dispatch::router())
            .route("/metrics", get(get_metrics))
            .layer(CorsLayer::permissive())
            .with_state(self.context.clone())
    }
}

#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Service counters", body = ServiceMetricsSnapshot)
    )
)]
async fn get_metrics(State(context): State<ServiceContext>) -> Json<ServiceMetricsSnapshot> {
    Json(context.metrics().snapshot())
}
