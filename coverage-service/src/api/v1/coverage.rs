use crate::api::{ApiError, ErrorResponse};
use crate::context::ServiceContext;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use coverage_db::validate_network;
use coverage_lib::{reconcile_network, CoverageError, ReconcileOptions, ReconciliationResult};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub fn router() -> Router<ServiceContext> {
    Router::new().route("/coverage", get(get_coverage))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CoverageParams {
    pub network: String,
    /// Number of buckets, the service default when omitted
    pub buckets: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CoverageResponse {
    pub network: String,
    pub coverage: ReconciliationResult,
    pub indexed_count: u64,
    pub percent_complete: f64,
}

#[utoipa::path(
    get,
    path = "/coverage",
    params(CoverageParams),
    responses(
        (status = 200, description = "Indexing coverage of the network", body = CoverageResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 503, description = "Indexing progress unavailable", body = ErrorResponse)
    )
)]
pub(crate) async fn get_coverage(
    State(context): State<ServiceContext>,
    Query(params): Query<CoverageParams>,
) -> Result<Json<CoverageResponse>, ApiError> {
    validate_network(&params.network).map_err(|err| ApiError::bad_request(err.to_string()))?;
    let config = context.config();
    let bucket_count = params.buckets.unwrap_or(config.default_bucket_count);
    if bucket_count > config.max_buckets {
        return Err(ApiError::bad_request(format!(
            "at most {} buckets can be requested",
            config.max_buckets
        )));
    }
    let options = ReconcileOptions::builder()
        .bucket_count(bucket_count)
        .page_size(config.page_size)
        .build();
    let store = context.store();
    match reconcile_network(store, store, &params.network, options).await {
        Ok(coverage) => {
            context.metrics().increment_reconciliations();
            Ok(Json(CoverageResponse {
                network: params.network,
                indexed_count: coverage.indexed_count(),
                percent_complete: coverage.percent_complete(),
                coverage,
            }))
        }
        Err(err) => {
            if matches!(err, CoverageError::SourceUnavailable(_)) {
                context.metrics().increment_failed_reconciliations();
            }
            Err(err.into())
        }
    }
}
