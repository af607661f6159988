use crate::dtos::ResolveFeeRequest;
use crate::models::PricingResult;
use crate::pricing::ExplainedResult;
use crate::startup::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

/// Resolve the delivery fee for an order context.
///
/// Always answers 200 for a valid request; if the rule store is unreachable
/// the body carries `source.base = "degraded"`.
#[tracing::instrument(skip(state, request))]
pub async fn resolve_fee(
    State(state): State<AppState>,
    Json(request): Json<ResolveFeeRequest>,
) -> Result<Json<PricingResult>, AppError> {
    request.validate()?;
    let result = state.service.resolve(request.into()).await?;
    Ok(Json(result))
}

/// Resolve with a per-tier trace of what was considered.
#[tracing::instrument(skip(state, request))]
pub async fn explain_fee(
    State(state): State<AppState>,
    Json(request): Json<ResolveFeeRequest>,
) -> Result<Json<ExplainedResult>, AppError> {
    request.validate()?;
    let explained = state.service.explain(request.into()).await?;
    Ok(Json(explained))
}
