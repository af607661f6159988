use crate::dtos::ChangeLogParams;
use crate::models::PricingChangeLogEntry;
use crate::startup::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

/// Newest-first audit trail, filterable by entity.
pub async fn list_change_log(
    State(state): State<AppState>,
    Query(params): Query<ChangeLogParams>,
) -> Result<Json<Vec<PricingChangeLogEntry>>, AppError> {
    params.validate()?;
    let entries = state.service.list_change_log(&params.into()).await?;
    Ok(Json(entries))
}
