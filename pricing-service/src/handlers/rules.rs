//! Pricing rule administration.
//!
//! Mutations require the `X-User-ID` header. Updates and deletes carry
//! `?expected_version=N` and answer 409 when the record moved on.

use crate::dtos::{
    ClientDefaultRequest, CreateClientOverrideRequest, FeeBody, ListRulesParams,
    OptionalVersionParams, PackageFeeRequest, UpdateClientOverrideRequest, VersionParams,
    ZoneRuleRequest,
};
use crate::middleware::Actor;
use crate::models::{
    ClientDefaultFee, ClientOverrideFee, GlobalDefaultFee, PackageTypeFee, ZoneFeeRule,
};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

// =============================================================================
// Global Default
// =============================================================================

pub async fn get_global_default(
    State(state): State<AppState>,
) -> Result<Json<GlobalDefaultFee>, AppError> {
    Ok(Json(state.service.global_default().await?))
}

#[tracing::instrument(skip(state, actor, body), fields(actor = %actor.as_str()))]
pub async fn update_global_default(
    State(state): State<AppState>,
    actor: Actor,
    Query(version): Query<VersionParams>,
    Json(body): Json<FeeBody>,
) -> Result<Json<GlobalDefaultFee>, AppError> {
    version.validate()?;
    body.validate()?;
    let updated = state
        .service
        .update_global_default(body.fee(), version.expected_version, actor.as_str())
        .await?;
    Ok(Json(updated))
}

// =============================================================================
// Client Overrides
// =============================================================================

pub async fn list_client_overrides(
    State(state): State<AppState>,
    Query(params): Query<ListRulesParams>,
) -> Result<Json<Vec<ClientOverrideFee>>, AppError> {
    let overrides = state.service.list_client_overrides(&params.into()).await?;
    Ok(Json(overrides))
}

#[tracing::instrument(skip(state, actor, body), fields(actor = %actor.as_str()))]
pub async fn create_client_override(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<CreateClientOverrideRequest>,
) -> Result<(StatusCode, Json<ClientOverrideFee>), AppError> {
    body.validate()?;
    let created = state
        .service
        .create_client_override(body.into(), actor.as_str())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_client_override(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientOverrideFee>, AppError> {
    Ok(Json(state.service.get_client_override(id).await?))
}

#[tracing::instrument(skip(state, actor, body), fields(actor = %actor.as_str()))]
pub async fn update_client_override(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionParams>,
    Json(body): Json<UpdateClientOverrideRequest>,
) -> Result<Json<ClientOverrideFee>, AppError> {
    version.validate()?;
    body.validate()?;
    let updated = state
        .service
        .update_client_override(id, body.into(), version.expected_version, actor.as_str())
        .await?;
    Ok(Json(updated))
}

#[tracing::instrument(skip(state, actor), fields(actor = %actor.as_str()))]
pub async fn delete_client_override(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionParams>,
) -> Result<StatusCode, AppError> {
    version.validate()?;
    state
        .service
        .delete_client_override(id, version.expected_version, actor.as_str())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Client Defaults
// =============================================================================

pub async fn get_client_default(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<ClientDefaultFee>, AppError> {
    Ok(Json(state.service.get_client_default(client_id).await?))
}

/// Create (no `expected_version`) or update a client's default fee.
#[tracing::instrument(skip(state, actor, body), fields(actor = %actor.as_str()))]
pub async fn set_client_default(
    State(state): State<AppState>,
    actor: Actor,
    Path(client_id): Path<Uuid>,
    Query(version): Query<OptionalVersionParams>,
    Json(body): Json<ClientDefaultRequest>,
) -> Result<(StatusCode, Json<ClientDefaultFee>), AppError> {
    version.validate()?;
    body.validate()?;
    let status = if version.expected_version.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let record = state
        .service
        .set_client_default(client_id, body.fee(), version.expected_version, actor.as_str())
        .await?;
    Ok((status, Json(record)))
}

#[tracing::instrument(skip(state, actor), fields(actor = %actor.as_str()))]
pub async fn delete_client_default(
    State(state): State<AppState>,
    actor: Actor,
    Path(client_id): Path<Uuid>,
    Query(version): Query<VersionParams>,
) -> Result<StatusCode, AppError> {
    version.validate()?;
    state
        .service
        .delete_client_default(client_id, version.expected_version, actor.as_str())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Zone Rules
// =============================================================================

pub async fn list_zone_rules(
    State(state): State<AppState>,
    Query(params): Query<ListRulesParams>,
) -> Result<Json<Vec<ZoneFeeRule>>, AppError> {
    Ok(Json(state.service.list_zone_rules(&params.into()).await?))
}

#[tracing::instrument(skip(state, actor, body), fields(actor = %actor.as_str()))]
pub async fn create_zone_rule(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<ZoneRuleRequest>,
) -> Result<(StatusCode, Json<ZoneFeeRule>), AppError> {
    body.validate()?;
    let created = state
        .service
        .create_zone_rule(body.into(), actor.as_str())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_zone_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ZoneFeeRule>, AppError> {
    Ok(Json(state.service.get_zone_rule(id).await?))
}

#[tracing::instrument(skip(state, actor, body), fields(actor = %actor.as_str()))]
pub async fn update_zone_rule(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionParams>,
    Json(body): Json<ZoneRuleRequest>,
) -> Result<Json<ZoneFeeRule>, AppError> {
    version.validate()?;
    body.validate()?;
    let updated = state
        .service
        .update_zone_rule(id, body.into(), version.expected_version, actor.as_str())
        .await?;
    Ok(Json(updated))
}

#[tracing::instrument(skip(state, actor), fields(actor = %actor.as_str()))]
pub async fn delete_zone_rule(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionParams>,
) -> Result<StatusCode, AppError> {
    version.validate()?;
    state
        .service
        .delete_zone_rule(id, version.expected_version, actor.as_str())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Package-Type Fees
// =============================================================================

pub async fn list_package_fees(
    State(state): State<AppState>,
    Query(params): Query<ListRulesParams>,
) -> Result<Json<Vec<PackageTypeFee>>, AppError> {
    Ok(Json(state.service.list_package_fees(&params.into()).await?))
}

#[tracing::instrument(skip(state, actor, body), fields(actor = %actor.as_str()))]
pub async fn create_package_fee(
    State(state): State<AppState>,
    actor: Actor,
    Json(body): Json<PackageFeeRequest>,
) -> Result<(StatusCode, Json<PackageTypeFee>), AppError> {
    body.validate()?;
    let created = state
        .service
        .create_package_fee(body.into(), actor.as_str())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_package_fee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PackageTypeFee>, AppError> {
    Ok(Json(state.service.get_package_fee(id).await?))
}

#[tracing::instrument(skip(state, actor, body), fields(actor = %actor.as_str()))]
pub async fn update_package_fee(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionParams>,
    Json(body): Json<PackageFeeRequest>,
) -> Result<Json<PackageTypeFee>, AppError> {
    version.validate()?;
    body.validate()?;
    let updated = state
        .service
        .update_package_fee(id, body.into(), version.expected_version, actor.as_str())
        .await?;
    Ok(Json(updated))
}

#[tracing::instrument(skip(state, actor), fields(actor = %actor.as_str()))]
pub async fn delete_package_fee(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionParams>,
) -> Result<StatusCode, AppError> {
    version.validate()?;
    state
        .service
        .delete_package_fee(id, version.expected_version, actor.as_str())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
