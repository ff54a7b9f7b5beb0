//! Settlement period handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::{DateRange, RequestContext};
use domain_settlement::SettlementPeriod;
use infra_db::SettlementRepository;

use crate::dto::settlement::{
    CreatePeriodRequest, PeriodAction, PeriodActionRequest, PeriodActionResponse, PeriodListQuery,
};
use crate::error::ApiError;
use crate::AppState;

fn require_admin(ctx: &RequestContext) -> Result<(), ApiError> {
    if !ctx.can_manage_commissions() {
        return Err(ApiError::Forbidden(format!(
            "role {} may not manage settlement periods",
            ctx.role
        )));
    }
    Ok(())
}

/// Creates an Open period. Pulling entries is a separate, explicit action.
pub async fn create_period(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(request): Json<CreatePeriodRequest>,
) -> Result<Json<SettlementPeriod>, ApiError> {
    require_admin(&ctx)?;

    let range = DateRange::new(request.from, request.to)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let period = SettlementRepository::new(state.pool.clone())
        .create_period(ctx.tenant_id, range)
        .await?;

    Ok(Json(period))
}

/// ADD_MOVEMENTS pulls matching unsettled entries into the period;
/// CLOSE settles everything attached and seals the period for good.
pub async fn period_action(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<PeriodActionRequest>,
) -> Result<Json<PeriodActionResponse>, ApiError> {
    require_admin(&ctx)?;

    let repo = SettlementRepository::new(state.pool.clone());
    let period_id = id.into();

    let affected = match request.action {
        PeriodAction::AddMovements => repo.add_movements(ctx.tenant_scope(), period_id).await?,
        PeriodAction::Close => repo.close_period(ctx.tenant_scope(), period_id).await?,
    };

    let period = repo
        .find(ctx.tenant_scope(), period_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("settlement period {} not found", id)))?;

    Ok(Json(PeriodActionResponse {
        action: request.action,
        affected,
        period,
    }))
}

pub async fn list_periods(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<PeriodListQuery>,
) -> Result<Json<Vec<SettlementPeriod>>, ApiError> {
    require_admin(&ctx)?;

    let periods = SettlementRepository::new(state.pool.clone())
        .list(
            ctx.tenant_scope(),
            query.limit.unwrap_or(50).clamp(1, 200),
            query.offset.unwrap_or(0).max(0),
        )
        .await?;

    Ok(Json(periods))
}

pub async fn get_period(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<SettlementPeriod>, ApiError> {
    require_admin(&ctx)?;

    let period = SettlementRepository::new(state.pool.clone())
        .find(ctx.tenant_scope(), id.into())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("settlement period {} not found", id)))?;

    Ok(Json(period))
}
