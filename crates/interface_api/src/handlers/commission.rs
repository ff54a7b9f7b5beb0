//! Commission handlers: settle, void, ledger listing, report

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{DateRange, RequestContext, Role};
use domain_commission::{EntryStatus, SettlementEngine};
use domain_settlement::CommissionReport;
use infra_db::{CommissionRepository, SettlementRepository};

use crate::dto::commission::{
    EntryListQuery, EntryListResponse, ReportQuery, SettleRequest, SettleResponse, VoidRequest,
    VoidResponse,
};
use crate::error::ApiError;
use crate::AppState;

fn engine(state: &AppState) -> SettlementEngine {
    SettlementEngine::new(Arc::new(CommissionRepository::new(state.pool.clone())))
}

/// Settles a confirmed contract. Idempotent: repeats return the existing
/// entry with `duplicate: true` and a 200, never an error.
pub async fn settle(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(request): Json<SettleRequest>,
) -> Result<Json<SettleResponse>, ApiError> {
    let outcome = engine(&state)
        .settle(&ctx, request.contract_id.into())
        .await?;

    Ok(Json(SettleResponse {
        entry: outcome.entry,
        rule: outcome.rule,
        duplicate: outcome.duplicate,
    }))
}

/// Voids a pending entry with a mandatory reason.
pub async fn void_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<VoidRequest>,
) -> Result<Json<VoidResponse>, ApiError> {
    request.validate()?;

    let outcome = engine(&state)
        .void(&ctx, id.into(), &request.reason)
        .await?;

    Ok(Json(VoidResponse {
        entry: outcome.entry,
        duplicate: outcome.duplicate,
    }))
}

/// Paginated ledger listing. Agents only see their own entries.
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<EntryListQuery>,
) -> Result<Json<EntryListResponse>, ApiError> {
    let status = query
        .state
        .as_deref()
        .map(str::parse::<EntryStatus>)
        .transpose()
        .map_err(ApiError::Validation)?;

    let agent_filter = match ctx.role {
        Role::Agent => ctx.agent_id,
        _ => None,
    };

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let items = CommissionRepository::new(state.pool.clone())
        .list_entries(
            ctx.tenant_scope(),
            agent_filter,
            status,
            query.q.as_deref(),
            limit,
            offset,
        )
        .await?;

    Ok(Json(EntryListResponse {
        items,
        limit,
        offset,
    }))
}

/// Per-agent and per-place totals over a date range. Admin-only.
pub async fn report(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<CommissionReport>, ApiError> {
    if !ctx.can_manage_commissions() {
        return Err(ApiError::Forbidden(format!(
            "role {} may not read commission reports",
            ctx.role
        )));
    }

    let range = DateRange::new(query.from, query.to)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let report = SettlementRepository::new(state.pool.clone())
        .report(ctx.tenant_scope(), range)
        .await?;

    Ok(Json(report))
}
