//! Commission rule handlers (admin CRUD)

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::RequestContext;
use domain_commission::CommissionRule;
use infra_db::RuleRepository;

use crate::dto::rules::{RuleListQuery, RuleRequest};
use crate::error::ApiError;
use crate::AppState;

fn require_admin(ctx: &RequestContext) -> Result<(), ApiError> {
    if !ctx.can_manage_commissions() {
        return Err(ApiError::Forbidden(format!(
            "role {} may not manage commission rules",
            ctx.role
        )));
    }
    Ok(())
}

pub async fn create_rule(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(request): Json<RuleRequest>,
) -> Result<Json<CommissionRule>, ApiError> {
    require_admin(&ctx)?;
    request.validate()?;

    let rule = request.into_rule(ctx.tenant_scope());
    RuleRepository::new(state.pool.clone()).create(&rule).await?;

    Ok(Json(rule))
}

pub async fn list_rules(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<RuleListQuery>,
) -> Result<Json<Vec<CommissionRule>>, ApiError> {
    require_admin(&ctx)?;

    let rules = RuleRepository::new(state.pool.clone())
        .list(
            ctx.tenant_scope(),
            query.category.as_deref(),
            query.limit.unwrap_or(100).clamp(1, 500),
            query.offset.unwrap_or(0).max(0),
        )
        .await?;

    Ok(Json(rules))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<RuleRequest>,
) -> Result<Json<CommissionRule>, ApiError> {
    require_admin(&ctx)?;
    request.validate()?;

    let repo = RuleRepository::new(state.pool.clone());
    let existing = repo
        .find(id.into())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("commission rule {} not found", id)))?;

    // Identity and scope are immutable; only the calculation changes
    let mut rule = request.into_rule(existing.tenant_id);
    rule.id = existing.id;
    rule.category = existing.category;
    rule.sub_category = existing.sub_category;
    rule.tier = existing.tier;
    rule.created_at = existing.created_at;

    repo.update(&rule).await?;
    Ok(Json(rule))
}

/// Deactivates a rule. Rules are never deleted: settled entries keep
/// their rule reference for the audit trail.
pub async fn deactivate_rule(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&ctx)?;

    RuleRepository::new(state.pool.clone())
        .deactivate(id.into())
        .await?;

    Ok(Json(serde_json::json!({ "deactivated": true })))
}
