//! Contract handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{RequestContext, Role};
use domain_contract::{ConfirmationService, Contract, ContractStatus, LogNotifier};
use infra_db::ContractRepository;

use crate::dto::contracts::{ContractListQuery, CreateContractRequest};
use crate::error::ApiError;
use crate::AppState;

/// Creates a draft contract. Agents create contracts for themselves; the
/// agent link defaults to the caller's own agent record.
pub async fn create_contract(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(request): Json<CreateContractRequest>,
) -> Result<Json<Contract>, ApiError> {
    request.validate()?;

    let mut contract = Contract::new(ctx.tenant_id, request.category, request.tier);
    contract.sub_category = request.sub_category;
    contract.lead_id = request.lead_id.map(Into::into);
    contract.agent_id = match ctx.role {
        Role::Agent => ctx.agent_id,
        _ => request.agent_id.map(Into::into),
    };
    contract.place_id = request.place_id.map(Into::into);
    contract.taxable_base = request.taxable_base;
    contract.invoice_total = request.invoice_total;
    contract.notes = request.notes;

    ContractRepository::new(state.pool.clone())
        .create(&contract)
        .await?;

    Ok(Json(contract))
}

pub async fn list_contracts(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ContractListQuery>,
) -> Result<Json<Vec<Contract>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ContractStatus>)
        .transpose()
        .map_err(ApiError::Validation)?;

    let contracts = ContractRepository::new(state.pool.clone())
        .list(
            ctx.tenant_scope(),
            status,
            query.limit.unwrap_or(50).clamp(1, 200),
            query.offset.unwrap_or(0).max(0),
        )
        .await?;

    Ok(Json(contracts))
}

pub async fn get_contract(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Contract>, ApiError> {
    let contract = ContractRepository::new(state.pool.clone())
        .find(ctx.tenant_scope(), id.into())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("contract {} not found", id)))?;

    Ok(Json(contract))
}

/// Draft -> Pending
pub async fn submit_contract(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Contract>, ApiError> {
    let repo = ContractRepository::new(state.pool.clone());
    let mut contract = repo
        .find(ctx.tenant_scope(), id.into())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("contract {} not found", id)))?;

    contract.submit().map_err(ApiError::from)?;
    repo.save(&contract).await?;

    Ok(Json(contract))
}

/// Pending -> Confirmed, deriving the client from the lead when needed.
pub async fn confirm_contract(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Contract>, ApiError> {
    let repo = ContractRepository::new(state.pool.clone());
    let contract = repo
        .find(ctx.tenant_scope(), id.into())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("contract {} not found", id)))?;

    let service = ConfirmationService::new(repo.clone(), LogNotifier);
    let outcome = service.confirm(&ctx, contract).await?;
    repo.save(&outcome.contract).await?;

    Ok(Json(outcome.contract))
}

pub async fn cancel_contract(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Contract>, ApiError> {
    let repo = ContractRepository::new(state.pool.clone());
    let mut contract = repo
        .find(ctx.tenant_scope(), id.into())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("contract {} not found", id)))?;

    contract.cancel().map_err(ApiError::from)?;
    repo.save(&contract).await?;

    Ok(Json(contract))
}
