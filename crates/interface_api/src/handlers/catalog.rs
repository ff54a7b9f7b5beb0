//! Catalog import handler

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use validator::Validate;

use core_kernel::RequestContext;
use domain_catalog::{CatalogImporter, CatalogStore, ImportSummary};
use infra_db::CatalogRepository;

use crate::dto::catalog::ImportRequest;
use crate::error::ApiError;
use crate::AppState;

/// Imports a parsed tariff sheet: upserts offers and price tiers, derives
/// per-tier FIXED rules from base commissions. Re-running the same import
/// updates in place.
pub async fn import_catalog(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<ImportSummary>, ApiError> {
    request.validate()?;

    let store: Arc<dyn CatalogStore> = Arc::new(CatalogRepository::new(state.pool.clone()));
    let summary = CatalogImporter::new(store)
        .import(&ctx, &request.category, request.rows)
        .await?;

    Ok(Json(summary))
}
