//! HTTP API Layer
//!
//! REST surface for the commission platform using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: thin request handlers delegating to domain engines and
//!   repositories
//! - **Middleware**: bearer-token auth resolving the per-request context,
//!   audit logging
//! - **DTOs**: request/response data transfer objects
//! - **Error handling**: one taxonomy-to-status mapping in `error`

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{catalog, commission, contracts, health, rules, settlement};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: ApiConfig,
}

/// Creates the main API router
pub fn create_router(pool: PgPool, config: ApiConfig) -> Router {
    let state = AppState { pool, config };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Contract lifecycle
    let contract_routes = Router::new()
        .route("/", post(contracts::create_contract))
        .route("/", get(contracts::list_contracts))
        .route("/:id", get(contracts::get_contract))
        .route("/:id/submit", post(contracts::submit_contract))
        .route("/:id/confirm", post(contracts::confirm_contract))
        .route("/:id/cancel", post(contracts::cancel_contract));

    // Commission engine: settle, void, ledger, report, rules
    let commission_routes = Router::new()
        .route("/settle", post(commission::settle))
        .route("/entries", get(commission::list_entries))
        .route("/entries/:id/void", post(commission::void_entry))
        .route("/report", get(commission::report))
        .route("/rules", post(rules::create_rule))
        .route("/rules", get(rules::list_rules))
        .route("/rules/:id", put(rules::update_rule))
        .route("/rules/:id", axum::routing::delete(rules::deactivate_rule));

    // Settlement period batching
    let period_routes = Router::new()
        .route("/", post(settlement::create_period))
        .route("/", get(settlement::list_periods))
        .route("/:id", get(settlement::get_period))
        .route("/:id/actions", post(settlement::period_action));

    // Catalog import
    let catalog_routes = Router::new().route("/import", post(catalog::import_catalog));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/contracts", contract_routes)
        .nest("/commission", commission_routes)
        .nest("/settlement-periods", period_routes)
        .nest("/catalog", catalog_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            audit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
