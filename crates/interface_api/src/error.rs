//! API error handling
//!
//! Maps the core error taxonomy onto HTTP statuses. Two mappings carry
//! business meaning: configuration errors (missing rule) return 422 with
//! the full resolution key so the fix is actionable, and idempotent
//! duplicates never pass through here at all; they are 200s with a
//! `duplicate` flag in the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain_catalog::CatalogError;
use domain_commission::CommissionError;
use domain_contract::ContractError;
use infra_db::{DatabaseError, PeriodOpError};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Configuration(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "configuration_error",
                msg.clone(),
            ),
            ApiError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
            ApiError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.clone(),
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<CommissionError> for ApiError {
    fn from(err: CommissionError) -> Self {
        match err {
            CommissionError::Unauthorized(msg) => ApiError::Forbidden(msg),
            CommissionError::ContractNotFound(_) | CommissionError::EntryNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            CommissionError::ContractNotConfirmed { .. }
            | CommissionError::EntryAlreadySettled(_)
            | CommissionError::EntryNotPending(_, _) => ApiError::Conflict(err.to_string()),
            CommissionError::MissingRule { .. } => ApiError::Configuration(err.to_string()),
            CommissionError::EmptyVoidReason(_) => ApiError::Validation(err.to_string()),
            CommissionError::Store(inner) => ApiError::Database(inner.to_string()),
        }
    }
}

impl From<ContractError> for ApiError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::Unauthorized(msg) => ApiError::Forbidden(msg),
            ContractError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            ContractError::MissingLead => ApiError::Validation(err.to_string()),
            ContractError::Core(inner) => match inner {
                core_kernel::CoreError::NotFound(msg) => ApiError::NotFound(msg),
                core_kernel::CoreError::Unauthorized(msg) => ApiError::Forbidden(msg),
                core_kernel::CoreError::Validation(msg) => ApiError::Validation(msg),
                other => ApiError::Internal(other.to_string()),
            },
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unauthorized(msg) => ApiError::Forbidden(msg),
            CatalogError::Store(msg) => ApiError::Database(msg),
        }
    }
}

impl From<PeriodOpError> for ApiError {
    fn from(err: PeriodOpError) -> Self {
        match err {
            PeriodOpError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PeriodOpError::Closed(_) => ApiError::Conflict(err.to_string()),
            PeriodOpError::Database(inner) => inner.into(),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.to_string())
        } else {
            ApiError::Database(err.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{LedgerEntryId, Tier};
    use domain_commission::RuleKey;

    #[test]
    fn test_missing_rule_maps_to_configuration_error_with_key() {
        let err = CommissionError::MissingRule {
            key: RuleKey {
                tenant_id: None,
                category: "luz".into(),
                sub_category: Some("endesa/one/2024/0-3500".into()),
                tier: Tier::C1,
            },
        };
        let api: ApiError = err.into();

        match &api {
            ApiError::Configuration(msg) => {
                assert!(msg.contains("luz"));
                assert!(msg.contains("endesa/one/2024/0-3500"));
                assert!(msg.contains("C1"));
            }
            other => panic!("expected Configuration, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_reason_maps_to_validation() {
        let api: ApiError = CommissionError::EmptyVoidReason(LedgerEntryId::new()).into();
        assert!(matches!(api, ApiError::Validation(_)));
    }
}
