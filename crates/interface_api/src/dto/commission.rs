//! Commission DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_commission::{LedgerEntry, RuleSummary};

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub contract_id: Uuid,
}

/// Settlement result. `duplicate` is how an idempotent repeat surfaces:
/// the UI shows it as success, never as an error toast.
#[derive(Debug, Serialize)]
pub struct SettleResponse {
    pub entry: LedgerEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleSummary>,
    pub duplicate: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VoidRequest {
    #[validate(length(min = 1, message = "void reason must not be empty"))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct VoidResponse {
    pub entry: LedgerEntry,
    pub duplicate: bool,
}

#[derive(Debug, Deserialize)]
pub struct EntryListQuery {
    pub state: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EntryListResponse {
    pub items: Vec<LedgerEntry>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}
