//! Settlement period DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use domain_settlement::SettlementPeriod;

#[derive(Debug, Deserialize)]
pub struct CreatePeriodRequest {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodAction {
    AddMovements,
    Close,
}

#[derive(Debug, Deserialize)]
pub struct PeriodActionRequest {
    pub action: PeriodAction,
}

#[derive(Debug, Serialize)]
pub struct PeriodActionResponse {
    pub action: PeriodAction,
    /// Entries added (ADD_MOVEMENTS) or settled (CLOSE)
    pub affected: u64,
    pub period: SettlementPeriod,
}

#[derive(Debug, Deserialize)]
pub struct PeriodListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
