//! Contract DTOs

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use core_kernel::Tier;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContractRequest {
    #[validate(length(min = 1))]
    pub category: String,
    pub sub_category: Option<String>,
    pub tier: Tier,
    pub lead_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub place_id: Option<Uuid>,
    pub taxable_base: Option<Decimal>,
    pub invoice_total: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContractListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
