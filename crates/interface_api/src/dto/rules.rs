//! Commission rule DTOs

use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use core_kernel::{Bounds, TenantId, Tier};
use domain_commission::{CalcKind, CommissionRule};

#[derive(Debug, Deserialize, Validate)]
pub struct RuleRequest {
    #[validate(length(min = 1))]
    pub category: String,
    pub sub_category: Option<String>,
    pub tier: Tier,
    pub kind: CalcKind,
    #[serde(default)]
    pub fixed_amount: Decimal,
    #[serde(default)]
    pub percentage: Decimal,
    pub min_total: Option<Decimal>,
    pub max_total: Option<Decimal>,
    pub min_agent: Option<Decimal>,
    pub max_agent: Option<Decimal>,
    pub min_special_place: Option<Decimal>,
    pub max_special_place: Option<Decimal>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RuleRequest {
    /// Builds a rule scoped to the caller's tenant (`None` for an
    /// unscoped SUPERADMIN, producing a global rule).
    pub fn into_rule(self, tenant_id: Option<TenantId>) -> CommissionRule {
        let mut rule = CommissionRule::new(
            tenant_id,
            self.category,
            self.sub_category,
            self.tier,
            self.kind,
            self.fixed_amount,
            self.percentage,
        );
        rule.total_bounds = Bounds::new(self.min_total, self.max_total);
        rule.agent_bounds = Bounds::new(self.min_agent, self.max_agent);
        rule.special_place_bounds = Bounds::new(self.min_special_place, self.max_special_place);
        rule.active = self.active;
        rule
    }
}

#[derive(Debug, Deserialize)]
pub struct RuleListQuery {
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
