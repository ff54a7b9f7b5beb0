//! Commission rules and their resolution
//!
//! Rules are keyed by (tenant, category, sub-category, tier). A null
//! tenant makes the rule global; a null sub-category makes it
//! category-wide. Resolution prefers the most specific match: an exact
//! sub-category rule beats a category-wide one, and within a bucket the
//! oldest rule (lowest id; ids are time-ordered UUIDv7) wins.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{Bounds, RuleId, TenantId, Tier};

/// How the total commission is calculated from the base amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalcKind {
    /// Total is the rule's fixed amount, regardless of base
    Fixed,
    /// Total is a percentage of the base amount
    PercentOfBase,
    /// Fixed amount plus a percentage of the base
    Mixed,
}

impl CalcKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalcKind::Fixed => "FIXED",
            CalcKind::PercentOfBase => "PERCENT_OF_BASE",
            CalcKind::Mixed => "MIXED",
        }
    }
}

impl std::str::FromStr for CalcKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FIXED" => Ok(CalcKind::Fixed),
            "PERCENT_OF_BASE" => Ok(CalcKind::PercentOfBase),
            "MIXED" => Ok(CalcKind::Mixed),
            other => Err(format!("unknown calculation kind: {}", other)),
        }
    }
}

impl fmt::Display for CalcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A commission rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionRule {
    pub id: RuleId,
    /// None = global rule, applies to every tenant
    pub tenant_id: Option<TenantId>,
    pub category: String,
    /// None = category-wide; imported tariffs carry a synthetic path here
    pub sub_category: Option<String>,
    pub tier: Tier,
    pub kind: CalcKind,
    pub fixed_amount: Decimal,
    /// Percent scale (5 = 5%); rule percentages are not heuristic-normalized
    pub percentage: Decimal,
    /// Clamp on the computed total
    pub total_bounds: Bounds,
    /// Clamp on the agent's share
    pub agent_bounds: Bounds,
    /// Clamp on a special place's share
    pub special_place_bounds: Bounds,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl CommissionRule {
    /// Creates an active rule with no clamps.
    pub fn new(
        tenant_id: Option<TenantId>,
        category: impl Into<String>,
        sub_category: Option<String>,
        tier: Tier,
        kind: CalcKind,
        fixed_amount: Decimal,
        percentage: Decimal,
    ) -> Self {
        Self {
            id: RuleId::new_v7(),
            tenant_id,
            category: category.into(),
            sub_category,
            tier,
            kind,
            fixed_amount,
            percentage,
            total_bounds: Bounds::none(),
            agent_bounds: Bounds::none(),
            special_place_bounds: Bounds::none(),
            active: true,
            created_at: Utc::now(),
        }
    }

    /// A global rule applies to every tenant; a scoped rule only to its own.
    pub fn applies_to_tenant(&self, tenant_id: TenantId) -> bool {
        self.tenant_id.map_or(true, |scoped| scoped == tenant_id)
    }

    pub fn key(&self) -> RuleKey {
        RuleKey {
            tenant_id: self.tenant_id,
            category: self.category.clone(),
            sub_category: self.sub_category.clone(),
            tier: self.tier,
        }
    }
}

/// The resolution key for a rule lookup. Shown verbatim in configuration
/// errors so an operator can create the missing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleKey {
    pub tenant_id: Option<TenantId>,
    pub category: String,
    pub sub_category: Option<String>,
    pub tier: Tier,
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "category={} sub_category={} tier={}",
            self.category,
            self.sub_category.as_deref().unwrap_or("-"),
            self.tier
        )
    }
}

/// Resolves the authoritative rule among candidates.
///
/// Exact sub-category match first, category-wide (`None`) fallback second;
/// within a bucket the lowest id (oldest rule) wins. Inactive rules never
/// match. Returns `None` when neither bucket has a match; the caller must
/// surface a configuration error, never default to zero.
pub fn resolve<'a>(
    rules: &'a [CommissionRule],
    tenant_id: TenantId,
    category: &str,
    sub_category: Option<&str>,
    tier: Tier,
) -> Option<&'a CommissionRule> {
    let bucket = |sub: Option<&str>| {
        rules
            .iter()
            .filter(|rule| {
                rule.active
                    && rule.applies_to_tenant(tenant_id)
                    && rule.category == category
                    && rule.tier == tier
                    && rule.sub_category.as_deref() == sub
            })
            .min_by_key(|rule| rule.id)
    };

    if let Some(sub) = sub_category {
        if let Some(exact) = bucket(Some(sub)) {
            return Some(exact);
        }
    }
    bucket(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rule(sub: Option<&str>, tier: Tier) -> CommissionRule {
        CommissionRule::new(
            None,
            "luz",
            sub.map(String::from),
            tier,
            CalcKind::PercentOfBase,
            Decimal::ZERO,
            dec!(5),
        )
    }

    #[test]
    fn test_exact_sub_category_beats_category_wide() {
        let general = rule(None, Tier::C1);
        let exact = rule(Some("endesa/one/2024"), Tier::C1);
        let rules = vec![general.clone(), exact.clone()];

        let resolved = resolve(&rules, TenantId::new(), "luz", Some("endesa/one/2024"), Tier::C1);
        assert_eq!(resolved.unwrap().id, exact.id);
    }

    #[test]
    fn test_falls_back_to_category_wide() {
        let general = rule(None, Tier::C1);
        let rules = vec![general.clone()];

        let resolved = resolve(&rules, TenantId::new(), "luz", Some("unknown/sub"), Tier::C1);
        assert_eq!(resolved.unwrap().id, general.id);
    }

    #[test]
    fn test_oldest_rule_wins_within_bucket() {
        let older = rule(None, Tier::C2);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let newer = rule(None, Tier::C2);
        // Insertion order must not matter
        let rules = vec![newer, older.clone()];

        let resolved = resolve(&rules, TenantId::new(), "luz", None, Tier::C2);
        assert_eq!(resolved.unwrap().id, older.id);
    }

    #[test]
    fn test_inactive_rules_never_match() {
        let mut inactive = rule(None, Tier::C1);
        inactive.active = false;
        let rules = vec![inactive];

        assert!(resolve(&rules, TenantId::new(), "luz", None, Tier::C1).is_none());
    }

    #[test]
    fn test_tenant_scoping() {
        let mine = TenantId::new();
        let other = TenantId::new();
        let mut scoped = rule(None, Tier::C1);
        scoped.tenant_id = Some(other);
        let rules = vec![scoped];

        assert!(resolve(&rules, mine, "luz", None, Tier::C1).is_none());
        assert!(resolve(&rules, other, "luz", None, Tier::C1).is_some());
    }

    #[test]
    fn test_no_match_is_none_not_default() {
        let rules = vec![rule(None, Tier::C1)];
        assert!(resolve(&rules, TenantId::new(), "gas", None, Tier::C1).is_none());
        assert!(resolve(&rules, TenantId::new(), "luz", None, Tier::Special).is_none());
    }
}
