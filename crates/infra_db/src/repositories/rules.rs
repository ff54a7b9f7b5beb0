//! Commission rule repository
//!
//! CRUD for the admin screens plus the two-step resolution query used by
//! the settlement engine: exact sub-category first, category-wide second,
//! oldest rule id first within a bucket. Global rules (NULL tenant)
//! compete in the same bucket as tenant-scoped ones.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{Bounds, RuleId, TenantId, Tier};
use domain_commission::{CalcKind, CommissionRule};

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct RuleRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    rule_id: Uuid,
    tenant_id: Option<Uuid>,
    category: String,
    sub_category: Option<String>,
    tier: String,
    calc_kind: String,
    fixed_amount: Decimal,
    percentage: Decimal,
    min_total: Option<Decimal>,
    max_total: Option<Decimal>,
    min_agent: Option<Decimal>,
    max_agent: Option<Decimal>,
    min_special_place: Option<Decimal>,
    max_special_place: Option<Decimal>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<RuleRow> for CommissionRule {
    type Error = DatabaseError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        Ok(CommissionRule {
            id: row.rule_id.into(),
            tenant_id: row.tenant_id.map(Into::into),
            category: row.category,
            sub_category: row.sub_category,
            tier: row.tier.parse().map_err(DatabaseError::RowDecode)?,
            kind: row
                .calc_kind
                .parse::<CalcKind>()
                .map_err(DatabaseError::RowDecode)?,
            fixed_amount: row.fixed_amount,
            percentage: row.percentage,
            total_bounds: Bounds::new(row.min_total, row.max_total),
            agent_bounds: Bounds::new(row.min_agent, row.max_agent),
            special_place_bounds: Bounds::new(row.min_special_place, row.max_special_place),
            active: row.active,
            created_at: row.created_at,
        })
    }
}

pub(crate) const RULE_COLUMNS: &str = "rule_id, tenant_id, category, sub_category, tier, calc_kind, \
     fixed_amount, percentage, min_total, max_total, min_agent, max_agent, \
     min_special_place, max_special_place, active, created_at";

/// One resolution step: fetch the oldest active rule for the exact
/// sub-category value (`None` = category-wide bucket).
pub(crate) async fn fetch_active_rule(
    pool: &PgPool,
    tenant_id: TenantId,
    category: &str,
    sub_category: Option<&str>,
    tier: Tier,
) -> Result<Option<CommissionRule>, DatabaseError> {
    let row = sqlx::query_as::<_, RuleRow>(&format!(
        "SELECT {RULE_COLUMNS} FROM commission_rules \
         WHERE active \
           AND category = $2 \
           AND tier = $3 \
           AND (tenant_id = $1 OR tenant_id IS NULL) \
           AND (($4::text IS NOT NULL AND sub_category = $4) \
             OR ($4::text IS NULL AND sub_category IS NULL)) \
         ORDER BY rule_id ASC \
         LIMIT 1"
    ))
    .bind(Uuid::from(tenant_id))
    .bind(category)
    .bind(tier.as_str())
    .bind(sub_category)
    .fetch_optional(pool)
    .await?;

    row.map(CommissionRule::try_from).transpose()
}

impl RuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, rule: &CommissionRule) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO commission_rules (
                rule_id, tenant_id, category, sub_category, tier, calc_kind,
                fixed_amount, percentage, min_total, max_total, min_agent,
                max_agent, min_special_place, max_special_place, active, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(Uuid::from(rule.id))
        .bind(rule.tenant_id.map(Uuid::from))
        .bind(&rule.category)
        .bind(&rule.sub_category)
        .bind(rule.tier.as_str())
        .bind(rule.kind.as_str())
        .bind(rule.fixed_amount)
        .bind(rule.percentage)
        .bind(rule.total_bounds.min)
        .bind(rule.total_bounds.max)
        .bind(rule.agent_bounds.min)
        .bind(rule.agent_bounds.max)
        .bind(rule.special_place_bounds.min)
        .bind(rule.special_place_bounds.max)
        .bind(rule.active)
        .bind(rule.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update(&self, rule: &CommissionRule) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE commission_rules
            SET calc_kind = $2, fixed_amount = $3, percentage = $4,
                min_total = $5, max_total = $6, min_agent = $7, max_agent = $8,
                min_special_place = $9, max_special_place = $10, active = $11
            WHERE rule_id = $1
            "#,
        )
        .bind(Uuid::from(rule.id))
        .bind(rule.kind.as_str())
        .bind(rule.fixed_amount)
        .bind(rule.percentage)
        .bind(rule.total_bounds.min)
        .bind(rule.total_bounds.max)
        .bind(rule.agent_bounds.min)
        .bind(rule.agent_bounds.max)
        .bind(rule.special_place_bounds.min)
        .bind(rule.special_place_bounds.max)
        .bind(rule.active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("CommissionRule", rule.id));
        }
        Ok(())
    }

    /// Rules are deactivated, never deleted: settled entries keep their
    /// rule reference for the audit trail.
    pub async fn deactivate(&self, id: RuleId) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE commission_rules SET active = FALSE WHERE rule_id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("CommissionRule", id));
        }
        Ok(())
    }

    pub async fn find(&self, id: RuleId) -> Result<Option<CommissionRule>, DatabaseError> {
        let row = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM commission_rules WHERE rule_id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(CommissionRule::try_from).transpose()
    }

    /// Lists the rules visible to a tenant: its own plus global ones.
    pub async fn list(
        &self,
        scope: Option<TenantId>,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommissionRule>, DatabaseError> {
        let rows = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {RULE_COLUMNS} FROM commission_rules \
             WHERE ($1::uuid IS NULL OR tenant_id = $1 OR tenant_id IS NULL) \
               AND ($2::text IS NULL OR category = $2) \
             ORDER BY category, tier, rule_id \
             LIMIT $3 OFFSET $4"
        ))
        .bind(scope.map(Uuid::from))
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CommissionRule::try_from).collect()
    }

    /// Full two-step resolution, exposed for diagnostics screens.
    pub async fn resolve(
        &self,
        tenant_id: TenantId,
        category: &str,
        sub_category: Option<&str>,
        tier: Tier,
    ) -> Result<Option<CommissionRule>, DatabaseError> {
        if let Some(sub) = sub_category {
            if let Some(rule) =
                fetch_active_rule(&self.pool, tenant_id, category, Some(sub), tier).await?
            {
                return Ok(Some(rule));
            }
        }
        fetch_active_rule(&self.pool, tenant_id, category, None, tier).await
    }
}
