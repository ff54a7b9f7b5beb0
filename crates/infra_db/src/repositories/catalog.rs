//! Catalog repository - the Postgres adapter behind `CatalogStore`
//!
//! Offers and price tiers upsert through ON CONFLICT on their composite
//! natural keys (NULLS NOT DISTINCT, so a missing annex still collides
//! with a missing annex). Derived rules upsert by update-then-insert on
//! (tenant, category, sub-category, tier); imports are admin-only and
//! serialized in practice, so the racier upsert form is not needed there.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{OfferId, Tier};
use domain_catalog::{CatalogError, CatalogStore, PriceTier, TariffOffer, Upserted};
use domain_commission::CommissionRule;

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(err: impl std::fmt::Display) -> CatalogError {
    CatalogError::Store(err.to_string())
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn upsert_offer(&self, offer: &TariffOffer) -> Result<(OfferId, Upserted), CatalogError> {
        let unit_prices =
            serde_json::to_value(&offer.unit_prices).map_err(store_err)?;

        // xmax = 0 only holds for freshly inserted rows
        let (offer_id, inserted): (Uuid, bool) = sqlx::query_as(
            r#"
            INSERT INTO tariff_offers (
                offer_id, offer_type, sub_type, company, name, annex,
                unit_prices, base_commission, active, featured, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (offer_type, sub_type, company, name, annex)
            DO UPDATE SET unit_prices = EXCLUDED.unit_prices,
                          base_commission = EXCLUDED.base_commission,
                          active = EXCLUDED.active,
                          featured = EXCLUDED.featured,
                          updated_at = now()
            RETURNING offer_id, (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::from(offer.id))
        .bind(&offer.key.offer_type)
        .bind(&offer.key.sub_type)
        .bind(&offer.key.company)
        .bind(&offer.key.name)
        .bind(&offer.key.annex)
        .bind(unit_prices)
        .bind(offer.base_commission)
        .bind(offer.active)
        .bind(offer.featured)
        .bind(offer.created_at)
        .bind(offer.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_err(DatabaseError::from(e)))?;

        Ok((
            offer_id.into(),
            if inserted { Upserted::Created } else { Upserted::Updated },
        ))
    }

    async fn upsert_tier(&self, tier: &PriceTier) -> Result<Upserted, CatalogError> {
        let (inserted,): (bool,) = sqlx::query_as(
            r#"
            INSERT INTO price_tiers (
                tier_id, offer_id, consumption_from, consumption_to,
                fixed_commission, variable_commission, agent_pct_override,
                place_pct_override, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (offer_id, consumption_from, consumption_to)
            DO UPDATE SET fixed_commission = EXCLUDED.fixed_commission,
                          variable_commission = EXCLUDED.variable_commission,
                          agent_pct_override = EXCLUDED.agent_pct_override,
                          place_pct_override = EXCLUDED.place_pct_override,
                          updated_at = now()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::from(tier.id))
        .bind(Uuid::from(tier.offer_id))
        .bind(tier.consumption_from)
        .bind(tier.consumption_to)
        .bind(tier.fixed_commission)
        .bind(tier.variable_commission)
        .bind(tier.agent_pct_override)
        .bind(tier.place_pct_override)
        .bind(tier.created_at)
        .bind(tier.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_err(DatabaseError::from(e)))?;

        Ok(if inserted { Upserted::Created } else { Upserted::Updated })
    }

    async fn upsert_rule(&self, rule: &CommissionRule) -> Result<Upserted, CatalogError> {
        let updated = sqlx::query(
            r#"
            UPDATE commission_rules
            SET calc_kind = $5, fixed_amount = $6, percentage = $7, active = TRUE
            WHERE category = $2
              AND tier = $4
              AND (tenant_id = $1 OR ($1::uuid IS NULL AND tenant_id IS NULL))
              AND (sub_category = $3 OR ($3::text IS NULL AND sub_category IS NULL))
            "#,
        )
        .bind(rule.tenant_id.map(Uuid::from))
        .bind(&rule.category)
        .bind(&rule.sub_category)
        .bind(rule.tier.as_str())
        .bind(rule.kind.as_str())
        .bind(rule.fixed_amount)
        .bind(rule.percentage)
        .execute(&self.pool)
        .await
        .map_err(|e| store_err(DatabaseError::from(e)))?;

        if updated.rows_affected() > 0 {
            return Ok(Upserted::Updated);
        }

        sqlx::query(
            r#"
            INSERT INTO commission_rules (
                rule_id, tenant_id, category, sub_category, tier, calc_kind,
                fixed_amount, percentage, active, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9)
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
        .bind(rule.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_err(DatabaseError::from(e)))?;

        Ok(Upserted::Created)
    }

    async fn tier_percentage(
        &self,
        category: &str,
        sub_category: Option<&str>,
        tier: Tier,
    ) -> Result<Option<Decimal>, CatalogError> {
        let pct: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT pct_of_base FROM tier_percentages
            WHERE category = $1
              AND tier = $3
              AND (sub_category = $2 OR ($2::text IS NULL AND sub_category IS NULL))
            "#,
        )
        .bind(category)
        .bind(sub_category)
        .bind(tier.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_err(DatabaseError::from(e)))?;

        Ok(pct)
    }
}
