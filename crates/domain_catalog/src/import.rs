//! Catalog import and rule derivation
//!
//! The spreadsheet parser is an external collaborator: it hands this
//! module an ordered sequence of header-normalized rows. The importer
//! groups rows by offer key, upserts offers and their price tiers, and,
//! when a row carries a positive base commission, derives one FIXED rule
//! per commission tier, scoped to a synthetic sub-category path
//! (company → tariff → annex → consumption bracket). Re-running an import
//! updates the same records instead of duplicating them.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use core_kernel::{Pct, RequestContext, TenantId, Tier};
use domain_commission::{CalcKind, CommissionRule};

use crate::error::CatalogError;
use crate::offer::{OfferKey, PriceTier, TariffOffer};

/// A header-normalized spreadsheet row: lower-cased column names mapped
/// to raw cell values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetRow(pub BTreeMap<String, serde_json::Value>);

impl SheetRow {
    pub fn text(&self, column: &str) -> Option<String> {
        match self.0.get(column)? {
            serde_json::Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn decimal(&self, column: &str) -> Option<Decimal> {
        match self.0.get(column)? {
            serde_json::Value::Number(n) => n.to_string().parse().ok(),
            serde_json::Value::String(s) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        }
    }

    pub fn flag(&self, column: &str) -> Option<bool> {
        match self.0.get(column)? {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "si" | "sí" | "yes" | "true" | "1" => Some(true),
                "no" | "false" | "0" => Some(false),
                _ => None,
            },
            serde_json::Value::Number(n) => Some(n.as_i64() != Some(0)),
            _ => None,
        }
    }

    /// Columns prefixed `precio_` carry per-period unit prices.
    pub fn unit_prices(&self) -> BTreeMap<String, Decimal> {
        self.0
            .keys()
            .filter_map(|column| {
                let period = column.strip_prefix("precio_")?;
                let price = self.decimal(column)?;
                Some((period.to_uppercase(), price))
            })
            .collect()
    }
}

/// Whether an upsert created a new row or touched an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
}

/// Persistence port for the importer.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Upserts an offer by its natural key; returns the stored offer id.
    async fn upsert_offer(
        &self,
        offer: &TariffOffer,
    ) -> Result<(core_kernel::OfferId, Upserted), CatalogError>;

    /// Upserts a price tier by (offer, consumption range).
    async fn upsert_tier(&self, tier: &PriceTier) -> Result<Upserted, CatalogError>;

    /// Upserts a derived rule by (tenant, category, sub-category, tier).
    async fn upsert_rule(&self, rule: &CommissionRule) -> Result<Upserted, CatalogError>;

    /// Configured percentage-of-base for a commission tier. `None` when
    /// the category carries no configuration for that tier.
    async fn tier_percentage(
        &self,
        category: &str,
        sub_category: Option<&str>,
        tier: Tier,
    ) -> Result<Option<Decimal>, CatalogError>;
}

/// Counters returned by an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub offers_created: u32,
    pub offers_updated: u32,
    pub tiers_created: u32,
    pub tiers_updated: u32,
    pub rules_created: u32,
    pub rules_updated: u32,
    /// Rows without a usable offer key
    pub rows_skipped: u32,
}

/// The synthetic sub-category path a derived rule is scoped to.
pub fn synthetic_sub_category(key: &OfferKey, bracket: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        key.company,
        key.name,
        key.annex.as_deref().unwrap_or("-"),
        bracket,
    )
}

/// The catalog importer.
pub struct CatalogImporter {
    store: std::sync::Arc<dyn CatalogStore>,
}

impl CatalogImporter {
    pub fn new(store: std::sync::Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Imports parsed rows into the catalog for one commission category.
    pub async fn import(
        &self,
        ctx: &RequestContext,
        category: &str,
        rows: Vec<SheetRow>,
    ) -> Result<ImportSummary, CatalogError> {
        if !ctx.can_manage_commissions() {
            return Err(CatalogError::Unauthorized(format!(
                "role {} may not import catalogs",
                ctx.role
            )));
        }

        let mut summary = ImportSummary::default();

        // Group rows by offer key so an offer is upserted once no matter
        // how many consumption tiers its sheet spreads over.
        let mut grouped: BTreeMap<OfferKey, Vec<SheetRow>> = BTreeMap::new();
        for row in rows {
            let key = match offer_key_of(&row) {
                Some(key) => key,
                None => {
                    summary.rows_skipped += 1;
                    continue;
                }
            };
            grouped.entry(key).or_default().push(row);
        }

        for (key, rows) in grouped {
            let offer = offer_of(&key, &rows);
            let (offer_id, offer_outcome) = self.store.upsert_offer(&offer).await?;
            match offer_outcome {
                Upserted::Created => summary.offers_created += 1,
                Upserted::Updated => summary.offers_updated += 1,
            }

            for row in &rows {
                let tier = price_tier_of(offer_id, row);
                match self.store.upsert_tier(&tier).await? {
                    Upserted::Created => summary.tiers_created += 1,
                    Upserted::Updated => summary.tiers_updated += 1,
                }

                let base_commission = row.decimal("comision_base").unwrap_or(Decimal::ZERO);
                if base_commission > Decimal::ZERO {
                    self.derive_rules(
                        ctx.tenant_scope(),
                        category,
                        &key,
                        &tier,
                        base_commission,
                        &mut summary,
                    )
                    .await?;
                }
            }
        }

        Ok(summary)
    }

    /// Derives one FIXED rule per commission tier from the base value.
    async fn derive_rules(
        &self,
        tenant_id: Option<TenantId>,
        category: &str,
        key: &OfferKey,
        price_tier: &PriceTier,
        base_commission: Decimal,
        summary: &mut ImportSummary,
    ) -> Result<(), CatalogError> {
        let sub_category = synthetic_sub_category(key, &price_tier.bracket_label());

        for tier in Tier::ALL {
            // Sub-category-specific configuration first, category-wide next
            let pct = match self
                .store
                .tier_percentage(category, key.sub_type.as_deref(), tier)
                .await?
            {
                Some(pct) => Some(pct),
                None => self.store.tier_percentage(category, None, tier).await?,
            };

            let Some(pct) = pct else {
                warn!(category, tier = %tier, "no tier percentage configured; rule not derived");
                continue;
            };

            let fixed_amount = Pct::normalize(pct).apply(base_commission);
            let mut rule = CommissionRule::new(
                tenant_id,
                category,
                Some(sub_category.clone()),
                tier,
                CalcKind::Fixed,
                fixed_amount,
                Decimal::ZERO,
            );
            rule.active = true;

            match self.store.upsert_rule(&rule).await? {
                Upserted::Created => summary.rules_created += 1,
                Upserted::Updated => summary.rules_updated += 1,
            }
        }

        Ok(())
    }
}

fn offer_key_of(row: &SheetRow) -> Option<OfferKey> {
    Some(OfferKey {
        offer_type: row.text("tipo")?,
        sub_type: row.text("subtipo"),
        company: row.text("compania")?,
        name: row.text("nombre")?,
        annex: row.text("anexo"),
    })
}

fn offer_of(key: &OfferKey, rows: &[SheetRow]) -> TariffOffer {
    let mut offer = TariffOffer::new(key.clone());
    // The first row of the group carries the offer-level attributes
    if let Some(first) = rows.first() {
        offer.unit_prices = first.unit_prices();
        offer.base_commission = first.decimal("comision_base");
        offer.active = first.flag("activa").unwrap_or(true);
        offer.featured = first.flag("destacada").unwrap_or(false);
    }
    offer
}

fn price_tier_of(offer_id: core_kernel::OfferId, row: &SheetRow) -> PriceTier {
    let mut tier = PriceTier::new(
        offer_id,
        row.decimal("consumo_desde").unwrap_or(Decimal::ZERO),
        row.decimal("consumo_hasta"),
    );
    tier.fixed_commission = row.decimal("comision_fija");
    tier.variable_commission = row.decimal("comision_variable");
    tier.agent_pct_override = row.decimal("pct_agente");
    tier.place_pct_override = row.decimal("pct_local");
    tier
}
