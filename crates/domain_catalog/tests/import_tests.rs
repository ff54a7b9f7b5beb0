//! Catalog importer tests against an in-memory store

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{OfferId, RequestContext, Role, TenantId, Tier};
use domain_catalog::{
    CatalogError, CatalogImporter, CatalogStore, OfferKey, PriceTier, SheetRow, TariffOffer,
    Upserted,
};
use domain_commission::{CalcKind, CommissionRule};

#[derive(Default)]
struct MemoryCatalog {
    offers: Mutex<BTreeMap<OfferKey, TariffOffer>>,
    tiers: Mutex<Vec<PriceTier>>,
    rules: Mutex<Vec<CommissionRule>>,
    /// (category, sub_category, tier) -> percentage-of-base
    tier_pcts: Mutex<BTreeMap<(String, Option<String>, String), Decimal>>,
}

impl MemoryCatalog {
    fn configure_pct(&self, category: &str, sub: Option<&str>, tier: Tier, pct: Decimal) {
        self.tier_pcts.lock().unwrap().insert(
            (category.to_string(), sub.map(String::from), tier.as_str().to_string()),
            pct,
        );
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn upsert_offer(
        &self,
        offer: &TariffOffer,
    ) -> Result<(OfferId, Upserted), CatalogError> {
        let mut offers = self.offers.lock().unwrap();
        if let Some(existing) = offers.get_mut(&offer.key) {
            existing.unit_prices = offer.unit_prices.clone();
            existing.base_commission = offer.base_commission;
            Ok((existing.id, Upserted::Updated))
        } else {
            offers.insert(offer.key.clone(), offer.clone());
            Ok((offer.id, Upserted::Created))
        }
    }

    async fn upsert_tier(&self, tier: &PriceTier) -> Result<Upserted, CatalogError> {
        let mut tiers = self.tiers.lock().unwrap();
        if let Some(existing) = tiers.iter_mut().find(|t| {
            t.offer_id == tier.offer_id
                && t.consumption_from == tier.consumption_from
                && t.consumption_to == tier.consumption_to
        }) {
            existing.fixed_commission = tier.fixed_commission;
            existing.variable_commission = tier.variable_commission;
            Ok(Upserted::Updated)
        } else {
            tiers.push(tier.clone());
            Ok(Upserted::Created)
        }
    }

    async fn upsert_rule(&self, rule: &CommissionRule) -> Result<Upserted, CatalogError> {
        let mut rules = self.rules.lock().unwrap();
        if let Some(existing) = rules.iter_mut().find(|r| {
            r.tenant_id == rule.tenant_id
                && r.category == rule.category
                && r.sub_category == rule.sub_category
                && r.tier == rule.tier
        }) {
            existing.fixed_amount = rule.fixed_amount;
            Ok(Upserted::Updated)
        } else {
            rules.push(rule.clone());
            Ok(Upserted::Created)
        }
    }

    async fn tier_percentage(
        &self,
        category: &str,
        sub_category: Option<&str>,
        tier: Tier,
    ) -> Result<Option<Decimal>, CatalogError> {
        Ok(self
            .tier_pcts
            .lock()
            .unwrap()
            .get(&(
                category.to_string(),
                sub_category.map(String::from),
                tier.as_str().to_string(),
            ))
            .copied())
    }
}

fn sheet_row(pairs: &[(&str, serde_json::Value)]) -> SheetRow {
    SheetRow(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

fn endesa_rows() -> Vec<SheetRow> {
    vec![
        sheet_row(&[
            ("tipo", serde_json::json!("luz")),
            ("subtipo", serde_json::json!("2.0TD")),
            ("compania", serde_json::json!("endesa")),
            ("nombre", serde_json::json!("one")),
            ("anexo", serde_json::json!("2024-03")),
            ("consumo_desde", serde_json::json!(0)),
            ("consumo_hasta", serde_json::json!(3500)),
            ("precio_p1", serde_json::json!(0.142)),
            ("comision_base", serde_json::json!(100)),
        ]),
        sheet_row(&[
            ("tipo", serde_json::json!("luz")),
            ("subtipo", serde_json::json!("2.0TD")),
            ("compania", serde_json::json!("endesa")),
            ("nombre", serde_json::json!("one")),
            ("anexo", serde_json::json!("2024-03")),
            ("consumo_desde", serde_json::json!(3500)),
            ("comision_base", serde_json::json!(100)),
        ]),
    ]
}

fn admin_ctx() -> RequestContext {
    RequestContext::new(Role::Admin, TenantId::new())
}

fn full_config(store: &MemoryCatalog) {
    store.configure_pct("luz", None, Tier::C1, dec!(50));
    store.configure_pct("luz", None, Tier::C2, dec!(60));
    store.configure_pct("luz", None, Tier::C3, dec!(70));
    store.configure_pct("luz", None, Tier::Special, dec!(80));
}

#[tokio::test]
async fn import_creates_offer_tiers_and_rules() {
    let store = Arc::new(MemoryCatalog::default());
    full_config(&store);
    let importer = CatalogImporter::new(Arc::clone(&store) as Arc<dyn CatalogStore>);

    let summary = importer.import(&admin_ctx(), "luz", endesa_rows()).await.unwrap();

    // Two rows, one offer key
    assert_eq!(summary.offers_created, 1);
    assert_eq!(summary.offers_updated, 0);
    assert_eq!(summary.tiers_created, 2);
    // One rule per commission tier per consumption bracket
    assert_eq!(summary.rules_created, 8);
    assert_eq!(summary.rows_skipped, 0);

    let rules = store.rules.lock().unwrap();
    let c1 = rules
        .iter()
        .find(|r| r.tier == Tier::C1 && r.sub_category.as_deref() == Some("endesa/one/2024-03/0-3500"))
        .unwrap();
    assert_eq!(c1.kind, CalcKind::Fixed);
    // 50% of the 100 base commission
    assert_eq!(c1.fixed_amount, dec!(50.00));

    let special = rules
        .iter()
        .find(|r| r.tier == Tier::Special && r.sub_category.as_deref() == Some("endesa/one/2024-03/3500+"))
        .unwrap();
    assert_eq!(special.fixed_amount, dec!(80.00));
}

#[tokio::test]
async fn reimport_updates_instead_of_duplicating() {
    let store = Arc::new(MemoryCatalog::default());
    full_config(&store);
    let importer = CatalogImporter::new(Arc::clone(&store) as Arc<dyn CatalogStore>);

    let ctx = admin_ctx();
    importer.import(&ctx, "luz", endesa_rows()).await.unwrap();
    let second = importer.import(&ctx, "luz", endesa_rows()).await.unwrap();

    assert_eq!(second.offers_created, 0);
    assert_eq!(second.offers_updated, 1);
    assert_eq!(second.tiers_created, 0);
    assert_eq!(second.tiers_updated, 2);
    assert_eq!(second.rules_created, 0);
    assert_eq!(second.rules_updated, 8);

    assert_eq!(store.offers.lock().unwrap().len(), 1);
    assert_eq!(store.tiers.lock().unwrap().len(), 2);
    assert_eq!(store.rules.lock().unwrap().len(), 8);
}

#[tokio::test]
async fn sub_category_config_overrides_category_wide() {
    let store = Arc::new(MemoryCatalog::default());
    full_config(&store);
    // Override for the 2.0TD sub-type
    store.configure_pct("luz", Some("2.0TD"), Tier::C1, dec!(90));
    let importer = CatalogImporter::new(Arc::clone(&store) as Arc<dyn CatalogStore>);

    importer.import(&admin_ctx(), "luz", endesa_rows()).await.unwrap();

    let rules = store.rules.lock().unwrap();
    let c1 = rules
        .iter()
        .find(|r| r.tier == Tier::C1 && r.sub_category.as_deref() == Some("endesa/one/2024-03/0-3500"))
        .unwrap();
    assert_eq!(c1.fixed_amount, dec!(90.00));
    // Tiers without an override still use the category-wide value
    let c2 = rules
        .iter()
        .find(|r| r.tier == Tier::C2 && r.sub_category.as_deref() == Some("endesa/one/2024-03/0-3500"))
        .unwrap();
    assert_eq!(c2.fixed_amount, dec!(60.00));
}

#[tokio::test]
async fn unconfigured_tiers_are_skipped() {
    let store = Arc::new(MemoryCatalog::default());
    store.configure_pct("luz", None, Tier::C1, dec!(50));
    let importer = CatalogImporter::new(Arc::clone(&store) as Arc<dyn CatalogStore>);

    let summary = importer.import(&admin_ctx(), "luz", endesa_rows()).await.unwrap();

    // Only C1 is configured: one rule per bracket
    assert_eq!(summary.rules_created, 2);
}

#[tokio::test]
async fn rows_without_key_are_counted_as_skipped() {
    let store = Arc::new(MemoryCatalog::default());
    let importer = CatalogImporter::new(Arc::clone(&store) as Arc<dyn CatalogStore>);

    let rows = vec![sheet_row(&[("tipo", serde_json::json!("luz"))])];
    let summary = importer.import(&admin_ctx(), "luz", rows).await.unwrap();

    assert_eq!(summary.rows_skipped, 1);
    assert_eq!(summary.offers_created, 0);
}

#[tokio::test]
async fn rows_without_base_commission_derive_no_rules() {
    let store = Arc::new(MemoryCatalog::default());
    full_config(&store);
    let importer = CatalogImporter::new(Arc::clone(&store) as Arc<dyn CatalogStore>);

    let rows = vec![sheet_row(&[
        ("tipo", serde_json::json!("gas")),
        ("compania", serde_json::json!("naturgy")),
        ("nombre", serde_json::json!("hogar")),
    ])];
    let summary = importer.import(&admin_ctx(), "gas", rows).await.unwrap();

    assert_eq!(summary.offers_created, 1);
    assert_eq!(summary.rules_created, 0);
}

#[tokio::test]
async fn import_is_admin_only() {
    let store = Arc::new(MemoryCatalog::default());
    let importer = CatalogImporter::new(Arc::clone(&store) as Arc<dyn CatalogStore>);

    let ctx = RequestContext::new(Role::Agent, TenantId::new());
    let err = importer.import(&ctx, "luz", endesa_rows()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Unauthorized(_)));
}
