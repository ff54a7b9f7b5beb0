//! Tariff offers and price tiers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use core_kernel::{OfferId, PriceTierId};

/// The natural key of a tariff offer.
///
/// A real composite key type, usable directly as a map key instead of a
/// concatenated string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OfferKey {
    /// Offer type (e.g. "luz", "gas")
    pub offer_type: String,
    pub sub_type: Option<String>,
    pub company: String,
    pub name: String,
    /// Annex/version label of the price sheet
    pub annex: Option<String>,
}

impl fmt::Display for OfferKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.offer_type,
            self.sub_type.as_deref().unwrap_or("-"),
            self.company,
            self.name,
            self.annex.as_deref().unwrap_or("-"),
        )
    }
}

/// A tariff offer from an imported price sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffOffer {
    pub id: OfferId,
    pub key: OfferKey,
    /// Per-period unit prices (P1..P6), keyed by period label
    pub unit_prices: BTreeMap<String, Decimal>,
    /// Base admin commission; rules are derived when positive
    pub base_commission: Option<Decimal>,
    pub active: bool,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TariffOffer {
    pub fn new(key: OfferKey) -> Self {
        let now = Utc::now();
        Self {
            id: OfferId::new_v7(),
            key,
            unit_prices: BTreeMap::new(),
            base_commission: None,
            active: true,
            featured: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A consumption-bracketed price tier of an offer.
///
/// Keyed by (offer, consumption_from, consumption_to); an open upper end
/// (`None`) means "and above".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTier {
    pub id: PriceTierId,
    pub offer_id: OfferId,
    pub consumption_from: Decimal,
    pub consumption_to: Option<Decimal>,
    pub fixed_commission: Option<Decimal>,
    pub variable_commission: Option<Decimal>,
    /// Stakeholder percentage overrides for this tier, ambiguous scale
    pub agent_pct_override: Option<Decimal>,
    pub place_pct_override: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PriceTier {
    pub fn new(offer_id: OfferId, consumption_from: Decimal, consumption_to: Option<Decimal>) -> Self {
        let now = Utc::now();
        Self {
            id: PriceTierId::new_v7(),
            offer_id,
            consumption_from,
            consumption_to,
            fixed_commission: None,
            variable_commission: None,
            agent_pct_override: None,
            place_pct_override: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Label of the consumption bracket, used in the synthetic
    /// sub-category path of derived rules.
    pub fn bracket_label(&self) -> String {
        match self.consumption_to {
            Some(to) => format!("{}-{}", self.consumption_from.normalize(), to.normalize()),
            None => format!("{}+", self.consumption_from.normalize()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_offer_key_orders_as_map_key() {
        let mut map = BTreeMap::new();
        let key_a = OfferKey {
            offer_type: "luz".into(),
            sub_type: None,
            company: "endesa".into(),
            name: "one".into(),
            annex: Some("2024".into()),
        };
        let key_b = OfferKey {
            annex: Some("2025".into()),
            ..key_a.clone()
        };

        map.insert(key_a.clone(), 1);
        map.insert(key_b, 2);
        map.insert(key_a.clone(), 3);

        assert_eq!(map.len(), 2);
        assert_eq!(map[&key_a], 3);
    }

    #[test]
    fn test_bracket_label() {
        let offer = TariffOffer::new(OfferKey {
            offer_type: "luz".into(),
            sub_type: None,
            company: "endesa".into(),
            name: "one".into(),
            annex: None,
        });

        let bounded = PriceTier::new(offer.id, dec!(3500), Some(dec!(10000)));
        assert_eq!(bounded.bracket_label(), "3500-10000");

        let open = PriceTier::new(offer.id, dec!(10000), None);
        assert_eq!(open.bracket_label(), "10000+");
    }
}
