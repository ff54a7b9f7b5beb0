//! Monetary arithmetic for commission calculations
//!
//! Commission amounts are euro values carried as `rust_decimal::Decimal`.
//! Every intermediate value is rounded half-up at the cent boundary
//! immediately after it is computed, so a settlement is reproducible from
//! its stored inputs alone.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rounds a monetary amount to two decimal places, half-up at the cent.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A commission percentage held on the percent scale (`15` means 15%).
///
/// Stored data carries both conventions: legacy rows hold fractions
/// (`0.15`), newer rows hold whole percentages (`15`). [`Pct::normalize`]
/// keeps the legacy heuristic: a value <= 1 is a fraction and is scaled up.
/// The heuristic lives only here; everything downstream sees percent scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pct(Decimal);

impl Pct {
    pub const ZERO: Pct = Pct(Decimal::ZERO);

    /// Normalizes a stored value of ambiguous scale to percent scale.
    pub fn normalize(value: Decimal) -> Self {
        if value <= Decimal::ONE {
            Self(value * dec!(100))
        } else {
            Self(value)
        }
    }

    /// Wraps a value already known to be on the percent scale.
    pub fn from_percent(value: Decimal) -> Self {
        Self(value)
    }

    pub fn as_percent(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Applies the percentage to a base amount, rounding at the cent.
    pub fn apply(&self, base: Decimal) -> Decimal {
        round2(base * self.0 / dec!(100))
    }
}

impl fmt::Display for Pct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

/// Optional lower/upper clamp applied to a computed amount.
///
/// Unset ends are no-ops. The clamped value is re-rounded so a fractional
/// bound cannot smuggle sub-cent precision into a stored amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl Bounds {
    pub fn new(min: Option<Decimal>, max: Option<Decimal>) -> Self {
        Self { min, max }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn clamp(&self, amount: Decimal) -> Decimal {
        let mut clamped = amount;
        if let Some(min) = self.min {
            if clamped < min {
                clamped = min;
            }
        }
        if let Some(max) = self.max {
            if clamped > max {
                clamped = max;
            }
        }
        round2(clamped)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "[{}, {}]", min, max),
            (Some(min), None) => write!(f, "[{}, ∞)", min),
            (None, Some(max)) => write!(f, "(-∞, {}]", max),
            (None, None) => write!(f, "(-∞, ∞)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_half_up() {
        assert_eq!(round2(dec!(2.345)), dec!(2.35));
        assert_eq!(round2(dec!(2.344)), dec!(2.34));
        assert_eq!(round2(dec!(2.5)), dec!(2.50));
        assert_eq!(round2(dec!(-2.345)), dec!(-2.35));
    }

    #[test]
    fn test_normalize_fraction_and_percent_agree() {
        let from_fraction = Pct::normalize(dec!(0.15));
        let from_percent = Pct::normalize(dec!(15));

        assert_eq!(from_fraction.as_percent(), dec!(15.00));
        assert_eq!(from_percent.as_percent(), dec!(15));
        assert_eq!(from_fraction.apply(dec!(200)), from_percent.apply(dec!(200)));
    }

    #[test]
    fn test_normalize_boundary_value() {
        // Exactly 1 is still treated as a fraction (100%)
        assert_eq!(Pct::normalize(Decimal::ONE).as_percent(), dec!(100));
        assert_eq!(Pct::normalize(dec!(1.01)).as_percent(), dec!(1.01));
    }

    #[test]
    fn test_pct_apply_rounds_at_cent() {
        // 33.33% of 10.01 = 3.336333 -> 3.34
        let pct = Pct::from_percent(dec!(33.33));
        assert_eq!(pct.apply(dec!(10.01)), dec!(3.34));
    }

    #[test]
    fn test_bounds_clamp() {
        let bounds = Bounds::new(Some(dec!(50)), Some(dec!(200)));
        assert_eq!(bounds.clamp(dec!(10)), dec!(50));
        assert_eq!(bounds.clamp(dec!(500)), dec!(200));
        assert_eq!(bounds.clamp(dec!(120)), dec!(120));
    }

    #[test]
    fn test_bounds_unset_ends_are_noops() {
        let bounds = Bounds::none();
        assert!(bounds.is_unbounded());
        assert_eq!(bounds.clamp(dec!(123.45)), dec!(123.45));

        let min_only = Bounds::new(Some(dec!(5)), None);
        assert_eq!(min_only.clamp(dec!(1000)), dec!(1000));
        assert_eq!(min_only.clamp(dec!(1)), dec!(5));
    }
}
