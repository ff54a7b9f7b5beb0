//! Proptest strategies for commission inputs

use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::Tier;

/// A monetary amount between 0.00 and 100,000.00, cent precision.
pub fn money_amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// A stored percentage in either legacy convention: fraction (0.00–1.00)
/// or percent scale (1–100).
pub fn stored_percentage() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        (0i64..=100i64).prop_map(|hundredths| Decimal::new(hundredths, 2)),
        (1i64..=100i64).prop_map(Decimal::from),
    ]
}

/// Any commission tier.
pub fn tier() -> impl Strategy<Value = Tier> {
    prop_oneof![
        Just(Tier::C1),
        Just(Tier::C2),
        Just(Tier::C3),
        Just(Tier::Special),
    ]
}
