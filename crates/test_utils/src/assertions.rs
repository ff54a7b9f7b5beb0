//! Assertion helpers for commission invariants

use rust_decimal::Decimal;

use domain_commission::LedgerEntry;

/// Asserts the split conservation invariant on an entry:
/// `agent + place + admin == total` and no share is negative.
///
/// # Panics
///
/// Panics with a diagnostic message when the invariant does not hold.
pub fn assert_split_conserved(entry: &LedgerEntry) {
    let sum = entry.agent_amount + entry.place_amount + entry.admin_amount;
    assert_eq!(
        sum, entry.total_amount,
        "split does not conserve total: {} + {} + {} = {} != {}",
        entry.agent_amount, entry.place_amount, entry.admin_amount, sum, entry.total_amount
    );
    assert!(entry.agent_amount >= Decimal::ZERO, "negative agent amount");
    assert!(entry.place_amount >= Decimal::ZERO, "negative place amount");
    assert!(entry.admin_amount >= Decimal::ZERO, "negative admin amount");
}
