//! Total commission computation
//!
//! Every intermediate value is rounded half-up at the cent immediately
//! after it is produced, so the stored amounts are reproducible from the
//! rule and base alone.

use rust_decimal::Decimal;

use core_kernel::{round2, Pct};

use crate::rule::{CalcKind, CommissionRule};

/// Computes the total commission for a rule and base amount.
///
/// FIXED ignores the base; MIXED adds a percentage of the base on top of
/// the fixed amount; PERCENT_OF_BASE applies the percentage alone. The
/// result is clamped to the rule's total bounds (unset ends are no-ops).
pub fn compute_total(rule: &CommissionRule, base_amount: Decimal) -> Decimal {
    let pct = Pct::from_percent(rule.percentage);
    let raw = match rule.kind {
        CalcKind::Fixed => round2(rule.fixed_amount),
        CalcKind::PercentOfBase => pct.apply(base_amount),
        CalcKind::Mixed => round2(round2(rule.fixed_amount) + pct.apply(base_amount)),
    };
    rule.total_bounds.clamp(raw)
}
