//! Stakeholder split of the total commission
//!
//! The split is agent-first, place-second; the admin (tenant) always
//! absorbs the remainder. When over-generous clamps push agent + place
//! past the total, the admin share is floored at zero and the other
//! shares are left as computed; the nominal total is allowed to drift
//! rather than re-normalizing the clamped shares.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{round2, Pct};

use crate::rule::CommissionRule;

/// Normalized percentages for the contract's stakeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeholderPcts {
    pub agent: Pct,
    pub place: Pct,
}

/// Per-party amounts of one settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub agent_amount: Decimal,
    pub place_amount: Decimal,
    pub admin_amount: Decimal,
}

impl Split {
    pub fn sum(&self) -> Decimal {
        self.agent_amount + self.place_amount + self.admin_amount
    }
}

/// Splits a total commission among agent, place, and admin.
///
/// Agent and place shares are rounded at the cent, then clamped: the agent
/// to the rule's agent bounds, the place to the special-place bounds when
/// (and only when) the place is flagged special. Admin takes
/// `max(0, total - agent - place)`.
pub fn split(
    total: Decimal,
    pcts: &StakeholderPcts,
    special_place: bool,
    rule: &CommissionRule,
) -> Split {
    let agent_amount = rule.agent_bounds.clamp(pcts.agent.apply(total));

    let place_raw = pcts.place.apply(total);
    let place_amount = if special_place {
        rule.special_place_bounds.clamp(place_raw)
    } else {
        place_raw
    };

    let admin_amount = round2(total - agent_amount - place_amount).max(Decimal::ZERO);

    Split {
        agent_amount,
        place_amount,
        admin_amount,
    }
}
