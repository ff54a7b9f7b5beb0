//! Settlement periods

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{DateRange, PeriodId, TenantId};
use domain_commission::LedgerEntry;

use crate::error::SettlementError;

/// Period state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodStatus {
    /// Accepting entries via the add-movements action
    Open,
    /// Closed out; attached entries are Settled; immutable
    Closed,
}

impl PeriodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodStatus::Open => "OPEN",
            PeriodStatus::Closed => "CLOSED",
        }
    }
}

impl std::str::FromStr for PeriodStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Ok(PeriodStatus::Open),
            "CLOSED" => Ok(PeriodStatus::Closed),
            other => Err(format!("unknown period status: {}", other)),
        }
    }
}

impl std::fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A date-bounded batch of ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementPeriod {
    pub id: PeriodId,
    pub tenant_id: TenantId,
    pub range: DateRange,
    pub status: PeriodStatus,
    pub agent_total: Decimal,
    pub place_total: Decimal,
    pub admin_total: Decimal,
    pub entry_count: i64,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SettlementPeriod {
    /// Creates an Open period for the range. Does not pull entries.
    pub fn open(tenant_id: TenantId, range: DateRange) -> Self {
        Self {
            id: PeriodId::new_v7(),
            tenant_id,
            range,
            status: PeriodStatus::Open,
            agent_total: Decimal::ZERO,
            place_total: Decimal::ZERO,
            admin_total: Decimal::ZERO,
            entry_count: 0,
            closed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PeriodStatus::Open
    }

    /// Whether this period would pull the entry in an add-movements pass:
    /// the period is open, the entry is pending and unattached, and it was
    /// created inside the period's range.
    pub fn accepts(&self, entry: &LedgerEntry) -> bool {
        self.is_open() && entry.is_period_candidate() && self.range.contains(entry.created_at)
    }

    /// Recomputes the aggregated totals from the attached entries.
    pub fn recompute_totals<'a>(&mut self, attached: impl IntoIterator<Item = &'a LedgerEntry>) {
        let mut agent = Decimal::ZERO;
        let mut place = Decimal::ZERO;
        let mut admin = Decimal::ZERO;
        let mut count = 0i64;

        for entry in attached {
            agent += entry.agent_amount;
            place += entry.place_amount;
            admin += entry.admin_amount;
            count += 1;
        }

        self.agent_total = agent;
        self.place_total = place;
        self.admin_total = admin;
        self.entry_count = count;
    }

    /// Closes the period. Closing is terminal; callers settle the attached
    /// entries in the same transaction.
    pub fn close(&mut self) -> Result<(), SettlementError> {
        if !self.is_open() {
            return Err(SettlementError::PeriodClosed(self.id));
        }
        self.status = PeriodStatus::Closed;
        self.closed_at = Some(Utc::now());
        Ok(())
    }
}
