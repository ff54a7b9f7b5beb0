//! Ledger entries ("asientos") and their derived movements
//!
//! A ledger entry is the record of one computed commission split for one
//! contract. Entries are never deleted: they are terminated by voiding
//! (with a mandatory reason) or by settlement inside a closed period.
//! Voiding touches state and metadata only; monetary fields are frozen
//! at creation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{
    AgentId, ClientId, ContractId, LeadId, LedgerEntryId, MovementId, PeriodId, PlaceId, RuleId,
    TenantId, Tier,
};
use domain_contract::Contract;

use crate::error::CommissionError;
use crate::rule::CommissionRule;
use crate::split::{Split, StakeholderPcts};

/// Ledger entry state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    /// Created, not yet part of a closed settlement period
    Pending,
    /// Locked by a closed settlement period; terminal
    Settled,
    /// Explicitly annulled with a reason; terminal, excluded everywhere
    Voided,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "PENDING",
            EntryStatus::Settled => "SETTLED",
            EntryStatus::Voided => "VOIDED",
        }
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(EntryStatus::Pending),
            "SETTLED" => Ok(EntryStatus::Settled),
            "VOIDED" => Ok(EntryStatus::Voided),
            other => Err(format!("unknown entry status: {}", other)),
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The immutable-once-settled record of a commission split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub tenant_id: TenantId,
    /// One entry per contract, enforced by a storage uniqueness constraint
    pub contract_id: ContractId,
    pub category: String,
    pub sub_category: Option<String>,
    pub tier: Tier,
    pub rule_id: RuleId,
    pub base_amount: Decimal,
    pub total_amount: Decimal,
    pub agent_amount: Decimal,
    pub place_amount: Decimal,
    pub admin_amount: Decimal,
    /// Percentages snapshotted at settlement time, percent scale
    pub agent_pct: Decimal,
    pub place_pct: Decimal,
    pub status: EntryStatus,
    pub void_reason: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    /// Settlement period this entry is attached to, if any
    pub period_id: Option<PeriodId>,
    // Denormalized references for reporting
    pub lead_id: Option<LeadId>,
    pub client_id: Option<ClientId>,
    pub agent_id: Option<AgentId>,
    pub place_id: Option<PlaceId>,
    pub created_at: DateTime<Utc>,
}

/// Result of a void call; `duplicate` marks the idempotent repeat.
#[derive(Debug, Clone)]
pub struct VoidOutcome {
    pub entry: LedgerEntry,
    pub duplicate: bool,
}

impl LedgerEntry {
    /// Builds the entry produced by settling a confirmed contract.
    pub fn generated(
        contract: &Contract,
        rule: &CommissionRule,
        base_amount: Decimal,
        total_amount: Decimal,
        pcts: StakeholderPcts,
        split: Split,
    ) -> Self {
        Self {
            id: LedgerEntryId::new_v7(),
            tenant_id: contract.tenant_id,
            contract_id: contract.id,
            category: contract.category.clone(),
            sub_category: contract.sub_category.clone(),
            tier: contract.tier,
            rule_id: rule.id,
            base_amount,
            total_amount,
            agent_amount: split.agent_amount,
            place_amount: split.place_amount,
            admin_amount: split.admin_amount,
            agent_pct: pcts.agent.as_percent(),
            place_pct: pcts.place.as_percent(),
            status: EntryStatus::Pending,
            void_reason: None,
            voided_at: None,
            period_id: None,
            lead_id: contract.lead_id,
            client_id: contract.client_id,
            agent_id: contract.agent_id,
            place_id: contract.place_id,
            created_at: Utc::now(),
        }
    }

    /// Voids a pending entry.
    ///
    /// Requires a non-empty reason. Voiding an already-voided entry is an
    /// idempotent no-op reporting the original void metadata; voiding a
    /// settled entry is a precondition error.
    pub fn void(&mut self, reason: &str) -> Result<bool, CommissionError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CommissionError::EmptyVoidReason(self.id));
        }
        match self.status {
            EntryStatus::Voided => Ok(false),
            EntryStatus::Settled => Err(CommissionError::EntryAlreadySettled(self.id)),
            EntryStatus::Pending => {
                self.status = EntryStatus::Voided;
                self.void_reason = Some(reason.to_string());
                self.voided_at = Some(Utc::now());
                Ok(true)
            }
        }
    }

    /// Marks the entry settled; only the period close path calls this.
    pub fn mark_settled(&mut self) -> Result<(), CommissionError> {
        match self.status {
            EntryStatus::Pending => {
                self.status = EntryStatus::Settled;
                Ok(())
            }
            _ => Err(CommissionError::EntryNotPending(self.id, self.status)),
        }
    }

    pub fn is_voided(&self) -> bool {
        self.status == EntryStatus::Voided
    }

    /// Pending, unattached entries are what settlement periods pick up.
    pub fn is_period_candidate(&self) -> bool {
        self.status == EntryStatus::Pending && self.period_id.is_none()
    }

    /// Derives the per-party movement rows for this entry.
    ///
    /// Movements are denormalized display rows, not a source of truth:
    /// their creation is best-effort and their loss is recoverable from
    /// the entry itself.
    pub fn derive_movements(&self) -> Vec<Movement> {
        let mut movements = Vec::with_capacity(3);
        if self.agent_id.is_some() {
            movements.push(Movement::generated(
                self.id,
                PartyRole::Agent,
                self.agent_id.map(Into::into),
                self.agent_amount,
            ));
        }
        if self.place_id.is_some() {
            movements.push(Movement::generated(
                self.id,
                PartyRole::Place,
                self.place_id.map(Into::into),
                self.place_amount,
            ));
        }
        movements.push(Movement::generated(
            self.id,
            PartyRole::Admin,
            None,
            self.admin_amount,
        ));
        movements
    }
}

/// Movement kind; only generation exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Generated,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Generated => "GENERATED",
        }
    }
}

/// Destination of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyRole {
    Agent,
    Place,
    Admin,
}

impl PartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyRole::Agent => "AGENT",
            PartyRole::Place => "PLACE",
            PartyRole::Admin => "ADMIN",
        }
    }
}

impl std::str::FromStr for PartyRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AGENT" => Ok(PartyRole::Agent),
            "PLACE" => Ok(PartyRole::Place),
            "ADMIN" => Ok(PartyRole::Admin),
            other => Err(format!("unknown party role: {}", other)),
        }
    }
}

/// A denormalized per-party line item derived from a ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub entry_id: LedgerEntryId,
    pub kind: MovementKind,
    pub role: PartyRole,
    pub party_id: Option<uuid::Uuid>,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    fn generated(
        entry_id: LedgerEntryId,
        role: PartyRole,
        party_id: Option<uuid::Uuid>,
        amount: Decimal,
    ) -> Self {
        Self {
            id: MovementId::new_v7(),
            entry_id,
            kind: MovementKind::Generated,
            role,
            party_id,
            amount,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::CalcKind;
    use crate::split::split;
    use core_kernel::Pct;
    use rust_decimal_macros::dec;

    fn entry() -> LedgerEntry {
        let tenant = TenantId::new();
        let mut contract = Contract::new(tenant, "luz", Tier::C1);
        contract.agent_id = Some(AgentId::new());
        contract.place_id = Some(PlaceId::new());
        let rule = CommissionRule::new(
            Some(tenant),
            "luz",
            None,
            Tier::C1,
            CalcKind::Fixed,
            dec!(80),
            Decimal::ZERO,
        );
        let pcts = StakeholderPcts {
            agent: Pct::from_percent(dec!(20)),
            place: Pct::from_percent(dec!(10)),
        };
        let amounts = split(dec!(80), &pcts, false, &rule);
        LedgerEntry::generated(&contract, &rule, dec!(1000), dec!(80), pcts, amounts)
    }

    #[test]
    fn test_void_requires_reason() {
        let mut entry = entry();
        assert!(matches!(
            entry.void("  "),
            Err(CommissionError::EmptyVoidReason(_))
        ));
        assert_eq!(entry.status, EntryStatus::Pending);
    }

    #[test]
    fn test_void_transitions_once() {
        let mut entry = entry();
        assert!(entry.void("duplicated contract").unwrap());
        assert_eq!(entry.status, EntryStatus::Voided);
        assert_eq!(entry.void_reason.as_deref(), Some("duplicated contract"));
        let first_voided_at = entry.voided_at;

        // Second void is a no-op keeping the original metadata
        assert!(!entry.void("another reason").unwrap());
        assert_eq!(entry.void_reason.as_deref(), Some("duplicated contract"));
        assert_eq!(entry.voided_at, first_voided_at);
    }

    #[test]
    fn test_void_preserves_monetary_fields() {
        let mut entry = entry();
        let (total, agent, place, admin) = (
            entry.total_amount,
            entry.agent_amount,
            entry.place_amount,
            entry.admin_amount,
        );
        entry.void("client backed out").unwrap();
        assert_eq!(entry.total_amount, total);
        assert_eq!(entry.agent_amount, agent);
        assert_eq!(entry.place_amount, place);
        assert_eq!(entry.admin_amount, admin);
    }

    #[test]
    fn test_settled_entry_cannot_be_voided() {
        let mut entry = entry();
        entry.mark_settled().unwrap();
        assert!(matches!(
            entry.void("too late"),
            Err(CommissionError::EntryAlreadySettled(_))
        ));
    }

    #[test]
    fn test_period_candidate_predicate() {
        let mut entry = entry();
        assert!(entry.is_period_candidate());

        entry.period_id = Some(PeriodId::new());
        assert!(!entry.is_period_candidate());

        entry.period_id = None;
        entry.void("annulled").unwrap();
        assert!(!entry.is_period_candidate());
    }

    #[test]
    fn test_movements_cover_all_parties() {
        let entry = entry();
        let movements = entry.derive_movements();
        assert_eq!(movements.len(), 3);

        let total: Decimal = movements.iter().map(|m| m.amount).sum();
        assert_eq!(total, entry.total_amount);

        let admin = movements
            .iter()
            .find(|m| m.role == PartyRole::Admin)
            .unwrap();
        assert!(admin.party_id.is_none());
        assert_eq!(admin.amount, dec!(56.00));
    }

    #[test]
    fn test_movements_skip_absent_parties() {
        let tenant = TenantId::new();
        let contract = Contract::new(tenant, "luz", Tier::C1);
        let rule = CommissionRule::new(
            Some(tenant),
            "luz",
            None,
            Tier::C1,
            CalcKind::Fixed,
            dec!(80),
            Decimal::ZERO,
        );
        let pcts = StakeholderPcts {
            agent: Pct::ZERO,
            place: Pct::ZERO,
        };
        let amounts = split(dec!(80), &pcts, false, &rule);
        let entry = LedgerEntry::generated(&contract, &rule, dec!(0), dec!(80), pcts, amounts);

        let movements = entry.derive_movements();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].role, PartyRole::Admin);
    }
}
