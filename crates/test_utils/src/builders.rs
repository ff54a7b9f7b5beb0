//! Builders for domain aggregates

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{AgentId, Bounds, ClientId, LeadId, Pct, PlaceId, TenantId, Tier};
use domain_commission::{
    split, CalcKind, CommissionRule, EntryStatus, LedgerEntry, StakeholderPcts,
};
use domain_contract::Contract;

use crate::fixtures::FIXTURE;

/// Builds contracts; defaults to a confirmed contract on the shared
/// fixture with a 1000 taxable base.
pub struct ContractBuilder {
    tenant_id: TenantId,
    category: String,
    tier: Tier,
    agent_id: Option<AgentId>,
    place_id: Option<PlaceId>,
    taxable_base: Option<Decimal>,
    invoice_total: Option<Decimal>,
    confirmed: bool,
}

impl Default for ContractBuilder {
    fn default() -> Self {
        Self {
            tenant_id: FIXTURE.tenant_id,
            category: "luz".to_string(),
            tier: Tier::C1,
            agent_id: Some(FIXTURE.agent_id),
            place_id: Some(FIXTURE.place_id),
            taxable_base: Some(dec!(1000)),
            invoice_total: None,
            confirmed: true,
        }
    }
}

impl ContractBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn agent(mut self, agent_id: Option<AgentId>) -> Self {
        self.agent_id = agent_id;
        self
    }

    pub fn place(mut self, place_id: Option<PlaceId>) -> Self {
        self.place_id = place_id;
        self
    }

    pub fn taxable_base(mut self, base: Option<Decimal>) -> Self {
        self.taxable_base = base;
        self
    }

    pub fn draft(mut self) -> Self {
        self.confirmed = false;
        self
    }

    pub fn build(self) -> Contract {
        let mut contract = Contract::new(self.tenant_id, self.category, self.tier);
        contract.lead_id = Some(LeadId::new());
        contract.agent_id = self.agent_id;
        contract.place_id = self.place_id;
        contract.taxable_base = self.taxable_base;
        contract.invoice_total = self.invoice_total;
        if self.confirmed {
            contract.submit().expect("draft -> pending");
            contract.confirm(ClientId::new()).expect("pending -> confirmed");
        }
        contract
    }
}

/// Builds commission rules; defaults to the reference FIXED 80 rule.
pub struct RuleBuilder {
    tenant_id: Option<TenantId>,
    category: String,
    sub_category: Option<String>,
    tier: Tier,
    kind: CalcKind,
    fixed_amount: Decimal,
    percentage: Decimal,
    total_bounds: Bounds,
    agent_bounds: Bounds,
    special_place_bounds: Bounds,
}

impl Default for RuleBuilder {
    fn default() -> Self {
        Self {
            tenant_id: None,
            category: "luz".to_string(),
            sub_category: None,
            tier: Tier::C1,
            kind: CalcKind::Fixed,
            fixed_amount: dec!(80),
            percentage: Decimal::ZERO,
            total_bounds: Bounds::none(),
            agent_bounds: Bounds::none(),
            special_place_bounds: Bounds::none(),
        }
    }
}

impl RuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tenant(mut self, tenant_id: Option<TenantId>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn sub_category(mut self, sub: impl Into<String>) -> Self {
        self.sub_category = Some(sub.into());
        self
    }

    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn percent_of_base(mut self, percentage: Decimal) -> Self {
        self.kind = CalcKind::PercentOfBase;
        self.fixed_amount = Decimal::ZERO;
        self.percentage = percentage;
        self
    }

    pub fn fixed(mut self, amount: Decimal) -> Self {
        self.kind = CalcKind::Fixed;
        self.fixed_amount = amount;
        self
    }

    pub fn total_bounds(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.total_bounds = Bounds::new(min, max);
        self
    }

    pub fn agent_bounds(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.agent_bounds = Bounds::new(min, max);
        self
    }

    pub fn build(self) -> CommissionRule {
        let mut rule = CommissionRule::new(
            self.tenant_id,
            self.category,
            self.sub_category,
            self.tier,
            self.kind,
            self.fixed_amount,
            self.percentage,
        );
        rule.total_bounds = self.total_bounds;
        rule.agent_bounds = self.agent_bounds;
        rule.special_place_bounds = self.special_place_bounds;
        rule
    }
}

/// Builds ledger entries through the real settlement math: total and
/// split come from the rule, never from hand-typed amounts.
pub struct EntryBuilder {
    contract: Option<Contract>,
    rule: Option<CommissionRule>,
    agent_pct: Decimal,
    place_pct: Decimal,
    special_place: bool,
    created_at: Option<DateTime<Utc>>,
    status: EntryStatus,
}

impl Default for EntryBuilder {
    fn default() -> Self {
        Self {
            contract: None,
            rule: None,
            agent_pct: dec!(20),
            place_pct: dec!(10),
            special_place: false,
            created_at: None,
            status: EntryStatus::Pending,
        }
    }
}

impl EntryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contract(mut self, contract: Contract) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn rule(mut self, rule: CommissionRule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn percentages(mut self, agent: Decimal, place: Decimal) -> Self {
        self.agent_pct = agent;
        self.place_pct = place;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn settled(mut self) -> Self {
        self.status = EntryStatus::Settled;
        self
    }

    pub fn build(self) -> LedgerEntry {
        let contract = self.contract.unwrap_or_else(|| ContractBuilder::new().build());
        let rule = self.rule.unwrap_or_else(|| RuleBuilder::new().build());

        let base = contract.base_amount();
        let total = domain_commission::compute_total(&rule, base);
        let pcts = StakeholderPcts {
            agent: Pct::normalize(self.agent_pct),
            place: Pct::normalize(self.place_pct),
        };
        let amounts = split(total, &pcts, self.special_place, &rule);

        let mut entry = LedgerEntry::generated(&contract, &rule, base, total, pcts, amounts);
        if let Some(at) = self.created_at {
            entry.created_at = at;
        }
        if self.status == EntryStatus::Settled {
            entry.mark_settled().expect("pending -> settled");
        }
        entry
    }
}
