//! Settlement engine tests against an in-memory store

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{
    AgentId, Bounds, ContractId, LedgerEntryId, PlaceId, RequestContext, Role, TenantId, Tier,
};
use domain_commission::{
    CalcKind, CommissionError, CommissionRule, LedgerEntry, Movement, SettlementEngine,
    SettlementStore, StakeholderSnapshot, StoreError,
};
use domain_contract::Contract;

#[derive(Default)]
struct MemoryStore {
    contracts: Mutex<HashMap<ContractId, Contract>>,
    entries: Mutex<HashMap<LedgerEntryId, LedgerEntry>>,
    movements: Mutex<Vec<Movement>>,
    rules: Mutex<Vec<CommissionRule>>,
    agent_pcts: Mutex<HashMap<AgentId, Decimal>>,
    place_pcts: Mutex<HashMap<PlaceId, (Decimal, bool)>>,
    fail_movements: AtomicBool,
    /// Entry another caller is about to win the insert race with; invisible
    /// to reads until our insert collides with the constraint.
    racing_entry: Mutex<Option<LedgerEntry>>,
    race_revealed: AtomicBool,
}

impl MemoryStore {
    fn add_contract(&self, contract: Contract) {
        self.contracts.lock().unwrap().insert(contract.id, contract);
    }

    fn add_rule(&self, rule: CommissionRule) {
        self.rules.lock().unwrap().push(rule);
    }

    fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn movement_count(&self) -> usize {
        self.movements.lock().unwrap().len()
    }
}

#[async_trait]
impl SettlementStore for MemoryStore {
    async fn find_contract(
        &self,
        scope: Option<TenantId>,
        id: ContractId,
    ) -> Result<Option<Contract>, StoreError> {
        Ok(self
            .contracts
            .lock()
            .unwrap()
            .get(&id)
            .filter(|c| scope.map_or(true, |tenant| c.tenant_id == tenant))
            .cloned())
    }

    async fn find_entry_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        if self.race_revealed.load(Ordering::SeqCst) {
            if let Some(raced) = self.racing_entry.lock().unwrap().as_ref() {
                if raced.contract_id == contract_id {
                    return Ok(Some(raced.clone()));
                }
            }
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .find(|e| e.contract_id == contract_id)
            .cloned())
    }

    async fn find_entry(
        &self,
        scope: Option<TenantId>,
        id: LedgerEntryId,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&id)
            .filter(|e| scope.map_or(true, |tenant| e.tenant_id == tenant))
            .cloned())
    }

    async fn resolve_rule(
        &self,
        tenant_id: TenantId,
        category: &str,
        sub_category: Option<&str>,
        tier: Tier,
    ) -> Result<Option<CommissionRule>, StoreError> {
        let rules = self.rules.lock().unwrap();
        Ok(domain_commission::resolve(&rules, tenant_id, category, sub_category, tier).cloned())
    }

    async fn stakeholder_snapshot(
        &self,
        contract: &Contract,
    ) -> Result<StakeholderSnapshot, StoreError> {
        let agent_pct = contract
            .agent_id
            .and_then(|id| self.agent_pcts.lock().unwrap().get(&id).copied());
        let place = contract
            .place_id
            .and_then(|id| self.place_pcts.lock().unwrap().get(&id).copied());
        Ok(StakeholderSnapshot {
            agent_pct,
            place_pct: place.map(|(pct, _)| pct),
            special_place: place.map(|(_, special)| special).unwrap_or(false),
        })
    }

    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        if self.racing_entry.lock().unwrap().is_some() {
            self.race_revealed.store(true, Ordering::SeqCst);
            return Err(StoreError::DuplicateEntry(entry.contract_id));
        }
        let mut entries = self.entries.lock().unwrap();
        if entries.values().any(|e| e.contract_id == entry.contract_id) {
            return Err(StoreError::DuplicateEntry(entry.contract_id));
        }
        entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn insert_movements(&self, movements: &[Movement]) -> Result<(), StoreError> {
        if self.fail_movements.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("movements table unavailable".into()));
        }
        self.movements.lock().unwrap().extend_from_slice(movements);
        Ok(())
    }

    async fn update_void(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(entry.id, entry.clone());
        Ok(())
    }
}

struct Scenario {
    store: Arc<MemoryStore>,
    ctx: RequestContext,
    contract_id: ContractId,
}

/// Confirmed contract: base 1000, tier C1, agent at 20% (stored as a
/// fraction), place at 10%, place not special.
fn confirmed_scenario() -> Scenario {
    let tenant = TenantId::new();
    let agent = AgentId::new();
    let place = PlaceId::new();

    let mut contract = Contract::new(tenant, "luz", Tier::C1);
    contract.agent_id = Some(agent);
    contract.place_id = Some(place);
    contract.lead_id = Some(core_kernel::LeadId::new());
    contract.taxable_base = Some(dec!(1000));
    contract.submit().unwrap();
    contract.confirm(core_kernel::ClientId::new()).unwrap();
    let contract_id = contract.id;

    let store = Arc::new(MemoryStore::default());
    store.add_contract(contract);
    store.agent_pcts.lock().unwrap().insert(agent, dec!(0.20));
    store
        .place_pcts
        .lock()
        .unwrap()
        .insert(place, (dec!(0.10), false));

    Scenario {
        store,
        ctx: RequestContext::new(Role::Admin, tenant),
        contract_id,
    }
}

fn fixed_rule_80() -> CommissionRule {
    CommissionRule::new(
        None,
        "luz",
        None,
        Tier::C1,
        CalcKind::Fixed,
        dec!(80),
        Decimal::ZERO,
    )
}

#[tokio::test]
async fn settle_fixed_rule_reference_scenario() {
    let scenario = confirmed_scenario();
    scenario.store.add_rule(fixed_rule_80());
    let engine = SettlementEngine::new(Arc::clone(&scenario.store) as Arc<dyn SettlementStore>);

    let outcome = engine.settle(&scenario.ctx, scenario.contract_id).await.unwrap();

    assert!(!outcome.duplicate);
    let entry = &outcome.entry;
    assert_eq!(entry.total_amount, dec!(80.00));
    assert_eq!(entry.agent_amount, dec!(16.00));
    assert_eq!(entry.place_amount, dec!(8.00));
    assert_eq!(entry.admin_amount, dec!(56.00));
    assert_eq!(
        entry.agent_amount + entry.place_amount + entry.admin_amount,
        entry.total_amount
    );
    // Snapshots are stored on the percent scale
    assert_eq!(entry.agent_pct, dec!(20.00));
    assert_eq!(entry.place_pct, dec!(10.00));

    assert_eq!(scenario.store.movement_count(), 3);
    assert!(outcome.rule.is_some());
}

#[tokio::test]
async fn settle_percent_rule_with_min_clamp() {
    let scenario = confirmed_scenario();
    let mut rule = CommissionRule::new(
        None,
        "luz",
        None,
        Tier::C1,
        CalcKind::PercentOfBase,
        Decimal::ZERO,
        dec!(5),
    );
    rule.total_bounds = Bounds::new(Some(dec!(100)), None);
    scenario.store.add_rule(rule);
    let engine = SettlementEngine::new(Arc::clone(&scenario.store) as Arc<dyn SettlementStore>);

    let outcome = engine.settle(&scenario.ctx, scenario.contract_id).await.unwrap();

    // raw 5% of 1000 = 50, clamped up to the 100 minimum
    assert_eq!(outcome.entry.total_amount, dec!(100.00));
}

#[tokio::test]
async fn settle_twice_is_idempotent() {
    let scenario = confirmed_scenario();
    scenario.store.add_rule(fixed_rule_80());
    let engine = SettlementEngine::new(Arc::clone(&scenario.store) as Arc<dyn SettlementStore>);

    let first = engine.settle(&scenario.ctx, scenario.contract_id).await.unwrap();
    let second = engine.settle(&scenario.ctx, scenario.contract_id).await.unwrap();

    assert!(!first.duplicate);
    assert!(second.duplicate);
    assert_eq!(first.entry.id, second.entry.id);
    assert_eq!(scenario.store.entry_count(), 1);
    // Movements were only derived once
    assert_eq!(scenario.store.movement_count(), 3);
}

#[tokio::test]
async fn settle_requires_confirmed_contract() {
    let tenant = TenantId::new();
    let mut contract = Contract::new(tenant, "luz", Tier::C1);
    contract.submit().unwrap();
    let contract_id = contract.id;

    let store = Arc::new(MemoryStore::default());
    store.add_contract(contract);
    store.add_rule(fixed_rule_80());
    let engine = SettlementEngine::new(Arc::clone(&store) as Arc<dyn SettlementStore>);
    let ctx = RequestContext::new(Role::Admin, tenant);

    let err = engine.settle(&ctx, contract_id).await.unwrap_err();
    assert!(matches!(err, CommissionError::ContractNotConfirmed { .. }));
    assert_eq!(store.entry_count(), 0);
}

#[tokio::test]
async fn settle_without_rule_is_a_configuration_error() {
    let scenario = confirmed_scenario();
    let engine = SettlementEngine::new(Arc::clone(&scenario.store) as Arc<dyn SettlementStore>);

    let err = engine.settle(&scenario.ctx, scenario.contract_id).await.unwrap_err();

    match err {
        CommissionError::MissingRule { key } => {
            assert_eq!(key.category, "luz");
            assert_eq!(key.tier, Tier::C1);
        }
        other => panic!("expected MissingRule, got {other:?}"),
    }
    assert_eq!(scenario.store.entry_count(), 0);
}

#[tokio::test]
async fn settle_recovers_from_lost_insert_race() {
    let scenario = confirmed_scenario();
    scenario.store.add_rule(fixed_rule_80());
    let engine = SettlementEngine::new(Arc::clone(&scenario.store) as Arc<dyn SettlementStore>);

    // First settle produces the winner's entry, then replay the race:
    // reads say "no entry" until our insert hits the constraint.
    let winner = engine.settle(&scenario.ctx, scenario.contract_id).await.unwrap();
    let winner_entry = winner.entry.clone();
    scenario.store.entries.lock().unwrap().clear();
    *scenario.store.racing_entry.lock().unwrap() = Some(winner_entry.clone());

    let outcome = engine.settle(&scenario.ctx, scenario.contract_id).await.unwrap();

    assert!(outcome.duplicate);
    assert_eq!(outcome.entry.id, winner_entry.id);
}

#[tokio::test]
async fn movement_failure_does_not_abort_settlement() {
    let scenario = confirmed_scenario();
    scenario.store.add_rule(fixed_rule_80());
    scenario.store.fail_movements.store(true, Ordering::SeqCst);
    let engine = SettlementEngine::new(Arc::clone(&scenario.store) as Arc<dyn SettlementStore>);

    let outcome = engine.settle(&scenario.ctx, scenario.contract_id).await.unwrap();

    assert!(!outcome.duplicate);
    assert_eq!(scenario.store.entry_count(), 1);
    assert_eq!(scenario.store.movement_count(), 0);
}

#[tokio::test]
async fn settle_is_admin_only() {
    let scenario = confirmed_scenario();
    scenario.store.add_rule(fixed_rule_80());
    let engine = SettlementEngine::new(Arc::clone(&scenario.store) as Arc<dyn SettlementStore>);

    let agent_ctx = RequestContext::new(Role::Agent, scenario.ctx.tenant_id);
    let err = engine.settle(&agent_ctx, scenario.contract_id).await.unwrap_err();
    assert!(matches!(err, CommissionError::Unauthorized(_)));
}

#[tokio::test]
async fn cross_tenant_contract_reads_as_not_found() {
    let scenario = confirmed_scenario();
    scenario.store.add_rule(fixed_rule_80());
    let engine = SettlementEngine::new(Arc::clone(&scenario.store) as Arc<dyn SettlementStore>);

    let foreign_ctx = RequestContext::new(Role::Admin, TenantId::new());
    let err = engine.settle(&foreign_ctx, scenario.contract_id).await.unwrap_err();
    assert!(matches!(err, CommissionError::ContractNotFound(_)));

    // SUPERADMIN is unscoped and sees the contract
    let super_ctx = RequestContext::new(Role::SuperAdmin, TenantId::new());
    assert!(engine.settle(&super_ctx, scenario.contract_id).await.is_ok());
}

#[tokio::test]
async fn void_lifecycle() {
    let scenario = confirmed_scenario();
    scenario.store.add_rule(fixed_rule_80());
    let engine = SettlementEngine::new(Arc::clone(&scenario.store) as Arc<dyn SettlementStore>);

    let entry_id = engine
        .settle(&scenario.ctx, scenario.contract_id)
        .await
        .unwrap()
        .entry
        .id;

    // Empty reason is rejected before any state change
    let err = engine.void(&scenario.ctx, entry_id, "   ").await.unwrap_err();
    assert!(matches!(err, CommissionError::EmptyVoidReason(_)));

    let voided = engine
        .void(&scenario.ctx, entry_id, "contract rescinded")
        .await
        .unwrap();
    assert!(!voided.duplicate);
    assert_eq!(voided.entry.void_reason.as_deref(), Some("contract rescinded"));

    // Second void is a no-op returning the original metadata
    let again = engine
        .void(&scenario.ctx, entry_id, "different reason")
        .await
        .unwrap();
    assert!(again.duplicate);
    assert_eq!(again.entry.void_reason.as_deref(), Some("contract rescinded"));
    assert_eq!(again.entry.voided_at, voided.entry.voided_at);
}

#[tokio::test]
async fn void_unknown_entry_is_not_found() {
    let scenario = confirmed_scenario();
    let engine = SettlementEngine::new(Arc::clone(&scenario.store) as Arc<dyn SettlementStore>);

    let err = engine
        .void(&scenario.ctx, LedgerEntryId::new(), "reason")
        .await
        .unwrap_err();
    assert!(matches!(err, CommissionError::EntryNotFound(_)));
}
