//! The settlement engine
//!
//! Orchestrates settle and void over an async store port. The engine is
//! deliberately free of SQL: the store adapter (Postgres in production, an
//! in-memory map in tests) owns persistence, while every business decision
//! (preconditions, rule resolution fallback, normalization, duplicate
//! recovery) lives here.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use core_kernel::{ContractId, LedgerEntryId, Pct, RequestContext, TenantId, Tier};
use domain_contract::Contract;

use crate::computation::compute_total;
use crate::entry::{LedgerEntry, Movement, VoidOutcome};
use crate::error::CommissionError;
use crate::rule::{CommissionRule, RuleKey};
use crate::split::{split, StakeholderPcts};

/// Store-level failures surfaced to the engine.
///
/// `DuplicateEntry` is special: it is how the storage uniqueness
/// constraint reports that another caller won the insert race, and the
/// engine turns it into the idempotent-duplicate outcome instead of an
/// error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ledger entry already exists for contract {0}")]
    DuplicateEntry(ContractId),

    #[error("store failure: {0}")]
    Backend(String),
}

/// Stakeholder data as stored: percentages of ambiguous scale plus the
/// special-place flag. Normalization happens in the engine, once.
#[derive(Debug, Clone, Copy, Default)]
pub struct StakeholderSnapshot {
    pub agent_pct: Option<Decimal>,
    pub place_pct: Option<Decimal>,
    pub special_place: bool,
}

impl StakeholderSnapshot {
    pub fn normalized(&self) -> StakeholderPcts {
        StakeholderPcts {
            agent: self.agent_pct.map(Pct::normalize).unwrap_or(Pct::ZERO),
            place: self.place_pct.map(Pct::normalize).unwrap_or(Pct::ZERO),
        }
    }
}

/// Persistence port for the settlement engine.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Loads a contract, scoped by tenant (`None` = unscoped SUPERADMIN).
    async fn find_contract(
        &self,
        scope: Option<TenantId>,
        id: ContractId,
    ) -> Result<Option<Contract>, StoreError>;

    /// Returns the ledger entry already created for a contract, if any.
    async fn find_entry_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Option<LedgerEntry>, StoreError>;

    /// Loads a ledger entry, scoped by tenant.
    async fn find_entry(
        &self,
        scope: Option<TenantId>,
        id: LedgerEntryId,
    ) -> Result<Option<LedgerEntry>, StoreError>;

    /// Resolves the active rule for (tenant, category, sub-category, tier)
    /// per the two-step specificity algorithm.
    async fn resolve_rule(
        &self,
        tenant_id: TenantId,
        category: &str,
        sub_category: Option<&str>,
        tier: Tier,
    ) -> Result<Option<CommissionRule>, StoreError>;

    /// Loads the stored percentages for the contract's agent/place.
    async fn stakeholder_snapshot(
        &self,
        contract: &Contract,
    ) -> Result<StakeholderSnapshot, StoreError>;

    /// Inserts the entry; must fail with [`StoreError::DuplicateEntry`]
    /// when the contract already has one.
    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), StoreError>;

    /// Inserts the derived movements. Callers treat failure as
    /// best-effort; implementations must not roll back the entry.
    async fn insert_movements(&self, movements: &[Movement]) -> Result<(), StoreError>;

    /// Persists void state and metadata of an entry.
    async fn update_void(&self, entry: &LedgerEntry) -> Result<(), StoreError>;
}

/// Summary of the rule a settlement resolved, echoed to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
    pub id: core_kernel::RuleId,
    pub kind: crate::rule::CalcKind,
    pub fixed_amount: Decimal,
    pub percentage: Decimal,
    pub category: String,
    pub sub_category: Option<String>,
    pub tier: Tier,
}

impl From<&CommissionRule> for RuleSummary {
    fn from(rule: &CommissionRule) -> Self {
        Self {
            id: rule.id,
            kind: rule.kind,
            fixed_amount: rule.fixed_amount,
            percentage: rule.percentage,
            category: rule.category.clone(),
            sub_category: rule.sub_category.clone(),
            tier: rule.tier,
        }
    }
}

/// Result of a settle call; `duplicate` marks the idempotent repeat.
#[derive(Debug)]
pub struct SettleOutcome {
    pub entry: LedgerEntry,
    pub rule: Option<RuleSummary>,
    pub duplicate: bool,
}

/// The settlement engine.
pub struct SettlementEngine {
    store: std::sync::Arc<dyn SettlementStore>,
}

impl SettlementEngine {
    pub fn new(store: std::sync::Arc<dyn SettlementStore>) -> Self {
        Self { store }
    }

    /// Settles a confirmed contract into a ledger entry.
    ///
    /// Safe to retry: a second call (or a concurrent one losing the insert
    /// race) returns the existing entry flagged as a duplicate.
    pub async fn settle(
        &self,
        ctx: &RequestContext,
        contract_id: ContractId,
    ) -> Result<SettleOutcome, CommissionError> {
        if !ctx.can_manage_commissions() {
            return Err(CommissionError::Unauthorized(format!(
                "role {} may not settle contracts",
                ctx.role
            )));
        }

        let contract = self
            .store
            .find_contract(ctx.tenant_scope(), contract_id)
            .await?
            .ok_or(CommissionError::ContractNotFound(contract_id))?;

        if !contract.is_confirmed() {
            return Err(CommissionError::ContractNotConfirmed {
                id: contract.id,
                status: contract.status,
            });
        }

        if let Some(existing) = self.store.find_entry_for_contract(contract.id).await? {
            return Ok(SettleOutcome {
                entry: existing,
                rule: None,
                duplicate: true,
            });
        }

        let rule = self
            .store
            .resolve_rule(
                contract.tenant_id,
                &contract.category,
                contract.sub_category.as_deref(),
                contract.tier,
            )
            .await?
            .ok_or_else(|| CommissionError::MissingRule {
                key: RuleKey {
                    tenant_id: Some(contract.tenant_id),
                    category: contract.category.clone(),
                    sub_category: contract.sub_category.clone(),
                    tier: contract.tier,
                },
            })?;

        let base_amount = contract.base_amount();
        let total_amount = compute_total(&rule, base_amount);

        let snapshot = self.store.stakeholder_snapshot(&contract).await?;
        let pcts = snapshot.normalized();
        let amounts = split(total_amount, &pcts, snapshot.special_place, &rule);

        let entry =
            LedgerEntry::generated(&contract, &rule, base_amount, total_amount, pcts, amounts);

        match self.store.insert_entry(&entry).await {
            Ok(()) => {}
            Err(StoreError::DuplicateEntry(_)) => {
                // Lost a concurrent race: the constraint kept exactly one
                // row, so re-read and hand back the winner's entry.
                let existing = self
                    .store
                    .find_entry_for_contract(contract.id)
                    .await?
                    .ok_or_else(|| {
                        StoreError::Backend(format!(
                            "entry for contract {} vanished after duplicate insert",
                            contract.id
                        ))
                    })?;
                return Ok(SettleOutcome {
                    entry: existing,
                    rule: Some(RuleSummary::from(&rule)),
                    duplicate: true,
                });
            }
            Err(other) => return Err(other.into()),
        }

        // Movements are denormalized display rows; losing them must not
        // lose the entry.
        let movements = entry.derive_movements();
        if let Err(err) = self.store.insert_movements(&movements).await {
            warn!(entry_id = %entry.id, error = %err, "movement write failed; entry kept");
        }

        Ok(SettleOutcome {
            entry,
            rule: Some(RuleSummary::from(&rule)),
            duplicate: false,
        })
    }

    /// Voids a pending ledger entry with a mandatory reason.
    pub async fn void(
        &self,
        ctx: &RequestContext,
        entry_id: LedgerEntryId,
        reason: &str,
    ) -> Result<VoidOutcome, CommissionError> {
        if !ctx.can_manage_commissions() {
            return Err(CommissionError::Unauthorized(format!(
                "role {} may not void entries",
                ctx.role
            )));
        }

        let mut entry = self
            .store
            .find_entry(ctx.tenant_scope(), entry_id)
            .await?
            .ok_or(CommissionError::EntryNotFound(entry_id))?;

        let transitioned = entry.void(reason)?;
        if transitioned {
            self.store.update_void(&entry).await?;
        }

        Ok(VoidOutcome {
            entry,
            duplicate: !transitioned,
        })
    }
}
