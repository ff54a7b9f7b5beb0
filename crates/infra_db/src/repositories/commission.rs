//! Commission repository - the Postgres adapter behind `SettlementStore`
//!
//! The entry insert is the authoritative write: it hits the UNIQUE
//! constraint on `contract_id` and reports the duplicate case upward so
//! the engine can recover a lost settle race. Movements are written
//! separately and best-effort, never inside the entry's transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{ContractId, DateRange, LedgerEntryId, TenantId, Tier};
use domain_commission::{
    CommissionRule, EntryStatus, LedgerEntry, Movement, SettlementStore, StakeholderSnapshot,
    StoreError,
};
use domain_contract::Contract;

use crate::error::DatabaseError;
use crate::repositories::contracts::ContractRepository;
use crate::repositories::rules::fetch_active_rule;

#[derive(Debug, Clone)]
pub struct CommissionRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    entry_id: Uuid,
    tenant_id: Uuid,
    contract_id: Uuid,
    category: String,
    sub_category: Option<String>,
    tier: String,
    rule_id: Uuid,
    base_amount: Decimal,
    total_amount: Decimal,
    agent_amount: Decimal,
    place_amount: Decimal,
    admin_amount: Decimal,
    agent_pct: Decimal,
    place_pct: Decimal,
    status: String,
    void_reason: Option<String>,
    voided_at: Option<DateTime<Utc>>,
    period_id: Option<Uuid>,
    lead_id: Option<Uuid>,
    client_id: Option<Uuid>,
    agent_id: Option<Uuid>,
    place_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for LedgerEntry {
    type Error = DatabaseError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            id: row.entry_id.into(),
            tenant_id: row.tenant_id.into(),
            contract_id: row.contract_id.into(),
            category: row.category,
            sub_category: row.sub_category,
            tier: row.tier.parse().map_err(DatabaseError::RowDecode)?,
            rule_id: row.rule_id.into(),
            base_amount: row.base_amount,
            total_amount: row.total_amount,
            agent_amount: row.agent_amount,
            place_amount: row.place_amount,
            admin_amount: row.admin_amount,
            agent_pct: row.agent_pct,
            place_pct: row.place_pct,
            status: row
                .status
                .parse::<EntryStatus>()
                .map_err(DatabaseError::RowDecode)?,
            void_reason: row.void_reason,
            voided_at: row.voided_at,
            period_id: row.period_id.map(Into::into),
            lead_id: row.lead_id.map(Into::into),
            client_id: row.client_id.map(Into::into),
            agent_id: row.agent_id.map(Into::into),
            place_id: row.place_id.map(Into::into),
            created_at: row.created_at,
        })
    }
}

pub(crate) const ENTRY_COLUMNS: &str = "entry_id, tenant_id, contract_id, category, sub_category, \
     tier, rule_id, base_amount, total_amount, agent_amount, place_amount, admin_amount, \
     agent_pct, place_pct, status, void_reason, voided_at, period_id, \
     lead_id, client_id, agent_id, place_id, created_at";

impl CommissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Paginated entry listing for the ledger screen. Agents pass their
    /// own id to see only their commissions ("mis comisiones").
    pub async fn list_entries(
        &self,
        scope: Option<TenantId>,
        agent: Option<core_kernel::AgentId>,
        status: Option<EntryStatus>,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>, DatabaseError> {
        let pattern = search.map(|q| format!("%{}%", q));
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries \
             WHERE ($1::uuid IS NULL OR tenant_id = $1) \
               AND ($2::uuid IS NULL OR agent_id = $2) \
               AND ($3::text IS NULL OR status = $3) \
               AND ($4::text IS NULL OR category ILIKE $4 OR sub_category ILIKE $4) \
             ORDER BY created_at DESC \
             LIMIT $5 OFFSET $6"
        ))
        .bind(scope.map(Uuid::from))
        .bind(agent.map(Uuid::from))
        .bind(status.map(|s| s.as_str()))
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    /// Entries created inside a range, voided included; report aggregation
    /// filters them out so the exclusion rule lives in one place.
    pub async fn entries_in_range(
        &self,
        scope: Option<TenantId>,
        range: DateRange,
    ) -> Result<Vec<LedgerEntry>, DatabaseError> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries \
             WHERE ($1::uuid IS NULL OR tenant_id = $1) \
               AND created_at >= $2 AND created_at < $3 \
             ORDER BY created_at"
        ))
        .bind(scope.map(Uuid::from))
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}

fn backend(err: DatabaseError) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl SettlementStore for CommissionRepository {
    async fn find_contract(
        &self,
        scope: Option<TenantId>,
        id: ContractId,
    ) -> Result<Option<Contract>, StoreError> {
        ContractRepository::new(self.pool.clone())
            .find(scope, id)
            .await
            .map_err(backend)
    }

    async fn find_entry_for_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE contract_id = $1"
        ))
        .bind(Uuid::from(contract_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| backend(e.into()))?;

        row.map(LedgerEntry::try_from).transpose().map_err(backend)
    }

    async fn find_entry(
        &self,
        scope: Option<TenantId>,
        id: LedgerEntryId,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries \
             WHERE entry_id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)"
        ))
        .bind(Uuid::from(id))
        .bind(scope.map(Uuid::from))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| backend(e.into()))?;

        row.map(LedgerEntry::try_from).transpose().map_err(backend)
    }

    async fn resolve_rule(
        &self,
        tenant_id: TenantId,
        category: &str,
        sub_category: Option<&str>,
        tier: Tier,
    ) -> Result<Option<CommissionRule>, StoreError> {
        if let Some(sub) = sub_category {
            if let Some(rule) =
                fetch_active_rule(&self.pool, tenant_id, category, Some(sub), tier)
                    .await
                    .map_err(backend)?
            {
                return Ok(Some(rule));
            }
        }
        fetch_active_rule(&self.pool, tenant_id, category, None, tier)
            .await
            .map_err(backend)
    }

    async fn stakeholder_snapshot(
        &self,
        contract: &Contract,
    ) -> Result<StakeholderSnapshot, StoreError> {
        let agent_pct: Option<Decimal> = match contract.agent_id {
            Some(agent_id) => {
                sqlx::query_scalar("SELECT commission_pct FROM agents WHERE agent_id = $1")
                    .bind(Uuid::from(agent_id))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| backend(e.into()))?
                    .flatten()
            }
            None => None,
        };

        let place: Option<(Option<Decimal>, bool)> = match contract.place_id {
            Some(place_id) => {
                sqlx::query_as("SELECT commission_pct, special FROM places WHERE place_id = $1")
                    .bind(Uuid::from(place_id))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| backend(e.into()))?
            }
            None => None,
        };

        Ok(StakeholderSnapshot {
            agent_pct,
            place_pct: place.and_then(|(pct, _)| pct),
            special_place: place.map(|(_, special)| special).unwrap_or(false),
        })
    }

    async fn insert_entry(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                entry_id, tenant_id, contract_id, category, sub_category, tier,
                rule_id, base_amount, total_amount, agent_amount, place_amount,
                admin_amount, agent_pct, place_pct, status, void_reason,
                voided_at, period_id, lead_id, client_id, agent_id, place_id,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                      $14, $15, $16, $17, $18, $19, $20, $21, $22, $23)
            "#,
        )
        .bind(Uuid::from(entry.id))
        .bind(Uuid::from(entry.tenant_id))
        .bind(Uuid::from(entry.contract_id))
        .bind(&entry.category)
        .bind(&entry.sub_category)
        .bind(entry.tier.as_str())
        .bind(Uuid::from(entry.rule_id))
        .bind(entry.base_amount)
        .bind(entry.total_amount)
        .bind(entry.agent_amount)
        .bind(entry.place_amount)
        .bind(entry.admin_amount)
        .bind(entry.agent_pct)
        .bind(entry.place_pct)
        .bind(entry.status.as_str())
        .bind(&entry.void_reason)
        .bind(entry.voided_at)
        .bind(entry.period_id.map(Uuid::from))
        .bind(entry.lead_id.map(Uuid::from))
        .bind(entry.client_id.map(Uuid::from))
        .bind(entry.agent_id.map(Uuid::from))
        .bind(entry.place_id.map(Uuid::from))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await;

        match result.map_err(DatabaseError::from) {
            Ok(_) => Ok(()),
            Err(err) if err.is_duplicate() => Err(StoreError::DuplicateEntry(entry.contract_id)),
            Err(err) => Err(backend(err)),
        }
    }

    async fn insert_movements(&self, movements: &[Movement]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| backend(e.into()))?;

        for movement in movements {
            sqlx::query(
                r#"
                INSERT INTO movements (movement_id, entry_id, kind, role, party_id, amount, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::from(movement.id))
            .bind(Uuid::from(movement.entry_id))
            .bind(movement.kind.as_str())
            .bind(movement.role.as_str())
            .bind(movement.party_id)
            .bind(movement.amount)
            .bind(movement.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| backend(e.into()))?;
        }

        tx.commit().await.map_err(|e| backend(e.into()))
    }

    async fn update_void(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE ledger_entries
            SET status = $2, void_reason = $3, voided_at = $4
            WHERE entry_id = $1
            "#,
        )
        .bind(Uuid::from(entry.id))
        .bind(entry.status.as_str())
        .bind(&entry.void_reason)
        .bind(entry.voided_at)
        .execute(&self.pool)
        .await
        .map_err(|e| backend(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(backend(DatabaseError::not_found("LedgerEntry", entry.id)));
        }
        Ok(())
    }
}
