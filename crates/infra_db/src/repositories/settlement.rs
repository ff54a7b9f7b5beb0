//! Settlement period repository
//!
//! Period mutations (add-movements, close) run in a single transaction
//! that first takes `SELECT … FOR UPDATE` on the period row: concurrent
//! callers on the same period serialize, so totals are never
//! double-counted. This is the chosen answer to the concurrency question
//! the original system left open.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use core_kernel::{DateRange, PeriodId, TenantId};
use domain_settlement::{aggregate, CommissionReport, PeriodStatus, SettlementPeriod};

use crate::error::DatabaseError;
use crate::repositories::commission::CommissionRepository;

/// Typed failures of period operations, mapped to the API taxonomy.
#[derive(Debug, Error)]
pub enum PeriodOpError {
    #[error("Settlement period {0} not found")]
    NotFound(PeriodId),

    #[error("Settlement period {0} is closed")]
    Closed(PeriodId),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for PeriodOpError {
    fn from(err: sqlx::Error) -> Self {
        PeriodOpError::Database(err.into())
    }
}

#[derive(Debug, Clone)]
pub struct SettlementRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct PeriodRow {
    period_id: Uuid,
    tenant_id: Uuid,
    range_from: DateTime<Utc>,
    range_to: DateTime<Utc>,
    status: String,
    agent_total: Decimal,
    place_total: Decimal,
    admin_total: Decimal,
    entry_count: i64,
    closed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PeriodRow> for SettlementPeriod {
    type Error = DatabaseError;

    fn try_from(row: PeriodRow) -> Result<Self, Self::Error> {
        Ok(SettlementPeriod {
            id: row.period_id.into(),
            tenant_id: row.tenant_id.into(),
            range: DateRange::new(row.range_from, row.range_to)
                .map_err(|e| DatabaseError::RowDecode(e.to_string()))?,
            status: row
                .status
                .parse::<PeriodStatus>()
                .map_err(DatabaseError::RowDecode)?,
            agent_total: row.agent_total,
            place_total: row.place_total,
            admin_total: row.admin_total,
            entry_count: row.entry_count,
            closed_at: row.closed_at,
            created_at: row.created_at,
        })
    }
}

const PERIOD_COLUMNS: &str = "period_id, tenant_id, range_from, range_to, status, agent_total, \
     place_total, admin_total, entry_count, closed_at, created_at";

impl SettlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates an Open period. Does not pull entries; that is the explicit
    /// add-movements action.
    pub async fn create_period(
        &self,
        tenant_id: TenantId,
        range: DateRange,
    ) -> Result<SettlementPeriod, DatabaseError> {
        let period = SettlementPeriod::open(tenant_id, range);

        sqlx::query(
            r#"
            INSERT INTO settlement_periods (
                period_id, tenant_id, range_from, range_to, status,
                agent_total, place_total, admin_total, entry_count,
                closed_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(Uuid::from(period.id))
        .bind(Uuid::from(period.tenant_id))
        .bind(period.range.from)
        .bind(period.range.to)
        .bind(period.status.as_str())
        .bind(period.agent_total)
        .bind(period.place_total)
        .bind(period.admin_total)
        .bind(period.entry_count)
        .bind(period.closed_at)
        .bind(period.created_at)
        .execute(&self.pool)
        .await?;

        Ok(period)
    }

    pub async fn find(
        &self,
        scope: Option<TenantId>,
        id: PeriodId,
    ) -> Result<Option<SettlementPeriod>, DatabaseError> {
        let row = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {PERIOD_COLUMNS} FROM settlement_periods \
             WHERE period_id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)"
        ))
        .bind(Uuid::from(id))
        .bind(scope.map(Uuid::from))
        .fetch_optional(&self.pool)
        .await?;

        row.map(SettlementPeriod::try_from).transpose()
    }

    pub async fn list(
        &self,
        scope: Option<TenantId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SettlementPeriod>, DatabaseError> {
        let rows = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {PERIOD_COLUMNS} FROM settlement_periods \
             WHERE ($1::uuid IS NULL OR tenant_id = $1) \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(scope.map(Uuid::from))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SettlementPeriod::try_from).collect()
    }

    /// Pulls matching unsettled entries into an Open period and recomputes
    /// its totals. Monotonic: only Pending, unattached entries created
    /// inside the range are candidates, so repeated calls add each entry
    /// once.
    pub async fn add_movements(
        &self,
        scope: Option<TenantId>,
        id: PeriodId,
    ) -> Result<u64, PeriodOpError> {
        let mut tx = self.pool.begin().await?;
        let period = self.lock_open_period(&mut tx, scope, id).await?;

        let added = sqlx::query(
            r#"
            UPDATE ledger_entries
            SET period_id = $1
            WHERE tenant_id = $2
              AND status = 'PENDING'
              AND period_id IS NULL
              AND created_at >= $3 AND created_at < $4
            "#,
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(period.tenant_id))
        .bind(period.range.from)
        .bind(period.range.to)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        Self::recompute_totals(&mut tx, id).await?;
        tx.commit().await?;

        Ok(added)
    }

    /// Closes an Open period, settling every attached Pending entry.
    /// Closing is terminal: there is no reopen operation.
    pub async fn close_period(
        &self,
        scope: Option<TenantId>,
        id: PeriodId,
    ) -> Result<u64, PeriodOpError> {
        let mut tx = self.pool.begin().await?;
        self.lock_open_period(&mut tx, scope, id).await?;

        let settled = sqlx::query(
            "UPDATE ledger_entries SET status = 'SETTLED' \
             WHERE period_id = $1 AND status = 'PENDING'",
        )
        .bind(Uuid::from(id))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            "UPDATE settlement_periods SET status = 'CLOSED', closed_at = now() \
             WHERE period_id = $1",
        )
        .bind(Uuid::from(id))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(settled)
    }

    /// Per-agent and per-place totals over a range; aggregation semantics
    /// (voided excluded, settled included) live in the domain.
    pub async fn report(
        &self,
        scope: Option<TenantId>,
        range: DateRange,
    ) -> Result<CommissionReport, DatabaseError> {
        let entries = CommissionRepository::new(self.pool.clone())
            .entries_in_range(scope, range)
            .await?;
        Ok(aggregate(range, &entries))
    }

    /// Locks the period row for the duration of the transaction and
    /// verifies it is still Open.
    async fn lock_open_period(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        scope: Option<TenantId>,
        id: PeriodId,
    ) -> Result<SettlementPeriod, PeriodOpError> {
        let row = sqlx::query_as::<_, PeriodRow>(&format!(
            "SELECT {PERIOD_COLUMNS} FROM settlement_periods \
             WHERE period_id = $1 AND ($2::uuid IS NULL OR tenant_id = $2) \
             FOR UPDATE"
        ))
        .bind(Uuid::from(id))
        .bind(scope.map(Uuid::from))
        .fetch_optional(&mut **tx)
        .await?;

        let period: SettlementPeriod = row
            .ok_or(PeriodOpError::NotFound(id))?
            .try_into()
            .map_err(PeriodOpError::Database)?;

        if !period.is_open() {
            return Err(PeriodOpError::Closed(id));
        }
        Ok(period)
    }

    async fn recompute_totals(
        tx: &mut Transaction<'_, Postgres>,
        id: PeriodId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE settlement_periods p
            SET agent_total = s.agent_total,
                place_total = s.place_total,
                admin_total = s.admin_total,
                entry_count = s.entry_count
            FROM (
                SELECT COALESCE(SUM(agent_amount), 0) AS agent_total,
                       COALESCE(SUM(place_amount), 0) AS place_total,
                       COALESCE(SUM(admin_amount), 0) AS admin_total,
                       COUNT(*) AS entry_count
                FROM ledger_entries
                WHERE period_id = $1 AND status <> 'VOIDED'
            ) s
            WHERE p.period_id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
