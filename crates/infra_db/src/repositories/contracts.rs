//! Contract repository
//!
//! Persistence for the contract aggregate plus the `ClientDirectory` port
//! used by the confirmation workflow (client lookup/creation from leads).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{ClientId, CoreError, LeadId, TenantId};
use domain_contract::{ClientDirectory, Contract, ContractStatus};

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct ContractRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ContractRow {
    contract_id: Uuid,
    tenant_id: Uuid,
    status: String,
    category: String,
    sub_category: Option<String>,
    tier: String,
    lead_id: Option<Uuid>,
    client_id: Option<Uuid>,
    agent_id: Option<Uuid>,
    place_id: Option<Uuid>,
    taxable_base: Option<Decimal>,
    invoice_total: Option<Decimal>,
    notes: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContractRow> for Contract {
    type Error = DatabaseError;

    fn try_from(row: ContractRow) -> Result<Self, Self::Error> {
        Ok(Contract {
            id: row.contract_id.into(),
            tenant_id: row.tenant_id.into(),
            status: row
                .status
                .parse::<ContractStatus>()
                .map_err(DatabaseError::RowDecode)?,
            category: row.category,
            sub_category: row.sub_category,
            tier: row.tier.parse().map_err(DatabaseError::RowDecode)?,
            lead_id: row.lead_id.map(Into::into),
            client_id: row.client_id.map(Into::into),
            agent_id: row.agent_id.map(Into::into),
            place_id: row.place_id.map(Into::into),
            taxable_base: row.taxable_base,
            invoice_total: row.invoice_total,
            notes: row.notes,
            confirmed_at: row.confirmed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const CONTRACT_COLUMNS: &str = "contract_id, tenant_id, status, category, sub_category, tier, \
     lead_id, client_id, agent_id, place_id, taxable_base, invoice_total, notes, \
     confirmed_at, created_at, updated_at";

impl ContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, contract: &Contract) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO contracts (
                contract_id, tenant_id, status, category, sub_category, tier,
                lead_id, client_id, agent_id, place_id, taxable_base,
                invoice_total, notes, confirmed_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(Uuid::from(contract.id))
        .bind(Uuid::from(contract.tenant_id))
        .bind(contract.status.as_str())
        .bind(&contract.category)
        .bind(&contract.sub_category)
        .bind(contract.tier.as_str())
        .bind(contract.lead_id.map(Uuid::from))
        .bind(contract.client_id.map(Uuid::from))
        .bind(contract.agent_id.map(Uuid::from))
        .bind(contract.place_id.map(Uuid::from))
        .bind(contract.taxable_base)
        .bind(contract.invoice_total)
        .bind(&contract.notes)
        .bind(contract.confirmed_at)
        .bind(contract.created_at)
        .bind(contract.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persists lifecycle changes (status, client link, timestamps, notes).
    pub async fn save(&self, contract: &Contract) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET status = $2, client_id = $3, notes = $4, taxable_base = $5,
                invoice_total = $6, confirmed_at = $7, updated_at = $8
            WHERE contract_id = $1
            "#,
        )
        .bind(Uuid::from(contract.id))
        .bind(contract.status.as_str())
        .bind(contract.client_id.map(Uuid::from))
        .bind(&contract.notes)
        .bind(contract.taxable_base)
        .bind(contract.invoice_total)
        .bind(contract.confirmed_at)
        .bind(contract.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Contract", contract.id));
        }
        Ok(())
    }

    pub async fn find(
        &self,
        scope: Option<TenantId>,
        id: core_kernel::ContractId,
    ) -> Result<Option<Contract>, DatabaseError> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts \
             WHERE contract_id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)"
        ))
        .bind(Uuid::from(id))
        .bind(scope.map(Uuid::from))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Contract::try_from).transpose()
    }

    pub async fn list(
        &self,
        scope: Option<TenantId>,
        status: Option<ContractStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Contract>, DatabaseError> {
        let rows = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts \
             WHERE ($1::uuid IS NULL OR tenant_id = $1) \
               AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(scope.map(Uuid::from))
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Contract::try_from).collect()
    }
}

#[async_trait]
impl ClientDirectory for ContractRepository {
    async fn find_for_lead(&self, lead_id: LeadId) -> Result<Option<ClientId>, CoreError> {
        let client: Option<(Uuid,)> =
            sqlx::query_as("SELECT client_id FROM clients WHERE lead_id = $1")
                .bind(Uuid::from(lead_id))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CoreError::internal(e.to_string()))?;

        Ok(client.map(|(id,)| id.into()))
    }

    async fn create_from_lead(
        &self,
        _tenant_id: TenantId,
        lead_id: LeadId,
    ) -> Result<ClientId, CoreError> {
        let client_id = ClientId::new_v7();
        let inserted: Result<Option<(Uuid,)>, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO clients (client_id, tenant_id, lead_id, full_name, email, phone, created_at)
            SELECT $1, tenant_id, lead_id, full_name, email, phone, now()
            FROM leads WHERE lead_id = $2
            RETURNING client_id
            "#,
        )
        .bind(Uuid::from(client_id))
        .bind(Uuid::from(lead_id))
        .fetch_optional(&self.pool)
        .await;

        match inserted.map_err(DatabaseError::from) {
            Ok(Some((id,))) => Ok(id.into()),
            Ok(None) => Err(CoreError::not_found(format!("lead {}", lead_id))),
            // Another confirmation created the client concurrently; the
            // partial unique index on lead_id kept exactly one row.
            Err(err) if err.is_duplicate() => self
                .find_for_lead(lead_id)
                .await?
                .ok_or_else(|| CoreError::internal("client vanished after duplicate insert")),
            Err(err) => Err(CoreError::internal(err.to_string())),
        }
    }
}
