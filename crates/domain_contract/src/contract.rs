//! Contract aggregate and lifecycle state machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AgentId, ClientId, ContractId, LeadId, PlaceId, TenantId, Tier};

use crate::error::ContractError;

/// Contract lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    /// Being drafted by an agent
    Draft,
    /// Submitted, awaiting admin review
    Pending,
    /// Confirmed by an admin; settlement may be created exactly once
    Confirmed,
    /// Cancelled; terminal
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Draft => "DRAFT",
            ContractStatus::Pending => "PENDING",
            ContractStatus::Confirmed => "CONFIRMED",
            ContractStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for ContractStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(ContractStatus::Draft),
            "PENDING" => Ok(ContractStatus::Pending),
            "CONFIRMED" => Ok(ContractStatus::Confirmed),
            "CANCELLED" => Ok(ContractStatus::Cancelled),
            other => Err(format!("unknown contract status: {}", other)),
        }
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The sellable unit: an energy supply contract referred by an agent
/// and/or a place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub tenant_id: TenantId,
    pub status: ContractStatus,
    /// Commission category (product family, e.g. "luz", "gas")
    pub category: String,
    /// Optional sub-category; imported tariffs use a synthetic path here
    pub sub_category: Option<String>,
    pub tier: Tier,
    pub lead_id: Option<LeadId>,
    pub client_id: Option<ClientId>,
    pub agent_id: Option<AgentId>,
    pub place_id: Option<PlaceId>,
    /// Taxable base of the underlying invoice ("base imponible")
    pub taxable_base: Option<Decimal>,
    /// Total invoice amount, taxes included
    pub invoice_total: Option<Decimal>,
    pub notes: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// Creates a new draft contract.
    pub fn new(tenant_id: TenantId, category: impl Into<String>, tier: Tier) -> Self {
        let now = Utc::now();
        Self {
            id: ContractId::new_v7(),
            tenant_id,
            status: ContractStatus::Draft,
            category: category.into(),
            sub_category: None,
            tier,
            lead_id: None,
            client_id: None,
            agent_id: None,
            place_id: None,
            taxable_base: None,
            invoice_total: None,
            notes: None,
            confirmed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Submits a draft for admin review.
    pub fn submit(&mut self) -> Result<(), ContractError> {
        self.transition(ContractStatus::Draft, ContractStatus::Pending)
    }

    /// Confirms a pending contract.
    ///
    /// The client link is mandatory from this point on: callers derive it
    /// from the originating lead when the contract has none yet (see
    /// [`crate::service::ConfirmationService`]).
    pub fn confirm(&mut self, client_id: ClientId) -> Result<(), ContractError> {
        self.transition(ContractStatus::Pending, ContractStatus::Confirmed)?;
        self.client_id = Some(client_id);
        self.confirmed_at = Some(Utc::now());
        Ok(())
    }

    /// Cancels a draft or pending contract.
    pub fn cancel(&mut self) -> Result<(), ContractError> {
        match self.status {
            ContractStatus::Draft | ContractStatus::Pending => {
                self.status = ContractStatus::Cancelled;
                self.updated_at = Utc::now();
                Ok(())
            }
            from => Err(ContractError::InvalidTransition {
                from,
                to: ContractStatus::Cancelled,
            }),
        }
    }

    /// Base amount the commission percentages are applied to.
    ///
    /// Prefers the taxable base; falls back to the invoice total; zero when
    /// neither is present (a FIXED rule still yields its fixed amount).
    pub fn base_amount(&self) -> Decimal {
        self.taxable_base
            .filter(|base| base > &Decimal::ZERO)
            .or(self.invoice_total.filter(|total| total > &Decimal::ZERO))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == ContractStatus::Confirmed
    }

    fn transition(&mut self, from: ContractStatus, to: ContractStatus) -> Result<(), ContractError> {
        if self.status != from {
            return Err(ContractError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}
