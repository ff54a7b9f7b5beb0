//! Core Kernel - Foundational types for the commission platform
//!
//! This crate provides the building blocks shared by every domain module:
//! - Monetary arithmetic with deterministic cent rounding
//! - Percentage normalization and clamping helpers
//! - Strongly-typed identifiers
//! - Date ranges for settlement periods and reports
//! - The per-request authorization context

pub mod money;
pub mod identifiers;
pub mod temporal;
pub mod tier;
pub mod context;
pub mod error;

pub use money::{round2, Bounds, Pct};
pub use identifiers::{
    AgentId, ClientId, ContractId, LeadId, LedgerEntryId, MovementId, OfferId, PeriodId, PlaceId,
    PriceTierId, RuleId, TenantId,
};
pub use temporal::{DateRange, TemporalError};
pub use tier::Tier;
pub use context::{RequestContext, Role};
pub use error::CoreError;
