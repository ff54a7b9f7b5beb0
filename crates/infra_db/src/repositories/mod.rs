//! Repository implementations for domain entities
//!
//! Repositories encapsulate SQL and map between database rows and domain
//! types. Queries are runtime-checked (`query_as` + `FromRow`) so the
//! workspace builds without a live database; enums travel as TEXT and are
//! parsed through their `FromStr` impls on the way out.

pub mod contracts;
pub mod rules;
pub mod commission;
pub mod settlement;
pub mod catalog;

pub use contracts::ContractRepository;
pub use rules::RuleRepository;
pub use commission::CommissionRepository;
pub use settlement::{PeriodOpError, SettlementRepository};
pub use catalog::CatalogRepository;
