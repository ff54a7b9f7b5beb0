//! Infrastructure Database Layer
//!
//! SQLx/Postgres adapters behind the domain store ports. Repositories map
//! between database rows and domain types and keep all SQL in one place;
//! the domain crates never see a connection pool.
//!
//! # Invariant enforcement
//!
//! The one-entry-per-contract invariant is enforced by a UNIQUE constraint
//! on `ledger_entries.contract_id`, not by application locking: concurrent
//! settle calls race to insert and the loser gets a 23505 which the engine
//! converts into the idempotent-duplicate outcome. Settlement period
//! mutations take a `SELECT … FOR UPDATE` row lock so concurrent
//! add-movements/close calls on the same period serialize.

pub mod pool;
pub mod error;
pub mod repositories;

pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use repositories::{
    CatalogRepository, CommissionRepository, ContractRepository, PeriodOpError, RuleRepository,
    SettlementRepository,
};

/// Embedded migrations, applied at server start.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
