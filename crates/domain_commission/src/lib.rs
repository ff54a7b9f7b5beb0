//! Commission Domain - rules, computation, and the settlement engine
//!
//! This crate owns the money-bearing part of the platform: how a confirmed
//! contract turns into an immutable ledger entry.
//!
//! # Settlement invariants
//!
//! - One ledger entry per contract, enforced by a storage uniqueness
//!   constraint; re-settlement is an idempotent no-op returning the
//!   existing entry.
//! - `agent + place + admin == total` after rounding; admin absorbs the
//!   remainder and is floored at zero, never negative.
//! - A missing rule is a configuration error naming the full resolution
//!   key, never a silent zero-commission default.
//! - Voiding records reason and timestamp; it never touches the monetary
//!   fields and never deletes the entry.

pub mod rule;
pub mod computation;
pub mod split;
pub mod entry;
pub mod engine;
pub mod error;

pub use rule::{resolve, CalcKind, CommissionRule, RuleKey};
pub use computation::compute_total;
pub use split::{split, Split, StakeholderPcts};
pub use entry::{EntryStatus, LedgerEntry, Movement, MovementKind, PartyRole, VoidOutcome};
pub use engine::{
    RuleSummary, SettleOutcome, SettlementEngine, SettlementStore, StakeholderSnapshot, StoreError,
};
pub use error::CommissionError;
