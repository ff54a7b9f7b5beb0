//! Shared test utilities for the commission test suite
//!
//! Builders produce domain aggregates with sensible defaults, fixtures
//! hold a canonical tenant/agent/place graph, generators provide proptest
//! strategies, and assertions capture the invariants tests check over and
//! over.

pub mod builders;
pub mod fixtures;
pub mod generators;
pub mod assertions;

pub use builders::{ContractBuilder, EntryBuilder, RuleBuilder};
pub use fixtures::{sample_person_name, TenantFixture, FIXTURE};
pub use assertions::assert_split_conserved;
