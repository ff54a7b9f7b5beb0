//! Commission domain errors
//!
//! Structured by the caller-visible taxonomy: authorization, validation,
//! configuration (missing rule, with its full resolution key), not-found,
//! precondition, and store failures. Idempotent duplicates are not errors
//! and are reported through outcome flags instead.

use thiserror::Error;

use core_kernel::{ContractId, LedgerEntryId};
use domain_contract::ContractStatus;

use crate::engine::StoreError;
use crate::entry::EntryStatus;
use crate::rule::RuleKey;

#[derive(Debug, Error)]
pub enum CommissionError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Contract {0} not found")]
    ContractNotFound(ContractId),

    #[error("Contract {id} is not confirmed (status: {status})")]
    ContractNotConfirmed {
        id: ContractId,
        status: ContractStatus,
    },

    /// No active rule resolves for the key. The key is carried verbatim so
    /// an operator can create the missing rule.
    #[error("No active commission rule for {key}")]
    MissingRule { key: RuleKey },

    #[error("Void of entry {0} requires a reason")]
    EmptyVoidReason(LedgerEntryId),

    #[error("Ledger entry {0} not found")]
    EntryNotFound(LedgerEntryId),

    #[error("Ledger entry {0} is already settled and cannot be voided")]
    EntryAlreadySettled(LedgerEntryId),

    #[error("Ledger entry {0} is {1}, expected PENDING")]
    EntryNotPending(LedgerEntryId, EntryStatus),

    #[error(transparent)]
    Store(#[from] StoreError),
}
