//! Contract domain errors

use thiserror::Error;

use core_kernel::CoreError;

use crate::contract::ContractStatus;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: ContractStatus,
        to: ContractStatus,
    },

    #[error("Contract has no lead to derive a client from")]
    MissingLead,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
