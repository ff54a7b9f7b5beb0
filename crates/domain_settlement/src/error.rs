//! Settlement domain errors

use thiserror::Error;

use core_kernel::{PeriodId, TemporalError};

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Settlement period {0} is closed")]
    PeriodClosed(PeriodId),

    #[error("Settlement period {0} not found")]
    PeriodNotFound(PeriodId),

    #[error(transparent)]
    Temporal(#[from] TemporalError),
}
