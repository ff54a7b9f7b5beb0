//! Contract Domain - the sellable unit and its lifecycle
//!
//! A contract moves Draft → Pending → Confirmed or Cancelled. Confirmation
//! links (or creates) the Client record from the originating Lead; a
//! confirmed contract is what the settlement engine consumes, exactly once.

pub mod contract;
pub mod service;
pub mod error;

pub use contract::{Contract, ContractStatus};
pub use service::{
    ClientDirectory, ConfirmationOutcome, ConfirmationService, LogNotifier, NotificationSender,
};
pub use error::ContractError;
