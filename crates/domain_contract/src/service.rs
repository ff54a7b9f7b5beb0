//! Contract confirmation workflow
//!
//! Confirmation is the one lifecycle step with side effects beyond the
//! aggregate itself: the Client record is resolved (or created) from the
//! originating Lead, and a notification goes out to the referring agent.
//! The notification is fire-and-forget; its failure never aborts the
//! confirmation.

use async_trait::async_trait;
use tracing::warn;

use core_kernel::{ClientId, CoreError, LeadId, RequestContext, TenantId};

use crate::contract::Contract;
use crate::error::ContractError;

/// Lookup/creation of Client records, backed by the data store.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Returns the client already linked to this lead, if any.
    async fn find_for_lead(&self, lead_id: LeadId) -> Result<Option<ClientId>, CoreError>;

    /// Creates a client from the lead's captured data.
    async fn create_from_lead(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
    ) -> Result<ClientId, CoreError>;
}

/// Outbound notification collaborator (email/WhatsApp behind the scenes).
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn contract_confirmed(&self, contract: &Contract) -> Result<(), CoreError>;
}

/// Result of a confirmation, including whether a client was created.
#[derive(Debug)]
pub struct ConfirmationOutcome {
    pub contract: Contract,
    pub client_created: bool,
}

/// Orchestrates contract confirmation.
pub struct ConfirmationService<D, N> {
    directory: D,
    notifier: N,
}

impl<D, N> ConfirmationService<D, N>
where
    D: ClientDirectory,
    N: NotificationSender,
{
    pub fn new(directory: D, notifier: N) -> Self {
        Self { directory, notifier }
    }

    /// Confirms a pending contract, deriving the client from the lead
    /// when the contract carries none.
    pub async fn confirm(
        &self,
        ctx: &RequestContext,
        mut contract: Contract,
    ) -> Result<ConfirmationOutcome, ContractError> {
        if !ctx.can_manage_commissions() {
            return Err(ContractError::Unauthorized(format!(
                "role {} may not confirm contracts",
                ctx.role
            )));
        }

        let mut client_created = false;
        let client_id = match contract.client_id {
            Some(existing) => existing,
            None => {
                let lead_id = contract.lead_id.ok_or(ContractError::MissingLead)?;
                match self.directory.find_for_lead(lead_id).await? {
                    Some(found) => found,
                    None => {
                        client_created = true;
                        self.directory
                            .create_from_lead(contract.tenant_id, lead_id)
                            .await?
                    }
                }
            }
        };

        contract.confirm(client_id)?;

        if let Err(err) = self.notifier.contract_confirmed(&contract).await {
            warn!(contract_id = %contract.id, error = %err, "confirmation notification failed");
        }

        Ok(ConfirmationOutcome {
            contract,
            client_created,
        })
    }
}

/// Notifier that only logs; the default until an outbound channel is wired.
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn contract_confirmed(&self, contract: &Contract) -> Result<(), CoreError> {
        tracing::info!(contract_id = %contract.id, "contract confirmed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractStatus;
    use core_kernel::{Role, Tier};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct FakeDirectory {
        existing: Option<ClientId>,
        created: Mutex<Vec<LeadId>>,
    }

    #[async_trait]
    impl ClientDirectory for FakeDirectory {
        async fn find_for_lead(&self, _lead_id: LeadId) -> Result<Option<ClientId>, CoreError> {
            Ok(self.existing)
        }

        async fn create_from_lead(
            &self,
            _tenant_id: TenantId,
            lead_id: LeadId,
        ) -> Result<ClientId, CoreError> {
            self.created.lock().unwrap().push(lead_id);
            Ok(ClientId::new())
        }
    }

    struct FailingNotifier {
        called: AtomicBool,
    }

    #[async_trait]
    impl NotificationSender for FailingNotifier {
        async fn contract_confirmed(&self, _contract: &Contract) -> Result<(), CoreError> {
            self.called.store(true, Ordering::SeqCst);
            Err(CoreError::validation("smtp down"))
        }
    }

    fn pending_contract(tenant: TenantId) -> Contract {
        let mut contract = Contract::new(tenant, "luz", Tier::C1);
        contract.lead_id = Some(LeadId::new());
        contract.submit().unwrap();
        contract
    }

    #[tokio::test]
    async fn test_confirm_creates_client_from_lead() {
        let tenant = TenantId::new();
        let ctx = RequestContext::new(Role::Admin, tenant);
        let directory = FakeDirectory {
            existing: None,
            created: Mutex::new(Vec::new()),
        };
        let service = ConfirmationService::new(directory, LogNotifier);

        let outcome = service.confirm(&ctx, pending_contract(tenant)).await.unwrap();

        assert_eq!(outcome.contract.status, ContractStatus::Confirmed);
        assert!(outcome.client_created);
        assert!(outcome.contract.client_id.is_some());
    }

    #[tokio::test]
    async fn test_confirm_reuses_existing_client() {
        let tenant = TenantId::new();
        let ctx = RequestContext::new(Role::Admin, tenant);
        let known = ClientId::new();
        let directory = FakeDirectory {
            existing: Some(known),
            created: Mutex::new(Vec::new()),
        };
        let service = ConfirmationService::new(directory, LogNotifier);

        let outcome = service.confirm(&ctx, pending_contract(tenant)).await.unwrap();

        assert!(!outcome.client_created);
        assert_eq!(outcome.contract.client_id, Some(known));
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_abort() {
        let tenant = TenantId::new();
        let ctx = RequestContext::new(Role::Admin, tenant);
        let directory = FakeDirectory {
            existing: Some(ClientId::new()),
            created: Mutex::new(Vec::new()),
        };
        let notifier = FailingNotifier {
            called: AtomicBool::new(false),
        };
        let service = ConfirmationService::new(directory, notifier);

        let outcome = service.confirm(&ctx, pending_contract(tenant)).await.unwrap();

        assert_eq!(outcome.contract.status, ContractStatus::Confirmed);
        assert!(service.notifier.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_agent_may_not_confirm() {
        let tenant = TenantId::new();
        let ctx = RequestContext::new(Role::Agent, tenant);
        let directory = FakeDirectory {
            existing: None,
            created: Mutex::new(Vec::new()),
        };
        let service = ConfirmationService::new(directory, LogNotifier);

        let err = service.confirm(&ctx, pending_contract(tenant)).await.unwrap_err();
        assert!(matches!(err, ContractError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_confirm_without_lead_or_client_fails() {
        let tenant = TenantId::new();
        let ctx = RequestContext::new(Role::Admin, tenant);
        let directory = FakeDirectory {
            existing: None,
            created: Mutex::new(Vec::new()),
        };
        let service = ConfirmationService::new(directory, LogNotifier);

        let mut contract = Contract::new(tenant, "luz", Tier::C1);
        contract.submit().unwrap();

        let err = service.confirm(&ctx, contract).await.unwrap_err();
        assert!(matches!(err, ContractError::MissingLead));
    }
}
