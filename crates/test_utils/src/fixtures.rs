//! Canonical test fixtures

use fake::faker::name::en::Name;
use fake::Fake;
use once_cell::sync::Lazy;

use core_kernel::{AgentId, PlaceId, TenantId};

/// A stable tenant/agent/place graph shared by tests that don't care
/// about identity, only about relationships.
#[derive(Debug, Clone, Copy)]
pub struct TenantFixture {
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub place_id: PlaceId,
}

impl TenantFixture {
    pub fn random() -> Self {
        Self {
            tenant_id: TenantId::new(),
            agent_id: AgentId::new(),
            place_id: PlaceId::new(),
        }
    }
}

/// The default fixture; stable within a test process.
pub static FIXTURE: Lazy<TenantFixture> = Lazy::new(TenantFixture::random);

/// A plausible person name for lead/client test data.
pub fn sample_person_name() -> String {
    Name().fake()
}
