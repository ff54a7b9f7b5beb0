//! Per-request authorization context
//!
//! The session layer resolves the caller once per request into a
//! [`RequestContext`] which is then passed explicitly into every core
//! operation. Core code never reaches back into ambient session state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::identifiers::{AgentId, PlaceId, TenantId};

/// Caller role resolved by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Agent,
    Admin,
    SuperAdmin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Agent => "AGENT",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPERADMIN",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AGENT" => Ok(Role::Agent),
            "ADMIN" => Ok(Role::Admin),
            "SUPERADMIN" | "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Everything the core needs to know about the caller.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub role: Role,
    pub tenant_id: TenantId,
    pub agent_id: Option<AgentId>,
    pub place_id: Option<PlaceId>,
}

impl RequestContext {
    pub fn new(role: Role, tenant_id: TenantId) -> Self {
        Self {
            role,
            tenant_id,
            agent_id: None,
            place_id: None,
        }
    }

    pub fn with_agent(mut self, agent_id: AgentId) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    pub fn with_place(mut self, place_id: PlaceId) -> Self {
        self.place_id = Some(place_id);
        self
    }

    /// Tenant predicate for reads and writes.
    ///
    /// `None` means unscoped: only SUPERADMIN sees across tenants. For
    /// every other role the caller's own tenant is the hard boundary:
    /// rows in other tenants behave exactly like rows that do not exist.
    pub fn tenant_scope(&self) -> Option<TenantId> {
        match self.role {
            Role::SuperAdmin => None,
            _ => Some(self.tenant_id),
        }
    }

    /// Settle, void, period, and import operations are admin-only.
    pub fn can_manage_commissions(&self) -> bool {
        matches!(self.role, Role::Admin | Role::SuperAdmin)
    }
}
