//! Authentication and request-context resolution
//!
//! The session layer is JWT bearer auth. A validated token resolves into
//! a [`RequestContext`] exactly once per request (in the auth middleware);
//! core operations receive that context explicitly and never look at the
//! token again.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use core_kernel::{RequestContext, Role};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Caller role: AGENT, ADMIN, or SUPERADMIN
    pub role: String,
    /// Tenant the caller belongs to
    pub tenant_id: Uuid,
    /// Agent record linked to the caller, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    /// Place record linked to the caller, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<Uuid>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

impl Claims {
    /// Resolves the claims into the per-request context.
    pub fn to_context(&self) -> Result<RequestContext, AuthError> {
        let role: Role = self
            .role
            .parse()
            .map_err(|_| AuthError::UnknownRole(self.role.clone()))?;

        let mut ctx = RequestContext::new(role, self.tenant_id.into());
        if let Some(agent_id) = self.agent_id {
            ctx = ctx.with_agent(agent_id.into());
        }
        if let Some(place_id) = self.place_id {
            ctx = ctx.with_place(place_id.into());
        }
        Ok(ctx)
    }
}

/// Creates a new JWT token.
pub fn create_token(
    user_id: &str,
    role: Role,
    tenant_id: Uuid,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        tenant_id,
        agent_id: None,
        place_id: None,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        if e.to_string().contains("ExpiredSignature") {
            AuthError::TokenExpired
        } else {
            AuthError::InvalidToken
        }
    })?;

    Ok(token_data.claims)
}
