//! AuthProvider port - the `authenticate(token)` capability.
//!
//! Session issuance, password hashing and login flows live outside the
//! core; the gateway and the HTTP middleware only need to resolve a bearer
//! token to an identity.

use async_trait::async_trait;

use crate::domain::chat::PublicUser;
use crate::domain::foundation::{DomainError, Timestamp, UserId};

/// Identity resolved from a valid bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub created_at: Timestamp,
}

impl AuthenticatedUser {
    /// The public identity snapshot embedded in broadcast envelopes.
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.user_id.clone(),
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            created_at: self.created_at,
        }
    }
}

/// Resolves bearer tokens to identities.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns the identity behind `token`, or `None` when the token is
    /// unknown or expired. Infrastructure failures surface as errors.
    async fn authenticate(&self, token: &str) -> Result<Option<AuthenticatedUser>, DomainError>;
}
