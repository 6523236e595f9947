//! Server membership and public identity value objects.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ServerId, Timestamp, UserId, ValidationError};

/// Role of a member inside one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(ValidationError::invalid_value(
                "role",
                format!("expected 'admin' or 'user', got '{}'", other),
            )),
        }
    }

    /// Whether this role may perform moderation actions.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// One user's membership row in one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub server_id: ServerId,
    pub user_id: UserId,
    pub role: Role,
    pub joined_at: Timestamp,
    /// When set and in the future, the member is muted.
    pub timeout_until: Option<Timestamp>,
}

impl Membership {
    /// Whether this member is currently timed out.
    pub fn is_timed_out(&self) -> bool {
        self.timeout_until.map(|t| t.is_future()).unwrap_or(false)
    }
}

/// The public identity snapshot embedded in broadcast envelopes so that
/// receivers never need a follow-up fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_storage_form() {
        assert_eq!(Role::parse("admin").unwrap(), Role::Admin);
        assert_eq!(Role::parse("user").unwrap(), Role::User);
        assert!(Role::parse("owner").is_err());
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
    }

    #[test]
    fn past_timeout_is_not_timed_out() {
        let m = Membership {
            server_id: ServerId::new("s"),
            user_id: UserId::new("u"),
            role: Role::User,
            joined_at: Timestamp::from_unix(0),
            timeout_until: Some(Timestamp::from_unix(1)),
        };
        assert!(!m.is_timed_out());
    }

    #[test]
    fn future_timeout_is_timed_out() {
        let m = Membership {
            server_id: ServerId::new("s"),
            user_id: UserId::new("u"),
            role: Role::User,
            joined_at: Timestamp::from_unix(0),
            timeout_until: Some(Timestamp::now().plus_secs(300)),
        };
        assert!(m.is_timed_out());
    }
}
