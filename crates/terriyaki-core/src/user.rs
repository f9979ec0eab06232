//! Users and the directory that resolves them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
}

impl RegisterUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            avatar: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::invalid("username", "must not be empty"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ValidationError::invalid(
                "email",
                format!("'{}' is not an email address", self.email),
            ));
        }
        Ok(())
    }
}

/// Lookup of users by email or id.
pub trait UserDirectory {
    /// Resolve an identifier that is either an email address or a user id.
    fn resolve(&self, email_or_id: &str) -> Result<User>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_requires_username_and_email() {
        assert!(RegisterUser::new("alice", "alice@example.com")
            .validate()
            .is_ok());
        assert!(RegisterUser::new("", "alice@example.com")
            .validate()
            .is_err());
        assert!(RegisterUser::new("alice", "not-an-email")
            .validate()
            .is_err());
    }
}
