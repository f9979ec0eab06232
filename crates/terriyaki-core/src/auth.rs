//! Access-token verification seam.
//!
//! Token issuance lives outside this crate. The engine only ever sees user
//! ids; front ends turn a bearer token into one through an [`AuthProvider`].

use std::collections::HashMap;

use crate::error::{CoreError, Result};

pub trait AuthProvider: Send + Sync {
    /// Returns the user id the token was issued to.
    fn verify_access(&self, token: &str) -> Result<String>;
}

/// Static token to user id table, usually loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: HashMap<String, String>,
}

impl TokenTable {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn insert(&mut self, token: impl Into<String>, user_id: impl Into<String>) {
        self.tokens.insert(token.into(), user_id.into());
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl AuthProvider for TokenTable {
    fn verify_access(&self, token: &str) -> Result<String> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CoreError::Unauthorized);
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or(CoreError::Unauthorized)
    }
}
