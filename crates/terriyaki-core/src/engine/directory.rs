use tracing::info;
use uuid::Uuid;

use super::GrindEngine;
use crate::error::{CoreError, Result};
use crate::storage::users;
use crate::user::{RegisterUser, User, UserDirectory};

impl<P> GrindEngine<P> {
    /// Register a new user. Emails are unique, ignoring case.
    pub fn register_user(&self, input: RegisterUser) -> Result<User> {
        input.validate()?;
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            avatar: input.avatar.trim().to_string(),
            created_at: self.now(),
        };

        let inserted = self.db.with_conn(|conn| users::insert_user(conn, &user))?;
        if !inserted {
            return Err(CoreError::EmailTaken(user.email));
        }
        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Resolve an email or user id.
    pub fn resolve_user(&self, email_or_id: &str) -> Result<User> {
        self.db.resolve(email_or_id)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.db.with_conn(users::list_users)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::GrindEngine;
    use crate::error::ErrorCode;
    use crate::problems::StaticProblemSource;
    use crate::storage::Database;
    use crate::user::RegisterUser;

    fn engine() -> GrindEngine<StaticProblemSource> {
        GrindEngine::new(Database::open_memory().unwrap(), StaticProblemSource::builtin())
    }

    #[test]
    fn register_then_resolve() {
        let engine = engine();
        let alice = engine
            .register_user(RegisterUser::new(" alice ", "alice@example.com"))
            .unwrap();
        assert_eq!(alice.username, "alice");
        assert_eq!(engine.resolve_user(&alice.id).unwrap(), alice);
        assert_eq!(engine.resolve_user("alice@example.com").unwrap(), alice);
        assert_eq!(engine.list_users().unwrap().len(), 1);
    }

    #[test]
    fn email_is_unique_ignoring_case() {
        let engine = engine();
        engine
            .register_user(RegisterUser::new("alice", "alice@example.com"))
            .unwrap();
        let err = engine
            .register_user(RegisterUser::new("alice2", "ALICE@example.com"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[test]
    fn invalid_registration_is_rejected() {
        let err = engine()
            .register_user(RegisterUser::new("bob", "bob"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
