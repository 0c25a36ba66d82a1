use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::data::user_repository::{NewUser, UserCredentials, UserRepository};
use crate::domain::error::DomainError;
use crate::domain::user::User;

#[derive(Debug, Default)]
pub(crate) struct MemoryUserRepository {
    users: Mutex<UserTable>,
}

#[derive(Debug, Default)]
struct UserTable {
    next_id: i64,
    rows: Vec<UserCredentials>,
}

impl MemoryUserRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_user(&self, input: NewUser) -> Result<User, DomainError> {
        let mut table = self
            .users
            .lock()
            .map_err(|_| DomainError::Unexpected("user table lock poisoned".to_string()))?;

        if table.rows.iter().any(|row| row.user.email == input.email) {
            return Err(DomainError::AlreadyExists("email".to_string()));
        }

        table.next_id += 1;
        let now = Utc::now();
        let user = User::new(table.next_id, input.email, now, now)?;
        table.rows.push(UserCredentials {
            user: user.clone(),
            password_hash: input.password_hash,
        });
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, DomainError> {
        let table = self
            .users
            .lock()
            .map_err(|_| DomainError::Unexpected("user table lock poisoned".to_string()))?;

        Ok(table.rows.iter().find(|row| row.user.email == email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryUserRepository;
    use crate::data::user_repository::{NewUser, UserRepository};
    use crate::domain::error::DomainError;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = MemoryUserRepository::new();
        let first = repo.create_user(new_user("a@b.com")).await.expect("first insert");
        assert_eq!(first.id, 1);

        let err = repo
            .create_user(new_user("a@b.com"))
            .await
            .expect_err("second insert must fail");
        assert!(matches!(err, DomainError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn find_by_email_returns_stored_hash() {
        let repo = MemoryUserRepository::new();
        repo.create_user(new_user("a@b.com")).await.expect("insert");

        let found = repo
            .find_by_email("a@b.com")
            .await
            .expect("lookup")
            .expect("user exists");
        assert_eq!(found.password_hash, "hash");
        assert!(repo.find_by_email("x@y.com").await.expect("lookup").is_none());
    }
}
