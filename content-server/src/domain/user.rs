use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use super::error::DomainError;

const PASSWORD_MIN_CHARS: usize = 6;
const PASSWORD_MAX_CHARS: usize = 128;

/// Email + master password pair submitted on sign-up and sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Credentials {
    pub(crate) email: String,
    pub(crate) master_password: String,
}

impl Credentials {
    /// Rules applied when a new account is created.
    pub(crate) fn validate_for_sign_up(self) -> Result<Self, DomainError> {
        let email = normalize_email(&self.email)?;
        let password_len = self.master_password.chars().count();
        if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&password_len) {
            return Err(DomainError::Validation {
                field: "master_password",
                message: "must be 6..128 chars",
            });
        }
        Ok(Self {
            email,
            master_password: self.master_password,
        })
    }

    /// Sign-in only rejects missing fields; anything else is decided by the
    /// credential check so unknown emails and bad passwords look the same.
    pub(crate) fn validate_for_sign_in(self) -> Result<Self, DomainError> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(DomainError::Validation {
                field: "email",
                message: "must not be empty",
            });
        }
        if self.master_password.is_empty() {
            return Err(DomainError::Validation {
                field: "master_password",
                message: "must not be empty",
            });
        }
        Ok(Self {
            email,
            master_password: self.master_password,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct User {
    pub(crate) id: i64,
    pub(crate) email: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl User {
    pub(crate) fn new(
        id: i64,
        email: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if id <= 0 {
            return Err(DomainError::Validation {
                field: "id",
                message: "must be > 0",
            });
        }
        let email = normalize_email(&email.into())?;

        Ok(Self {
            id,
            email,
            created_at,
            updated_at,
        })
    }
}

fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    if !email.validate_email() {
        return Err(DomainError::Validation {
            field: "email",
            message: "must be a valid email",
        });
    }
    Ok(email)
}
