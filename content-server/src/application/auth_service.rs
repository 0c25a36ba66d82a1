use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};
use tracing::{debug, info, warn};

use crate::data::user_repository::{NewUser, UserRepository};
use crate::domain::error::DomainError;
use crate::domain::token::{TokenClaims, TokenDetails};
use crate::domain::user::{Credentials, User};
use crate::infrastructure::jwt::{Claims, JwtError, JwtService, TokenKind};

pub(crate) struct AuthService<R: UserRepository> {
    repo: R,
    jwt: JwtService,
}

impl<R: UserRepository> AuthService<R> {
    const DUMMY_PASSWORD_HASH: &'static str = "$argon2id$v=19$m=19456,t=2,p=1$MDEyMzQ1Njc4OWFiY2RlZg$gwN6hT1sNdk9kI95f7n2Gl3fL0qRmBf2Ffkj2r90/0M";

    pub(crate) fn new(repo: R, jwt: JwtService) -> Self {
        Self { repo, jwt }
    }

    /// Creates the account. Does not sign the user in.
    pub(crate) async fn sign_up(&self, credentials: Credentials) -> Result<User, DomainError> {
        let credentials = credentials.validate_for_sign_up()?;

        if self.repo.find_by_email(&credentials.email).await?.is_some() {
            info!(email = %credentials.email, "sign-up rejected, email already registered");
            return Err(DomainError::AlreadyExists("email".to_string()));
        }

        let password_hash = self.hash_password(&credentials.master_password)?;
        let user = self
            .repo
            .create_user(NewUser {
                email: credentials.email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, email = %user.email, "user signed up");
        Ok(user)
    }

    pub(crate) async fn sign_in(&self, credentials: Credentials) -> Result<TokenDetails, DomainError> {
        let credentials = credentials.validate_for_sign_in()?;

        let user_creds = match self.repo.find_by_email(&credentials.email).await? {
            Some(user_creds) => user_creds,
            None => {
                // keep the timing close to the wrong-password path
                match self.verify_password(&credentials.master_password, Self::DUMMY_PASSWORD_HASH) {
                    Ok(()) | Err(DomainError::InvalidCredentials) => {}
                    Err(err) => return Err(err),
                }
                info!(email = %credentials.email, "sign-in for unknown email");
                return Err(DomainError::InvalidCredentials);
            }
        };

        if let Err(err) = self.verify_password(&credentials.master_password, &user_creds.password_hash) {
            if matches!(err, DomainError::InvalidCredentials) {
                warn!(user_id = user_creds.user.id, "sign-in with wrong password");
            }
            return Err(err);
        }

        let details = self.issue_tokens(&user_creds.user.email, user_creds.user.id)?;
        info!(user_id = user_creds.user.id, "user signed in");
        Ok(details)
    }

    /// Mints a fresh pair from a refresh token. The presented token stays
    /// valid until it expires.
    pub(crate) async fn refresh_token(&self, refresh_token: &str) -> Result<TokenDetails, DomainError> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(DomainError::Validation {
                field: "refresh_token",
                message: "must not be empty",
            });
        }

        let claims = self.decode(refresh_token, TokenKind::Refresh)?;
        let details = self.issue_tokens(&claims.email, claims.user_id)?;

        info!(user_id = claims.user_id, "token pair refreshed");
        Ok(details)
    }

    /// Validates an access token.
    pub(crate) fn validate_token(&self, token: &str) -> Result<TokenClaims, DomainError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DomainError::InvalidToken);
        }
        self.decode(token, TokenKind::Access)
            .map(|claims| claims.identity())
    }

    pub(crate) fn hash_password(&self, raw_password: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Self::argon2()?
            .hash_password(raw_password.as_bytes(), &salt)
            .map_err(|err| DomainError::unexpected("hash password", err))?;
        Ok(password_hash.to_string())
    }

    pub(crate) fn verify_password(
        &self,
        raw_password: &str,
        password_hash: &str,
    ) -> Result<(), DomainError> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|err| DomainError::unexpected("parse password hash", err))?;
        Self::argon2()?
            .verify_password(raw_password.as_bytes(), &parsed_hash)
            .map_err(|err| match err {
                PasswordHashError::Password => DomainError::InvalidCredentials,
                _ => DomainError::unexpected("verify password", err),
            })?;

        Ok(())
    }

    fn decode(&self, token: &str, expected: TokenKind) -> Result<Claims, DomainError> {
        let claims = self.jwt.validate_token(token).map_err(|err| match err {
            JwtError::Expired => DomainError::ExpiredToken,
            JwtError::Invalid(source) => {
                debug!(error = %source, "token rejected");
                DomainError::InvalidToken
            }
            JwtError::Encode(source) => DomainError::unexpected("decode token", source),
        })?;

        if claims.token_type != expected {
            debug!(
                user_id = claims.user_id,
                actual = ?claims.token_type,
                expected = ?expected,
                "token used for the wrong purpose"
            );
            return Err(DomainError::InvalidToken);
        }
        Ok(claims)
    }

    fn issue_tokens(&self, email: &str, user_id: i64) -> Result<TokenDetails, DomainError> {
        let details = self
            .jwt
            .create_token_pair(email, user_id)
            .map_err(|err| DomainError::unexpected("create token pair", err))?;

        if details.transmission_key.is_weak() {
            warn!(user_id, "transmission key was generated without the OS random source");
        }
        Ok(details)
    }

    fn argon2() -> Result<Argon2<'static>, DomainError> {
        let params = Params::new(19 * 1024, 2, 1, None)
            .map_err(|err| DomainError::unexpected("argon2 params", err))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}
