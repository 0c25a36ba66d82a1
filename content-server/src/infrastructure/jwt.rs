use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::token::{TokenClaims, TokenDetails};
use crate::infrastructure::keys::{generate_token_id, generate_transmission_key};

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error)]
pub(crate) enum JwtError {
    #[error("token encode failed")]
    Encode(#[source] jsonwebtoken::errors::Error),

    #[error("token is invalid")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("token expired")]
    Expired,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TokenKind {
    Access,
    Refresh,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct Claims {
    pub(crate) email: String,
    pub(crate) user_id: i64,
    pub(crate) token_type: TokenKind,
    pub(crate) jti: String,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

impl Claims {
    pub(crate) fn identity(&self) -> TokenClaims {
        TokenClaims {
            email: self.email.clone(),
            user_id: self.user_id,
            issued_at: DateTime::from_timestamp(self.iat, 0).unwrap_or_default(),
            expires_at: DateTime::from_timestamp(self.exp, 0).unwrap_or_default(),
        }
    }
}

pub(crate) struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtService {
    const DEFAULT_ACCESS_TTL_SECONDS: i64 = 60 * 60;
    const DEFAULT_REFRESH_TTL_SECONDS: i64 = 24 * 60 * 60;

    pub(crate) fn new(secret: &str, access_ttl_seconds: i64, refresh_ttl_seconds: i64) -> Self {
        let access_ttl_seconds = if access_ttl_seconds > 0 {
            access_ttl_seconds
        } else {
            Self::DEFAULT_ACCESS_TTL_SECONDS
        };
        let refresh_ttl_seconds = if refresh_ttl_seconds > 0 {
            refresh_ttl_seconds
        } else {
            Self::DEFAULT_REFRESH_TTL_SECONDS
        };

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        JwtService {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl: Duration::seconds(access_ttl_seconds),
            refresh_ttl: Duration::seconds(refresh_ttl_seconds),
        }
    }

    pub(crate) fn create_token_pair(
        &self,
        email: &str,
        user_id: i64,
    ) -> Result<TokenDetails, JwtError> {
        let now = Utc::now();
        let access_expires_at = now + self.access_ttl;
        let refresh_expires_at = now + self.refresh_ttl;

        let access_token = self.sign(&Claims {
            email: email.to_string(),
            user_id,
            token_type: TokenKind::Access,
            jti: generate_token_id(),
            iat: now.timestamp(),
            exp: access_expires_at.timestamp(),
        })?;
        let refresh_token = self.sign(&Claims {
            email: email.to_string(),
            user_id,
            token_type: TokenKind::Refresh,
            jti: generate_token_id(),
            iat: now.timestamp(),
            exp: refresh_expires_at.timestamp(),
        })?;

        Ok(TokenDetails {
            access_token,
            refresh_token,
            transmission_key: generate_transmission_key(),
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// A token is live only while `exp` is strictly in the future.
    pub(crate) fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(err),
            },
        )?;

        if token_data.claims.exp <= Utc::now().timestamp() {
            return Err(JwtError::Expired);
        }

        Ok(token_data.claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key).map_err(JwtError::Encode)
    }
}
