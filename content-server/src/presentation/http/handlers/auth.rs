use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::token::TokenDetails;
use crate::domain::user::Credentials;
use crate::presentation::AppState;
use crate::presentation::http::app_error::AppResult;
use crate::presentation::http::middleware::auth::AuthenticatedUser;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct CredentialsDto {
    #[validate(length(min = 1, max = 255))]
    pub(crate) email: String,
    #[validate(length(min = 1, max = 128))]
    pub(crate) master_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub(crate) struct RefreshDto {
    #[validate(length(min = 1))]
    pub(crate) refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct TokenDetailsDto {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    pub(crate) transmission_key: String,
    pub(crate) access_token_expires_at: DateTime<Utc>,
    pub(crate) refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct MessageDto {
    pub(crate) message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct CheckTokenDto {
    pub(crate) valid: bool,
    pub(crate) email: String,
}

impl From<CredentialsDto> for Credentials {
    fn from(dto: CredentialsDto) -> Self {
        Self {
            email: dto.email,
            master_password: dto.master_password,
        }
    }
}

impl From<TokenDetails> for TokenDetailsDto {
    fn from(details: TokenDetails) -> Self {
        Self {
            access_token: details.access_token,
            refresh_token: details.refresh_token,
            transmission_key: details.transmission_key.value,
            access_token_expires_at: details.access_expires_at,
            refresh_token_expires_at: details.refresh_expires_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "auth",
    request_body = CredentialsDto,
    responses(
        (status = 201, description = "User created", body = MessageDto),
        (status = 400, description = "Validation error"),
        (status = 409, description = "User already exists"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsDto>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageDto>)> {
    let Json(dto) = payload?;
    dto.validate()?;

    state.auth_service.sign_up(dto.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageDto {
            message: "user created successfully".to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signin",
    tag = "auth",
    request_body = CredentialsDto,
    responses(
        (status = 200, description = "Signed in", body = TokenDetailsDto),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid email or password"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsDto>, JsonRejection>,
) -> AppResult<(StatusCode, Json<TokenDetailsDto>)> {
    let Json(dto) = payload?;
    dto.validate()?;

    let details = state.auth_service.sign_in(dto.into()).await?;
    Ok((StatusCode::OK, Json(details.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshDto,
    responses(
        (status = 200, description = "New token pair", body = TokenDetailsDto),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid or expired refresh token"),
        (status = 500, description = "Internal error")
    )
)]
pub(crate) async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshDto>, JsonRejection>,
) -> AppResult<(StatusCode, Json<TokenDetailsDto>)> {
    let Json(dto) = payload?;
    dto.validate()?;

    let details = state.auth_service.refresh_token(&dto.refresh_token).await?;
    Ok((StatusCode::OK, Json(details.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/check",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Token is valid", body = CheckTokenDto),
        (status = 401, description = "Invalid or expired token")
    )
)]
pub(crate) async fn check(auth: AuthenticatedUser) -> Json<CheckTokenDto> {
    Json(CheckTokenDto {
        valid: true,
        email: auth.email,
    })
}
