//! Bearer-token verification and per-request user context.
//!
//! Tokens are issued by the external identity provider. This module only
//! verifies the HS256 signature and standard claims, then reads the user id
//! from `sub`.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::errors::AppError;
use crate::flags::{self, UserFlags};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;
        if let Some(aud) = config.audience.as_deref() {
            validation.set_audience(&[aud]);
        }
        if let Some(iss) = config.issuer.as_deref() {
            validation.set_issuer(&[iss]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Verifies `token` and returns the authenticated user id.
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Rejected bearer token: {e}");
            AppError::Unauthenticated("Invalid or expired token".to_string())
        })?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Unauthenticated("Token subject is not a user id".to_string()))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    let header =
        header.ok_or_else(|| AppError::Unauthenticated("Missing Authorization header".into()))?;
    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthenticated("Malformed Authorization header".into()))?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::Unauthenticated(
            "Authorization header must use the Bearer scheme".into(),
        ));
    }
    Ok(token)
}

/// The authenticated caller and their resolved feature flags.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub flags: UserFlags,
}

impl AuthUser {
    /// Rejects requests that act on behalf of a different user.
    pub fn ensure_acting_as(&self, user_id: Option<Uuid>) -> Result<(), AppError> {
        match user_id {
            Some(id) if id != self.user_id => Err(AppError::Forbidden(
                "Cannot act on behalf of another user".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|v| {
                v.to_str()
                    .map_err(|_| AppError::Unauthenticated("Malformed Authorization header".into()))
            })
            .transpose()?;
        let token = bearer_token(header)?;
        let user_id = state.verifier.verify(token)?;
        let flags = flags::resolve(state.store.as_ref(), user_id).await?;
        Ok(AuthUser { user_id, flags })
    }
}
