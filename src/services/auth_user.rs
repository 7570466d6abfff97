use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{error, warn};

use crate::config::AuthConfig;
use crate::dto::claims_dto::Claims;
use crate::error::StrikrError;

/// Caller authenticated with a bearer JWT signed with `auth.jwt_secret`.
pub struct AuthUser(pub Claims);

/// Authenticated caller carrying the staff role.
pub struct StaffUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StrikrError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .ok_or_else(|| StrikrError::Unauthorized("Missing or invalid Authorization header".to_string()))?;

        let auth = parts.extensions.get::<AuthConfig>().ok_or_else(|| {
            error!("Auth config missing from request extensions");
            StrikrError::Unauthorized("Authentication is not configured".to_string())
        })?;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            warn!("Token decoding failed: {:?}", e);
            StrikrError::Unauthorized("Invalid token".to_string())
        })?;

        Ok(AuthUser(claims.claims))
    }
}

impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
{
    type Rejection = StrikrError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !claims.is_staff() {
            warn!(sub = %claims.sub, "Non-staff caller tried a staff route");
            return Err(StrikrError::Unauthorized("Staff role required".to_string()));
        }
        Ok(StaffUser(claims))
    }
}
