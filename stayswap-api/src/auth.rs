use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Acting user, taken from the `X-User-Id` header.
///
/// Authentication itself lives with an upstream collaborator (the gateway
/// verifies the session and injects the header); this service only needs the
/// identity for ownership checks.
#[derive(Debug, Clone, Copy)]
pub struct ActingUser(pub Uuid);

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthenticated("Missing X-User-Id header".to_string()))?;
        let raw = raw
            .to_str()
            .map_err(|_| ApiError::Unauthenticated("Invalid X-User-Id header".to_string()))?;
        let user_id = raw
            .parse::<Uuid>()
            .map_err(|_| ApiError::Unauthenticated("X-User-Id must be a UUID".to_string()))?;
        Ok(ActingUser(user_id))
    }
}
