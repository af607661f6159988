use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

pub const ACTOR_HEADER: &str = "X-User-ID";

/// Acting identity for rule mutations.
///
/// Taken from the `X-User-ID` header set by the calling admin tool. Every
/// change-log entry records it, and the rule handlers' spans carry it as the
/// `actor` field.
#[derive(Debug, Clone)]
pub struct Actor(pub String);

impl Actor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::AuthError(anyhow::anyhow!(
                    "Missing X-User-ID header (required for pricing rule changes)"
                ))
            })?;

        Ok(Actor(actor.to_string()))
    }
}
