//! The caller's identity, as forwarded by the authenticating gateway.
//!
//! The gateway sets `X-Actor-Role` (`guardian` or `staff`) and `X-Actor-Id`
//! (a UUID) on every request it lets through.

use axum::{extract::FromRequestParts, http::request::Parts};
use circular_core::auth::Actor;
use uuid::Uuid;

use crate::error::ApiError;

pub const ROLE_HEADER: &str = "x-actor-role";
pub const ID_HEADER: &str = "x-actor-id";

/// Extractor for the authenticated [`Actor`].
pub struct CurrentActor(pub Actor);

impl<St> FromRequestParts<St> for CurrentActor
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
    let header = |name: &'static str| {
      parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .ok_or_else(|| ApiError::MissingActor(format!("{name} header is required")))
    };

    let id = header(ID_HEADER)?;
    let id = Uuid::parse_str(id)
      .map_err(|_| ApiError::MissingActor(format!("{ID_HEADER} is not a UUID")))?;

    match header(ROLE_HEADER)?.to_ascii_lowercase().as_str() {
      "guardian" => Ok(CurrentActor(Actor::Guardian(id))),
      "staff" => Ok(CurrentActor(Actor::Staff(id))),
      other => Err(ApiError::MissingActor(format!("unknown role {other:?}"))),
    }
  }
}
