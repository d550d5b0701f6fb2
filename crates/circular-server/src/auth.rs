//! HTTP Basic auth for the gateway in front of the API.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, StatusCode, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

#[derive(Debug, thiserror::Error)]
#[error("unauthorized")]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
  fn into_response(self) -> Response {
    (
      StatusCode::UNAUTHORIZED,
      [(header::WWW_AUTHENTICATE, r#"Basic realm="circular""#)],
      "Unauthorized",
    )
      .into_response()
  }
}

/// Verify Basic credentials in `headers` against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Unauthorized> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Unauthorized)?;

  let encoded = header_val.strip_prefix("Basic ").ok_or(Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Unauthorized)?;

  if username != config.username {
    return Err(Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash).map_err(|_| Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Unauthorized)
}

/// Middleware rejecting every request without valid credentials.
pub async fn require_basic(
  State(config): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Result<Response, Unauthorized> {
  if let Err(e) = verify_auth(req.headers(), &config) {
    tracing::debug!(path = %req.uri().path(), "rejected credentials");
    return Err(e);
  }
  Ok(next.run(req).await)
}
