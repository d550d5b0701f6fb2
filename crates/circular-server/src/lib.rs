//! HTTP host for the circular consent workflow.
//!
//! Wraps the JSON API from `circular-api` in HTTP Basic auth and request
//! tracing, and supplies the production [`DocumentGenerator`] backed by the
//! external renderer.

pub mod auth;
pub mod docgen;
pub mod sweep;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware};
use circular_core::{
  directory::ParticipantDirectory, document::DocumentGenerator, store::CircularStore,
};
use circular_workflow::{Portal, PortalConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CIRCULAR_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                            String,
  pub port:                            u16,
  pub store_path:                      PathBuf,
  pub auth_username:                   String,
  pub auth_password_hash:              String,
  /// Base URL of the PDF rendering service.
  pub document_service_url:            String,
  #[serde(default = "default_document_timeout_secs")]
  pub document_timeout_secs:           u64,
  /// Period of the pending-document sweep. Unset disables it.
  #[serde(default)]
  pub sweep_interval_secs:             Option<u64>,
  #[serde(default)]
  pub require_verified_for_attendance: bool,
}

fn default_document_timeout_secs() -> u64 { 10 }

impl ServerConfig {
  pub fn portal_config(&self) -> PortalConfig {
    PortalConfig {
      document_timeout:                Duration::from_secs(self.document_timeout_secs),
      require_verified_for_attendance: self.require_verified_for_attendance,
    }
  }

  pub fn auth_config(&self) -> AuthConfig {
    AuthConfig {
      username:      self.auth_username.clone(),
      password_hash: self.auth_password_hash.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: `/api` behind Basic auth, with request tracing.
pub fn router<S, D, G>(portal: Portal<S, D, G>, auth: Arc<AuthConfig>) -> Router
where
  S: CircularStore + 'static,
  D: ParticipantDirectory + 'static,
  G: DocumentGenerator + 'static,
{
  Router::new()
    .nest("/api", circular_api::api_router(portal))
    .layer(middleware::from_fn_with_state(auth, auth::require_basic))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::{convert::Infallible, sync::Arc};

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use circular_core::{
    document::{DocumentGenerator, RenderRequest},
    response::DocumentRef,
  };
  use circular_store_sqlite::SqliteStore;
  use circular_workflow::{Portal, PortalConfig};
  use rand_core::OsRng;
  use tower::ServiceExt as _;

  use super::*;

  struct NoopGenerator;

  impl DocumentGenerator for NoopGenerator {
    type Error = Infallible;

    async fn render(&self, request: RenderRequest) -> Result<DocumentRef, Infallible> {
      Ok(DocumentRef {
        document_id: request.response_id.to_string(),
        url:         String::new(),
      })
    }
  }

  async fn app(password: &str) -> Router {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let portal = Portal::new(
      store.clone(),
      store,
      Arc::new(NoopGenerator),
      PortalConfig::default(),
    );
    router(
      portal,
      Arc::new(AuthConfig { username: "gateway".into(), password_hash: hash }),
    )
  }

  fn request(authorization: Option<String>) -> Request<Body> {
    let mut req = Request::builder()
      .uri(format!("/api/activities/{}/circular", uuid::Uuid::new_v4()))
      .header("x-actor-role", "staff")
      .header("x-actor-id", uuid::Uuid::new_v4().to_string());
    if let Some(value) = authorization {
      req = req.header(header::AUTHORIZATION, value);
    }
    req.body(Body::empty()).unwrap()
  }

  #[tokio::test]
  async fn api_requires_basic_auth() {
    let app = app("secret").await;
    let resp = app.oneshot(request(None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn authenticated_requests_reach_the_api() {
    let app = app("secret").await;
    let creds = format!("Basic {}", B64.encode("gateway:secret"));
    let resp = app.oneshot(request(Some(creds))).await.unwrap();
    // Past auth; the activity simply has no circular.
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn config_defaults() {
    let cfg: ServerConfig = serde_json::from_value(serde_json::json!({
      "host": "127.0.0.1",
      "port": 8080,
      "store_path": "/tmp/circular.db",
      "auth_username": "gateway",
      "auth_password_hash": "$argon2id$...",
      "document_service_url": "http://localhost:9000",
    }))
    .unwrap();
    assert_eq!(cfg.document_timeout_secs, 10);
    assert_eq!(cfg.sweep_interval_secs, None);
    assert!(!cfg.portal_config().require_verified_for_attendance);
  }
}
