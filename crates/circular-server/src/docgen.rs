//! [`DocumentGenerator`] backed by the external PDF rendering service.
//!
//! `POST {base_url}/render` with the response's template, answers and the
//! base64 signature image. The service replies with
//! `{"document_ref": "...", "document_url": "..."}`.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use circular_core::{
  document::{DocumentGenerator, RenderRequest},
  response::DocumentRef,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
  #[error("document service request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("document service returned {status}: {body}")]
  Status { status: u16, body: String },
}

#[derive(Serialize)]
struct RenderBody<'a> {
  #[serde(flatten)]
  request:   &'a RenderRequest,
  signature: String,
}

#[derive(Deserialize)]
struct Rendered {
  document_ref: String,
  document_url: String,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpDocumentGenerator {
  client:   Client,
  base_url: String,
}

impl HttpDocumentGenerator {
  pub fn new(base_url: impl Into<String>) -> Result<Self, DocumentError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url.trim_end_matches('/'), path)
  }
}

impl DocumentGenerator for HttpDocumentGenerator {
  type Error = DocumentError;

  async fn render(&self, request: RenderRequest) -> Result<DocumentRef, DocumentError> {
    let body = RenderBody {
      signature: B64.encode(&request.signature),
      request:   &request,
    };
    let resp = self.client.post(self.url("/render")).json(&body).send().await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(DocumentError::Status { status: status.as_u16(), body });
    }

    let rendered: Rendered = resp.json().await?;
    tracing::debug!(
      response_id = %request.response_id,
      document_ref = %rendered.document_ref,
      "document rendered"
    );
    Ok(DocumentRef {
      document_id: rendered.document_ref,
      url:         rendered.document_url,
    })
  }
}
