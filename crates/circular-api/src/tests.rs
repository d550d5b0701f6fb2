//! Router tests: status codes, headers and JSON shapes over a real store.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use axum::{
  Router,
  body::Body,
  http::{HeaderMap, Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::NaiveDate;
use circular_core::{
  directory::Participant,
  document::{DocumentGenerator, RenderRequest},
  response::DocumentRef,
};
use circular_store_sqlite::SqliteStore;
use circular_workflow::{Portal, PortalConfig};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{
  actor::{ID_HEADER, ROLE_HEADER},
  api_router,
};

#[derive(Debug, thiserror::Error)]
#[error("renderer is down")]
struct Down;

/// Renders instantly while `up`, fails otherwise.
struct SwitchGenerator {
  up: AtomicBool,
}

impl DocumentGenerator for SwitchGenerator {
  type Error = Down;

  async fn render(&self, request: RenderRequest) -> Result<DocumentRef, Down> {
    if !self.up.load(Ordering::SeqCst) {
      return Err(Down);
    }
    Ok(DocumentRef {
      document_id: request.response_id.to_string(),
      url:         format!("https://docs.example/{}.pdf", request.response_id),
    })
  }
}

struct Harness {
  app:         Router,
  generator:   Arc<SwitchGenerator>,
  activity:    Uuid,
  participant: Uuid,
  guardian:    Uuid,
  staff:       Uuid,
}

enum As {
  Guardian(Uuid),
  Staff(Uuid),
  Nobody,
}

impl Harness {
  async fn call(
    &self,
    method: Method,
    uri: &str,
    who: As,
    body: Option<Value>,
    if_match: Option<&str>,
  ) -> (StatusCode, HeaderMap, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    match who {
      As::Guardian(id) => {
        req = req.header(ROLE_HEADER, "guardian").header(ID_HEADER, id.to_string());
      }
      As::Staff(id) => {
        req = req.header(ROLE_HEADER, "staff").header(ID_HEADER, id.to_string());
      }
      As::Nobody => {}
    }
    if let Some(tag) = if_match {
      req = req.header(header::IF_MATCH, tag);
    }
    let req = match body {
      Some(json) => req
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => req.body(Body::empty()).unwrap(),
    };

    let resp = self.app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, value)
  }

  fn sign_body(&self) -> Value {
    json!({
      "activity_id": self.activity,
      "participant_id": self.participant,
      "answers": { "allergy_ack": { "type": "boolean", "value": true } },
      "acknowledged": [],
      "signature": format!("data:image/png;base64,{}", B64.encode(b"\x89PNG sig")),
    })
  }

  async fn sign(&self) -> Value {
    let (status, _, body) = self
      .call(Method::POST, "/api/sign", As::Guardian(self.guardian), Some(self.sign_body()), None)
      .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
  }
}

async fn harness() -> Harness {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let generator = Arc::new(SwitchGenerator { up: AtomicBool::new(true) });
  let portal = Portal::new(store.clone(), store.clone(), generator.clone(), PortalConfig::default());
  let app = Router::new().nest("/api", api_router(portal));

  let participant = Participant {
    participant_id: Uuid::new_v4(),
    name:           "Irene".into(),
    surname:        "Vidal".into(),
    birth_date:     NaiveDate::from_ymd_opt(2014, 1, 20).unwrap(),
    section:        "manada".into(),
  };
  store.add_participant(participant.clone()).await.unwrap();
  let guardian = Uuid::new_v4();
  store
    .link_guardian(guardian, participant.participant_id, "mother")
    .await
    .unwrap();

  let h = Harness {
    app,
    generator,
    activity: Uuid::new_v4(),
    participant: participant.participant_id,
    guardian,
    staff: Uuid::new_v4(),
  };

  let (status, _, _) = h
    .call(
      Method::PUT,
      &format!("/api/activities/{}", h.activity),
      As::Staff(h.staff),
      Some(json!({
        "title": "Acampada de otoño",
        "starts_at": "2031-10-10T08:00:00Z",
        "ends_at": "2031-10-12T18:00:00Z",
        "sections": ["manada"],
      })),
      None,
    )
    .await;
  assert_eq!(status, StatusCode::OK);

  let (status, _, body) = h
    .call(
      Method::PUT,
      &format!("/api/activities/{}/circular", h.activity),
      As::Staff(h.staff),
      Some(json!({
        "template_ref": "acampada",
        "fields": [{
          "id": "allergy_ack",
          "label": "Allergies reviewed",
          "kind": { "type": "boolean" },
          "required": true,
        }],
      })),
      None,
    )
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");

  h
}

// The harness mounts under /api; prefix every path.
impl Harness {
  async fn api(
    &self,
    method: Method,
    path: &str,
    who: As,
    body: Option<Value>,
  ) -> (StatusCode, HeaderMap, Value) {
    self.call(method, &format!("/api{path}"), who, body, None).await
  }
}

// ─── Auth context ────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_actor_is_401() {
  let h = harness().await;
  let (status, _, body) = h
    .api(Method::GET, &format!("/stats?activity={}", h.activity), As::Nobody, None)
    .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn wrong_role_is_403() {
  let h = harness().await;
  let (status, _, body) = h
    .api(
      Method::GET,
      &format!("/stats?activity={}", h.activity),
      As::Guardian(h.guardian),
      None,
    )
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn unlinked_guardian_is_403() {
  let h = harness().await;
  let (status, _, _) = h
    .call(Method::POST, "/api/sign", As::Guardian(Uuid::new_v4()), Some(h.sign_body()), None)
    .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Forms and signing ───────────────────────────────────────────────────────

#[tokio::test]
async fn form_reports_missing_profile_as_stale() {
  let h = harness().await;
  let (status, _, body) = h
    .api(
      Method::GET,
      &format!("/form?activity={}&participant={}", h.activity, h.participant),
      As::Guardian(h.guardian),
      None,
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["health"]["stale"], true);
  assert_eq!(body["response"], Value::Null);
  assert_eq!(body["definition"]["template_ref"], "acampada");
}

#[tokio::test]
async fn form_for_unknown_activity_is_404() {
  let h = harness().await;
  let (status, _, body) = h
    .api(
      Method::GET,
      &format!("/form?activity={}&participant={}", Uuid::new_v4(), h.participant),
      As::Guardian(h.guardian),
      None,
    )
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn incomplete_form_lists_missing_fields() {
  let h = harness().await;
  let mut body = h.sign_body();
  body["answers"] = json!({});

  let (status, _, body) = h.api(Method::POST, "/sign", As::Guardian(h.guardian), Some(body)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "incomplete_form");
  assert_eq!(body["missing"], json!(["allergy_ack"]));
}

#[tokio::test]
async fn sign_verify_with_etags() {
  let h = harness().await;
  let signed = h.sign().await;
  assert_eq!(signed["state"], "SIGNED");
  let id = signed["response_id"].as_str().unwrap().to_owned();

  let (status, headers, body) = h
    .api(Method::GET, &format!("/responses/{id}"), As::Staff(h.staff), None)
    .await;
  assert_eq!(status, StatusCode::OK);
  // Inserted at 1, document attached at 2.
  assert_eq!(headers[header::ETAG], "\"2\"");
  assert_eq!(body["version"], 2);

  let (status, _, body) = h
    .call(
      Method::POST,
      &format!("/api/verify/{id}"),
      As::Staff(h.staff),
      None,
      Some("\"1\""),
    )
    .await;
  assert_eq!(status, StatusCode::PRECONDITION_FAILED);
  assert_eq!(body["error"], "precondition_failed");

  let (status, headers, body) = h
    .call(
      Method::POST,
      &format!("/api/verify/{id}"),
      As::Staff(h.staff),
      None,
      Some("\"2\""),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["state"], "VERIFIED");
  assert_eq!(headers[header::ETAG], "\"3\"");

  let (status, _, body) = h
    .api(Method::GET, &format!("/responses/{id}/history"), As::Staff(h.staff), None)
    .await;
  assert_eq!(status, StatusCode::OK);
  let kinds: Vec<_> = body
    .as_array()
    .unwrap()
    .iter()
    .map(|e| e["kind"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(kinds, ["signed", "document_attached", "verified"]);
}

#[tokio::test]
async fn generator_outage_degrades_to_pending() {
  let h = harness().await;
  h.generator.up.store(false, Ordering::SeqCst);

  let signed = h.sign().await;
  assert_eq!(signed["state"], "SIGNED_DOCUMENT_PENDING");
  assert_eq!(signed["document"], Value::Null);
  let id = signed["response_id"].as_str().unwrap().to_owned();

  let (status, _, body) = h
    .api(Method::POST, &format!("/verify/{id}"), As::Staff(h.staff), None)
    .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "not_ready");

  let (status, _, body) = h
    .api(Method::POST, &format!("/responses/{id}/document"), As::Staff(h.staff), None)
    .await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["error"], "upstream_unavailable");

  h.generator.up.store(true, Ordering::SeqCst);
  let (status, _, body) = h
    .api(Method::POST, &format!("/responses/{id}/document"), As::Staff(h.staff), None)
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["state"], "SIGNED");
}

// ─── Review ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reject_needs_a_reason_and_blocks_verify() {
  let h = harness().await;
  let id = h.sign().await["response_id"].as_str().unwrap().to_owned();

  let (status, _, body) = h
    .api(
      Method::POST,
      &format!("/reject/{id}"),
      As::Staff(h.staff),
      Some(json!({ "reason": "" })),
    )
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "invalid_rejection");

  let (status, _, body) = h
    .api(
      Method::POST,
      &format!("/reject/{id}"),
      As::Staff(h.staff),
      Some(json!({ "reason": "signature does not match" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["state"], "REJECTED");

  let (status, _, body) = h
    .api(Method::POST, &format!("/verify/{id}"), As::Staff(h.staff), None)
    .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn pending_and_stats() {
  let h = harness().await;

  let (_, _, stats) = h
    .api(Method::GET, &format!("/stats?activity={}", h.activity), As::Staff(h.staff), None)
    .await;
  assert_eq!(stats["total"], 1);
  assert_eq!(stats["not_yet_signed"], 1);

  h.sign().await;

  let (status, _, pending) = h
    .api(Method::GET, &format!("/pending?activity={}", h.activity), As::Staff(h.staff), None)
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(pending.as_array().unwrap().len(), 1);

  let (_, _, stats) = h
    .api(Method::GET, &format!("/stats?activity={}", h.activity), As::Staff(h.staff), None)
    .await;
  assert_eq!(stats["pending_verification"], 1);
  assert_eq!(stats["total_signed"], 1);

  let (_, _, stats) = h
    .api(
      Method::GET,
      &format!("/stats?activity={}&section=tropa", h.activity),
      As::Staff(h.staff),
      None,
    )
    .await;
  assert_eq!(stats["total"], 0);
}

#[tokio::test]
async fn payment_status_update() {
  let h = harness().await;
  let id = h.sign().await["response_id"].as_str().unwrap().to_owned();

  let (status, headers, body) = h
    .api(
      Method::PUT,
      &format!("/responses/{id}/payment"),
      As::Staff(h.staff),
      Some(json!({ "status": "EXEMPT" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["payment_status"], "EXEMPT");
  assert_eq!(headers[header::ETAG], "\"3\"");
}

// ─── Definitions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn definition_is_frozen_after_signing() {
  let h = harness().await;
  h.sign().await;

  let (status, _, body) = h
    .api(
      Method::PUT,
      &format!("/activities/{}/circular", h.activity),
      As::Staff(h.staff),
      Some(json!({ "template_ref": "acampada-v2" })),
    )
    .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "definition_frozen");

  let (status, _, body) = h
    .api(
      Method::GET,
      &format!("/activities/{}/circular", h.activity),
      As::Guardian(h.guardian),
      None,
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["template_ref"], "acampada");
}

#[tokio::test]
async fn activity_roster_is_frozen_after_signing() {
  let h = harness().await;
  h.sign().await;
  let activity = |sections: Value| {
    json!({
      "title": "Acampada de invierno",
      "starts_at": "2031-10-10T08:00:00Z",
      "ends_at": "2031-10-12T18:00:00Z",
      "location": "Valsaín",
      "sections": sections,
    })
  };
  let path = format!("/activities/{}", h.activity);

  let (status, _, body) = h
    .api(Method::PUT, &path, As::Staff(h.staff), Some(activity(json!(["manada", "tropa"]))))
    .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "activity_frozen");

  let (status, _, body) = h
    .api(Method::PUT, &path, As::Staff(h.staff), Some(activity(json!(["manada"]))))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["title"], "Acampada de invierno");
}

#[tokio::test]
async fn unconfigured_activity_is_404() {
  let h = harness().await;
  let (status, _, body) = h
    .api(
      Method::GET,
      &format!("/activities/{}/circular", Uuid::new_v4()),
      As::Staff(h.staff),
      None,
    )
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "not_configured");
}

// ─── Attendance & health ─────────────────────────────────────────────────────

#[tokio::test]
async fn attendance_round_trip() {
  let h = harness().await;

  let (status, _, view) = h
    .api(
      Method::POST,
      "/confirm-attendance",
      As::Guardian(h.guardian),
      Some(json!({
        "activity_id": h.activity,
        "participant_id": h.participant,
        "attending": true,
      })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(view["confirmation"]["state"], "CONFIRMED");
  assert_eq!(view["circular_state"], Value::Null);
  let id = view["confirmation"]["confirmation_id"].as_str().unwrap().to_owned();

  let (status, _, view) = h
    .api(
      Method::PUT,
      &format!("/modify-attendance/{id}"),
      As::Guardian(h.guardian),
      Some(json!({ "attending": false, "comment": "family trip" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(view["confirmation"]["state"], "DECLINED");

  let (status, _, roster) = h
    .api(
      Method::GET,
      &format!("/attendance?activity={}", h.activity),
      As::Staff(h.staff),
      None,
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(roster[0]["state"], "DECLINED");
  assert_eq!(roster[0]["comment"], "family trip");
}

#[tokio::test]
async fn health_profile_put_and_get() {
  let h = harness().await;
  let path = format!("/health/{}", h.participant);

  let (status, _, body) = h
    .api(
      Method::PUT,
      &path,
      As::Guardian(h.guardian),
      Some(json!({
        "allergies": ["nuts"],
        "contacts": [
          { "name": "Marta", "phone": "600 000 001", "relation": "aunt", "is_primary": true },
          { "name": "Jon", "phone": "600 000 002", "relation": "uncle", "is_primary": true },
        ],
      })),
    )
    .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["error"], "invalid_health_profile");

  let (status, _, _) = h
    .api(
      Method::PUT,
      &path,
      As::Guardian(h.guardian),
      Some(json!({
        "allergies": ["nuts"],
        "contacts": [
          { "name": "Marta", "phone": "600 000 001", "relation": "aunt", "is_primary": true },
        ],
      })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);

  let (status, _, body) = h.api(Method::GET, &path, As::Staff(h.staff), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["stale"], false);
  assert_eq!(body["profile"]["allergies"], json!(["nuts"]));
  assert_eq!(body["contacts"].as_array().unwrap().len(), 1);
}
