//! Router tests against an in-memory SQLite store.

use std::{
  net::{IpAddr, SocketAddr},
  sync::Arc,
};

use axum::{
  Router,
  body::Body,
  extract::ConnectInfo,
  http::{Request, StatusCode, header},
};
use claimstore_core::{
  registry::{DEFAULT_PREDICATES, EquivalencePredicates},
  store::ClaimStore,
};
use claimstore_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{ApiConfig, api_router};

const LOCAL: [u8; 4] = [127, 0, 0, 1];

async fn app() -> Router {
  let store = SqliteStore::open_in_memory(EquivalencePredicates::default())
    .await
    .unwrap();
  for p in DEFAULT_PREDICATES {
    store.seed_predicate((*p).into(), None).await.unwrap();
  }
  api_router(Arc::new(store), ApiConfig::default())
}

fn request(method: &str, uri: &str, peer: [u8; 4], body: Option<Value>) -> Request<Body> {
  let builder = Request::builder().method(method).uri(uri);
  let mut req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string())),
    None => builder.body(Body::empty()),
  }
  .unwrap();
  req
    .extensions_mut()
    .insert(ConnectInfo(SocketAddr::new(IpAddr::from(peer), 40000)));
  req
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, body)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
  send(app, request("POST", uri, LOCAL, Some(body))).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
  send(app, request("GET", uri, [192, 168, 1, 20], None)).await
}

fn cds() -> Value {
  json!({
    "name": "CDS",
    "url": "http://cds.cern.ch",
    "persistent_identifiers": [{
      "type": "CDS_RECORD_ID",
      "description": "CDS internal unique identifier",
      "url": "http://cds.cern.ch/record/<CDS_RECORD_ID>",
      "example_value": "2003192",
      "example_url": "http://cds.cern.ch/record/2003192"
    }]
  })
}

fn inspire() -> Value {
  json!({
    "name": "INSPIRE",
    "url": "http://inspirehep.net",
    "persistent_identifiers": [{
      "type": "INSPIRE_RECORD_ID",
      "description": "INSPIRE internal unique identifier",
      "url": "http://inspirehep.net/record/<INSPIRE_RECORD_ID>",
      "example_value": "cond-mat/9906097",
      "example_url": "http://inspirehep.net/record/cond-mat/9906097"
    }, {
      "type": "DOI",
      "description": "Digital Object Identifier",
      "url": "http://dx.doi.org/<DOI>",
      "example_value": "10.1103/PhysRevB.61.9876",
      "example_url": "http://dx.doi.org/10.1103/PhysRevB.61.9876"
    }]
  })
}

fn claim(claimant: &str, subject: (&str, &str), predicate: &str, object: (&str, &str)) -> Value {
  json!({
    "claimant": claimant,
    "subject": { "type": subject.0, "value": subject.1 },
    "predicate": predicate,
    "certainty": 0.8,
    "object": { "type": object.0, "value": object.1 },
    "arguments": { "human": 0, "actor": "CDS_submission", "role": "CDS_curator" },
    "created": "2015-03-25T11:00:00Z"
  })
}

/// Two claimants, one equivalence claim and one citation of the INSPIRE
/// side.
async fn populated() -> Router {
  let app = app().await;
  assert_eq!(post(&app, "/subscribe", cds()).await.0, StatusCode::OK);
  assert_eq!(post(&app, "/subscribe", inspire()).await.0, StatusCode::OK);
  let same = claim(
    "CDS",
    ("CDS_RECORD_ID", "2003192"),
    "is_same_as",
    ("INSPIRE_RECORD_ID", "cond-mat/9906097"),
  );
  assert_eq!(post(&app, "/claims", same).await.0, StatusCode::OK);
  let cited = claim(
    "INSPIRE",
    ("INSPIRE_RECORD_ID", "cond-mat/9906097"),
    "is_cited_by",
    ("DOI", "10.1103/PhysRevB.61.9876"),
  );
  assert_eq!(post(&app, "/claims", cited).await.0, StatusCode::OK);
  app
}

// ─── Submissions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn subscribe_returns_uuid() {
  let app = app().await;
  let (status, body) = post(&app, "/subscribe", cds()).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "success");
  assert!(body["uuid"].as_str().unwrap().parse::<uuid::Uuid>().is_ok());
}

#[tokio::test]
async fn duplicate_subscription_is_a_bad_request() {
  let app = app().await;
  post(&app, "/subscribe", cds()).await;
  let (status, body) = post(&app, "/subscribe", cds()).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["status"], "error");
  assert_eq!(body["message"], "This claimant is already registered");
}

#[tokio::test]
async fn submitted_claims_are_listed() {
  let app = populated().await;
  let (status, body) = get(&app, "/claims").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 2);
  assert_eq!(body[0]["claimant"], "CDS");
  assert_eq!(body[0]["arguments"]["actor"], "CDS_submission");
  assert_eq!(body[0]["claim_details"]["predicate"], "is_same_as");
}

#[tokio::test]
async fn malformed_claim_is_invalid_data() {
  let app = populated().await;

  let mut missing = claim("CDS", ("CDS_RECORD_ID", "1"), "is_same_as", ("DOI", "2"));
  missing.as_object_mut().unwrap().remove("predicate");
  let (status, body) = post(&app, "/claims", missing).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "JSON data is not valid");
  assert!(body["details"].is_string());

  let mut certain = claim("CDS", ("CDS_RECORD_ID", "1"), "is_same_as", ("DOI", "2"));
  certain["certainty"] = json!(1.5);
  assert_eq!(post(&app, "/claims", certain).await.0, StatusCode::BAD_REQUEST);

  let mut dated = claim("CDS", ("CDS_RECORD_ID", "1"), "is_same_as", ("DOI", "2"));
  dated["created"] = json!("25/03/2015");
  let (status, body) = post(&app, "/claims", dated).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Claim datetime does not follow ISO 8601 Z");

  let mut flagged = claim("CDS", ("CDS_RECORD_ID", "1"), "is_same_as", ("DOI", "2"));
  flagged["arguments"]["human"] = json!(7);
  let (status, body) = post(&app, "/claims", flagged).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "JSON data is not valid");

  assert_eq!(get(&app, "/claims").await.1.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn basic_format_timestamp_is_accepted() {
  let app = populated().await;
  let mut compact = claim("CDS", ("CDS_RECORD_ID", "1"), "is_same_as", ("DOI", "2"));
  compact["created"] = json!("20150326T093000+0100");
  assert_eq!(post(&app, "/claims", compact).await.0, StatusCode::OK);

  let (_, body) = get(&app, "/claims?since=2015-03-26T08:30:00Z").await;
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["created"], "2015-03-26T08:30:00Z");
}

#[tokio::test]
async fn non_json_body_is_rejected() {
  let app = populated().await;
  let req = Request::builder()
    .method("POST")
    .uri("/claims")
    .header(header::CONTENT_TYPE, "text/plain")
    .body(Body::from("claimant=CDS"))
    .map(|mut req| {
      req.extensions_mut().insert(ConnectInfo(SocketAddr::from((LOCAL, 40000))));
      req
    })
    .unwrap();
  let (status, body) = send(&app, req).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn unregistered_references_are_bad_requests() {
  let app = populated().await;
  let cases = [
    (claim("ADS", ("CDS_RECORD_ID", "1"), "is_same_as", ("DOI", "2")), "Claimant not registered"),
    (claim("CDS", ("ISBN", "1"), "is_same_as", ("DOI", "2")), "Subject Type not registered"),
    (claim("CDS", ("CDS_RECORD_ID", "1"), "is_same_as", ("ISBN", "2")), "Object Type not registered"),
    (
      claim("CDS", ("DOI", "1"), "is_same_as", ("DOI", "2")),
      "Subject and Object cannot have the same identifier type",
    ),
    (claim("CDS", ("CDS_RECORD_ID", "1"), "is_twin_of", ("DOI", "2")), "Predicate not registered"),
  ];
  for (body, message) in cases {
    let (status, body) = post(&app, "/claims", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], message);
  }
}

#[tokio::test]
async fn submissions_outside_allow_list_are_forbidden() {
  let app = app().await;
  let (status, body) =
    send(&app, request("POST", "/subscribe", [10, 0, 0, 7], Some(cds()))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["status"], "error");
  assert_eq!(get(&app, "/claimants").await.1, json!([]));

  // Reads stay open to the same peer.
  let (status, _) = send(&app, request("GET", "/claims", [10, 0, 0, 7], None)).await;
  assert_eq!(status, StatusCode::OK);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn recurse_expands_through_the_class() {
  let app = populated().await;
  let uri = "/claims?type=CDS_RECORD_ID&value=2003192";
  assert_eq!(get(&app, uri).await.1.as_array().unwrap().len(), 1);

  let (_, body) = get(&app, &format!("{uri}&recurse=true")).await;
  let predicates: Vec<_> = body.as_array().unwrap().iter().map(|c| c["predicate"].clone()).collect();
  assert_eq!(predicates, [json!("is_same_as"), json!("is_cited_by")]);
}

#[tokio::test]
async fn recurse_accepts_numeric_flag() {
  let app = populated().await;
  let uri = "/claims?type=CDS_RECORD_ID&value=2003192";

  let (status, body) = get(&app, &format!("{uri}&recurse=1")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 2);

  let (status, body) = get(&app, &format!("{uri}&recurse=0")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);

  let (status, body) = get(&app, &format!("{uri}&recurse=maybe")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Query parameters are not valid");
}

#[tokio::test]
async fn claim_filters_from_query_string() {
  let app = populated().await;
  let count = |body: Value| body.as_array().unwrap().len();

  assert_eq!(count(get(&app, "/claims?claimant=INSPIRE").await.1), 1);
  assert_eq!(count(get(&app, "/claims?predicate=is_same_as").await.1), 1);
  assert_eq!(count(get(&app, "/claims?subject=inspire_record_id").await.1), 1);
  assert_eq!(count(get(&app, "/claims?certainty=0.9").await.1), 0);
  assert_eq!(count(get(&app, "/claims?human=0&actor=CDS%25").await.1), 2);
  assert_eq!(count(get(&app, "/claims?since=2015-03-25T11:00:00Z").await.1), 2);
  assert_eq!(count(get(&app, "/claims?until=2015-03-25T11:00:00Z").await.1), 0);
  assert_eq!(count(get(&app, "/claims?per_page=1&page=2").await.1), 1);
  assert_eq!(count(get(&app, "/claims?per_page=1&page=3").await.1), 0);
  assert_eq!(count(get(&app, &format!("/claims?per_page={}", usize::MAX)).await.1), 2);
}

#[tokio::test]
async fn bad_query_parameter_is_invalid_data() {
  let app = populated().await;
  let (status, body) = get(&app, "/claims?certainty=high").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["status"], "error");
}

// ─── Registry and index ──────────────────────────────────────────────────────

#[tokio::test]
async fn registry_listings() {
  let app = populated().await;

  let (_, claimants) = get(&app, "/claimants").await;
  assert_eq!(claimants.as_array().unwrap().len(), 2);
  assert_eq!(claimants[0]["name"], "CDS");

  let (_, types) = get(&app, "/identifiers").await;
  let names: Vec<_> = types.as_array().unwrap().iter().map(|t| t["type"].clone()).collect();
  assert_eq!(names, [json!("CDS_RECORD_ID"), json!("DOI"), json!("INSPIRE_RECORD_ID")]);

  let (_, predicates) = get(&app, "/predicates").await;
  assert_eq!(predicates.as_array().unwrap().len(), DEFAULT_PREDICATES.len());
}

#[tokio::test]
async fn eqids_dump_and_single_class() {
  let app = populated().await;

  let (status, all) = get(&app, "/eqids").await;
  assert_eq!(status, StatusCode::OK);
  let all = all.as_object().unwrap();
  assert_eq!(all.len(), 1);
  let (eqid, members) = all.iter().next().unwrap();
  assert_eq!(
    members,
    &json!([
      { "type": "CDS_RECORD_ID", "value": "2003192" },
      { "type": "INSPIRE_RECORD_ID", "value": "cond-mat/9906097" },
    ])
  );

  let (status, one) = get(&app, &format!("/eqids/{eqid}")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(&one[eqid], members);

  let (status, _) = get(&app, &format!("/eqids/{}", uuid::Uuid::new_v4())).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = get(&app, "/eqids/not-a-uuid").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}
