//! Handlers for `/claims` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/claims` | Body: claim document; allow-listed peers only |
//! | `GET`  | `/claims` | Filters in [`ListParams`]; paged |

use axum::{
  Json,
  extract::{
    Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
};
use chrono::{DateTime, Utc};
use claimstore_core::{
  claim::Claim,
  store::{ClaimFilter, ClaimStore},
  submission::parse_claim,
};
use serde::{Deserialize, Deserializer, de};
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /claims`: returns `{"status":"success","uuid":..}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: ClaimStore,
{
  let Json(payload) = body?;
  let claim = parse_claim(payload)?;
  let uuid = state
    .store
    .record_claim(claim)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(json!({ "status": "success", "uuid": uuid })))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Inclusive lower bound on `created`.
  pub since:     Option<DateTime<Utc>>,
  /// Exclusive upper bound on `created`.
  pub until:     Option<DateTime<Utc>>,
  pub claimant:  Option<String>,
  pub predicate: Option<String>,
  /// Minimum certainty.
  pub certainty: Option<f64>,
  pub human:     Option<u8>,
  /// `LIKE` pattern.
  pub actor:     Option<String>,
  /// `LIKE` pattern.
  pub role:      Option<String>,
  #[serde(rename = "type")]
  pub type_name: Option<String>,
  pub value:     Option<String>,
  pub subject:   Option<String>,
  pub object:    Option<String>,
  /// `1`/`0` or `true`/`false`.
  #[serde(default, deserialize_with = "flag")]
  pub recurse:   bool,
  /// 1-based.
  pub page:      Option<usize>,
  pub per_page:  Option<usize>,
}

impl ListParams {
  pub fn into_filter(self, default_per_page: usize) -> ClaimFilter {
    let per_page = self.per_page.unwrap_or(default_per_page);
    let page = self.page.unwrap_or(1).max(1);
    ClaimFilter {
      since:     self.since,
      until:     self.until,
      claimant:  self.claimant,
      predicate: self.predicate,
      certainty: self.certainty,
      human:     self.human,
      actor:     self.actor,
      role:      self.role,
      type_name: self.type_name,
      value:     self.value,
      subject:   self.subject,
      object:    self.object,
      recurse:   self.recurse,
      limit:     Some(per_page),
      offset:    Some((page - 1).saturating_mul(per_page)),
    }
  }
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = String::deserialize(deserializer)?;
  match raw.as_str() {
    "1" | "true" => Ok(true),
    "0" | "false" => Ok(false),
    other => Err(de::Error::invalid_value(
      de::Unexpected::Str(other),
      &"one of 0, 1, true, false",
    )),
  }
}

/// `GET /claims[?since=..][&type=..&value=..&recurse=1][&page=..&per_page=..]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Claim>>, ApiError>
where
  S: ClaimStore,
{
  let Query(params) = params?;
  let filter = params.into_filter(state.default_per_page);
  let claims = state
    .store
    .find_claims(&filter)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(claims))
}
