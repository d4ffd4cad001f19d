//! Handlers for subscription and the registry listings.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subscribe` | Body: claimant document; allow-listed peers only |
//! | `GET`  | `/claimants` | |
//! | `GET`  | `/identifiers` | Registered identifier types |
//! | `GET`  | `/predicates` | |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use claimstore_core::{
  registry::{Claimant, IdentifierType, Predicate},
  store::ClaimStore,
  submission::parse_claimant,
};
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

/// `POST /subscribe`: returns `{"status":"success","uuid":..}`
pub async fn subscribe<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: ClaimStore,
{
  let Json(payload) = body?;
  let claimant = parse_claimant(payload)?;
  let claimant = state
    .store
    .subscribe(claimant)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(json!({ "status": "success", "uuid": claimant.uuid })))
}

/// `GET /claimants`
pub async fn claimants<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Claimant>>, ApiError>
where
  S: ClaimStore,
{
  let claimants = state.store.list_claimants().await.map_err(ApiError::from_store)?;
  Ok(Json(claimants))
}

/// `GET /identifiers`
pub async fn identifier_types<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<IdentifierType>>, ApiError>
where
  S: ClaimStore,
{
  let types = state
    .store
    .list_identifier_types()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(types))
}

/// `GET /predicates`
pub async fn predicates<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Predicate>>, ApiError>
where
  S: ClaimStore,
{
  let predicates = state.store.list_predicates().await.map_err(ApiError::from_store)?;
  Ok(Json(predicates))
}
