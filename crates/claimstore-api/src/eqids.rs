//! Handlers for `/eqids` endpoints: a read-only dump of the equivalence
//! index, grouped by class.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/eqids` | `{"<eqid>":[{"type":..,"value":..}, ..], ..}` |
//! | `GET`  | `/eqids/{eqid}` | One class; 404 if unknown |

use axum::{
  Json,
  extract::{Path, State, rejection::PathRejection},
};
use claimstore_core::{equivalence::EquivalenceClasses, store::ClaimStore};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// `GET /eqids`
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<EquivalenceClasses>, ApiError>
where
  S: ClaimStore,
{
  let classes = state
    .store
    .equivalence_classes(None)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(classes))
}

/// `GET /eqids/{eqid}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  eqid: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<EquivalenceClasses>, ApiError>
where
  S: ClaimStore,
{
  let Path(eqid) = eqid?;
  let classes = state
    .store
    .equivalence_classes(Some(eqid))
    .await
    .map_err(ApiError::from_store)?;
  if classes.is_empty() {
    return Err(ApiError::NotFound(format!("equivalence class {eqid} not found")));
  }
  Ok(Json(classes))
}
