//! JSON submissions accepted at the boundary (REST bodies, fixture files).
//!
//! Parsing here is structural only: names are not resolved and `created`
//! is not interpreted. A document that does not have the expected shape, or
//! whose certainty lies outside `[0, 1]`, is rejected as invalid data.

use serde::Deserialize;

use crate::{
  Error, Result,
  claim::{IdentifierPair, NewClaim, Provenance},
  registry::NewClaimant,
};

#[derive(Debug, Deserialize)]
struct ClaimBody {
  claimant:  String,
  subject:   IdentifierPair,
  predicate: String,
  certainty: f64,
  object:    IdentifierPair,
  #[serde(default)]
  arguments: Provenance,
  created:   String,
}

/// Parse a claim document, keeping the original JSON as the payload.
pub fn parse_claim(payload: serde_json::Value) -> Result<NewClaim> {
  let body: ClaimBody = serde_json::from_value(payload.clone())
    .map_err(|e| Error::invalid_data("JSON data is not valid", e))?;

  if !(0.0..=1.0).contains(&body.certainty) {
    return Err(Error::invalid_data(
      "JSON data is not valid",
      format!("certainty {} is not within [0, 1]", body.certainty),
    ));
  }

  if let Some(human) = body.arguments.human.filter(|h| *h > 1) {
    return Err(Error::invalid_data(
      "JSON data is not valid",
      format!("human flag {human} is not 0 or 1"),
    ));
  }

  Ok(NewClaim {
    claimant:   body.claimant,
    subject:    body.subject,
    predicate:  body.predicate,
    object:     body.object,
    certainty:  body.certainty,
    created:    body.created,
    provenance: body.arguments,
    payload,
  })
}

/// Parse a claimant subscription document.
pub fn parse_claimant(payload: serde_json::Value) -> Result<NewClaimant> {
  serde_json::from_value(payload)
    .map_err(|e| Error::invalid_data("JSON data is not valid", e))
}
