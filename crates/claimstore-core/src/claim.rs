//! Claims: typed relationship assertions between two identifiers.
//!
//! A claim is immutable once recorded. The only mutations the log ever sees
//! are bulk ones (claimant removal, index rebuild re-stamping).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One side of a claim: an identifier value within a registered type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentifierPair {
  #[serde(rename = "type")]
  pub type_name: String,
  pub value:     String,
}

impl IdentifierPair {
  pub fn new(type_name: impl Into<String>, value: impl Into<String>) -> Self {
    Self { type_name: type_name.into(), value: value.into() }
  }
}

/// Who made the claim and in which capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
  /// `1` if a human performed the claim, `0` if it was automated.
  pub human: Option<u8>,
  pub actor: Option<String>,
  pub role:  Option<String>,
}

/// Input for [`ClaimStore::record_claim`](crate::store::ClaimStore::record_claim).
///
/// Names are resolved against the registry by the store; `created` is kept
/// as submitted and parsed there so a malformed timestamp is reported as
/// invalid data.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClaim {
  pub claimant:   String,
  pub subject:    IdentifierPair,
  pub predicate:  String,
  pub object:     IdentifierPair,
  pub certainty:  f64,
  /// ISO 8601 date-time with an explicit offset.
  pub created:    String,
  pub provenance: Provenance,
  /// The submission exactly as received.
  pub payload:    serde_json::Value,
}

/// A persisted claim with its references resolved back to names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
  pub uuid:          Uuid,
  /// Server-assigned.
  pub received:      DateTime<Utc>,
  /// Claimant-supplied.
  pub created:       DateTime<Utc>,
  pub claimant:      String,
  pub subject:       IdentifierPair,
  pub predicate:     String,
  pub object:        IdentifierPair,
  pub certainty:     f64,
  pub arguments:     Provenance,
  pub claim_details: serde_json::Value,
  /// Index entry of the subject; set only for equivalence-bearing claims.
  #[serde(skip)]
  pub subject_eqid:  Option<i64>,
  /// Index entry of the object; set only for equivalence-bearing claims.
  #[serde(skip)]
  pub object_eqid:   Option<i64>,
}
