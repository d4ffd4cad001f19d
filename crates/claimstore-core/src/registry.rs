//! Registry entities: claimants, identifier types and predicates.
//!
//! These are the vocabulary a claim refers to. Claimants and identifier
//! types are registered at runtime through subscription; predicates are
//! seeded once at initialisation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Predicates seeded into a fresh store.
pub const DEFAULT_PREDICATES: &[&str] = &[
  "is_same_as",
  "is_different_than",
  "is_erratum_of",
  "is_superseded_by",
  "is_cited_by",
  "is_software_for",
  "is_dataset_for",
];

/// Identifier type names are case-insensitive on input and stored upper-case.
pub fn normalize_type_name(name: &str) -> String { name.trim().to_uppercase() }

// ─── Entities ────────────────────────────────────────────────────────────────

/// An organisation permitted to submit claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claimant {
  #[serde(skip)]
  pub id:     i64,
  pub uuid:   Uuid,
  pub name:   String,
  pub url:    Option<String>,
  pub joined: DateTime<Utc>,
}

/// A registered namespace for identifier values, e.g. `DOI`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierType {
  #[serde(skip)]
  pub id:            i64,
  /// Always upper-case.
  #[serde(rename = "type")]
  pub name:          String,
  pub description:   String,
  /// URL template in which the identifier is used.
  pub url:           String,
  pub example_value: String,
  pub example_url:   String,
  /// Claimant that registered the type, if any.
  pub claimant:      Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
  #[serde(skip)]
  pub id:          i64,
  pub name:        String,
  pub description: Option<String>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Descriptor of an identifier type as submitted by a claimant or loaded
/// from a fixture file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierTypeSpec {
  #[serde(rename = "type")]
  pub name:          String,
  pub description:   String,
  pub url:           String,
  pub example_value: String,
  pub example_url:   String,
}

/// Input for [`ClaimStore::subscribe`](crate::store::ClaimStore::subscribe).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClaimant {
  pub name:                   String,
  pub url:                    Option<String>,
  #[serde(default)]
  pub persistent_identifiers: Vec<IdentifierTypeSpec>,
}

// ─── Equivalence configuration ───────────────────────────────────────────────

/// The predicates whose claims unify subject and object in the equivalence
/// index.
///
/// Loaded once from configuration and handed to the store by value; the set
/// never changes for the lifetime of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalencePredicates(BTreeSet<String>);

impl EquivalencePredicates {
  pub fn new<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(names.into_iter().map(Into::into).collect())
  }

  pub fn contains(&self, predicate: &str) -> bool { self.0.contains(predicate) }

  pub fn iter(&self) -> impl Iterator<Item = &str> { self.0.iter().map(String::as_str) }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Default for EquivalencePredicates {
  fn default() -> Self { Self::new(["is_same_as"]) }
}
