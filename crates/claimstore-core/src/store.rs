//! The `ClaimStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `claimstore-sqlite`).
//! The REST layer and the administrative binary depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  claim::{Claim, IdentifierPair, NewClaim},
  equivalence::{EquivalenceClasses, Merge},
  registry::{Claimant, IdentifierType, IdentifierTypeSpec, NewClaimant, Predicate},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`ClaimStore::find_claims`]. All present filters are
/// AND-combined; an empty filter matches every claim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimFilter {
  /// Inclusive lower bound on the claim creation time.
  pub since:     Option<DateTime<Utc>>,
  /// Exclusive upper bound on the claim creation time.
  pub until:     Option<DateTime<Utc>>,
  pub claimant:  Option<String>,
  pub predicate: Option<String>,
  /// Inclusive minimum certainty.
  pub certainty: Option<f64>,
  pub human:     Option<u8>,
  /// SQL `LIKE` pattern; the caller places the wildcards.
  pub actor:     Option<String>,
  /// SQL `LIKE` pattern; the caller places the wildcards.
  pub role:      Option<String>,
  /// Identifier type on either side.
  pub type_name: Option<String>,
  /// Identifier value on either side.
  pub value:     Option<String>,
  /// Exact subject type; overrides `type_name`/`value`.
  pub subject:   Option<String>,
  /// Exact object type; overrides `type_name`/`value`.
  pub object:    Option<String>,
  /// Expand `type_name`/`value` to its whole equivalence class.
  pub recurse:   bool,
  pub limit:     Option<usize>,
  pub offset:    Option<usize>,
}

/// How a [`ClaimFilter`] constrains the identifiers of a claim, after the
/// precedence rules are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierMatch<'a> {
  /// No identifier constraint.
  Any,
  /// Either side must be a member of the class of this pair.
  Class(IdentifierPair),
  /// Exact subject and/or object type.
  Sides {
    subject: Option<&'a str>,
    object:  Option<&'a str>,
  },
  /// Type and/or value on either side.
  Either {
    type_name: Option<&'a str>,
    value:     Option<&'a str>,
  },
}

impl ClaimFilter {
  /// Resolve the identifier filters: `recurse` with both type and value wins,
  /// then the subject/object restriction, then the generic type/value match.
  pub fn identifier_match(&self) -> IdentifierMatch<'_> {
    match (&self.type_name, &self.value) {
      (Some(t), Some(v)) if self.recurse => {
        return IdentifierMatch::Class(IdentifierPair::new(t.as_str(), v.as_str()));
      }
      _ => {}
    }

    if self.subject.is_some() || self.object.is_some() {
      return IdentifierMatch::Sides {
        subject: self.subject.as_deref(),
        object:  self.object.as_deref(),
      };
    }

    if self.type_name.is_some() || self.value.is_some() {
      return IdentifierMatch::Either {
        type_name: self.type_name.as_deref(),
        value:     self.value.as_deref(),
      };
    }

    IdentifierMatch::Any
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Implemented by backend error types so callers can tell a domain rejection
/// from a storage failure without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The domain error behind this failure, if it is one.
  fn domain(&self) -> Option<&crate::Error>;
}

impl StoreError for crate::Error {
  fn domain(&self) -> Option<&crate::Error> { Some(self) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a ClaimStore backend.
///
/// Claims are append-only. Every mutating method runs in a single
/// transaction: on error nothing it did is durable.
pub trait ClaimStore: Send + Sync {
  type Error: StoreError;

  // ── Registry ──────────────────────────────────────────────────────────

  /// Register a claimant together with the identifier types it brings.
  /// Types that already exist are left untouched.
  fn subscribe(
    &self,
    claimant: NewClaimant,
  ) -> impl Future<Output = Result<Claimant, Self::Error>> + Send + '_;

  /// Register an identifier type without owner; returns the existing one if
  /// the name is taken.
  fn register_identifier_type(
    &self,
    spec: IdentifierTypeSpec,
  ) -> impl Future<Output = Result<IdentifierType, Self::Error>> + Send + '_;

  /// Insert a predicate unless it already exists.
  fn seed_predicate(
    &self,
    name: String,
    description: Option<String>,
  ) -> impl Future<Output = Result<Predicate, Self::Error>> + Send + '_;

  fn list_claimants(
    &self,
  ) -> impl Future<Output = Result<Vec<Claimant>, Self::Error>> + Send + '_;

  fn list_identifier_types(
    &self,
  ) -> impl Future<Output = Result<Vec<IdentifierType>, Self::Error>> + Send + '_;

  fn list_predicates(
    &self,
  ) -> impl Future<Output = Result<Vec<Predicate>, Self::Error>> + Send + '_;

  /// Delete a claimant and all of its claims. Returns `false` if no claimant
  /// had that name.
  fn remove_claimant(
    &self,
    name: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Claims ────────────────────────────────────────────────────────────

  /// Validate and persist a claim, unifying subject and object in the
  /// equivalence index when the predicate is equivalence-bearing. Returns
  /// the claim's UUID.
  fn record_claim(
    &self,
    claim: NewClaim,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + '_;

  fn find_claims<'a>(
    &'a self,
    filter: &'a ClaimFilter,
  ) -> impl Future<Output = Result<Vec<Claim>, Self::Error>> + Send + 'a;

  // ── Equivalence index ─────────────────────────────────────────────────

  /// Every pair in the class of `(type_name, value)`; empty if the pair was
  /// never indexed.
  fn lookup_class(
    &self,
    pair: IdentifierPair,
  ) -> impl Future<Output = Result<Vec<IdentifierPair>, Self::Error>> + Send + '_;

  /// Unify two pairs outside of any claim.
  fn merge_pair(
    &self,
    subject: IdentifierPair,
    object: IdentifierPair,
  ) -> impl Future<Output = Result<Merge, Self::Error>> + Send + '_;

  /// All classes, or just `eqid` when given.
  fn equivalence_classes(
    &self,
    eqid: Option<Uuid>,
  ) -> impl Future<Output = Result<EquivalenceClasses, Self::Error>> + Send + '_;

  /// Delete every index entry. Returns the number removed.
  fn clear_equivalences(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Replay every equivalence-bearing claim, in storage order, through the
  /// merge. Returns the number of claims replayed.
  fn rebuild_equivalences(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
