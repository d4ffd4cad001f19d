//! Types of the equivalence-identifier index.
//!
//! The index partitions `(identifier type, value)` pairs into classes. Every
//! row carries the UUID of its class (`eqid`); the UUID doubles as the class
//! representative, so lookups are a point read and unions rewrite the
//! absorbed class.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claim::IdentifierPair;

/// One index row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalentIdentifier {
  pub id:      i64,
  pub eqid:    Uuid,
  pub type_id: i64,
  pub value:   String,
}

/// Which of the four union cases a merge took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
  /// Neither side was indexed; a new class was minted for both.
  Created,
  /// Both sides were already in the same class.
  AlreadyUnified,
  /// Both sides existed in different classes; `moved` rows of the object's
  /// class were re-pointed to the subject's class.
  Unified { moved: usize },
  /// Exactly one side existed; the other joined its class.
  Attached,
}

/// Result of merging one subject/object pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge {
  pub subject: EquivalentIdentifier,
  pub object:  EquivalentIdentifier,
  pub outcome: MergeOutcome,
}

/// Dump of the index: class id to its members, members sorted.
pub type EquivalenceClasses = BTreeMap<Uuid, Vec<IdentifierPair>>;
