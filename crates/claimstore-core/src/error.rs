//! Error types for `claimstore-core`.

use thiserror::Error;

/// A referential or business-rule violation. Nothing is committed when one
/// of these is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
  #[error("Claimant not registered")]
  ClaimantNotRegistered,

  #[error("Subject Type not registered")]
  SubjectTypeNotRegistered,

  #[error("Object Type not registered")]
  ObjectTypeNotRegistered,

  #[error("Subject and Object cannot have the same identifier type")]
  SameIdentifierType,

  #[error("Predicate not registered")]
  PredicateNotRegistered,

  #[error("This claimant is already registered")]
  ClaimantAlreadyRegistered,
}

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed input, e.g. a timestamp that does not parse.
  #[error("{message}")]
  InvalidData {
    message: String,
    details: Option<String>,
  },

  #[error(transparent)]
  InvalidRequest(#[from] Rejection),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn invalid_data(message: impl Into<String>, details: impl ToString) -> Self {
    Self::InvalidData {
      message: message.into(),
      details: Some(details.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
