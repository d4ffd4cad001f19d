//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that string
//! comparison in SQL is chronological. UUIDs are stored as hyphenated
//! lowercase strings. The claim payload is stored as compact JSON.

use chrono::{DateTime, ParseError, SecondsFormat, Utc};
use claimstore_core::{
  claim::{Claim, IdentifierPair, Provenance},
  equivalence::EquivalentIdentifier,
  registry::Claimant,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Further ISO 8601 forms accepted for a claimant-supplied `created`, tried
/// after `%+`. Each one requires a zone designator.
const ISO_8601_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%.f%#z",
  "%Y-%m-%dT%H:%M%#z",
  "%Y%m%dT%H%M%S%#z",
];

/// Parse an ISO 8601 timestamp with a timezone, normalised to UTC. The
/// error is the one from the last format tried.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, ParseError> {
  ISO_8601_FORMATS
    .iter()
    .fold(DateTime::parse_from_str(s, "%+"), |parsed, fmt| {
      parsed.or_else(|_| DateTime::parse_from_str(s, fmt))
    })
    .map(|dt| dt.with_timezone(&Utc))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawClaim::from_row`]. Expects the aliases used by
/// the claim query (`c`, `cl`, `p`, `st`, `ot`).
pub const CLAIM_COLUMNS: &str = "
  c.uuid, c.received, c.created, cl.name,
  st.name, c.subject_value, p.name, ot.name, c.object_value,
  c.certainty, c.human, c.actor, c.role, c.claim_details,
  c.subject_eqid, c.object_eqid";

/// Raw values read directly from a `claims` row joined with its references.
pub struct RawClaim {
  pub uuid:          String,
  pub received:      String,
  pub created:       String,
  pub claimant:      String,
  pub subject_type:  String,
  pub subject_value: String,
  pub predicate:     String,
  pub object_type:   String,
  pub object_value:  String,
  pub certainty:     f64,
  pub human:         Option<u8>,
  pub actor:         Option<String>,
  pub role:          Option<String>,
  pub claim_details: String,
  pub subject_eqid:  Option<i64>,
  pub object_eqid:   Option<i64>,
}

impl RawClaim {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawClaim {
      uuid:          row.get(0)?,
      received:      row.get(1)?,
      created:       row.get(2)?,
      claimant:      row.get(3)?,
      subject_type:  row.get(4)?,
      subject_value: row.get(5)?,
      predicate:     row.get(6)?,
      object_type:   row.get(7)?,
      object_value:  row.get(8)?,
      certainty:     row.get(9)?,
      human:         row.get(10)?,
      actor:         row.get(11)?,
      role:          row.get(12)?,
      claim_details: row.get(13)?,
      subject_eqid:  row.get(14)?,
      object_eqid:   row.get(15)?,
    })
  }

  pub fn into_claim(self) -> Result<Claim> {
    Ok(Claim {
      uuid:          decode_uuid(&self.uuid)?,
      received:      decode_dt(&self.received)?,
      created:       decode_dt(&self.created)?,
      claimant:      self.claimant,
      subject:       IdentifierPair::new(self.subject_type, self.subject_value),
      predicate:     self.predicate,
      object:        IdentifierPair::new(self.object_type, self.object_value),
      certainty:     self.certainty,
      arguments:     Provenance {
        human: self.human,
        actor: self.actor,
        role:  self.role,
      },
      claim_details: serde_json::from_str(&self.claim_details)?,
      subject_eqid:  self.subject_eqid,
      object_eqid:   self.object_eqid,
    })
  }
}

/// Raw values read directly from a `claimants` row.
pub struct RawClaimant {
  pub id:     i64,
  pub uuid:   String,
  pub name:   String,
  pub url:    Option<String>,
  pub joined: String,
}

impl RawClaimant {
  pub fn into_claimant(self) -> Result<Claimant> {
    Ok(Claimant {
      id:     self.id,
      uuid:   decode_uuid(&self.uuid)?,
      name:   self.name,
      url:    self.url,
      joined: decode_dt(&self.joined)?,
    })
  }
}

/// Raw values read directly from an `equivalent_identifiers` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
  pub id:      i64,
  pub eqid:    String,
  pub type_id: i64,
  pub value:   String,
}

impl RawEntry {
  pub fn into_entry(self) -> Result<EquivalentIdentifier> {
    Ok(EquivalentIdentifier {
      id:      self.id,
      eqid:    decode_uuid(&self.eqid)?,
      type_id: self.type_id,
      value:   self.value,
    })
  }
}
