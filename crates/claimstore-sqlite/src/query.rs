//! Translation of a [`ClaimFilter`] into one SQL statement.
//!
//! Conditions are appended in a fixed order with positional `?` parameters;
//! the parameter vector is kept in step with the placeholders.

use claimstore_core::{
  registry::normalize_type_name,
  store::{ClaimFilter, IdentifierMatch},
};
use rusqlite::types::Value;

use crate::encode::{CLAIM_COLUMNS, encode_dt};

pub struct ClaimSql {
  pub sql:    String,
  pub params: Vec<Value>,
}

#[derive(Default)]
struct Conditions {
  clauses: Vec<String>,
  params:  Vec<Value>,
}

impl Conditions {
  fn push(&mut self, clause: &str, params: impl IntoIterator<Item = Value>) {
    self.clauses.push(clause.to_owned());
    self.params.extend(params);
  }
}

fn text(s: &str) -> Value { Value::Text(s.to_owned()) }

/// Build the claim query.
///
/// `class` must be the resolved class UUID when the filter is a
/// [`IdentifierMatch::Class`]; the caller short-circuits when the pair has
/// no class.
pub fn claims_query(filter: &ClaimFilter, class: Option<&str>) -> ClaimSql {
  let mut conds = Conditions::default();

  if let Some(since) = filter.since {
    conds.push("c.created >= ?", [Value::Text(encode_dt(since))]);
  }
  if let Some(until) = filter.until {
    conds.push("c.created < ?", [Value::Text(encode_dt(until))]);
  }
  if let Some(claimant) = &filter.claimant {
    conds.push("cl.name = ?", [text(claimant)]);
  }
  if let Some(predicate) = &filter.predicate {
    conds.push("p.name = ?", [text(predicate)]);
  }
  if let Some(certainty) = filter.certainty {
    conds.push("c.certainty >= ?", [Value::Real(certainty)]);
  }
  if let Some(human) = filter.human {
    conds.push("c.human = ?", [Value::Integer(i64::from(human))]);
  }
  if let Some(actor) = &filter.actor {
    conds.push("c.actor LIKE ?", [text(actor)]);
  }
  if let Some(role) = &filter.role {
    conds.push("c.role LIKE ?", [text(role)]);
  }

  match filter.identifier_match() {
    IdentifierMatch::Any => {}
    IdentifierMatch::Class(_) => {
      conds.push(
        "EXISTS (
           SELECT 1 FROM equivalent_identifiers m
           WHERE m.eqid = ?
             AND ((m.type_id = c.subject_type_id AND m.value = c.subject_value)
               OR (m.type_id = c.object_type_id  AND m.value = c.object_value))
         )",
        [class.map_or(Value::Null, text)],
      );
    }
    IdentifierMatch::Sides { subject, object } => {
      if let Some(subject) = subject {
        conds.push("st.name = ?", [Value::Text(normalize_type_name(subject))]);
      }
      if let Some(object) = object {
        conds.push("ot.name = ?", [Value::Text(normalize_type_name(object))]);
      }
    }
    IdentifierMatch::Either { type_name: Some(t), value: Some(v) } => {
      let t = normalize_type_name(t);
      conds.push(
        "((st.name = ? AND c.subject_value = ?) OR (ot.name = ? AND c.object_value = ?))",
        [text(&t), text(v), text(&t), text(v)],
      );
    }
    IdentifierMatch::Either { type_name: Some(t), value: None } => {
      let t = normalize_type_name(t);
      conds.push("(st.name = ? OR ot.name = ?)", [text(&t), text(&t)]);
    }
    IdentifierMatch::Either { type_name: None, value: Some(v) } => {
      conds.push("(c.subject_value = ? OR c.object_value = ?)", [text(v), text(v)]);
    }
    IdentifierMatch::Either { type_name: None, value: None } => {}
  }

  let where_clause = if conds.clauses.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.clauses.join("\n  AND "))
  };

  let mut params = conds.params;
  // SQLite reads a negative LIMIT as "no limit".
  let clamp = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
  params.push(Value::Integer(filter.limit.map_or(-1, clamp)));
  params.push(Value::Integer(filter.offset.map_or(0, clamp)));

  let sql = format!(
    "SELECT {CLAIM_COLUMNS}
     FROM claims c
     JOIN claimants        cl ON cl.id = c.claimant_id
     JOIN predicates       p  ON p.id  = c.predicate_id
     JOIN identifier_types st ON st.id = c.subject_type_id
     JOIN identifier_types ot ON ot.id = c.object_type_id
     {where_clause}
     ORDER BY c.id
     LIMIT ? OFFSET ?"
  );

  ClaimSql { sql, params }
}
