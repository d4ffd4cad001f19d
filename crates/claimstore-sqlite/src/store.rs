//! [`SqliteStore`], the SQLite implementation of [`ClaimStore`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::{
  Connection, OptionalExtension as _, TransactionBehavior, params, params_from_iter,
};
use tracing::info;
use uuid::Uuid;

use claimstore_core::{
  Rejection,
  claim::{Claim, IdentifierPair, NewClaim},
  equivalence::{EquivalenceClasses, Merge},
  registry::{
    Claimant, EquivalencePredicates, IdentifierType, IdentifierTypeSpec, NewClaimant,
    Predicate, normalize_type_name,
  },
  store::{ClaimFilter, ClaimStore, IdentifierMatch},
};

use crate::{
  Error, Result,
  encode::{RawClaim, RawClaimant, decode_uuid, encode_dt, encode_uuid, parse_iso8601},
  equivalence::{EquivalenceIndex, RawMerge},
  query::claims_query,
  schema::SCHEMA,
};

// ─── Lookups ─────────────────────────────────────────────────────────────────

fn claimant_id(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row("SELECT id FROM claimants WHERE name = ?1", params![name], |r| r.get(0))
    .optional()
}

fn type_id(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row(
      "SELECT id FROM identifier_types WHERE name = ?1",
      params![normalize_type_name(name)],
      |r| r.get(0),
    )
    .optional()
}

fn predicate_id(conn: &Connection, name: &str) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row("SELECT id FROM predicates WHERE name = ?1", params![name], |r| r.get(0))
    .optional()
}

const TYPE_COLUMNS: &str = "
  t.id, t.name, t.description, t.url, t.example_value, t.example_url, c.name";

fn identifier_type_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<IdentifierType> {
  Ok(IdentifierType {
    id:            row.get(0)?,
    name:          row.get(1)?,
    description:   row.get(2)?,
    url:           row.get(3)?,
    example_value: row.get(4)?,
    example_url:   row.get(5)?,
    claimant:      row.get(6)?,
  })
}

fn insert_identifier_type(
  conn: &Connection,
  spec: &IdentifierTypeSpec,
  claimant_id: Option<i64>,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO identifier_types
       (name, description, url, example_value, example_url, claimant_id)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      normalize_type_name(&spec.name),
      spec.description,
      spec.url,
      spec.example_value,
      spec.example_url,
      claimant_id,
    ],
  )?;
  Ok(())
}

fn decode_merge(raw: RawMerge) -> Result<Merge> {
  Ok(Merge {
    subject: raw.subject.into_entry()?,
    object:  raw.object.into_entry()?,
    outcome: raw.outcome,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A ClaimStore backed by a single SQLite file.
///
/// Clones share the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn:        tokio_rusqlite::Connection,
  equivalence: Arc<EquivalencePredicates>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(
    path: impl AsRef<Path>,
    equivalence: EquivalencePredicates,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, equivalence: Arc::new(equivalence) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory(equivalence: EquivalencePredicates) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, equivalence: Arc::new(equivalence) };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The predicates this store treats as equivalence-bearing.
  pub fn equivalence_predicates(&self) -> &EquivalencePredicates { &self.equivalence }
}

// ─── ClaimStore impl ─────────────────────────────────────────────────────────

impl ClaimStore for SqliteStore {
  type Error = Error;

  // ── Registry ──────────────────────────────────────────────────────────────

  async fn subscribe(&self, input: NewClaimant) -> Result<Claimant> {
    let claimant = Claimant {
      id:     0,
      uuid:   Uuid::new_v4(),
      name:   input.name,
      url:    input.url,
      joined: Utc::now(),
    };

    let uuid_str   = encode_uuid(claimant.uuid);
    let joined_str = encode_dt(claimant.joined);
    let name       = claimant.name.clone();
    let url        = claimant.url.clone();
    let types      = input.persistent_identifiers;

    let inserted: std::result::Result<i64, Rejection> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if claimant_id(&tx, &name)?.is_some() {
          return Ok(Err(Rejection::ClaimantAlreadyRegistered));
        }
        tx.execute(
          "INSERT INTO claimants (uuid, name, url, joined) VALUES (?1, ?2, ?3, ?4)",
          params![uuid_str, name, url, joined_str],
        )?;
        let id = tx.last_insert_rowid();
        for spec in &types {
          if type_id(&tx, &spec.name)?.is_none() {
            insert_identifier_type(&tx, spec, Some(id))?;
          }
        }
        tx.commit()?;
        Ok(Ok(id))
      })
      .await?;

    let id = inserted?;
    info!(claimant = %claimant.name, uuid = %claimant.uuid, "claimant subscribed");
    Ok(Claimant { id, ..claimant })
  }

  async fn register_identifier_type(&self, spec: IdentifierTypeSpec) -> Result<IdentifierType> {
    let identifier_type = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if type_id(&tx, &spec.name)?.is_none() {
          insert_identifier_type(&tx, &spec, None)?;
        }
        let identifier_type = tx.query_row(
          &format!(
            "SELECT {TYPE_COLUMNS}
             FROM identifier_types t
             LEFT JOIN claimants c ON c.id = t.claimant_id
             WHERE t.name = ?1"
          ),
          params![normalize_type_name(&spec.name)],
          identifier_type_from_row,
        )?;
        tx.commit()?;
        Ok(identifier_type)
      })
      .await?;
    Ok(identifier_type)
  }

  async fn seed_predicate(&self, name: String, description: Option<String>) -> Result<Predicate> {
    let predicate = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
          "INSERT OR IGNORE INTO predicates (name, description) VALUES (?1, ?2)",
          params![name, description],
        )?;
        let predicate = tx.query_row(
          "SELECT id, name, description FROM predicates WHERE name = ?1",
          params![name],
          |row| {
            Ok(Predicate {
              id:          row.get(0)?,
              name:        row.get(1)?,
              description: row.get(2)?,
            })
          },
        )?;
        tx.commit()?;
        Ok(predicate)
      })
      .await?;
    Ok(predicate)
  }

  async fn list_claimants(&self) -> Result<Vec<Claimant>> {
    let raws: Vec<RawClaimant> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, uuid, name, url, joined FROM claimants ORDER BY id")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawClaimant {
              id:     row.get(0)?,
              uuid:   row.get(1)?,
              name:   row.get(2)?,
              url:    row.get(3)?,
              joined: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawClaimant::into_claimant).collect()
  }

  async fn list_identifier_types(&self) -> Result<Vec<IdentifierType>> {
    let types = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TYPE_COLUMNS}
           FROM identifier_types t
           LEFT JOIN claimants c ON c.id = t.claimant_id
           ORDER BY t.name"
        ))?;
        let rows = stmt
          .query_map([], identifier_type_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(types)
  }

  async fn list_predicates(&self) -> Result<Vec<Predicate>> {
    let predicates = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, name, description FROM predicates ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Predicate {
              id:          row.get(0)?,
              name:        row.get(1)?,
              description: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(predicates)
  }

  async fn remove_claimant(&self, name: String) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM claimants WHERE name = ?1", params![name])?;
        tx.commit()?;
        Ok(removed > 0)
      })
      .await?;
    Ok(removed)
  }

  // ── Claims ────────────────────────────────────────────────────────────────

  async fn record_claim(&self, input: NewClaim) -> Result<Uuid> {
    let created = parse_iso8601(&input.created).map_err(|e| {
      claimstore_core::Error::invalid_data("Claim datetime does not follow ISO 8601 Z", e)
    })?;

    let uuid         = Uuid::new_v4();
    let uuid_str     = encode_uuid(uuid);
    let received_str = encode_dt(Utc::now());
    let created_str  = encode_dt(created);
    let details_str  = input.payload.to_string();
    let unify        = self.equivalence.contains(&input.predicate);

    let recorded: std::result::Result<(), Rejection> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(claimant) = claimant_id(&tx, &input.claimant)? else {
          return Ok(Err(Rejection::ClaimantNotRegistered));
        };
        let Some(subject_type) = type_id(&tx, &input.subject.type_name)? else {
          return Ok(Err(Rejection::SubjectTypeNotRegistered));
        };
        let Some(object_type) = type_id(&tx, &input.object.type_name)? else {
          return Ok(Err(Rejection::ObjectTypeNotRegistered));
        };
        if subject_type == object_type {
          return Ok(Err(Rejection::SameIdentifierType));
        }
        let Some(predicate) = predicate_id(&tx, &input.predicate)? else {
          return Ok(Err(Rejection::PredicateNotRegistered));
        };

        let (subject_eqid, object_eqid) = if unify {
          let merge = EquivalenceIndex::new(&tx).merge_pair(
            subject_type,
            &input.subject.value,
            object_type,
            &input.object.value,
          )?;
          (Some(merge.subject.id), Some(merge.object.id))
        } else {
          (None, None)
        };

        tx.execute(
          "INSERT INTO claims (
             uuid, received, created, claimant_id,
             subject_type_id, subject_value, subject_eqid,
             predicate_id, certainty, human, actor, role,
             object_type_id, object_value, object_eqid, claim_details
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
          params![
            uuid_str,
            received_str,
            created_str,
            claimant,
            subject_type,
            input.subject.value,
            subject_eqid,
            predicate,
            input.certainty,
            input.provenance.human,
            input.provenance.actor,
            input.provenance.role,
            object_type,
            input.object.value,
            object_eqid,
            details_str,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    recorded?;
    Ok(uuid)
  }

  async fn find_claims(&self, filter: &ClaimFilter) -> Result<Vec<Claim>> {
    let filter = filter.clone();

    let raws: Vec<RawClaim> = self
      .conn
      .call(move |conn| {
        let class = match filter.identifier_match() {
          IdentifierMatch::Class(pair) => {
            let class = match type_id(conn, &pair.type_name)? {
              Some(t) => EquivalenceIndex::new(conn).class_of(t, &pair.value)?,
              None => None,
            };
            // Recurse without a class matches nothing, whatever else is set.
            if class.is_none() {
              return Ok(Vec::new());
            }
            class
          }
          _ => None,
        };

        let query = claims_query(&filter, class.as_deref());
        let mut stmt = conn.prepare(&query.sql)?;
        let rows = stmt
          .query_map(params_from_iter(query.params.iter()), RawClaim::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawClaim::into_claim).collect()
  }

  // ── Equivalence index ─────────────────────────────────────────────────────

  async fn lookup_class(&self, pair: IdentifierPair) -> Result<Vec<IdentifierPair>> {
    let members = self
      .conn
      .call(move |conn| {
        let Some(t) = type_id(conn, &pair.type_name)? else {
          return Ok(Vec::new());
        };
        Ok(EquivalenceIndex::new(conn).lookup_class(t, &pair.value)?)
      })
      .await?;

    Ok(
      members
        .into_iter()
        .map(|(type_name, value)| IdentifierPair { type_name, value })
        .collect(),
    )
  }

  async fn merge_pair(&self, subject: IdentifierPair, object: IdentifierPair) -> Result<Merge> {
    let merged: std::result::Result<RawMerge, Rejection> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(subject_type) = type_id(&tx, &subject.type_name)? else {
          return Ok(Err(Rejection::SubjectTypeNotRegistered));
        };
        let Some(object_type) = type_id(&tx, &object.type_name)? else {
          return Ok(Err(Rejection::ObjectTypeNotRegistered));
        };
        let merge = EquivalenceIndex::new(&tx).merge_pair(
          subject_type,
          &subject.value,
          object_type,
          &object.value,
        )?;
        tx.commit()?;
        Ok(Ok(merge))
      })
      .await?;

    decode_merge(merged?)
  }

  async fn equivalence_classes(&self, eqid: Option<Uuid>) -> Result<EquivalenceClasses> {
    let eqid_str = eqid.map(encode_uuid);

    let rows = self
      .conn
      .call(move |conn| Ok(EquivalenceIndex::new(conn).classes(eqid_str.as_deref())?))
      .await?;

    let mut classes = EquivalenceClasses::new();
    for (eqid, type_name, value) in rows {
      classes
        .entry(decode_uuid(&eqid)?)
        .or_default()
        .push(IdentifierPair { type_name, value });
    }
    Ok(classes)
  }

  async fn clear_equivalences(&self) -> Result<usize> {
    let removed = self
      .conn
      .call(|conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = EquivalenceIndex::new(&tx).clear()?;
        tx.commit()?;
        Ok(removed)
      })
      .await?;
    Ok(removed)
  }

  async fn rebuild_equivalences(&self) -> Result<usize> {
    let equivalence = Arc::clone(&self.equivalence);

    let replayed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let replayed = EquivalenceIndex::new(&tx).rebuild(|p| equivalence.contains(p))?;
        tx.commit()?;
        Ok(replayed)
      })
      .await?;
    Ok(replayed)
  }
}
