//! The equivalence-identifier index.
//!
//! A disjoint-set structure over `(identifier type, value)` pairs persisted
//! in `equivalent_identifiers`. The class UUID stored on every row is the
//! representative: membership is a point lookup and a union rewrites every
//! row of the absorbed class. There are no parent pointers and no ranks.
//!
//! All functions run on a borrowed connection so the caller decides the
//! transaction boundary; a merge is only durable together with whatever
//! the caller commits alongside it.

use claimstore_core::equivalence::MergeOutcome;
use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::encode::{RawEntry, encode_uuid};

/// Both sides of a merge as raw rows, plus the case taken.
#[derive(Debug, Clone)]
pub struct RawMerge {
  pub subject: RawEntry,
  pub object:  RawEntry,
  pub outcome: MergeOutcome,
}

pub struct EquivalenceIndex<'c> {
  conn: &'c Connection,
}

impl<'c> EquivalenceIndex<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  /// The index row for a pair, if it was ever indexed.
  pub fn find(&self, type_id: i64, value: &str) -> rusqlite::Result<Option<RawEntry>> {
    self
      .conn
      .query_row(
        "SELECT id, eqid, type_id, value FROM equivalent_identifiers
         WHERE type_id = ?1 AND value = ?2
         ORDER BY id
         LIMIT 1",
        params![type_id, value],
        |row| {
          Ok(RawEntry {
            id:      row.get(0)?,
            eqid:    row.get(1)?,
            type_id: row.get(2)?,
            value:   row.get(3)?,
          })
        },
      )
      .optional()
  }

  /// Class UUID of a pair, if it was ever indexed.
  pub fn class_of(&self, type_id: i64, value: &str) -> rusqlite::Result<Option<String>> {
    Ok(self.find(type_id, value)?.map(|e| e.eqid))
  }

  /// `(type name, value)` of every member of the pair's class, sorted.
  /// Empty when the pair is not indexed.
  pub fn lookup_class(
    &self,
    type_id: i64,
    value: &str,
  ) -> rusqlite::Result<Vec<(String, String)>> {
    let Some(eqid) = self.class_of(type_id, value)? else {
      return Ok(Vec::new());
    };

    let mut stmt = self.conn.prepare(
      "SELECT t.name, e.value
       FROM equivalent_identifiers e
       JOIN identifier_types t ON t.id = e.type_id
       WHERE e.eqid = ?1
       ORDER BY t.name, e.value",
    )?;
    let members = stmt
      .query_map(params![eqid], |row| Ok((row.get(0)?, row.get(1)?)))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(members)
  }

  /// Every entry as `(eqid, type name, value)`, optionally restricted to one
  /// class, grouped by class.
  pub fn classes(&self, eqid: Option<&str>) -> rusqlite::Result<Vec<(String, String, String)>> {
    let mut stmt = self.conn.prepare(
      "SELECT e.eqid, t.name, e.value
       FROM equivalent_identifiers e
       JOIN identifier_types t ON t.id = e.type_id
       WHERE ?1 IS NULL OR e.eqid = ?1
       ORDER BY e.eqid, t.name, e.value",
    )?;
    let rows = stmt
      .query_map(params![eqid], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }

  fn insert(&self, eqid: &str, type_id: i64, value: &str) -> rusqlite::Result<RawEntry> {
    self.conn.execute(
      "INSERT INTO equivalent_identifiers (eqid, type_id, value) VALUES (?1, ?2, ?3)",
      params![eqid, type_id, value],
    )?;
    Ok(RawEntry {
      id:      self.conn.last_insert_rowid(),
      eqid:    eqid.to_owned(),
      type_id,
      value:   value.to_owned(),
    })
  }

  /// Unify the classes of subject and object.
  ///
  /// On a union of two existing classes the object's class is absorbed into
  /// the subject's; the returned object entry carries the new class UUID.
  pub fn merge_pair(
    &self,
    subject_type: i64,
    subject_value: &str,
    object_type: i64,
    object_value: &str,
  ) -> rusqlite::Result<RawMerge> {
    let existing_subject = self.find(subject_type, subject_value)?;
    let existing_object = if (subject_type, subject_value) == (object_type, object_value) {
      existing_subject.clone()
    } else {
      self.find(object_type, object_value)?
    };

    let merge = match (existing_subject, existing_object) {
      (None, None) => {
        let eqid = encode_uuid(Uuid::new_v4());
        let subject = self.insert(&eqid, subject_type, subject_value)?;
        let object = if (subject_type, subject_value) == (object_type, object_value) {
          subject.clone()
        } else {
          self.insert(&eqid, object_type, object_value)?
        };
        RawMerge { subject, object, outcome: MergeOutcome::Created }
      }

      (Some(subject), Some(object)) if subject.eqid == object.eqid => {
        RawMerge { subject, object, outcome: MergeOutcome::AlreadyUnified }
      }

      (Some(subject), Some(mut object)) => {
        let moved = self.conn.execute(
          "UPDATE equivalent_identifiers SET eqid = ?1 WHERE eqid = ?2",
          params![subject.eqid, object.eqid],
        )?;
        object.eqid = subject.eqid.clone();
        RawMerge { subject, object, outcome: MergeOutcome::Unified { moved } }
      }

      (Some(subject), None) => {
        let object = self.insert(&subject.eqid, object_type, object_value)?;
        RawMerge { subject, object, outcome: MergeOutcome::Attached }
      }

      (None, Some(object)) => {
        let subject = self.insert(&object.eqid, subject_type, subject_value)?;
        RawMerge { subject, object, outcome: MergeOutcome::Attached }
      }
    };

    debug!(
      eqid = %merge.subject.eqid,
      outcome = ?merge.outcome,
      "merged equivalent identifiers"
    );
    Ok(merge)
  }

  /// Delete every entry. Claims referencing entries are set to NULL by the
  /// foreign keys.
  pub fn clear(&self) -> rusqlite::Result<usize> {
    let removed = self.conn.execute("DELETE FROM equivalent_identifiers", [])?;
    info!(removed, "cleared equivalence index");
    Ok(removed)
  }

  /// Replay every claim whose predicate satisfies `is_equivalence`, in
  /// storage order, through [`merge_pair`](Self::merge_pair) and re-stamp
  /// the claim's index references. Does not clear first.
  pub fn rebuild(&self, is_equivalence: impl Fn(&str) -> bool) -> rusqlite::Result<usize> {
    let claims: Vec<(i64, String, i64, String, i64, String)> = {
      let mut stmt = self.conn.prepare(
        "SELECT c.id, p.name, c.subject_type_id, c.subject_value,
                c.object_type_id, c.object_value
         FROM claims c
         JOIN predicates p ON p.id = c.predicate_id
         ORDER BY c.id",
      )?;
      let rows = stmt
        .query_map([], |row| {
          Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      rows
    };

    let mut replayed = 0;
    for (claim_id, predicate, subject_type, subject_value, object_type, object_value) in claims {
      if !is_equivalence(&predicate) {
        continue;
      }
      let merge = self.merge_pair(subject_type, &subject_value, object_type, &object_value)?;
      self.conn.execute(
        "UPDATE claims SET subject_eqid = ?1, object_eqid = ?2 WHERE id = ?3",
        params![merge.subject.id, merge.object.id, claim_id],
      )?;
      replayed += 1;
    }

    info!(replayed, "rebuilt equivalence index");
    Ok(replayed)
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;

  use super::*;
  use crate::schema::SCHEMA;

  /// A connection with three identifier types (ids 1, 2, 3).
  fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    for name in ["A", "B", "C"] {
      conn
        .execute(
          "INSERT INTO identifier_types (name, description, url, example_value, example_url)
           VALUES (?1, '', '', '', '')",
          params![name],
        )
        .unwrap();
    }
    conn
  }

  fn count(conn: &Connection) -> i64 {
    conn
      .query_row("SELECT COUNT(*) FROM equivalent_identifiers", [], |r| r.get(0))
      .unwrap()
  }

  /// The partition as a set of member sets, ignoring class UUIDs.
  fn partition(conn: &Connection) -> BTreeSet<BTreeSet<(String, String)>> {
    let rows = EquivalenceIndex::new(conn).classes(None).unwrap();
    let mut classes: std::collections::BTreeMap<String, BTreeSet<(String, String)>> =
      Default::default();
    for (eqid, t, v) in rows {
      classes.entry(eqid).or_default().insert((t, v));
    }
    classes.into_values().collect()
  }

  #[test]
  fn lookup_of_unindexed_pair_is_empty() {
    let conn = conn();
    assert!(EquivalenceIndex::new(&conn).lookup_class(1, "x").unwrap().is_empty());
  }

  #[test]
  fn neither_exists_mints_one_class_for_both() {
    let conn = conn();
    let index = EquivalenceIndex::new(&conn);
    let m = index.merge_pair(1, "a1", 2, "b1").unwrap();
    assert_eq!(m.outcome, MergeOutcome::Created);
    assert_eq!(m.subject.eqid, m.object.eqid);
    assert_ne!(m.subject.id, m.object.id);
    assert_eq!(count(&conn), 2);
    assert_eq!(
      index.lookup_class(2, "b1").unwrap(),
      vec![("A".to_owned(), "a1".to_owned()), ("B".to_owned(), "b1".to_owned())]
    );
  }

  #[test]
  fn remerge_is_a_no_op() {
    let conn = conn();
    let index = EquivalenceIndex::new(&conn);
    let first = index.merge_pair(1, "a1", 2, "b1").unwrap();
    let before = partition(&conn);
    let second = index.merge_pair(1, "a1", 2, "b1").unwrap();
    assert_eq!(second.outcome, MergeOutcome::AlreadyUnified);
    assert_eq!(second.subject, first.subject);
    assert_eq!(second.object, first.object);
    assert_eq!(partition(&conn), before);
    assert_eq!(count(&conn), 2);
  }

  #[test]
  fn identical_sides_index_a_single_entry() {
    let conn = conn();
    let index = EquivalenceIndex::new(&conn);
    let m = index.merge_pair(1, "a1", 1, "a1").unwrap();
    assert_eq!(m.subject, m.object);
    assert_eq!(count(&conn), 1);
    let again = index.merge_pair(1, "a1", 1, "a1").unwrap();
    assert_eq!(again.outcome, MergeOutcome::AlreadyUnified);
    assert_eq!(count(&conn), 1);
  }

  #[test]
  fn one_side_existing_attaches_the_other() {
    let conn = conn();
    let index = EquivalenceIndex::new(&conn);
    let first = index.merge_pair(1, "a1", 2, "b1").unwrap();

    let by_subject = index.merge_pair(1, "a1", 3, "c1").unwrap();
    assert_eq!(by_subject.outcome, MergeOutcome::Attached);
    assert_eq!(by_subject.subject, first.subject);
    assert_eq!(by_subject.object.eqid, first.subject.eqid);

    let by_object = index.merge_pair(3, "c2", 2, "b1").unwrap();
    assert_eq!(by_object.outcome, MergeOutcome::Attached);
    assert_eq!(by_object.object, first.object);
    assert_eq!(by_object.subject.eqid, first.subject.eqid);

    assert_eq!(index.lookup_class(1, "a1").unwrap().len(), 4);
  }

  #[test]
  fn union_of_m_and_n_yields_one_class_of_m_plus_n() {
    let conn = conn();
    let index = EquivalenceIndex::new(&conn);
    // Class of size 3 around a1, class of size 2 around a2.
    let left = index.merge_pair(1, "a1", 2, "b1").unwrap();
    index.merge_pair(1, "a1", 3, "c1").unwrap();
    let right = index.merge_pair(1, "a2", 2, "b2").unwrap();
    assert_ne!(left.subject.eqid, right.subject.eqid);

    let m = index.merge_pair(3, "c1", 1, "a2").unwrap();
    assert_eq!(m.outcome, MergeOutcome::Unified { moved: 2 });
    assert_eq!(m.subject.eqid, left.subject.eqid);
    assert_eq!(m.object.eqid, left.subject.eqid);

    assert_eq!(count(&conn), 5);
    let classes = partition(&conn);
    assert_eq!(classes.len(), 1);
    assert_eq!(classes.iter().next().unwrap().len(), 5);

    // The absorbed class UUID is gone entirely.
    let leftover: i64 = conn
      .query_row(
        "SELECT COUNT(*) FROM equivalent_identifiers WHERE eqid = ?1",
        params![right.subject.eqid],
        |r| r.get(0),
      )
      .unwrap();
    assert_eq!(leftover, 0);
  }

  #[test]
  fn transitivity_through_a_shared_member() {
    let conn = conn();
    let index = EquivalenceIndex::new(&conn);
    index.merge_pair(1, "a", 2, "b").unwrap();
    index.merge_pair(2, "b", 3, "c").unwrap();
    let class = index.lookup_class(1, "a").unwrap();
    assert!(class.contains(&("C".to_owned(), "c".to_owned())));
  }

  #[test]
  fn membership_is_independent_of_merge_order() {
    let edges = [
      (1, "a1", 2, "b1"),
      (3, "c3", 1, "a4"),
      (1, "a1", 3, "c3"),
      (2, "b5", 3, "c6"),
      (2, "b1", 3, "c7"),
      (1, "a8", 2, "b9"),
    ];

    let mut reference = None;
    // Forward, reversed and two rotations.
    let orders: Vec<Vec<usize>> = vec![
      (0..edges.len()).collect(),
      (0..edges.len()).rev().collect(),
      (0..edges.len()).map(|i| (i + 2) % edges.len()).collect(),
      (0..edges.len()).map(|i| (i + 5) % edges.len()).collect(),
    ];
    for order in orders {
      let conn = conn();
      let index = EquivalenceIndex::new(&conn);
      for i in order {
        let (st, sv, ot, ov) = edges[i];
        index.merge_pair(st, sv, ot, ov).unwrap();
      }
      let got = partition(&conn);
      match &reference {
        None => reference = Some(got),
        Some(expected) => assert_eq!(&got, expected),
      }
    }

    let expected = reference.unwrap();
    assert_eq!(expected.len(), 3);
    assert!(expected.iter().any(|c| c.len() == 5));
  }

  #[test]
  fn clear_empties_the_index() {
    let conn = conn();
    let index = EquivalenceIndex::new(&conn);
    index.merge_pair(1, "a", 2, "b").unwrap();
    index.merge_pair(1, "x", 3, "y").unwrap();
    assert_eq!(index.clear().unwrap(), 4);
    assert_eq!(count(&conn), 0);
    assert!(index.lookup_class(1, "a").unwrap().is_empty());
  }
}
