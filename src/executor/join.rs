// Copyright 2026 Amalgam Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Join algorithms and per-predicate selection
//!
//! [`join_pair`] executes one predicate, picking among:
//!
//! - **Filter join** - one side already spans the other's keyed table (a
//!   previously-joined result being re-filtered): iterate that side and
//!   test both extracted fields per tuple. No auxiliary structure.
//! - **Index-intersection join** - both sides indexed under equality:
//!   iterate one index's keys, cross-product the buckets of keys present in
//!   both.
//! - **Index-scan join** - one side indexed: scan the other side once and
//!   probe the index per scanned tuple.
//! - **Hash join** - neither side indexed: build a transient index over the
//!   smaller side, then index-scan. O(build) + amortized O(probe).
//! - **Nested-loop join** - O(|A|*|B|) fallback, re-scanning the inner side
//!   via `reset()` per outer element. Auto-selected only for custom tests
//!   (which no index can serve); available directly as [`nested_loops`].
//!
//! Every algorithm is a lazy state machine: it materializes a tuple only
//! when pulled, replays identically after `reset()`, and clones into an
//! independent cursor.

use std::sync::Arc;

use log::debug;

use crate::core::{Error, FieldRef, Relation, Result, Tuple};
use crate::executor::predicate::{JoinPredicate, JoinTest};
use crate::executor::stream::{RekeyStream, TupleStream, TypeSet};
use crate::storage::index::Index;

/// A join result: itself a [`TupleStream`] spanning the union of its
/// inputs' contained tables, so further joins can consume it.
///
/// Initially keyed on the first input's join field; [`join_on`] re-keys it
/// for the next predicate.
///
/// [`join_on`]: PolyTupleStream::join_on
#[derive(Clone)]
pub struct PolyTupleStream {
    op: JoinOp,
    types: TypeSet,
    join_field: FieldRef,
    cardinality: usize,
}

impl std::fmt::Debug for PolyTupleStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolyTupleStream")
            .field("types", &self.types)
            .field("join_field", &self.join_field)
            .field("cardinality", &self.cardinality)
            .finish_non_exhaustive()
    }
}

impl PolyTupleStream {
    /// Re-express this result against a different join field, consuming it.
    /// The field's table must be contained in the result.
    pub fn join_on(self, field: FieldRef) -> Result<RekeyStream> {
        RekeyStream::new(Box::new(self), field)
    }
}

impl TupleStream for PolyTupleStream {
    fn next(&mut self) -> Option<Tuple> {
        self.op.next()
    }

    fn reset(&mut self) {
        self.op.reset();
    }

    fn cardinality(&self) -> usize {
        self.cardinality
    }

    fn contained_types(&self) -> &TypeSet {
        &self.types
    }

    fn join_field(&self) -> FieldRef {
        self.join_field
    }

    fn box_clone(&self) -> Box<dyn TupleStream> {
        Box::new(self.clone())
    }
}

/// Execute one join predicate, selecting the algorithm from the streams'
/// contained-type sets and index status.
///
/// Fails with [`Error::SelfJoin`] when both sides are keyed on the same
/// table, regardless of content.
pub fn join_pair(pred: JoinPredicate) -> Result<PolyTupleStream> {
    let JoinPredicate { a, b, test } = pred;

    if a.container() == b.container() {
        return Err(Error::self_join(a.container()));
    }

    let types: TypeSet = a
        .contained_types()
        .union(b.contained_types())
        .copied()
        .collect();
    let join_field = a.join_field();
    let cardinality = a.cardinality().saturating_mul(b.cardinality());

    let overlapping = a
        .contained_types()
        .intersection(b.contained_types())
        .next()
        .is_some();
    if overlapping {
        // One side already spans the other's keyed table; drive that side.
        let (driver, a_field, b_field) = if a.contained_types().contains(&b.container()) {
            let fields = (a.join_field(), b.join_field());
            (a, fields.0, fields.1)
        } else if b.contained_types().contains(&a.container()) {
            let fields = (a.join_field(), b.join_field());
            (b, fields.0, fields.1)
        } else {
            return Err(Error::not_supported(
                "join inputs share tables but neither side contains the other's join key",
            ));
        };
        debug!("join: filter join driven by '{}'", driver.container());
        let cardinality = driver.cardinality();
        return Ok(PolyTupleStream {
            op: JoinOp::Filter(FilterJoin {
                driver,
                a_field,
                b_field,
                test,
            }),
            types,
            join_field,
            cardinality,
        });
    }

    let op = match test.relation() {
        None => {
            debug!(
                "join: nested loops '{}' x '{}' (custom test)",
                a.container(),
                b.container()
            );
            JoinOp::NestedLoops(NestedLoopsJoin {
                a,
                b,
                test,
                current_a: None,
            })
        }
        Some(rel) => {
            let a_index = a.index().cloned();
            let b_index = b.index().cloned();
            match (a_index, b_index) {
                (Some(ai), Some(bi)) if rel == Relation::Eq => {
                    debug!(
                        "join: index intersection '{}' x '{}'",
                        a.container(),
                        b.container()
                    );
                    JoinOp::Intersection(IntersectionJoin::new(ai, bi))
                }
                // Both indexed under a non-equality relation also lands
                // here: intersection only serves EQ, so probe a's index.
                (Some(ai), _) => {
                    debug!(
                        "join: index scan of '{}' probing '{}' index",
                        b.container(),
                        a.container()
                    );
                    JoinOp::IndexScan(IndexScanJoin::new(ai, b, rel))
                }
                (None, Some(bi)) => {
                    debug!(
                        "join: index scan of '{}' probing '{}' index",
                        a.container(),
                        b.container()
                    );
                    JoinOp::IndexScan(IndexScanJoin::new(bi, a, rel.flip()))
                }
                (None, None) => {
                    let (mut build, probe, oriented) = if a.cardinality() <= b.cardinality() {
                        (a, b, rel)
                    } else {
                        (b, a, rel.flip())
                    };
                    debug!(
                        "join: hash join building over '{}' ({} rows)",
                        build.container(),
                        build.cardinality()
                    );
                    let index = build_transient_index(build.as_mut(), oriented)?;
                    JoinOp::IndexScan(IndexScanJoin::new(Arc::new(index), probe, oriented))
                }
            }
        }
    };

    Ok(PolyTupleStream {
        op,
        types,
        join_field,
        cardinality,
    })
}

/// Nested-loop join of two streams, the always-applicable fallback.
pub fn nested_loops(
    a: Box<dyn TupleStream>,
    b: Box<dyn TupleStream>,
    test: JoinTest,
) -> Result<PolyTupleStream> {
    if a.container() == b.container() {
        return Err(Error::self_join(a.container()));
    }
    let types: TypeSet = a
        .contained_types()
        .union(b.contained_types())
        .copied()
        .collect();
    let join_field = a.join_field();
    let cardinality = a.cardinality().saturating_mul(b.cardinality());
    Ok(PolyTupleStream {
        op: JoinOp::NestedLoops(NestedLoopsJoin {
            a,
            b,
            test,
            current_a: None,
        }),
        types,
        join_field,
        cardinality,
    })
}

/// Build a transient index over a stream, keyed by its join field.
///
/// Hash-backed for EQ/NE, ordered for range relations. An extractor that
/// cannot reach its field is a programmer error and propagates.
fn build_transient_index(stream: &mut dyn TupleStream, relation: Relation) -> Result<Index> {
    let mut index = Index::for_relation(relation);
    let field = stream.join_field();
    stream.reset();
    while let Some(tuple) = stream.next() {
        let key = tuple.field(field).cloned().ok_or_else(|| {
            Error::invalid_argument(format!(
                "cannot extract join key '{}' while building index",
                field.table
            ))
        })?;
        index.insert(key, tuple);
    }
    Ok(index)
}

// ============================================================================
// Algorithm state machines
// ============================================================================

#[derive(Clone)]
enum JoinOp {
    Filter(FilterJoin),
    IndexScan(IndexScanJoin),
    Intersection(IntersectionJoin),
    NestedLoops(NestedLoopsJoin),
}

impl JoinOp {
    fn next(&mut self) -> Option<Tuple> {
        match self {
            JoinOp::Filter(op) => op.next(),
            JoinOp::IndexScan(op) => op.next(),
            JoinOp::Intersection(op) => op.next(),
            JoinOp::NestedLoops(op) => op.next(),
        }
    }

    fn reset(&mut self) {
        match self {
            JoinOp::Filter(op) => op.reset(),
            JoinOp::IndexScan(op) => op.reset(),
            JoinOp::Intersection(op) => op.reset(),
            JoinOp::NestedLoops(op) => op.reset(),
        }
    }
}

/// Filter join: both join fields are extractable from each driver tuple.
#[derive(Clone)]
struct FilterJoin {
    driver: Box<dyn TupleStream>,
    a_field: FieldRef,
    b_field: FieldRef,
    test: JoinTest,
}

impl FilterJoin {
    fn next(&mut self) -> Option<Tuple> {
        loop {
            let tuple = self.driver.next()?;
            if let (Some(ka), Some(kb)) = (tuple.field(self.a_field), tuple.field(self.b_field)) {
                if self.test.matches(ka, kb) {
                    return Some(tuple);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.driver.reset();
    }
}

/// Index-scan join: scan one side, probe the other's index per scanned
/// tuple, cross-product the hits.
///
/// `relation` is oriented as `indexed_key REL scanned_key`.
#[derive(Clone)]
struct IndexScanJoin {
    index: Arc<Index>,
    scanned: Box<dyn TupleStream>,
    relation: Relation,
    current: Option<Tuple>,
    matches: std::vec::IntoIter<Tuple>,
}

impl IndexScanJoin {
    fn new(index: Arc<Index>, scanned: Box<dyn TupleStream>, relation: Relation) -> Self {
        IndexScanJoin {
            index,
            scanned,
            relation,
            current: None,
            matches: Vec::new().into_iter(),
        }
    }

    fn next(&mut self) -> Option<Tuple> {
        loop {
            if let Some(current) = &self.current {
                if let Some(hit) = self.matches.next() {
                    return Some(Tuple::merge(&hit, current));
                }
            }
            let tuple = self.scanned.next()?;
            self.matches = match self.scanned.extract_key(&tuple) {
                Some(key) => self.index.probe(self.relation, key).into_iter(),
                None => Vec::new().into_iter(),
            };
            self.current = Some(tuple);
        }
    }

    fn reset(&mut self) {
        self.scanned.reset();
        self.current = None;
        self.matches = Vec::new().into_iter();
    }
}

/// Index-intersection join: iterate a's keys; for each key present in both
/// indexes, cross-product the two buckets.
#[derive(Clone)]
struct IntersectionJoin {
    a_index: Arc<Index>,
    b_index: Arc<Index>,
    keys: std::vec::IntoIter<crate::core::Value>,
    a_matches: std::vec::IntoIter<Tuple>,
    current_a: Option<Tuple>,
    b_bucket: Vec<Tuple>,
    b_matches: std::vec::IntoIter<Tuple>,
}

impl IntersectionJoin {
    fn new(a_index: Arc<Index>, b_index: Arc<Index>) -> Self {
        let keys = a_index.keys().into_iter();
        IntersectionJoin {
            a_index,
            b_index,
            keys,
            a_matches: Vec::new().into_iter(),
            current_a: None,
            b_bucket: Vec::new(),
            b_matches: Vec::new().into_iter(),
        }
    }

    fn next(&mut self) -> Option<Tuple> {
        loop {
            if let Some(current_a) = &self.current_a {
                if let Some(b) = self.b_matches.next() {
                    return Some(Tuple::merge(current_a, &b));
                }
            }
            if let Some(a) = self.a_matches.next() {
                self.current_a = Some(a);
                self.b_matches = self.b_bucket.clone().into_iter();
                continue;
            }
            // advance to the next key shared by both indexes
            let key = self.keys.next()?;
            if let (Some(a_bucket), Some(b_bucket)) =
                (self.a_index.get(&key), self.b_index.get(&key))
            {
                self.a_matches = a_bucket.to_vec().into_iter();
                self.b_bucket = b_bucket.to_vec();
                self.b_matches = Vec::new().into_iter();
                self.current_a = None;
            }
        }
    }

    fn reset(&mut self) {
        self.keys = self.a_index.keys().into_iter();
        self.a_matches = Vec::new().into_iter();
        self.current_a = None;
        self.b_bucket = Vec::new();
        self.b_matches = Vec::new().into_iter();
    }
}

/// Nested-loop join: for each outer tuple, rewind and re-scan the inner
/// side.
#[derive(Clone)]
struct NestedLoopsJoin {
    a: Box<dyn TupleStream>,
    b: Box<dyn TupleStream>,
    test: JoinTest,
    current_a: Option<Tuple>,
}

impl NestedLoopsJoin {
    fn next(&mut self) -> Option<Tuple> {
        loop {
            if let Some(current_a) = &self.current_a {
                while let Some(tb) = self.b.next() {
                    let keys = (
                        current_a.field(self.a.join_field()),
                        tb.field(self.b.join_field()),
                    );
                    if let (Some(ka), Some(kb)) = keys {
                        if self.test.matches(ka, kb) {
                            return Some(Tuple::merge(current_a, &tb));
                        }
                    }
                }
            }
            let ta = self.a.next()?;
            self.b.reset();
            self.current_a = Some(ta);
        }
    }

    fn reset(&mut self) {
        self.a.reset();
        self.b.reset();
        self.current_a = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TableId, Value};
    use crate::storage::table::Table;

    fn users() -> Table {
        let mut t = Table::new(TableId("users"), &["id", "name"]);
        t.insert(vec![Value::integer(1), Value::text("ada")]).unwrap();
        t.insert(vec![Value::integer(2), Value::text("bob")]).unwrap();
        t.insert(vec![Value::integer(3), Value::text("eve")]).unwrap();
        t
    }

    fn orders() -> Table {
        let mut t = Table::new(TableId("orders"), &["user_id", "item"]);
        t.insert(vec![Value::integer(1), Value::text("pen")]).unwrap();
        t.insert(vec![Value::integer(1), Value::text("ink")]).unwrap();
        t.insert(vec![Value::integer(3), Value::text("pad")]).unwrap();
        t.insert(vec![Value::integer(9), Value::text("gum")]).unwrap();
        t
    }

    fn pairs(result: &mut PolyTupleStream) -> Vec<(Value, Value)> {
        let users_name = FieldRef::new(TableId("users"), crate::core::FieldId(1));
        let orders_item = FieldRef::new(TableId("orders"), crate::core::FieldId(1));
        let mut out: Vec<(Value, Value)> = result
            .collect_all()
            .iter()
            .map(|t| {
                (
                    t.field(users_name).cloned().unwrap_or(Value::Null),
                    t.field(orders_item).cloned().unwrap_or(Value::Null),
                )
            })
            .collect();
        out.sort();
        out
    }

    fn expected_pairs() -> Vec<(Value, Value)> {
        let mut v = vec![
            (Value::text("ada"), Value::text("pen")),
            (Value::text("ada"), Value::text("ink")),
            (Value::text("eve"), Value::text("pad")),
        ];
        v.sort();
        v
    }

    #[test]
    fn test_hash_join_selected_when_unindexed() {
        let u = users();
        let o = orders();
        let mut result = join_pair(JoinPredicate::eq(
            Box::new(u.join_on("id").unwrap()),
            Box::new(o.join_on("user_id").unwrap()),
        ))
        .unwrap();
        assert_eq!(pairs(&mut result), expected_pairs());
    }

    #[test]
    fn test_index_scan_join_selected_with_one_index() {
        let mut u = users();
        u.create_index("id").unwrap();
        let o = orders();
        let mut result = join_pair(JoinPredicate::eq(
            Box::new(u.join_on("id").unwrap()),
            Box::new(o.join_on("user_id").unwrap()),
        ))
        .unwrap();
        assert_eq!(pairs(&mut result), expected_pairs());
    }

    #[test]
    fn test_intersection_join_selected_with_both_indexes() {
        let mut u = users();
        u.create_index("id").unwrap();
        let mut o = orders();
        o.create_index("user_id").unwrap();
        let mut result = join_pair(JoinPredicate::eq(
            Box::new(u.join_on("id").unwrap()),
            Box::new(o.join_on("user_id").unwrap()),
        ))
        .unwrap();
        assert_eq!(pairs(&mut result), expected_pairs());
    }

    #[test]
    fn test_nested_loops_matches_hash_join() {
        let u = users();
        let o = orders();
        let mut result = nested_loops(
            Box::new(u.join_on("id").unwrap()),
            Box::new(o.join_on("user_id").unwrap()),
            JoinTest::Relation(Relation::Eq),
        )
        .unwrap();
        assert_eq!(pairs(&mut result), expected_pairs());
    }

    #[test]
    fn test_self_join_rejected() {
        let u = users();
        let err = join_pair(JoinPredicate::eq(
            Box::new(u.join_on("id").unwrap()),
            Box::new(u.join_on("name").unwrap()),
        ))
        .unwrap_err();
        assert_eq!(err, Error::self_join(TableId("users")));
    }

    #[test]
    fn test_join_result_restart() {
        let u = users();
        let o = orders();
        let mut result = join_pair(JoinPredicate::eq(
            Box::new(u.join_on("id").unwrap()),
            Box::new(o.join_on("user_id").unwrap()),
        ))
        .unwrap();
        let first = pairs(&mut result);
        result.reset();
        let second = pairs(&mut result);
        assert_eq!(first, second);
    }

    #[test]
    fn test_ordering_relation_join() {
        let u = users();
        let o = orders();
        // users.id > orders.user_id
        let mut result = join_pair(JoinPredicate::with_relation(
            Box::new(u.join_on("id").unwrap()),
            Box::new(o.join_on("user_id").unwrap()),
            Relation::Gt,
        ))
        .unwrap();
        // ids {1,2,3} x user_ids {1,1,3,9}: 2>1 (twice), 3>1 (twice)
        assert_eq!(result.collect_all().len(), 4);
    }
}
