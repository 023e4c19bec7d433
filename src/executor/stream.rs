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

//! Tuple streams: lazy, pull-based, restartable sequences
//!
//! [`TupleStream`] is the capability contract every logical source
//! satisfies — a table scan, an index retrieval, or a prior join result.
//! It is also the boundary a table implementation must provide to the
//! engine.
//!
//! Pull semantics follow Rust's iterator contract: `next()` returns `None`
//! at exhaustion and stays `None` (fused). `reset()` rewinds to the start
//! and replays the identical sequence. Streams are clonable; a clone is an
//! independent cursor over identical contents, so multiple consumers never
//! share hidden cursor state unless they deliberately share one stream
//! object.
//!
//! Streams are single-threaded by design: iteration state is owned by the
//! stream instance, and concurrent advancement from multiple threads
//! requires external synchronization. This is a documented precondition of
//! the engine, not a missing feature.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::core::{Error, FieldId, FieldRef, Record, Result, TableId, Tuple, Value};
use crate::executor::predicate::FieldPredicate;
use crate::storage::index::Index;
use crate::storage::table::Table;

/// The set of tables a stream's tuples span
pub type TypeSet = FxHashSet<TableId>;

/// A lazy, restartable sequence of tuples for one logical source, keyed by
/// a join field for a pending join.
pub trait TupleStream {
    /// Pull the next tuple. Fused: keeps returning `None` after exhaustion.
    fn next(&mut self) -> Option<Tuple>;

    /// Rewind to the first element; the replay yields the identical
    /// sequence. Cheap relative to a re-scan (a cursor rewind), which keeps
    /// the nested-loops fallback viable.
    fn reset(&mut self);

    /// Size estimate used for join-order and hash-join build-side
    /// heuristics.
    fn cardinality(&self) -> usize;

    /// The table this stream is keyed on (the join field's container).
    fn container(&self) -> TableId {
        self.join_field().table
    }

    /// All tables this stream's tuples span.
    fn contained_types(&self) -> &TypeSet;

    /// The extractor keying this stream for a pending join.
    fn join_field(&self) -> FieldRef;

    /// Extract the join key from one of this stream's tuples.
    fn extract_key<'t>(&self, tuple: &'t Tuple) -> Option<&'t Value> {
        tuple.field(self.join_field())
    }

    /// The index over this stream's contents keyed by the join field, if
    /// one exists.
    fn index(&self) -> Option<&Arc<Index>> {
        None
    }

    fn is_indexed(&self) -> bool {
        self.index().is_some()
    }

    fn box_clone(&self) -> Box<dyn TupleStream>;

    /// Drain the remaining tuples into a vector.
    fn collect_all(&mut self) -> Vec<Tuple> {
        let mut out = Vec::new();
        while let Some(t) = self.next() {
            out.push(t);
        }
        out
    }
}

impl Clone for Box<dyn TupleStream> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl std::fmt::Debug for dyn TupleStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleStream")
            .field("join_field", &self.join_field())
            .field("cardinality", &self.cardinality())
            .finish_non_exhaustive()
    }
}

/// Forwarding impl so a boxed stream is itself a [`TupleStream`], letting a
/// `Box<dyn TupleStream>` be passed where a stream value is expected.
impl TupleStream for Box<dyn TupleStream> {
    fn next(&mut self) -> Option<Tuple> {
        (**self).next()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn cardinality(&self) -> usize {
        (**self).cardinality()
    }

    fn container(&self) -> TableId {
        (**self).container()
    }

    fn contained_types(&self) -> &TypeSet {
        (**self).contained_types()
    }

    fn join_field(&self) -> FieldRef {
        (**self).join_field()
    }

    fn extract_key<'t>(&self, tuple: &'t Tuple) -> Option<&'t Value> {
        (**self).extract_key(tuple)
    }

    fn index(&self) -> Option<&Arc<Index>> {
        (**self).index()
    }

    fn is_indexed(&self) -> bool {
        (**self).is_indexed()
    }

    fn box_clone(&self) -> Box<dyn TupleStream> {
        (**self).box_clone()
    }

    fn collect_all(&mut self) -> Vec<Tuple> {
        (**self).collect_all()
    }
}

// ============================================================================
// Table scan
// ============================================================================

/// A stream over one table's rows, yielding singleton tuples.
///
/// Holds a snapshot of the rows (and of the persistent index on the join
/// field, when one exists), so table mutation after creation never perturbs
/// a live scan.
#[derive(Clone)]
pub struct TableScan {
    table: TableId,
    join_field: FieldRef,
    rows: Arc<Vec<Arc<Record>>>,
    index: Option<Arc<Index>>,
    types: TypeSet,
    pos: usize,
}

impl TableScan {
    /// A scan of `table` keyed on `field`
    pub fn over_field(table: &Table, field: FieldId) -> Self {
        TableScan {
            table: table.id(),
            join_field: FieldRef::new(table.id(), field),
            rows: table.snapshot(),
            index: table.index_on(field).cloned(),
            types: TypeSet::from_iter([table.id()]),
            pos: 0,
        }
    }
}

impl TupleStream for TableScan {
    fn next(&mut self) -> Option<Tuple> {
        let record = self.rows.get(self.pos)?;
        self.pos += 1;
        Some(Tuple::singleton(self.table, Arc::clone(record)))
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn cardinality(&self) -> usize {
        self.rows.len()
    }

    fn contained_types(&self) -> &TypeSet {
        &self.types
    }

    fn join_field(&self) -> FieldRef {
        self.join_field
    }

    fn index(&self) -> Option<&Arc<Index>> {
        self.index.as_ref()
    }

    fn box_clone(&self) -> Box<dyn TupleStream> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Materialized stream
// ============================================================================

/// A stream over an already-materialized tuple sequence: an index-bucket
/// retrieval seeding a query, or a closure graph's reachable-key set.
#[derive(Clone)]
pub struct MaterializedStream {
    join_field: FieldRef,
    types: TypeSet,
    tuples: Arc<Vec<Tuple>>,
    pos: usize,
}

impl MaterializedStream {
    pub fn new(join_field: FieldRef, types: TypeSet, tuples: Vec<Tuple>) -> Self {
        MaterializedStream {
            join_field,
            types,
            tuples: Arc::new(tuples),
            pos: 0,
        }
    }
}

impl TupleStream for MaterializedStream {
    fn next(&mut self) -> Option<Tuple> {
        let tuple = self.tuples.get(self.pos)?;
        self.pos += 1;
        Some(tuple.clone())
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn cardinality(&self) -> usize {
        self.tuples.len()
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

// ============================================================================
// Residual filter
// ============================================================================

/// Applies residual field predicates to one table's record within each
/// tuple of the inner stream.
///
/// Reports no index: the inner index describes the unfiltered contents and
/// must not leak through.
#[derive(Clone)]
pub struct FilterStream {
    inner: Box<dyn TupleStream>,
    table: TableId,
    predicates: Vec<FieldPredicate>,
}

impl FilterStream {
    pub fn new(inner: Box<dyn TupleStream>, table: TableId, predicates: Vec<FieldPredicate>) -> Self {
        FilterStream {
            inner,
            table,
            predicates,
        }
    }
}

impl TupleStream for FilterStream {
    fn next(&mut self) -> Option<Tuple> {
        loop {
            let tuple = self.inner.next()?;
            let passes = match tuple.get(self.table) {
                Some(record) => self.predicates.iter().all(|p| p.matches_record(record)),
                None => false,
            };
            if passes {
                return Some(tuple);
            }
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn cardinality(&self) -> usize {
        self.inner.cardinality()
    }

    fn contained_types(&self) -> &TypeSet {
        self.inner.contained_types()
    }

    fn join_field(&self) -> FieldRef {
        self.inner.join_field()
    }

    fn box_clone(&self) -> Box<dyn TupleStream> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Re-keying
// ============================================================================

/// Re-expresses a stream against a different join field, without touching
/// its contents. Used by multi-predicate unification to point a pending
/// predicate at an accumulated join result, and by closure graphs to key an
/// edge stream by its source or target field.
///
/// Reports no index: any inner index is keyed by the old join field.
#[derive(Clone, Debug)]
pub struct RekeyStream {
    inner: Box<dyn TupleStream>,
    join_field: FieldRef,
}

impl RekeyStream {
    /// Fails unless `field.table` is contained in the inner stream.
    pub fn new(inner: Box<dyn TupleStream>, field: FieldRef) -> Result<Self> {
        if !inner.contained_types().contains(&field.table) {
            return Err(Error::invalid_argument(format!(
                "cannot key stream on '{}': table not contained",
                field.table
            )));
        }
        Ok(RekeyStream {
            inner,
            join_field: field,
        })
    }
}

impl TupleStream for RekeyStream {
    fn next(&mut self) -> Option<Tuple> {
        self.inner.next()
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn cardinality(&self) -> usize {
        self.inner.cardinality()
    }

    fn contained_types(&self) -> &TypeSet {
        self.inner.contained_types()
    }

    fn join_field(&self) -> FieldRef {
        self.join_field
    }

    fn box_clone(&self) -> Box<dyn TupleStream> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    fn numbers() -> Table {
        let mut t = Table::new(TableId("numbers"), &["n"]);
        for n in 1..=4 {
            t.insert(vec![Value::integer(n)]).unwrap();
        }
        t
    }

    fn keys(stream: &mut dyn TupleStream) -> Vec<Value> {
        let field = stream.join_field();
        stream
            .collect_all()
            .iter()
            .filter_map(|t| t.field(field).cloned())
            .collect()
    }

    #[test]
    fn test_scan_restart_idempotence() {
        let t = numbers();
        let mut scan = t.scan();
        let first = keys(&mut scan);
        scan.reset();
        let second = keys(&mut scan);
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_scan_is_fused() {
        let t = numbers();
        let mut scan = t.scan();
        while scan.next().is_some() {}
        assert!(scan.next().is_none());
        assert!(scan.next().is_none());
    }

    #[test]
    fn test_clone_is_independent_cursor() {
        let t = numbers();
        let mut scan = t.scan();
        scan.next();
        scan.next();
        let mut clone = scan.clone();
        // both cursors continue from the same position, independently
        assert_eq!(keys(&mut clone), keys(&mut scan));
    }

    #[test]
    fn test_rekey_requires_contained_table() {
        let t = numbers();
        let scan = t.scan();
        let err = RekeyStream::new(
            Box::new(scan),
            FieldRef::new(TableId("other"), FieldId(0)),
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_rekey_forwards_contents() {
        let mut t = Table::new(TableId("pairs"), &["a", "b"]);
        t.insert(vec![Value::integer(1), Value::integer(10)]).unwrap();
        let mut rekeyed = RekeyStream::new(
            Box::new(t.scan()),
            FieldRef::new(TableId("pairs"), FieldId(1)),
        )
        .unwrap();
        assert_eq!(keys(&mut rekeyed), vec![Value::integer(10)]);
        assert!(!rekeyed.is_indexed());
    }
}
