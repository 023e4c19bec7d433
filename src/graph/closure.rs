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

//! Closure graphs: reachability over edge-producing joins
//!
//! A [`ClosureGraph`] consumes a tuple stream as an edge relation — a
//! source-field and target-field extractor applied to each tuple — and
//! answers bounded-depth reachability, step-count, and
//! breadth-first-reachable-set queries. Its reachability test plugs back
//! into the join engine as an ordinary predicate, so transitive-closure
//! membership can join two otherwise-unrelated streams.
//!
//! One node exists per distinct *key value*: node identity is value
//! equality of the extracted key, never object identity. Nodes live in an
//! arena addressed by index, with adjacency lists of indices — no owning
//! references between nodes, so cyclic relations cost nothing structurally.
//! Adjacency preserves first-insertion order, which makes traversal order
//! deterministic.
//!
//! Traversal is always an explicit stack or queue with visited tracking:
//! cycles terminate, and deep graphs cannot overflow the call stack.
//!
//! Missing keys are unreachable from and to everything — never an error.

use std::collections::VecDeque;
use std::sync::Arc;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::{Error, FieldId, FieldRef, Record, Result, TableId, Tuple, Value};
use crate::executor::predicate::{JoinPredicate, JoinTest};
use crate::executor::stream::{MaterializedStream, RekeyStream, TupleStream, TypeSet};

#[derive(Debug, Clone)]
struct Node {
    key: Value,
    next: Vec<usize>,
}

#[derive(Debug, Default)]
struct GraphCore {
    nodes: Vec<Node>,
    ids: FxHashMap<Value, usize>,
    edge_count: usize,
}

impl GraphCore {
    /// One node per distinct key value
    fn intern(&mut self, key: Value) -> usize {
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            key: key.clone(),
            next: Vec::new(),
        });
        self.ids.insert(key, id);
        id
    }

    fn add_edge(&mut self, src: usize, dst: usize) {
        let next = &mut self.nodes[src].next;
        if !next.contains(&dst) {
            next.push(dst);
            self.edge_count += 1;
        }
    }

    /// Depth-first first-path search with an explicit stack.
    ///
    /// A node is re-expanded only when reached at a strictly smaller depth
    /// than before: that bounds cycles and keeps the search correct under a
    /// depth limit, where a plain visited set would miss shallower
    /// re-entries. `max_steps` is an inclusive bound on path length.
    fn first_path_steps(&self, src: usize, dst: usize, max_steps: Option<usize>) -> Option<usize> {
        let mut best: FxHashMap<usize, usize> = FxHashMap::default();
        let mut stack = vec![(src, 0_usize)];
        while let Some((node, depth)) = stack.pop() {
            if node == dst {
                return Some(depth);
            }
            if let Some(max) = max_steps {
                if depth >= max {
                    continue;
                }
            }
            match best.get(&node) {
                Some(&seen) if seen <= depth => continue,
                _ => {}
            }
            best.insert(node, depth);
            // reversed so the first successor is explored first
            for &succ in self.nodes[node].next.iter().rev() {
                stack.push((succ, depth + 1));
            }
        }
        None
    }

    /// Breadth-first shortest-path length within an inclusive bound.
    fn shortest_steps(&self, src: usize, dst: usize, max_steps: Option<usize>) -> Option<usize> {
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        seen.insert(src);
        let mut queue = VecDeque::new();
        queue.push_back((src, 0_usize));
        while let Some((node, depth)) = queue.pop_front() {
            if node == dst {
                return Some(depth);
            }
            if let Some(max) = max_steps {
                if depth >= max {
                    continue;
                }
            }
            for &succ in &self.nodes[node].next {
                if seen.insert(succ) {
                    queue.push_back((succ, depth + 1));
                }
            }
        }
        None
    }

    /// Breadth-first enumeration of every reachable key, starting key
    /// first.
    fn breadth_first(&self, src: usize) -> Vec<Value> {
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        seen.insert(src);
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(src);
        while let Some(node) = queue.pop_front() {
            order.push(self.nodes[node].key.clone());
            for &succ in &self.nodes[node].next {
                if seen.insert(succ) {
                    queue.push_back(succ);
                }
            }
        }
        order
    }
}

/// The edge stream a graph was built from, retained so the reachability
/// test can be re-expressed as a join over it.
#[derive(Clone)]
struct EdgeOrigin {
    stream: Box<dyn TupleStream>,
    source: FieldRef,
    target: FieldRef,
}

/// A directed reachability oracle built from an edge-producing join.
#[derive(Clone)]
pub struct ClosureGraph {
    core: Arc<GraphCore>,
    origin: Option<EdgeOrigin>,
}

impl ClosureGraph {
    /// Build from an edge stream: `source` and `target` extract the two
    /// endpoint keys of each edge tuple.
    pub fn from_edges(
        mut stream: Box<dyn TupleStream>,
        source: FieldRef,
        target: FieldRef,
    ) -> Result<Self> {
        for field in [source, target] {
            if !stream.contained_types().contains(&field.table) {
                return Err(Error::invalid_argument(format!(
                    "edge stream does not contain table '{}'",
                    field.table
                )));
            }
        }

        let mut core = GraphCore::default();
        stream.reset();
        while let Some(tuple) = stream.next() {
            let (Some(src_key), Some(dst_key)) = (tuple.field(source), tuple.field(target)) else {
                return Err(Error::invalid_argument(
                    "edge tuple is missing a key field",
                ));
            };
            let src = core.intern(src_key.clone());
            let dst = core.intern(dst_key.clone());
            core.add_edge(src, dst);
        }
        stream.reset();
        debug!(
            "closure graph: {} nodes, {} edges",
            core.nodes.len(),
            core.edge_count
        );
        Ok(ClosureGraph {
            core: Arc::new(core),
            origin: Some(EdgeOrigin {
                stream,
                source,
                target,
            }),
        })
    }

    /// Build from a connecting predicate across two streams: every key pair
    /// satisfying `test` becomes an edge from a's key to b's key.
    pub fn from_connecting(
        mut a: Box<dyn TupleStream>,
        mut b: Box<dyn TupleStream>,
        test: JoinTest,
    ) -> Result<Self> {
        let mut core = GraphCore::default();
        a.reset();
        while let Some(ta) = a.next() {
            let Some(ka) = a.extract_key(&ta) else {
                return Err(Error::invalid_argument(
                    "stream tuple is missing its join key",
                ));
            };
            b.reset();
            while let Some(tb) = b.next() {
                let Some(kb) = b.extract_key(&tb) else {
                    return Err(Error::invalid_argument(
                        "stream tuple is missing its join key",
                    ));
                };
                if test.matches(ka, kb) {
                    let src = core.intern(ka.clone());
                    let dst = core.intern(kb.clone());
                    core.add_edge(src, dst);
                }
            }
        }
        debug!(
            "closure graph: {} nodes, {} edges (connecting predicate)",
            core.nodes.len(),
            core.edge_count
        );
        Ok(ClosureGraph {
            core: Arc::new(core),
            origin: None,
        })
    }

    pub fn node_count(&self) -> usize {
        self.core.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.core.edge_count
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.core.ids.contains_key(key)
    }

    /// The number of edges on the first depth-first path found from `src`
    /// to `dst` with length at most `max_steps` (`None` = unbounded), or
    /// `None` when no such path exists.
    ///
    /// This is *a* path length, not necessarily the shortest, unless the
    /// topology is a chain; use [`shortest_steps_between`] when the true
    /// distance matters.
    ///
    /// [`shortest_steps_between`]: ClosureGraph::shortest_steps_between
    pub fn steps_between(
        &self,
        src: &Value,
        dst: &Value,
        max_steps: Option<usize>,
    ) -> Option<usize> {
        let src = *self.core.ids.get(src)?;
        let dst = *self.core.ids.get(dst)?;
        self.core.first_path_steps(src, dst, max_steps)
    }

    /// The shortest-path length from `src` to `dst` within `max_steps`
    /// (breadth-first).
    pub fn shortest_steps_between(
        &self,
        src: &Value,
        dst: &Value,
        max_steps: Option<usize>,
    ) -> Option<usize> {
        let src = *self.core.ids.get(src)?;
        let dst = *self.core.ids.get(dst)?;
        self.core.shortest_steps(src, dst, max_steps)
    }

    /// True iff any path leads from `src` to `dst`.
    pub fn reachable(&self, src: &Value, dst: &Value) -> bool {
        self.steps_between(src, dst, None).is_some()
    }

    /// True iff the first-found path length lies in
    /// `[min_steps, max_steps]`.
    pub fn reachable_within(
        &self,
        src: &Value,
        dst: &Value,
        min_steps: usize,
        max_steps: Option<usize>,
    ) -> bool {
        self.steps_between(src, dst, max_steps)
            .map_or(false, |steps| steps >= min_steps)
    }

    /// Every key reachable from `src` in breadth-first order, starting with
    /// `src` itself. Empty when `src` is not in the graph.
    pub fn breadth_first_from(&self, src: &Value) -> Vec<Value> {
        match self.core.ids.get(src) {
            Some(&id) => self.core.breadth_first(id),
            None => Vec::new(),
        }
    }

    /// The reachable-key set as a re-iterable single-column stream under
    /// `as_table`, so it can seed further joins.
    pub fn breadth_first_stream(&self, src: &Value, as_table: TableId) -> MaterializedStream {
        let tuples = self
            .breadth_first_from(src)
            .into_iter()
            .map(|key| Tuple::singleton(as_table, Arc::new(Record::new(vec![key]))))
            .collect();
        MaterializedStream::new(
            FieldRef::new(as_table, FieldId(0)),
            TypeSet::from_iter([as_table]),
            tuples,
        )
    }

    /// The reachability test as a join-pluggable key predicate.
    pub fn reachability_test(&self) -> JoinTest {
        let core = Arc::clone(&self.core);
        JoinTest::Custom(Arc::new(move |a, b| {
            match (core.ids.get(a), core.ids.get(b)) {
                (Some(&src), Some(&dst)) => core.first_path_steps(src, dst, None).is_some(),
                _ => false,
            }
        }))
    }

    /// The windowed reachability test: first-found path length in
    /// `[min_steps, max_steps]`.
    pub fn reachability_test_within(
        &self,
        min_steps: usize,
        max_steps: Option<usize>,
    ) -> JoinTest {
        let core = Arc::clone(&self.core);
        JoinTest::Custom(Arc::new(move |a, b| {
            match (core.ids.get(a), core.ids.get(b)) {
                (Some(&src), Some(&dst)) => core
                    .first_path_steps(src, dst, max_steps)
                    .map_or(false, |steps| steps >= min_steps),
                _ => false,
            }
        }))
    }

    /// Pair two arbitrary streams under this graph's reachability test, so
    /// transitive-closure membership acts as an ordinary join condition.
    pub fn join_predicate_between(
        &self,
        a: Box<dyn TupleStream>,
        b: Box<dyn TupleStream>,
    ) -> JoinPredicate {
        JoinPredicate {
            a,
            b,
            test: self.reachability_test(),
        }
    }

    /// The original self-pairing form: the edge stream keyed on its source
    /// field joined with itself keyed on its target field, under the
    /// reachability test.
    ///
    /// Only available for graphs built with [`from_edges`], and only
    /// executable when the source and target fields live in different
    /// contained tables (the engine's universal self-join rejection applies
    /// otherwise).
    ///
    /// [`from_edges`]: ClosureGraph::from_edges
    pub fn as_join_predicate(&self) -> Result<JoinPredicate> {
        let Some(origin) = &self.origin else {
            return Err(Error::not_supported(
                "closure graph was not built from an edge stream",
            ));
        };
        let a = RekeyStream::new(origin.stream.clone(), origin.source)?;
        let b = RekeyStream::new(origin.stream.clone(), origin.target)?;
        Ok(JoinPredicate {
            a: Box::new(a),
            b: Box::new(b),
            test: self.reachability_test(),
        })
    }
}
