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

//! # Amalgam - embedded in-memory join and reachability engine
//!
//! Amalgam answers multi-table queries over in-process record collections
//! by composing lazy tuple streams. Per join predicate it selects among
//! filter, hash, index-scan, index-intersection, and nested-loop joins
//! based on the streams' contained-type sets and index status; a set of
//! predicates is unified into one connected join plan. A closure-graph
//! layer turns any edge-producing join into a reachability oracle whose
//! test plugs back into the engine as an ordinary join predicate.
//!
//! ## Key properties
//!
//! - **Lazy, pull-based streams** - a tuple is materialized only when
//!   pulled; `reset()` replays the identical sequence
//! - **Index-aware selection** - persistent table indexes and transient
//!   hash-join indexes feed the same probe machinery
//! - **Reachability as a predicate** - transitive closure over a
//!   relationship joins otherwise-unrelated streams
//! - **Single-threaded by design** - no locks, no background threads;
//!   iteration state is owned by the stream that created it
//!
//! ## Quick start
//!
//! ```rust
//! use amalgam::{join, JoinPredicate, Table, TableId, TupleStream, Value};
//!
//! # fn main() -> amalgam::Result<()> {
//! let mut users = Table::new(TableId("users"), &["id", "name"]);
//! users.insert(vec![Value::integer(1), Value::text("ada")])?;
//! users.insert(vec![Value::integer(2), Value::text("bob")])?;
//!
//! let mut orders = Table::new(TableId("orders"), &["user_id", "item"]);
//! orders.insert(vec![Value::integer(1), Value::text("pen")])?;
//!
//! let mut result = join(vec![JoinPredicate::eq(
//!     Box::new(users.join_on("id")?),
//!     Box::new(orders.join_on("user_id")?),
//! )])?;
//!
//! while let Some(tuple) = result.next() {
//!     let user = tuple.get(TableId("users")).expect("joined tuple spans users");
//!     let order = tuple.get(TableId("orders")).expect("joined tuple spans orders");
//!     println!("{:?} ordered {:?}", user, order);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Values, records, tuples, errors
//! - [`storage`] - Tables and indexes
//! - [`executor`] - Streams, predicates, join algorithms, unification
//! - [`graph`] - Closure graphs and reachability queries

pub mod core;
pub mod executor;
pub mod graph;
pub mod storage;

// Re-export main types for convenience
pub use crate::core::{
    Error, FieldId, FieldRef, Record, Relation, Result, Schema, TableId, Tuple, Value,
};
pub use executor::{
    join, join_pair, nested_loops, query, FieldPredicate, FieldTest, FilterStream, JoinPredicate,
    JoinTest, KeyPredicate, MaterializedStream, PolyTupleStream, RekeyStream, TableScan,
    TupleStream, TypeSet,
};
pub use graph::ClosureGraph;
pub use storage::{Index, Table};
