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

//! Query executor
//!
//! Lazy, pull-based, single-threaded evaluation over tuple streams:
//!
//! ```text
//! Table scans / index retrievals
//!   |
//! join_pair (algorithm selection per predicate)
//!   |
//! PolyTupleStream (a joinable stream spanning several tables)
//!   |
//! join (multi-predicate unification)
//!   |
//! Consumer iteration
//! ```
//!
//! # Components
//!
//! - [`TupleStream`] - the capability contract for every logical source
//! - [`JoinPredicate`] / [`FieldPredicate`] - join and per-field predicates
//! - [`join_pair`] / [`join`] / [`nested_loops`] - join execution
//! - [`query`] - single-table index-seeded queries

pub mod join;
pub mod predicate;
pub mod query;
pub mod stream;
pub mod unify;

pub use join::{join_pair, nested_loops, PolyTupleStream};
pub use predicate::{FieldPredicate, FieldTest, JoinPredicate, JoinTest, KeyPredicate};
pub use query::query;
pub use stream::{
    FilterStream, MaterializedStream, RekeyStream, TableScan, TupleStream, TypeSet,
};
pub use unify::join;
