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

//! Multi-predicate unification
//!
//! [`join`] chains a set of predicates into one connected join plan: an
//! incremental left-deep tree builder. Predicates are sorted once by a
//! selectivity heuristic (index availability class, then cardinality
//! product), the first is executed as a two-way join, and each round folds
//! one more predicate into the accumulated result by re-keying the side
//! whose table the result already contains. The folded predicate executes
//! next, so the accumulated result grows monotonically and is never
//! orphaned by an unrelated predicate running in between. A predicate
//! whose sides are both disconnected waits until the result grows to reach
//! it; if no remaining predicate connects, the set does not unify.
//!
//! There is no cost model beyond the initial sort — callers needing an
//! optimal order supply predicates pre-ordered.

use log::debug;

use crate::core::{Error, Result};
use crate::executor::join::{join_pair, PolyTupleStream};
use crate::executor::predicate::JoinPredicate;
use crate::executor::stream::{RekeyStream, TupleStream};

/// Join a set of predicates into a single [`PolyTupleStream`].
///
/// Fails with [`Error::EmptyPredicates`] on empty input and
/// [`Error::PredicatesDoNotUnify`] when no ordering connects every
/// predicate to the accumulated result.
pub fn join(mut preds: Vec<JoinPredicate>) -> Result<PolyTupleStream> {
    if preds.is_empty() {
        return Err(Error::EmptyPredicates);
    }
    preds.sort_by_key(JoinPredicate::plan_cost);
    join_round(preds)
}

fn join_round(mut preds: Vec<JoinPredicate>) -> Result<PolyTupleStream> {
    let first = preds.remove(0);
    debug!(
        "unify: joining '{}' x '{}' ({} predicates remaining)",
        first.a.container(),
        first.b.container(),
        preds.len()
    );
    let result = join_pair(first)?;
    if preds.is_empty() {
        return Ok(result);
    }

    // Fold the result into the first remaining predicate that shares a
    // contained table with it, and execute that predicate next: the
    // accumulated result must not sit idle in the middle of the list, or a
    // later fold would discard the constraints it already carries.
    let connected = preds.iter().position(|p| {
        result.contained_types().contains(&p.a.container())
            || result.contained_types().contains(&p.b.container())
    });
    let Some(i) = connected else {
        return Err(Error::PredicatesDoNotUnify);
    };

    let mut pred = preds.remove(i);
    if result.contained_types().contains(&pred.a.container()) {
        let field = pred.a.join_field();
        pred.a = Box::new(RekeyStream::new(Box::new(result), field)?);
    } else {
        let field = pred.b.join_field();
        pred.b = Box::new(RekeyStream::new(Box::new(result), field)?);
    }
    preds.insert(0, pred);

    join_round(preds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TableId, Value};
    use crate::storage::table::Table;

    fn keyed(name: &'static str, keys: &[i64]) -> Table {
        let mut t = Table::new(TableId(name), &["k"]);
        for k in keys {
            t.insert(vec![Value::integer(*k)]).unwrap();
        }
        t
    }

    #[test]
    fn test_empty_predicate_list() {
        assert_eq!(join(Vec::new()).unwrap_err(), Error::EmptyPredicates);
    }

    #[test]
    fn test_single_predicate_executes_directly() {
        let a = keyed("a", &[1, 2]);
        let b = keyed("b", &[2, 3]);
        let mut result = join(vec![JoinPredicate::eq(
            Box::new(a.join_on("k").unwrap()),
            Box::new(b.join_on("k").unwrap()),
        )])
        .unwrap();
        assert_eq!(result.collect_all().len(), 1);
    }

    #[test]
    fn test_disjoint_predicates_do_not_unify() {
        let names: [&'static str; 6] = ["a", "b", "c", "d", "e", "f"];
        let tables: Vec<Table> = names.iter().map(|&n| keyed(n, &[1, 2])).collect();
        let pred = |x: usize, y: usize| {
            JoinPredicate::eq(
                Box::new(tables[x].join_on("k").unwrap()),
                Box::new(tables[y].join_on("k").unwrap()),
            )
        };
        let err = join(vec![pred(0, 1), pred(2, 3), pred(4, 5)]).unwrap_err();
        assert_eq!(err, Error::PredicatesDoNotUnify);
    }

    #[test]
    fn test_chained_predicates_unify() {
        let a = keyed("a", &[1, 2]);
        let b = keyed("b", &[1, 2, 3]);
        let c = keyed("c", &[2, 3]);
        let d = keyed("d", &[2]);
        let mut result = join(vec![
            JoinPredicate::eq(
                Box::new(a.join_on("k").unwrap()),
                Box::new(b.join_on("k").unwrap()),
            ),
            JoinPredicate::eq(
                Box::new(b.join_on("k").unwrap()),
                Box::new(c.join_on("k").unwrap()),
            ),
            JoinPredicate::eq(
                Box::new(c.join_on("k").unwrap()),
                Box::new(d.join_on("k").unwrap()),
            ),
        ])
        .unwrap();

        // all four tables unified into one stream
        for name in ["a", "b", "c", "d"] {
            assert!(result.contained_types().contains(&TableId(name)));
        }
        // only k=2 survives every equality
        let tuples = result.collect_all();
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].width(), 4);
    }
}
