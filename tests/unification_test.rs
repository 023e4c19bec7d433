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

//! Multi-Predicate Unification Tests
//!
//! Predicate sets either chain into one connected plan spanning every
//! table, or fail with a unification error; degenerate inputs fail with
//! invalid-argument or self-join errors.

use amalgam::{join, Error, JoinPredicate, Table, TableId, TupleStream, Value};

fn keyed(id: TableId, keys: &[i64]) -> Table {
    let mut t = Table::new(id, &["k"]);
    for k in keys {
        t.insert(vec![Value::integer(*k)]).unwrap();
    }
    t
}

fn eq(a: &Table, b: &Table) -> JoinPredicate {
    JoinPredicate::eq(
        Box::new(a.join_on("k").unwrap()),
        Box::new(b.join_on("k").unwrap()),
    )
}

#[test]
fn test_empty_predicate_list_fails() {
    assert_eq!(join(Vec::new()).unwrap_err(), Error::EmptyPredicates);
}

#[test]
fn test_self_join_always_fails() {
    let a = keyed(TableId("a"), &[1, 2]);
    let err = join(vec![eq(&a, &a)]).unwrap_err();
    assert_eq!(err, Error::SelfJoin("a".to_string()));

    // content does not matter: an empty self-join fails identically
    let empty = keyed(TableId("empty"), &[]);
    let err = join(vec![eq(&empty, &empty)]).unwrap_err();
    assert_eq!(err, Error::SelfJoin("empty".to_string()));
}

#[test]
fn test_three_disjoint_predicates_fail_to_unify() {
    let a = keyed(TableId("a"), &[1]);
    let b = keyed(TableId("b"), &[1]);
    let c = keyed(TableId("c"), &[1]);
    let d = keyed(TableId("d"), &[1]);
    let e = keyed(TableId("e"), &[1]);
    let f = keyed(TableId("f"), &[1]);
    let err = join(vec![eq(&a, &b), eq(&c, &d), eq(&e, &f)]).unwrap_err();
    assert_eq!(err, Error::PredicatesDoNotUnify);
}

#[test]
fn test_chain_unifies_into_one_stream() {
    let a = keyed(TableId("a"), &[1, 2, 5]);
    let b = keyed(TableId("b"), &[2, 3, 5]);
    let c = keyed(TableId("c"), &[2, 5, 9]);
    let d = keyed(TableId("d"), &[5]);

    let mut result = join(vec![eq(&a, &b), eq(&b, &c), eq(&c, &d)]).unwrap();

    for name in ["a", "b", "c", "d"] {
        assert!(
            result.contained_types().contains(&TableId(name)),
            "result must contain table '{name}'"
        );
    }
    let tuples = result.collect_all();
    // only k=5 satisfies the whole chain
    assert_eq!(tuples.len(), 1);
    assert_eq!(tuples[0].width(), 4);
    for name in ["a", "b", "c", "d"] {
        let record = tuples[0].get(TableId(name)).expect("all tables merged");
        assert_eq!(record.values(), &[Value::integer(5)]);
    }
}

#[test]
fn test_unification_is_order_insensitive_for_connected_sets() {
    let a = keyed(TableId("a"), &[1, 2]);
    let b = keyed(TableId("b"), &[2, 3]);
    let c = keyed(TableId("c"), &[2]);

    // connected regardless of the order the caller supplies
    let mut forward = join(vec![eq(&a, &b), eq(&b, &c)]).unwrap();
    let mut backward = join(vec![eq(&b, &c), eq(&a, &b)]).unwrap();
    assert_eq!(forward.collect_all().len(), 1);
    assert_eq!(backward.collect_all().len(), 1);
}

#[test]
fn test_star_schema_unifies() {
    // hub joined to three satellites on the same key column
    let hub = keyed(TableId("hub"), &[1, 2, 3, 4]);
    let s1 = keyed(TableId("s1"), &[1, 2, 3]);
    let s2 = keyed(TableId("s2"), &[2, 3]);
    let s3 = keyed(TableId("s3"), &[3, 4]);

    let mut result = join(vec![eq(&hub, &s1), eq(&hub, &s2), eq(&hub, &s3)]).unwrap();
    let tuples = result.collect_all();
    assert_eq!(tuples.len(), 1); // only k=3 appears everywhere
    assert_eq!(tuples[0].width(), 4);
}

#[test]
fn test_indexed_predicate_sorted_first_still_correct() {
    let mut a = keyed(TableId("a"), &[1, 2, 3]);
    a.create_index("k").unwrap();
    let mut b = keyed(TableId("b"), &[2, 3]);
    b.create_index("k").unwrap();
    let c = keyed(TableId("c"), &[3]);

    // the indexed a=b pair should seed the plan; the result is the same
    // either way
    let mut result = join(vec![eq(&c, &a), eq(&a, &b)]).unwrap();
    let tuples = result.collect_all();
    assert_eq!(tuples.len(), 1);
    assert_eq!(tuples[0].width(), 3);
}

#[test]
fn test_monotone_contained_types() {
    let a = keyed(TableId("a"), &[1]);
    let b = keyed(TableId("b"), &[1]);
    let c = keyed(TableId("c"), &[1]);

    let two = join(vec![eq(&a, &b)]).unwrap();
    assert_eq!(two.contained_types().len(), 2);

    let three = join(vec![eq(&a, &b), eq(&b, &c)]).unwrap();
    assert_eq!(three.contained_types().len(), 3);
}
