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

//! Join and field predicates

use std::fmt;
use std::sync::Arc;

use crate::core::{FieldId, Record, Relation, Value};
use crate::executor::stream::TupleStream;

/// A two-argument key predicate (closure-graph reachability tests plug in
/// here)
pub type KeyPredicate = Arc<dyn Fn(&Value, &Value) -> bool>;

/// A one-argument value predicate for single-table queries
pub type ValuePredicate = Arc<dyn Fn(&Value) -> bool>;

/// The test a join predicate applies to its two extracted keys: either a
/// comparison [`Relation`] or an opaque custom predicate.
///
/// Custom predicates cannot be served by an index, so they always execute
/// as filter or nested-loop joins.
#[derive(Clone)]
pub enum JoinTest {
    Relation(Relation),
    Custom(KeyPredicate),
}

impl JoinTest {
    pub fn matches(&self, a: &Value, b: &Value) -> bool {
        match self {
            JoinTest::Relation(rel) => rel.matches(a, b),
            JoinTest::Custom(f) => f(a, b),
        }
    }

    pub fn relation(&self) -> Option<Relation> {
        match self {
            JoinTest::Relation(rel) => Some(*rel),
            JoinTest::Custom(_) => None,
        }
    }
}

impl fmt::Debug for JoinTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinTest::Relation(rel) => write!(f, "{rel:?}"),
            JoinTest::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Pairs two streams with the test relating their join fields.
pub struct JoinPredicate {
    pub a: Box<dyn TupleStream>,
    pub b: Box<dyn TupleStream>,
    pub test: JoinTest,
}

impl JoinPredicate {
    /// An equality predicate: `a.join_field == b.join_field`
    pub fn eq(a: Box<dyn TupleStream>, b: Box<dyn TupleStream>) -> Self {
        Self::with_relation(a, b, Relation::Eq)
    }

    pub fn with_relation(a: Box<dyn TupleStream>, b: Box<dyn TupleStream>, rel: Relation) -> Self {
        JoinPredicate {
            a,
            b,
            test: JoinTest::Relation(rel),
        }
    }

    /// A predicate with a custom two-argument key test
    pub fn custom(
        a: Box<dyn TupleStream>,
        b: Box<dyn TupleStream>,
        test: impl Fn(&Value, &Value) -> bool + 'static,
    ) -> Self {
        JoinPredicate {
            a,
            b,
            test: JoinTest::Custom(Arc::new(test)),
        }
    }

    /// Selectivity class for multi-predicate ordering: both sides indexed
    /// under equality beats one side indexed beats neither (custom tests
    /// count as neither).
    pub(crate) fn plan_class(&self) -> u8 {
        let eq = matches!(self.test, JoinTest::Relation(Relation::Eq));
        match (self.a.is_indexed(), self.b.is_indexed()) {
            (true, true) if eq => 0,
            (true, _) | (_, true) if self.test.relation().is_some() => 1,
            _ => 2,
        }
    }

    /// Sort key for multi-predicate ordering: selectivity class, then the
    /// cardinality product.
    pub(crate) fn plan_cost(&self) -> (u8, u128) {
        (
            self.plan_class(),
            self.a.cardinality() as u128 * self.b.cardinality() as u128,
        )
    }
}

impl Clone for JoinPredicate {
    fn clone(&self) -> Self {
        JoinPredicate {
            a: self.a.clone(),
            b: self.b.clone(),
            test: self.test.clone(),
        }
    }
}

impl fmt::Debug for JoinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPredicate")
            .field("a", &self.a.join_field())
            .field("b", &self.b.join_field())
            .field("test", &self.test)
            .finish()
    }
}

// ============================================================================
// Field predicates (single-table queries)
// ============================================================================

/// The test a field predicate applies to one record field.
#[derive(Clone)]
pub enum FieldTest {
    Relation(Relation, Value),
    Custom(ValuePredicate),
}

impl fmt::Debug for FieldTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldTest::Relation(rel, v) => write!(f, "{rel:?} {v}"),
            FieldTest::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A per-field predicate over one table's records.
#[derive(Debug, Clone)]
pub struct FieldPredicate {
    pub field: FieldId,
    pub test: FieldTest,
}

impl FieldPredicate {
    /// `field == value`
    pub fn eq(field: FieldId, value: Value) -> Self {
        Self::with_relation(field, Relation::Eq, value)
    }

    pub fn with_relation(field: FieldId, rel: Relation, value: Value) -> Self {
        FieldPredicate {
            field,
            test: FieldTest::Relation(rel, value),
        }
    }

    /// A predicate with a custom one-argument value test
    pub fn custom(field: FieldId, test: impl Fn(&Value) -> bool + 'static) -> Self {
        FieldPredicate {
            field,
            test: FieldTest::Custom(Arc::new(test)),
        }
    }

    /// Test one record against this predicate
    pub fn matches_record(&self, record: &Record) -> bool {
        match record.get(self.field) {
            Some(value) => match &self.test {
                FieldTest::Relation(rel, target) => rel.matches(value, target),
                FieldTest::Custom(f) => f(value),
            },
            None => false,
        }
    }

    /// The comparison value when this is an equality test, used for index
    /// bucket seeding
    pub(crate) fn equality_value(&self) -> Option<&Value> {
        match &self.test {
            FieldTest::Relation(Relation::Eq, value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_predicate_relation() {
        let r = Record::new(vec![Value::integer(5), Value::text("x")]);
        assert!(FieldPredicate::eq(FieldId(0), Value::integer(5)).matches_record(&r));
        assert!(!FieldPredicate::eq(FieldId(0), Value::integer(6)).matches_record(&r));
        assert!(
            FieldPredicate::with_relation(FieldId(0), Relation::Gt, Value::integer(4))
                .matches_record(&r)
        );
        // out-of-range field never matches
        assert!(!FieldPredicate::eq(FieldId(9), Value::integer(5)).matches_record(&r));
    }

    #[test]
    fn test_field_predicate_custom() {
        let r = Record::new(vec![Value::text("amalgam")]);
        let p = FieldPredicate::custom(FieldId(0), |v| matches!(v, Value::Text(s) if s.len() > 3));
        assert!(p.matches_record(&r));
    }

    #[test]
    fn test_join_test_matches() {
        assert!(JoinTest::Relation(Relation::Eq).matches(&Value::integer(1), &Value::integer(1)));
        let custom = JoinTest::Custom(Arc::new(|a, b| a != b));
        assert!(custom.matches(&Value::integer(1), &Value::integer(2)));
        assert!(custom.relation().is_none());
    }
}
