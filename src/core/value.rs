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

//! Runtime values and comparison relations
//!
//! [`Value`] is the dynamic field/key type flowing through extractors,
//! indexes, and closure-graph nodes. It needs to serve as a hash-map and
//! B-tree key, so equality, hashing, and ordering are all total and
//! mutually consistent:
//!
//! - Equality is variant-strict (`Integer(1) != Float(1.0)`), except that
//!   `Null == Null` — indexes may bucket records under a missing value, and
//!   such records join with each other.
//! - Floats compare and hash by bit pattern, so `NaN == NaN` and
//!   `0.0 != -0.0`. Ordering uses `f64::total_cmp`, which agrees with the
//!   bit-pattern equality.
//! - Cross-variant ordering is by type rank (Null < Boolean < Integer <
//!   Float < Text).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A dynamically typed value: one field of a record, one join key, or one
/// closure-graph node identity.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Create an integer value
    pub fn integer(v: i64) -> Self {
        Value::Integer(v)
    }

    /// Create a float value
    pub fn float(v: f64) -> Self {
        Value::Float(v)
    }

    /// Create a text value
    pub fn text(v: impl Into<String>) -> Self {
        Value::Text(v.into())
    }

    /// Create a boolean value
    pub fn boolean(v: bool) -> Self {
        Value::Boolean(v)
    }

    /// Create a null value
    pub fn null() -> Self {
        Value::Null
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Rank used for cross-variant ordering
    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Float(_) => 3,
            Value::Text(_) => 4,
        }
    }

    /// Total-order comparison across all values.
    ///
    /// Same variants compare naturally; different variants compare by type
    /// rank. `compare(a, b) == Ordering::Equal` iff `a == b`.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Type discriminant first, then the payload; floats hash by bits to
        // stay consistent with PartialEq.
        match self {
            Value::Null => 0_u8.hash(state),
            Value::Boolean(b) => {
                1_u8.hash(state);
                b.hash(state);
            }
            Value::Integer(i) => {
                2_u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                3_u8.hash(state);
                f.to_bits().hash(state);
            }
            Value::Text(s) => {
                4_u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

// ============================================================================
// Relations
// ============================================================================

/// Comparison relation between two join keys: `a.field REL b.field`.
///
/// EQ and NE are served by hash indexes; the ordering relations are served
/// by ordered (B-tree) indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Relation {
    /// Test an ordering outcome against this relation
    pub fn test(&self, ord: Ordering) -> bool {
        match self {
            Relation::Eq => ord == Ordering::Equal,
            Relation::Ne => ord != Ordering::Equal,
            Relation::Lt => ord == Ordering::Less,
            Relation::Le => ord != Ordering::Greater,
            Relation::Gt => ord == Ordering::Greater,
            Relation::Ge => ord != Ordering::Less,
        }
    }

    /// The relation with its sides swapped: `a REL b` iff `b REL.flip() a`
    pub fn flip(&self) -> Relation {
        match self {
            Relation::Eq => Relation::Eq,
            Relation::Ne => Relation::Ne,
            Relation::Lt => Relation::Gt,
            Relation::Le => Relation::Ge,
            Relation::Gt => Relation::Lt,
            Relation::Ge => Relation::Le,
        }
    }

    /// Test two values against this relation
    pub fn matches(&self, a: &Value, b: &Value) -> bool {
        self.test(a.compare(b))
    }
}
