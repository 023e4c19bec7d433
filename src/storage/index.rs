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

//! Indexes: key-to-bucket mappings over tuples
//!
//! An [`Index`] maps each extracted key to the bucket of tuples sharing
//! that key. Two backings exist:
//!
//! - **Hash** (`FxHashMap`) - O(1) equality probes, used for EQ/NE
//! - **Ordered** (`BTreeMap`) - range probes, used for LT/LE/GT/GE
//!
//! Partition invariant: the buckets partition their source — every source
//! element appears exactly once, under exactly the key its extractor
//! returns. Construction sites uphold this by inserting each element once
//! with its extracted key; [`Index::len`] therefore always equals the
//! source size.
//!
//! Indexes built by the engine (hash-join build phase, closure edge pass)
//! are transient and scoped to one query. Indexes owned by a table are
//! persistent, maintained on insert, and consumed read-only here.

use std::collections::BTreeMap;
use std::ops::Bound;

use rustc_hash::FxHashMap;

use crate::core::{Relation, Tuple, Value};

type Bucket = Vec<Tuple>;

#[derive(Debug, Clone)]
enum IndexData {
    Hash(FxHashMap<Value, Bucket>),
    Ordered(BTreeMap<Value, Bucket>),
}

/// A mapping from extracted key to the set of tuples sharing that key.
#[derive(Debug, Clone)]
pub struct Index {
    data: IndexData,
    entries: usize,
}

impl Index {
    /// Create an empty hash-backed index
    pub fn hash() -> Self {
        Index {
            data: IndexData::Hash(FxHashMap::default()),
            entries: 0,
        }
    }

    /// Create an empty ordered (B-tree-backed) index
    pub fn ordered() -> Self {
        Index {
            data: IndexData::Ordered(BTreeMap::new()),
            entries: 0,
        }
    }

    /// Create the backing suited to probing under `relation`: hash for
    /// EQ/NE, ordered for the range relations
    pub fn for_relation(relation: Relation) -> Self {
        match relation {
            Relation::Eq | Relation::Ne => Index::hash(),
            _ => Index::ordered(),
        }
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self.data, IndexData::Ordered(_))
    }

    /// Insert one tuple under its extracted key
    pub fn insert(&mut self, key: Value, tuple: Tuple) {
        match &mut self.data {
            IndexData::Hash(map) => map.entry(key).or_default().push(tuple),
            IndexData::Ordered(map) => map.entry(key).or_default().push(tuple),
        }
        self.entries += 1;
    }

    /// The bucket for an exact key
    pub fn get(&self, key: &Value) -> Option<&[Tuple]> {
        match &self.data {
            IndexData::Hash(map) => map.get(key).map(Vec::as_slice),
            IndexData::Ordered(map) => map.get(key).map(Vec::as_slice),
        }
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    /// All distinct keys. The order is deterministic for a given index
    /// instance, so replaying an iteration over the same index observes the
    /// same sequence.
    pub fn keys(&self) -> Vec<Value> {
        match &self.data {
            IndexData::Hash(map) => map.keys().cloned().collect(),
            IndexData::Ordered(map) => map.keys().cloned().collect(),
        }
    }

    /// Total number of indexed tuples (the source size, by the partition
    /// invariant)
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of distinct keys
    pub fn bucket_count(&self) -> usize {
        match &self.data {
            IndexData::Hash(map) => map.len(),
            IndexData::Ordered(map) => map.len(),
        }
    }

    /// All tuples whose indexed key `k` satisfies `k relation key`.
    ///
    /// EQ is a single bucket lookup; the range relations use B-tree range
    /// scans when the index is ordered and fall back to testing every key
    /// otherwise.
    pub fn probe(&self, relation: Relation, key: &Value) -> Vec<Tuple> {
        match (&self.data, relation) {
            (_, Relation::Eq) => self.get(key).map(<[Tuple]>::to_vec).unwrap_or_default(),
            (IndexData::Hash(map), Relation::Ne) => map
                .iter()
                .filter(|(k, _)| *k != key)
                .flat_map(|(_, b)| b.iter().cloned())
                .collect(),
            (IndexData::Ordered(map), Relation::Ne) => map
                .iter()
                .filter(|(k, _)| *k != key)
                .flat_map(|(_, b)| b.iter().cloned())
                .collect(),
            (IndexData::Ordered(map), rel) => {
                let bounds: (Bound<&Value>, Bound<&Value>) = match rel {
                    Relation::Lt => (Bound::Unbounded, Bound::Excluded(key)),
                    Relation::Le => (Bound::Unbounded, Bound::Included(key)),
                    Relation::Gt => (Bound::Excluded(key), Bound::Unbounded),
                    Relation::Ge => (Bound::Included(key), Bound::Unbounded),
                    // Eq and Ne are handled above
                    Relation::Eq | Relation::Ne => unreachable!(),
                };
                map.range::<Value, _>(bounds)
                    .flat_map(|(_, b)| b.iter().cloned())
                    .collect()
            }
            (IndexData::Hash(map), rel) => map
                .iter()
                .filter(|(k, _)| rel.test(k.compare(key)))
                .flat_map(|(_, b)| b.iter().cloned())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Record, TableId};
    use std::sync::Arc;

    fn tuple(key: i64) -> Tuple {
        Tuple::singleton(
            TableId("t"),
            Arc::new(Record::new(vec![Value::integer(key)])),
        )
    }

    fn filled(ordered: bool) -> Index {
        let mut ix = if ordered { Index::ordered() } else { Index::hash() };
        for key in [1, 2, 2, 3, 5] {
            ix.insert(Value::integer(key), tuple(key));
        }
        ix
    }

    #[test]
    fn test_partition_invariant() {
        for ordered in [false, true] {
            let ix = filled(ordered);
            assert_eq!(ix.len(), 5);
            assert_eq!(ix.bucket_count(), 4);
            let total: usize = ix
                .keys()
                .iter()
                .map(|k| ix.get(k).map_or(0, <[Tuple]>::len))
                .sum();
            assert_eq!(total, ix.len());
        }
    }

    #[test]
    fn test_eq_probe() {
        let ix = filled(false);
        assert_eq!(ix.probe(Relation::Eq, &Value::integer(2)).len(), 2);
        assert!(ix.probe(Relation::Eq, &Value::integer(4)).is_empty());
    }

    #[test]
    fn test_ne_probe() {
        for ordered in [false, true] {
            let ix = filled(ordered);
            assert_eq!(ix.probe(Relation::Ne, &Value::integer(2)).len(), 3);
        }
    }

    #[test]
    fn test_range_probes() {
        let ix = filled(true);
        assert_eq!(ix.probe(Relation::Lt, &Value::integer(3)).len(), 3);
        assert_eq!(ix.probe(Relation::Le, &Value::integer(3)).len(), 4);
        assert_eq!(ix.probe(Relation::Gt, &Value::integer(2)).len(), 2);
        assert_eq!(ix.probe(Relation::Ge, &Value::integer(2)).len(), 4);
    }

    #[test]
    fn test_hash_backed_range_fallback() {
        let ix = filled(false);
        assert_eq!(ix.probe(Relation::Lt, &Value::integer(3)).len(), 3);
        assert_eq!(ix.probe(Relation::Ge, &Value::integer(5)).len(), 1);
    }

    #[test]
    fn test_keys_are_stable_per_instance() {
        let ix = filled(false);
        assert_eq!(ix.keys(), ix.keys());
    }
}
