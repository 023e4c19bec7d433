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

//! Tuples: the unit flowing through all streams
//!
//! A [`Tuple`] maps each participating table to the record instance it
//! contributed. Single-table scans yield singleton tuples; joins merge the
//! tuples of their two inputs, so a tuple may span several original tables.
//!
//! Invariant: no table identifier appears twice within one tuple. Join
//! selection guarantees that merging never has to reconcile two different
//! instances for the same table; a violation is an engine bug, checked in
//! debug builds.

use std::fmt;
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use crate::core::record::{FieldRef, Record};
use crate::core::value::Value;

/// Identifies one logical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub &'static str);

impl TableId {
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A merged record spanning one or more source tables, keyed by table
/// identifier. Immutable after construction.
///
/// Entries are kept sorted by table id, so equality and lookup are
/// canonical regardless of merge order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    entries: SmallVec<[(TableId, Arc<Record>); 2]>,
}

impl Tuple {
    /// A tuple holding a single table's record
    pub fn singleton(table: TableId, record: Arc<Record>) -> Self {
        Tuple {
            entries: smallvec![(table, record)],
        }
    }

    /// The record contributed by `table`, if present
    pub fn get(&self, table: TableId) -> Option<&Arc<Record>> {
        self.entries
            .binary_search_by(|(t, _)| t.cmp(&table))
            .ok()
            .map(|i| &self.entries[i].1)
    }

    pub fn contains(&self, table: TableId) -> bool {
        self.get(table).is_some()
    }

    /// Extract a field value through a (table, field) reference
    pub fn field(&self, field: FieldRef) -> Option<&Value> {
        self.get(field.table).and_then(|r| r.get(field.field))
    }

    /// Tables this tuple spans, in id order
    pub fn tables(&self) -> impl Iterator<Item = TableId> + '_ {
        self.entries.iter().map(|(t, _)| *t)
    }

    /// Number of tables this tuple spans
    pub fn width(&self) -> usize {
        self.entries.len()
    }

    /// Merge two tuples into one spanning the union of their tables.
    ///
    /// Both inputs may already span several tables. A table present on both
    /// sides must carry the same instance.
    pub fn merge(a: &Tuple, b: &Tuple) -> Tuple {
        let mut entries = a.entries.clone();
        for (table, record) in &b.entries {
            match entries.binary_search_by(|(t, _)| t.cmp(table)) {
                Ok(i) => {
                    debug_assert!(
                        Arc::ptr_eq(&entries[i].1, record) || entries[i].1 == *record,
                        "conflicting instances for table '{}' in tuple merge",
                        table
                    );
                }
                Err(i) => entries.insert(i, (*table, Arc::clone(record))),
            }
        }
        Tuple { entries }
    }
}
