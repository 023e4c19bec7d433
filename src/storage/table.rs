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

//! Tables: named, schema-checked record collections
//!
//! A [`Table`] owns its rows and any persistent indexes declared on its
//! columns. Rows and indexes are `Arc`-shared with live scans: a scan takes
//! a snapshot, and inserting into the table after a scan was created never
//! perturbs that scan (copy-on-write via `Arc::make_mut`).

use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::core::{Error, FieldId, Record, Result, Schema, TableId, Tuple, Value};
use crate::executor::stream::TableScan;
use crate::storage::index::Index;

/// A named in-memory record collection.
pub struct Table {
    id: TableId,
    schema: Schema,
    rows: Arc<Vec<Arc<Record>>>,
    indexes: FxHashMap<FieldId, Arc<Index>>,
}

impl Table {
    pub fn new(id: TableId, columns: &[&str]) -> Self {
        Table {
            id,
            schema: Schema::new(columns.iter().copied()),
            rows: Arc::new(Vec::new()),
            indexes: FxHashMap::default(),
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve a column name to its field id
    pub fn field(&self, column: &str) -> Result<FieldId> {
        self.schema
            .field(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))
    }

    /// Register one record. Every persistent index is updated in the same
    /// call, so indexes always partition the current row set.
    pub fn insert(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.schema.column_count() {
            return Err(Error::arity_mismatch(
                self.id.name(),
                self.schema.column_count(),
                values.len(),
            ));
        }
        let record = Arc::new(Record::new(values));
        for (field, index) in self.indexes.iter_mut() {
            let key = record.get(*field).cloned().unwrap_or(Value::Null);
            Arc::make_mut(index).insert(key, Tuple::singleton(self.id, Arc::clone(&record)));
        }
        Arc::make_mut(&mut self.rows).push(record);
        Ok(())
    }

    /// Declare a persistent hash index on `column`, built over the current
    /// rows and maintained on every subsequent insert.
    pub fn create_index(&mut self, column: &str) -> Result<()> {
        self.build_index(column, false)
    }

    /// Declare a persistent ordered index on `column` (serves the range
    /// relations in addition to equality).
    pub fn create_ordered_index(&mut self, column: &str) -> Result<()> {
        self.build_index(column, true)
    }

    fn build_index(&mut self, column: &str, ordered: bool) -> Result<()> {
        let field = self.field(column)?;
        if self.indexes.contains_key(&field) {
            return Err(Error::DuplicateIndex(column.to_string()));
        }
        let mut index = if ordered { Index::ordered() } else { Index::hash() };
        for record in self.rows.iter() {
            let key = record.get(field).cloned().unwrap_or(Value::Null);
            index.insert(key, Tuple::singleton(self.id, Arc::clone(record)));
        }
        debug!(
            "table '{}': built {} index on '{}' ({} rows, {} keys)",
            self.id,
            if ordered { "ordered" } else { "hash" },
            column,
            index.len(),
            index.bucket_count()
        );
        self.indexes.insert(field, Arc::new(index));
        Ok(())
    }

    /// The persistent index on `field`, if one was declared
    pub fn index_on(&self, field: FieldId) -> Option<&Arc<Index>> {
        self.indexes.get(&field)
    }

    /// Snapshot of the current rows, shared with scans
    pub fn snapshot(&self) -> Arc<Vec<Arc<Record>>> {
        Arc::clone(&self.rows)
    }

    /// A stream over this table keyed on `column` for a pending join
    pub fn join_on(&self, column: &str) -> Result<TableScan> {
        Ok(TableScan::over_field(self, self.field(column)?))
    }

    /// A stream over this table keyed on its first column
    pub fn scan(&self) -> TableScan {
        TableScan::over_field(self, FieldId(0))
    }
}
