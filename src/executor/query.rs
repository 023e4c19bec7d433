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

//! Single-table queries
//!
//! [`query`] seeds iteration from the smallest applicable equality-index
//! bucket when one exists — an O(bucket) retrieval instead of a full scan —
//! and applies every other predicate as a residual linear filter.

use log::debug;

use crate::core::{Error, FieldRef, Result};
use crate::executor::predicate::FieldPredicate;
use crate::executor::stream::{FilterStream, MaterializedStream, TableScan, TupleStream, TypeSet};
use crate::storage::table::Table;

/// Query one table with a set of per-field predicates.
///
/// The returned stream is keyed on the first predicate's field, so its
/// results can feed a join directly.
pub fn query(table: &Table, predicates: Vec<FieldPredicate>) -> Result<Box<dyn TupleStream>> {
    if predicates.is_empty() {
        return Err(Error::EmptyPredicates);
    }

    // Smallest equality bucket among persistently indexed fields; ties keep
    // the earliest predicate.
    let mut seed: Option<(usize, usize)> = None;
    for (i, pred) in predicates.iter().enumerate() {
        let Some(value) = pred.equality_value() else {
            continue;
        };
        let Some(index) = table.index_on(pred.field) else {
            continue;
        };
        let size = index.get(value).map_or(0, |b| b.len());
        if seed.map_or(true, |(_, smallest)| size < smallest) {
            seed = Some((i, size));
        }
    }

    let join_field = FieldRef::new(table.id(), predicates[0].field);
    let types = TypeSet::from_iter([table.id()]);

    match seed {
        Some((i, size)) => {
            debug!(
                "query: seeding '{}' from index bucket ({} rows of {})",
                table.id(),
                size,
                table.len()
            );
            let pred = &predicates[i];
            let bucket = table
                .index_on(pred.field)
                .zip(pred.equality_value())
                .and_then(|(index, value)| index.get(value))
                .map(|b| b.to_vec())
                .unwrap_or_default();
            let seeded = MaterializedStream::new(join_field, types, bucket);

            let residual: Vec<FieldPredicate> = predicates
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, p)| p.clone())
                .collect();
            if residual.is_empty() {
                Ok(Box::new(seeded))
            } else {
                Ok(Box::new(FilterStream::new(
                    Box::new(seeded),
                    table.id(),
                    residual,
                )))
            }
        }
        None => {
            debug!("query: full scan of '{}' ({} rows)", table.id(), table.len());
            let scan = TableScan::over_field(table, predicates[0].field);
            Ok(Box::new(FilterStream::new(
                Box::new(scan),
                table.id(),
                predicates,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Relation, TableId, Value};

    fn cities() -> Table {
        let mut t = Table::new(TableId("cities"), &["name", "country", "pop"]);
        for (name, country, pop) in [
            ("oslo", "no", 700),
            ("bergen", "no", 280),
            ("lima", "pe", 9700),
            ("cusco", "pe", 430),
            ("arequipa", "pe", 1000),
        ] {
            t.insert(vec![
                Value::text(name),
                Value::text(country),
                Value::integer(pop),
            ])
            .unwrap();
        }
        t
    }

    #[test]
    fn test_unindexed_full_scan() {
        let t = cities();
        let country = t.field("country").unwrap();
        let mut result = query(&t, vec![FieldPredicate::eq(country, Value::text("pe"))]).unwrap();
        assert_eq!(result.collect_all().len(), 3);
    }

    #[test]
    fn test_indexed_seeding_with_residual() {
        let mut t = cities();
        t.create_index("country").unwrap();
        let country = t.field("country").unwrap();
        let pop = t.field("pop").unwrap();
        let mut result = query(
            &t,
            vec![
                FieldPredicate::with_relation(pop, Relation::Gt, Value::integer(500)),
                FieldPredicate::eq(country, Value::text("pe")),
            ],
        )
        .unwrap();
        // seeded from the country bucket (3 rows), filtered by pop
        assert_eq!(result.collect_all().len(), 2);
    }

    #[test]
    fn test_smallest_bucket_wins() {
        let mut t = cities();
        t.create_index("country").unwrap();
        t.create_index("name").unwrap();
        let country = t.field("country").unwrap();
        let name = t.field("name").unwrap();
        // the name bucket (1 row) is smaller than the country bucket (2)
        let mut result = query(
            &t,
            vec![
                FieldPredicate::eq(country, Value::text("no")),
                FieldPredicate::eq(name, Value::text("oslo")),
            ],
        )
        .unwrap();
        let tuples = result.collect_all();
        assert_eq!(tuples.len(), 1);
    }

    #[test]
    fn test_missing_key_yields_empty() {
        let mut t = cities();
        t.create_index("country").unwrap();
        let country = t.field("country").unwrap();
        let mut result = query(&t, vec![FieldPredicate::eq(country, Value::text("xx"))]).unwrap();
        assert!(result.collect_all().is_empty());
    }

    #[test]
    fn test_empty_predicates_rejected() {
        let t = cities();
        assert_eq!(query(&t, Vec::new()).unwrap_err(), Error::EmptyPredicates);
    }
}
