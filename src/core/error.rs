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

//! Error types for Amalgam
//!
//! Join construction is fail-fast: selection and execution never retry, and
//! a failure aborts the whole join with no partial results.

use thiserror::Error;

use crate::core::tuple::TableId;

/// Result type alias for Amalgam operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for engine operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Invalid arguments
    // =========================================================================
    /// Empty predicate list passed to `join` or `query`
    #[error("must supply at least one predicate")]
    EmptyPredicates,

    /// Malformed input, e.g. a join field whose table is absent from its
    /// stream, or an extractor that cannot reach its field during an index
    /// build
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // =========================================================================
    // Unsupported operations
    // =========================================================================
    /// Self-join attempted: both sides of a predicate are keyed on the same
    /// table
    #[error("self joins are not supported: both sides are keyed on table '{0}'")]
    SelfJoin(String),

    /// Operation not supported
    #[error("not supported: {0}")]
    NotSupported(String),

    // =========================================================================
    // Planning errors
    // =========================================================================
    /// A multi-predicate join set has no ordering in which every predicate
    /// connects to the accumulated result
    #[error("join predicates do not unify")]
    PredicatesDoNotUnify,

    // =========================================================================
    // Table errors
    // =========================================================================
    /// Column not found in table schema
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Record width does not match the table schema
    #[error("record has {got} values, table '{table}' expects {expected}")]
    ArityMismatch {
        table: String,
        expected: usize,
        got: usize,
    },

    /// Index already exists on the column
    #[error("index on column '{0}' already exists")]
    DuplicateIndex(String),
}

impl Error {
    /// Create a new InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Create a new NotSupported error
    pub fn not_supported(message: impl Into<String>) -> Self {
        Error::NotSupported(message.into())
    }

    /// Create a new SelfJoin error
    pub fn self_join(table: TableId) -> Self {
        Error::SelfJoin(table.name().to_string())
    }

    /// Create a new ArityMismatch error
    pub fn arity_mismatch(table: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::ArityMismatch {
            table: table.into(),
            expected,
            got,
        }
    }

    /// Check if this is an invalid-argument class error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::EmptyPredicates | Error::InvalidArgument(_) | Error::ArityMismatch { .. }
        )
    }

    /// Check if this is an unsupported-operation class error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::SelfJoin(_) | Error::NotSupported(_))
    }
}
