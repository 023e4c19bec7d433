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

//! Core types for Amalgam
//!
//! The fundamental types used throughout the engine:
//!
//! - [`Value`] - Runtime field/key values
//! - [`Relation`] - Comparison relations between join keys
//! - [`Record`] - An immutable registered instance
//! - [`Schema`] / [`FieldId`] / [`FieldRef`] - Field resolution and extractors
//! - [`TableId`] / [`Tuple`] - Table identity and the merged-record unit
//! - [`Error`] - Error taxonomy for all engine operations

pub mod error;
pub mod record;
pub mod tuple;
pub mod value;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use record::{FieldId, FieldRef, Record, Schema};
pub use tuple::{TableId, Tuple};
pub use value::{Relation, Value};
