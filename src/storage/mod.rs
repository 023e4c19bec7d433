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

//! Storage layer: tables and indexes
//!
//! - [`Table`] - named, schema-checked record collections with persistent
//!   indexes and snapshot scans
//! - [`Index`] - key-to-bucket mappings, hash- or B-tree-backed

pub mod index;
pub mod table;

pub use index::Index;
pub use table::Table;
