//! # rsparser - Result Set to Record Tree Parser
//!
//! rsparser transforms a two-dimensional relational result set (a finite,
//! ordered stream of rows) into a forest of hierarchical records: trees
//! of scalars, nested objects, typed references and homogeneous
//! collections. Structure is driven by two inputs: a record types catalog
//! describing the target schema, and a columns markup whose label strings
//! simultaneously name every column's target property and encode nesting
//! boundaries and collection axes.
//!
//! ## Quick Start
//!
//! ```ignore
//! use rsparser::{Parser, SourceValue};
//! use rsparser::schema::{PropertyDef, RecordTypeCatalog, RecordTypeDef};
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(
//!     RecordTypeCatalog::builder()
//!         .record_type(RecordTypeDef::new(
//!             "Person",
//!             vec![
//!                 PropertyDef::number("id").id(),
//!                 PropertyDef::string("firstName"),
//!                 PropertyDef::string("lastName"),
//!             ],
//!         ))
//!         .build()?,
//! );
//!
//! let mut parser = Parser::new(catalog, "Person")?;
//! parser.init(&["id", "firstName", "lastName"])?;
//! parser.feed_row(&[
//!     SourceValue::from(1),
//!     SourceValue::from("John"),
//!     SourceValue::from("Doe"),
//! ])?;
//!
//! let people = parser.records();
//! ```
//!
//! ## Architecture
//!
//! The parser is a markup compiler plus a row-walk state machine:
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │        Public API (Parser)           │
//! ├──────────────────────────────────────┤
//! │   Markup Compiler (labels → plan)    │
//! ├───────────────────┬──────────────────┤
//! │  Handler Plans    │  Handler States  │
//! ├───────────────────┴──────────────────┤
//! │     Row Walk (cursor over columns)   │
//! ├──────────────────────────────────────┤
//! │  Records / Referred Records / Spans  │
//! └──────────────────────────────────────┘
//! ```
//!
//! `init` compiles the markup against the catalog into one handler per
//! column. The dispatch decisions (property kinds, extractors, skip
//! targets, the anchor chain) are all made once, so the per-row walk is
//! branch-light. Feeding rows advances a cursor through the handlers;
//! anchors detect value changes to delimit collection elements, reset
//! downstream state, and transfer the cursor when their value repeats.
//! Fetched referred records are deduplicated in a side table, and the
//! rows of an already-materialized referent are skipped wholesale.
//!
//! ## Module Overview
//!
//! - [`types`]: raw source cells and the output value tree
//! - [`extract`]: typed cell extractors and their process-wide registry
//! - [`schema`]: record types catalog with load-time validation
//! - [`markup`]: column label grammar and the markup compiler
//! - [`parser`]: the row walk, accumulators, skipping and merge
//! - [`error`]: the three error classes (markup, usage, data)
//!
//! ## Concurrency
//!
//! A parser instance is strictly single-threaded and synchronous;
//! `feed_row` performs no I/O and never blocks. Independent parser
//! instances may run on different threads, and parsers that walked
//! different collection axes of the same query can be combined with
//! [`Parser::merge`].

mod handlers;

pub mod error;
pub mod extract;
pub mod markup;
pub mod parser;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
pub use extract::register;
pub use parser::{Parser, RowSource};
pub use types::{Record, SourceValue, Value};
