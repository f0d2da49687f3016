//! # Columns Markup
//!
//! A markup is an ordered sequence of short label strings, one per
//! result-set column. Each label simultaneously names the column's target
//! property and encodes its nesting level:
//!
//! ```text
//! label  := [ prefix "$" ] name [ ":" ]
//! prefix := 1+ printable characters, no "$"
//! name   := property | subtype | record type | ""   ("" only for a
//!                                                    collection value cell)
//! ```
//!
//! The empty prefix is the top level; a strictly longer prefix is a
//! strictly deeper level. A trailing `:` marks a fetched reference: the
//! column holds the referred record's id and the following deeper-prefix
//! columns populate the referred record itself.
//!
//! ## Compilation
//!
//! [`compile`] walks the labels by recursive descent against the record
//! types catalog and produces one handler plan per column: the kind of
//! state machine bound to the column, the handler that owns its write
//! target, its extractor, and the column to resume at when its subtree is
//! absent. Collection columns are linked into the anchor chain as they are
//! encountered; a level admits no further columns after its collection,
//! and an anchor admits exactly one child anchor.

mod compiler;
mod label;

pub use label::Label;

pub(crate) use compiler::compile;
