//! # Result Set Parser
//!
//! The parser turns a flat stream of result-set rows into a forest of
//! hierarchical records. Structure comes from two inputs fixed at `init`:
//! the record types catalog and the columns markup. Compilation binds one
//! handler to every column; feeding rows advances a cursor through those
//! handlers, coalescing multi-row collection expansions into single record
//! subtrees and deduplicating fetched referred records.
//!
//! ## Lifecycle
//!
//! ```rust,ignore
//! let mut parser = Parser::new(catalog, "Person")?;
//! parser.init(&["id", "firstName", "lastName"])?;
//! for row in rows {
//!     parser.feed_row(&row)?;
//! }
//! let records = parser.records();
//! let referred = parser.referred_records();
//! ```
//!
//! `feed_row` is strictly synchronous and performs no I/O; a parser
//! instance is single-threaded, while independent instances may run in
//! parallel.
//!
//! ## Ordering Guarantees
//!
//! `records` preserves the first-sight order of top record ids in the row
//! stream; collection elements appear in the row order their anchors were
//! observed; `referred_records` iterates in first-sight order.
//!
//! ## Error Recovery
//!
//! A data error aborts the current `feed_row` call and leaves the handler
//! states inconsistent; the accumulated records must not be read until
//! `reset()` is called (or the parser is discarded).

mod merge;
mod walk;

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use crate::handlers::{HandlerPlan, HandlerState};
use crate::markup::{self, Label};
use crate::schema::RecordTypeCatalog;
use crate::types::{Record, SourceValue};
use hashbrown::HashMap;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// One row of the result set: positional, or keyed by markup label.
///
/// A missing cell (short positional rows are rejected, but an absent map
/// entry is fine) reads as NULL.
pub trait RowSource {
    /// Positional width of the row, `None` for label-keyed rows.
    fn width(&self) -> Option<usize>;

    /// The cell at a column position / markup label.
    fn cell(&self, col: usize, label: &str) -> Option<&SourceValue>;
}

impl RowSource for [SourceValue] {
    fn width(&self) -> Option<usize> {
        Some(self.len())
    }

    fn cell(&self, col: usize, _label: &str) -> Option<&SourceValue> {
        self.get(col)
    }
}

impl RowSource for Vec<SourceValue> {
    fn width(&self) -> Option<usize> {
        Some(self.len())
    }

    fn cell(&self, col: usize, _label: &str) -> Option<&SourceValue> {
        self.get(col)
    }
}

impl<const N: usize> RowSource for [SourceValue; N] {
    fn width(&self) -> Option<usize> {
        Some(N)
    }

    fn cell(&self, col: usize, _label: &str) -> Option<&SourceValue> {
        self.get(col)
    }
}

impl RowSource for std::collections::HashMap<String, SourceValue> {
    fn width(&self) -> Option<usize> {
        None
    }

    fn cell(&self, _col: usize, label: &str) -> Option<&SourceValue> {
        self.get(label)
    }
}

impl RowSource for HashMap<String, SourceValue> {
    fn width(&self) -> Option<usize> {
        None
    }

    fn cell(&self, _col: usize, label: &str) -> Option<&SourceValue> {
        self.get(label)
    }
}

/// Rows consumed reading a fetched referred record the first time, keyed
/// by (reference value, column index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Span {
    /// First sighting in progress; holds the starting row number.
    Open { start: u64 },
    /// First sighting finished; holds the row delta to skip on re-sighting.
    Closed { rows: u64 },
    /// The fetched reference has no downstream columns; nothing to skip.
    NoSkip,
}

/// Result set parser; see the module documentation.
#[derive(Debug)]
pub struct Parser {
    catalog: Arc<RecordTypeCatalog>,
    top_type: String,
    labels: Vec<String>,
    plan: Arc<Vec<HandlerPlan>>,
    state: Vec<HandlerState>,
    records: Vec<Record>,
    referred: IndexMap<String, Record>,
    rows_processed: u64,
    skip_next_n_rows: u64,
    spans: HashMap<(String, usize), Span>,
    initialized: bool,
}

impl Parser {
    /// Creates a parser for the given top record type.
    pub fn new(catalog: Arc<RecordTypeCatalog>, top_record_type: &str) -> Result<Parser> {
        catalog.record_type(top_record_type)?;
        Ok(Parser {
            catalog,
            top_type: top_record_type.to_string(),
            labels: Vec::new(),
            plan: Arc::new(Vec::new()),
            state: Vec::new(),
            records: Vec::new(),
            referred: IndexMap::new(),
            rows_processed: 0,
            skip_next_n_rows: 0,
            spans: HashMap::new(),
            initialized: false,
        })
    }

    /// Compiles the columns markup. Must be called exactly once, before
    /// the first row is fed.
    pub fn init<S: AsRef<str>>(&mut self, markup: &[S]) -> Result<()> {
        if self.initialized {
            return Err(Error::usage("parser is already initialized"));
        }
        if markup.is_empty() {
            return Err(Error::usage("markup must have at least one column"));
        }
        let labels: Vec<Label> = markup
            .iter()
            .enumerate()
            .map(|(col, raw)| Label::parse(raw.as_ref(), col))
            .collect::<Result<_>>()?;
        let top = self.catalog.record_type(&self.top_type)?;
        let plan = markup::compile(&self.catalog, &labels, top)?;
        debug!(
            columns = plan.len(),
            top_type = %self.top_type,
            "markup compiled"
        );
        self.state = vec![HandlerState::default(); plan.len()];
        self.labels = markup.iter().map(|s| s.as_ref().to_string()).collect();
        self.plan = Arc::new(plan);
        self.initialized = true;
        Ok(())
    }

    /// Feeds one row. Positional rows must match the markup width exactly.
    pub fn feed_row<R: RowSource + ?Sized>(&mut self, row: &R) -> Result<()> {
        if !self.initialized {
            return Err(Error::usage("feed_row called before init"));
        }
        let row_num = self.rows_processed;
        self.rows_processed += 1;
        if self.skip_next_n_rows > 0 {
            self.skip_next_n_rows -= 1;
            trace!(
                row = row_num,
                remaining = self.skip_next_n_rows,
                "skipping row of an already materialized referred record"
            );
            return Ok(());
        }
        let plan = Arc::clone(&self.plan);
        if let Some(width) = row.width() {
            if width != plan.len() {
                return Err(Error::usage(format!(
                    "row width {} does not match markup length {}",
                    width,
                    plan.len()
                )));
            }
        }
        let mut col = 0;
        while col < plan.len() {
            col = self.step(plan.as_slice(), col, row, row_num)?;
        }
        Ok(())
    }

    /// Clears the accumulated records, counters and handler states. The
    /// compiled handler plan persists; the parser accepts rows again.
    pub fn reset(&mut self) {
        debug!(records = self.records.len(), "parser reset");
        self.records.clear();
        self.referred.clear();
        self.spans.clear();
        self.rows_processed = 0;
        self.skip_next_n_rows = 0;
        for state in &mut self.state {
            state.clear();
        }
    }

    /// The accumulated top records, in first-sight order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The fetched referred records, keyed by reference value, in
    /// first-sight order.
    pub fn referred_records(&self) -> &IndexMap<String, Record> {
        &self.referred
    }

    /// Number of rows fed so far, including skipped rows.
    pub fn rows_processed(&self) -> u64 {
        self.rows_processed
    }

    /// The top record type this parser builds.
    pub fn top_record_type(&self) -> &str {
        &self.top_type
    }
}
