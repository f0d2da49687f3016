//! # Column Labels
//!
//! Splits a raw label string into its `(prefix, name, fetched)` parts.
//! Labels are parsed up front so the compiler works on structured input.

use crate::error::{Error, Result};

/// A parsed column label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Nesting level marker; empty at the top level, strictly longer for
    /// strictly deeper levels.
    pub prefix: String,
    /// Target property, subtype or record type name. Empty only for the
    /// value cell of a scalar-valued or fetched-reference collection.
    pub name: String,
    /// Trailing `:`, marking a column that holds a fetched reference id.
    pub fetched: bool,
}

impl Label {
    /// Parses one raw label. `col` is used for error coordinates only.
    pub fn parse(raw: &str, col: usize) -> Result<Label> {
        let (body, fetched) = match raw.strip_suffix(':') {
            Some(body) => (body, true),
            None => (raw, false),
        };
        let (prefix, name) = match body.split_once('$') {
            Some((prefix, name)) => {
                if prefix.is_empty() {
                    return Err(Error::markup(col, format!("empty prefix in label '{}'", raw)));
                }
                (prefix, name)
            }
            None => ("", body),
        };
        if name.contains('$') {
            return Err(Error::markup(
                col,
                format!("more than one '$' in label '{}'", raw),
            ));
        }
        if name.contains(':') {
            return Err(Error::markup(
                col,
                format!("misplaced ':' in label '{}'", raw),
            ));
        }
        Ok(Label {
            prefix: prefix.to_string(),
            name: name.to_string(),
            fetched,
        })
    }
}
