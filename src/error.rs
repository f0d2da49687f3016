//! # Error Types
//!
//! Every failure the parser can produce falls into one of three classes:
//!
//! | Class | Raised during | Examples |
//! |-------|---------------|----------|
//! | Markup | `init` | first column not the id; prefix not longer than parent; more than one collection axis; unknown property |
//! | Usage | API misuse | double init; empty markup; row width mismatch; incompatible parsers for merge |
//! | Data | `feed_row` | NULL top id; repeated NULL anchor; stuck anchor; more than one value for a polymorphic slot |
//!
//! Markup and usage errors leave the parser untouched. A data error aborts
//! the current `feed_row` call and leaves the accumulated records in an
//! undefined state; callers must `reset()` or discard the parser before
//! reading `records` again.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The three error classes of the parser API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Invalid columns markup, detected while compiling it against the schema.
    #[error("markup error at column {col}: {msg}")]
    Markup { col: usize, msg: String },

    /// The API was used outside its contract.
    #[error("usage error: {msg}")]
    Usage { msg: String },

    /// The row stream contradicts the markup or the schema.
    #[error("data error at row {row}, column {col}: {msg}")]
    Data { row: u64, col: usize, msg: String },
}

impl Error {
    pub(crate) fn markup(col: usize, msg: impl Into<String>) -> Self {
        Error::Markup {
            col,
            msg: msg.into(),
        }
    }

    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Error::Usage { msg: msg.into() }
    }

    pub(crate) fn data(row: u64, col: usize, msg: impl Into<String>) -> Self {
        Error::Data {
            row,
            col,
            msg: msg.into(),
        }
    }

    /// Returns true for markup errors.
    pub fn is_markup(&self) -> bool {
        matches!(self, Error::Markup { .. })
    }

    /// Returns true for usage errors.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage { .. })
    }

    /// Returns true for data errors.
    pub fn is_data(&self) -> bool {
        matches!(self, Error::Data { .. })
    }

    /// Row/column coordinates of a data error.
    pub fn coordinates(&self) -> Option<(u64, usize)> {
        match self {
            Error::Data { row, col, .. } => Some((*row, *col)),
            _ => None,
        }
    }
}
