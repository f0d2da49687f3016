//! # Value Extractors
//!
//! Extractors convert raw result-set cells to typed output values. Each
//! extractor is a pure function `(raw, row, col) -> typed | null` keyed by
//! a type name; the markup compiler resolves names to function pointers
//! once at `init` time, so the row walk never touches the registry.
//!
//! ## Built-in Extractors
//!
//! | Name | NULL input | Non-NULL input |
//! |------|-----------|----------------|
//! | `string` | `None` | canonical string of the cell |
//! | `number` | `None` | numeric value of the cell |
//! | `boolean` | `None` | truthiness of the cell |
//! | `datetime` | `None` | ISO-8601 UTC string |
//! | `isNull` | `Some(true)` | `Some(false)` |
//!
//! Extractors never fail for well-formed driver input; a cell whose
//! storage class contradicts the declared column type is a data error
//! carrying the row/column coordinates.
//!
//! ## Custom Types
//!
//! [`register`] installs a process-wide extractor under a type name,
//! replacing a built-in of the same name. Registration is visible to
//! parsers whose `init` runs after the call; already-compiled parsers
//! keep the functions they resolved.

use crate::error::{Error, Result};
use crate::types::{format_number, SourceValue, Value};
use parking_lot::RwLock;

/// A pure cell-to-value conversion. `None` means the cell was NULL.
pub type ExtractorFn = fn(&SourceValue, u64, usize) -> Result<Option<Value>>;

static CUSTOM: RwLock<Vec<(String, ExtractorFn)>> = RwLock::new(Vec::new());

/// Registers a process-wide extractor under `type_name`, replacing any
/// previous registration (or built-in) of that name.
pub fn register(type_name: &str, extractor: ExtractorFn) {
    let mut custom = CUSTOM.write();
    if let Some(entry) = custom.iter_mut().find(|(n, _)| n == type_name) {
        entry.1 = extractor;
    } else {
        custom.push((type_name.to_string(), extractor));
    }
}

/// Resolves a type name to its extractor. Custom registrations shadow the
/// built-ins.
pub(crate) fn lookup(type_name: &str) -> Option<ExtractorFn> {
    if let Some((_, f)) = CUSTOM.read().iter().find(|(n, _)| n == type_name) {
        return Some(*f);
    }
    builtin(type_name)
}

fn builtin(type_name: &str) -> Option<ExtractorFn> {
    match type_name {
        "string" => Some(extract_string),
        "number" => Some(extract_number),
        "boolean" => Some(extract_boolean),
        "datetime" => Some(extract_datetime),
        "isNull" => Some(extract_is_null),
        _ => None,
    }
}

/// Canonical string of the cell.
pub fn extract_string(raw: &SourceValue, _row: u64, _col: usize) -> Result<Option<Value>> {
    Ok(match raw {
        SourceValue::Null => None,
        SourceValue::Int(i) => Some(Value::String(i.to_string())),
        SourceValue::Float(f) => Some(Value::String(format_number(*f))),
        SourceValue::Text(s) => Some(Value::String(s.clone())),
        SourceValue::Bool(b) => Some(Value::String(b.to_string())),
        SourceValue::Timestamp(micros) => Some(Value::String(format_iso_utc(*micros))),
    })
}

/// Numeric value of the cell.
pub fn extract_number(raw: &SourceValue, row: u64, col: usize) -> Result<Option<Value>> {
    match raw {
        SourceValue::Null => Ok(None),
        SourceValue::Int(i) => Ok(Some(Value::Number(*i as f64))),
        SourceValue::Float(f) => Ok(Some(Value::Number(*f))),
        SourceValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) => Ok(Some(Value::Number(n))),
            Err(_) => Err(Error::data(
                row,
                col,
                format!("cannot read number from text cell '{}'", s),
            )),
        },
        other => Err(Error::data(
            row,
            col,
            format!("cannot read number from cell {:?}", other),
        )),
    }
}

/// Truthiness of the cell: zero numbers and empty strings are false.
pub fn extract_boolean(raw: &SourceValue, _row: u64, _col: usize) -> Result<Option<Value>> {
    Ok(match raw {
        SourceValue::Null => None,
        SourceValue::Int(i) => Some(Value::Bool(*i != 0)),
        SourceValue::Float(f) => Some(Value::Bool(*f != 0.0)),
        SourceValue::Text(s) => Some(Value::Bool(!s.is_empty())),
        SourceValue::Bool(b) => Some(Value::Bool(*b)),
        SourceValue::Timestamp(_) => Some(Value::Bool(true)),
    })
}

/// ISO-8601 UTC string of the cell. Integer cells are taken as
/// microseconds since the Unix epoch; text cells pass through.
pub fn extract_datetime(raw: &SourceValue, row: u64, col: usize) -> Result<Option<Value>> {
    match raw {
        SourceValue::Null => Ok(None),
        SourceValue::Timestamp(micros) | SourceValue::Int(micros) => {
            Ok(Some(Value::Datetime(format_iso_utc(*micros))))
        }
        SourceValue::Text(s) => Ok(Some(Value::Datetime(s.clone()))),
        other => Err(Error::data(
            row,
            col,
            format!("cannot read datetime from cell {:?}", other),
        )),
    }
}

/// NULL indicator: `Some(true)` for NULL cells, `Some(false)` otherwise.
pub fn extract_is_null(raw: &SourceValue, _row: u64, _col: usize) -> Result<Option<Value>> {
    Ok(Some(Value::Bool(raw.is_null())))
}

const MICROS_PER_SEC: i64 = 1_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// Formats epoch microseconds as `YYYY-MM-DDTHH:MM:SS[.ffffff]Z`.
pub(crate) fn format_iso_utc(micros: i64) -> String {
    let mut secs = micros.div_euclid(MICROS_PER_SEC);
    let sub_micros = micros.rem_euclid(MICROS_PER_SEC);
    let days = secs.div_euclid(SECONDS_PER_DAY);
    secs = secs.rem_euclid(SECONDS_PER_DAY);
    let (year, month, day) = days_to_date(days);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if sub_micros == 0 {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            year, month, day, hours, minutes, seconds
        )
    } else {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}Z",
            year, month, day, hours, minutes, seconds, sub_micros
        )
    }
}

/// Civil-from-days conversion (proleptic Gregorian, day 0 = 1970-01-01).
fn days_to_date(days: i64) -> (i64, u32, u32) {
    let days = days + 719_468;
    let era = days.div_euclid(146_097);
    let doe = days.rem_euclid(146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}
