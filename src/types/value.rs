//! # Source Cells and Output Values
//!
//! `SourceValue` models what a relational driver hands over per cell: NULL
//! or one of five owned storage classes. `Value` models one node of the
//! constructed record tree. `Record` is the object node: an
//! insertion-ordered map from property name to value.
//!
//! Insertion order of `Record` is observable (collection elements and
//! properties appear in the order the row walk produced them), so the map
//! type must preserve it.

use indexmap::IndexMap;

/// A raw result-set cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    /// Microseconds since the Unix epoch, UTC.
    Timestamp(i64),
}

impl SourceValue {
    /// Returns true if this cell is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SourceValue::Null)
    }
}

impl From<i64> for SourceValue {
    fn from(v: i64) -> Self {
        SourceValue::Int(v)
    }
}

impl From<i32> for SourceValue {
    fn from(v: i32) -> Self {
        SourceValue::Int(v as i64)
    }
}

impl From<f64> for SourceValue {
    fn from(v: f64) -> Self {
        SourceValue::Float(v)
    }
}

impl From<&str> for SourceValue {
    fn from(v: &str) -> Self {
        SourceValue::Text(v.to_string())
    }
}

impl From<String> for SourceValue {
    fn from(v: String) -> Self {
        SourceValue::Text(v)
    }
}

impl From<bool> for SourceValue {
    fn from(v: bool) -> Self {
        SourceValue::Bool(v)
    }
}

impl<T: Into<SourceValue>> From<Option<T>> for SourceValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => SourceValue::Null,
        }
    }
}

/// One node of the hierarchical output tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A null array element slot. Never stored as a property value.
    Null,
    String(String),
    Number(f64),
    Bool(bool),
    /// ISO-8601 datetime, UTC.
    Datetime(String),
    /// Canonical reference, `"<RecordTypeName>#<id>"`.
    Ref(String),
    Object(Record),
    Array(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&Record> {
        match self {
            Value::Object(r) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn as_object_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Object(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Datetime(s) | Value::Ref(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical string rendering of a scalar, as used for reference ids
    /// and map keys. Numbers render without a trailing `.0`.
    pub fn key_string(&self) -> Option<String> {
        match self {
            Value::String(s) | Value::Datetime(s) | Value::Ref(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Renders a number the way it would appear in a reference id: integral
/// values without a fractional part.
pub(crate) fn format_number(n: f64) -> String {
    if n == n.trunc() && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A constructed record: property name to value, insertion-ordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    properties: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.properties.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.properties.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.into_iter()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Record {
            properties: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_value_null_detection() {
        assert!(SourceValue::Null.is_null());
        assert!(!SourceValue::Int(0).is_null());
        assert!(SourceValue::from(None::<i64>).is_null());
    }

    #[test]
    fn key_string_renders_integral_numbers_without_fraction() {
        assert_eq!(Value::Number(25.0).key_string().unwrap(), "25");
        assert_eq!(Value::Number(9.5).key_string().unwrap(), "9.5");
        assert_eq!(Value::Number(-3.0).key_string().unwrap(), "-3");
    }

    #[test]
    fn key_string_for_non_scalars_is_none() {
        assert_eq!(Value::Object(Record::new()).key_string(), None);
        assert_eq!(Value::Array(vec![]).key_string(), None);
    }

    #[test]
    fn record_preserves_insertion_order() {
        let mut rec = Record::new();
        rec.insert("zeta", Value::Number(1.0));
        rec.insert("alpha", Value::Number(2.0));
        let names: Vec<&str> = rec.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }
}
