//! # Parser Merge
//!
//! Combines the output of two parsers that walked the same top records
//! along different collection axes. Records are paired positionally and
//! fused field by field, driven by the property descriptors: scalar
//! leaves overwrite, nested objects recurse (with discriminator checks
//! for polymorphic objects), object arrays fuse element-wise, object
//! maps require equal key sets, and anything only the other parser saw
//! is moved over. Referred records merge by reference value.

use super::Parser;
use crate::error::{Error, Result};
use crate::schema::{ObjectShape, PropScope, PropertyDef, PropertyValue};
use crate::types::{Record, Value};
use std::sync::Arc;
use tracing::debug;

impl Parser {
    /// Merges `other` into this parser and returns `self`.
    ///
    /// Both parsers must share the top record type and hold the same
    /// records in the same order (same ids); violations are usage errors.
    pub fn merge(&mut self, other: Parser) -> Result<&mut Parser> {
        if other.top_type != self.top_type {
            return Err(Error::usage(format!(
                "cannot merge parsers with different top record types ('{}' vs '{}')",
                self.top_type, other.top_type
            )));
        }
        if self.records.len() != other.records.len() {
            return Err(Error::usage(format!(
                "cannot merge parsers holding {} and {} records",
                self.records.len(),
                other.records.len()
            )));
        }
        let catalog = Arc::clone(&self.catalog);
        let top = catalog.record_type(&self.top_type)?;
        for (dst, src) in self.records.iter_mut().zip(other.records) {
            merge_record(dst, src, PropScope::of(top.properties()))?;
        }
        for (key, src) in other.referred {
            match self.referred.get_mut(&key) {
                Some(dst) => {
                    let type_name = key.split('#').next().unwrap_or("");
                    let def = catalog.record_type(type_name)?;
                    merge_record(dst, src, PropScope::of(def.properties()))?;
                }
                None => {
                    self.referred.insert(key, src);
                }
            }
        }
        debug!(records = self.records.len(), "parsers merged");
        Ok(self)
    }
}

fn merge_record(dst: &mut Record, src: Record, scope: PropScope<'_>) -> Result<()> {
    for (name, sval) in src {
        if !dst.contains(&name) {
            dst.insert(name, sval);
            continue;
        }
        match scope.get(&name) {
            // Properties outside the scope (a polymorphic discriminator
            // checked by the caller) overwrite like scalar leaves.
            None => {
                dst.insert(name, sval);
            }
            Some(pd) => merge_property(dst, &name, sval, pd)?,
        }
    }
    Ok(())
}

fn merge_property(dst: &mut Record, name: &str, sval: Value, pd: &PropertyDef) -> Result<()> {
    if pd.is_scalar() {
        match &pd.value {
            PropertyValue::Scalar(_) => {
                if pd.is_id() {
                    if dst.get(name) != Some(&sval) {
                        return Err(Error::usage(format!(
                            "id property '{}' differs between merged records",
                            name
                        )));
                    }
                } else {
                    dst.insert(name.to_string(), sval);
                }
            }
            PropertyValue::Ref(_) => {
                dst.insert(name.to_string(), sval);
            }
            PropertyValue::Object(shape) => {
                let Value::Object(srec) = sval else {
                    return Err(shape_mismatch(name));
                };
                let drec = dst
                    .get_mut(name)
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| shape_mismatch(name))?;
                merge_object(drec, srec, shape)?;
            }
        }
        return Ok(());
    }

    match &pd.value {
        // Scalar and reference collections are leaves: the incoming
        // collection replaces the existing one.
        PropertyValue::Scalar(_) | PropertyValue::Ref(_) => {
            dst.insert(name.to_string(), sval);
        }
        PropertyValue::Object(shape) => {
            if pd.is_array() {
                let Value::Array(src_items) = sval else {
                    return Err(shape_mismatch(name));
                };
                let dst_items = dst
                    .get_mut(name)
                    .and_then(Value::as_array_mut)
                    .ok_or_else(|| shape_mismatch(name))?;
                if dst_items.len() != src_items.len() {
                    return Err(Error::usage(format!(
                        "array property '{}' has different lengths in merged records",
                        name
                    )));
                }
                for (d, s) in dst_items.iter_mut().zip(src_items) {
                    match (d, s) {
                        (Value::Null, Value::Null) => {}
                        (Value::Object(drec), Value::Object(srec)) => {
                            merge_object(drec, srec, shape)?;
                        }
                        _ => {
                            return Err(Error::usage(format!(
                                "array property '{}' has mismatched null alignment in merged records",
                                name
                            )))
                        }
                    }
                }
            } else {
                let Value::Map(src_map) = sval else {
                    return Err(shape_mismatch(name));
                };
                let dst_map = dst
                    .get_mut(name)
                    .and_then(Value::as_map_mut)
                    .ok_or_else(|| shape_mismatch(name))?;
                if dst_map.len() != src_map.len()
                    || !src_map.keys().all(|k| dst_map.contains_key(k))
                {
                    return Err(Error::usage(format!(
                        "map property '{}' has different key sets in merged records",
                        name
                    )));
                }
                for (k, s) in src_map {
                    let (Some(Value::Object(drec)), Value::Object(srec)) =
                        (dst_map.get_mut(&k), s)
                    else {
                        return Err(shape_mismatch(name));
                    };
                    merge_object(drec, srec, shape)?;
                }
            }
        }
    }
    Ok(())
}

/// Recurses into a nested object, comparing discriminators first for
/// polymorphic shapes.
fn merge_object(dst: &mut Record, src: Record, shape: &ObjectShape) -> Result<()> {
    match shape.type_property() {
        None => merge_record(dst, src, PropScope::of(shape.properties())),
        Some(type_prop) => {
            let dtype = dst.get(type_prop).and_then(Value::as_str).map(str::to_string);
            let stype = src.get(type_prop).and_then(Value::as_str).map(str::to_string);
            if let (Some(d), Some(s)) = (&dtype, &stype) {
                if d != s {
                    return Err(Error::usage(format!(
                        "polymorphic type mismatch on merge ('{}' vs '{}')",
                        d, s
                    )));
                }
            }
            let subtype = dtype.or(stype);
            match subtype.as_deref().and_then(|t| shape.subtype(t)) {
                Some(sub) => merge_record(dst, src, PropScope::with_base(sub, shape.properties())),
                None => merge_record(dst, src, PropScope::of(shape.properties())),
            }
        }
    }
}

fn shape_mismatch(name: &str) -> Error {
    Error::usage(format!(
        "property '{}' has mismatched value shapes in merged records",
        name
    ))
}
