//! # Catalog and Load-Time Validation
//!
//! The catalog owns every record type description. `build()` walks the
//! whole schema once, checks the invariants the row-walk machinery relies
//! on, and resolves every map property to exactly one key value type, so
//! the compiler and handlers never re-validate.

use super::property::{
    Cardinality, MapKeyType, PropertyDef, PropertyValue, ScalarType,
};
use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Description of one record type: its name and property descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTypeDef {
    pub(crate) name: String,
    pub(crate) properties: IndexMap<String, PropertyDef>,
    pub(crate) id_property: String,
}

impl RecordTypeDef {
    pub fn new(name: impl Into<String>, properties: Vec<PropertyDef>) -> Self {
        RecordTypeDef {
            name: name.into(),
            properties: super::property::index_by_name(properties),
            id_property: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &IndexMap<String, PropertyDef> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    /// Name of the id property, resolved at catalog build time.
    pub fn id_property_name(&self) -> &str {
        &self.id_property
    }

    /// The id property descriptor.
    pub fn id_property(&self) -> &PropertyDef {
        &self.properties[&self.id_property]
    }
}

/// Read-only library of record type descriptions.
#[derive(Debug, Clone, Default)]
pub struct RecordTypeCatalog {
    types: IndexMap<String, RecordTypeDef>,
}

impl RecordTypeCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder {
            types: IndexMap::new(),
        }
    }

    /// Looks a record type up by name.
    pub fn record_type(&self, name: &str) -> Result<&RecordTypeDef> {
        self.types
            .get(name)
            .ok_or_else(|| Error::usage(format!("unknown record type '{}'", name)))
    }

    pub fn has_record_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

/// Accumulates record type definitions and validates them into a catalog.
pub struct CatalogBuilder {
    types: IndexMap<String, RecordTypeDef>,
}

impl CatalogBuilder {
    pub fn record_type(mut self, def: RecordTypeDef) -> Self {
        self.types.insert(def.name.clone(), def);
        self
    }

    /// Validates every definition and freezes the catalog.
    pub fn build(mut self) -> Result<RecordTypeCatalog> {
        // Immutable snapshot for cross-type lookups while definitions are
        // rewritten in place (map key resolution).
        let snapshot = self.types.clone();

        for (name, def) in self.types.iter_mut() {
            let id = resolve_id_property(&def.properties, IdRule::ExactlyOne)
                .map_err(|msg| Error::usage(format!("record type '{}': {}", name, msg)))?;
            def.id_property = id;
            validate_props(&mut def.properties, &snapshot, name)?;
        }

        Ok(RecordTypeCatalog { types: self.types })
    }
}

#[derive(Clone, Copy, PartialEq)]
enum IdRule {
    ExactlyOne,
    None,
}

fn resolve_id_property(
    props: &IndexMap<String, PropertyDef>,
    rule: IdRule,
) -> std::result::Result<String, String> {
    let mut ids = props.values().filter(|p| p.is_id);
    match rule {
        IdRule::ExactlyOne => {
            let first = ids.next().ok_or("no id property")?;
            if ids.next().is_some() {
                return Err("more than one id property".to_string());
            }
            if !first.is_scalar() {
                return Err(format!("id property '{}' is not scalar", first.name));
            }
            match first.scalar_value_type() {
                Some(ScalarType::String) | Some(ScalarType::Number) => Ok(first.name.clone()),
                _ => Err(format!(
                    "id property '{}' must be of string or number type",
                    first.name
                )),
            }
        }
        IdRule::None => {
            if let Some(p) = ids.next() {
                Err(format!("unexpected id property '{}'", p.name))
            } else {
                Ok(String::new())
            }
        }
    }
}

fn validate_props(
    props: &mut IndexMap<String, PropertyDef>,
    snapshot: &IndexMap<String, RecordTypeDef>,
    ctx: &str,
) -> Result<()> {
    let prop_names: Vec<String> = props.keys().cloned().collect();
    for name in prop_names {
        let ctx = format!("{}.{}", ctx, name);
        let prop = &mut props[&name];

        match &mut prop.value {
            PropertyValue::Scalar(_) => {}
            PropertyValue::Ref(shape) => {
                if shape.targets.is_empty() {
                    return Err(Error::usage(format!("{}: reference has no targets", ctx)));
                }
                for target in &shape.targets {
                    if !snapshot.contains_key(target) {
                        return Err(Error::usage(format!(
                            "{}: reference target '{}' is not a known record type",
                            ctx, target
                        )));
                    }
                }
            }
            PropertyValue::Object(shape) => {
                if shape.type_property.is_none() {
                    let id_rule = if prop.cardinality == Cardinality::Array {
                        IdRule::ExactlyOne
                    } else {
                        IdRule::None
                    };
                    resolve_id_property(&shape.properties, id_rule)
                        .map_err(|msg| Error::usage(format!("{}: {}", ctx, msg)))?;
                }
                validate_props(&mut shape.properties, snapshot, &ctx)?;
                let subtype_names: Vec<String> = shape.subtypes.keys().cloned().collect();
                for subtype in subtype_names {
                    let sub_ctx = format!("{}<{}>", ctx, subtype);
                    let sub_props = shape
                        .subtypes
                        .get_mut(&subtype)
                        .expect("subtype name just listed");
                    validate_props(sub_props, snapshot, &sub_ctx)?;
                }
            }
        }

        if prop.cardinality == Cardinality::Map {
            let resolved = resolve_map_key(prop, snapshot, &ctx)?;
            if let Some(spec) = prop.key.as_mut() {
                spec.resolved = Some(resolved);
            }
        } else if prop.key.is_some() {
            return Err(Error::usage(format!(
                "{}: key declaration on a non-map property",
                ctx
            )));
        }
    }
    Ok(())
}

/// Resolves a map property to its single key value type.
fn resolve_map_key(
    prop: &PropertyDef,
    snapshot: &IndexMap<String, RecordTypeDef>,
    ctx: &str,
) -> Result<MapKeyType> {
    let spec = prop
        .key
        .as_ref()
        .ok_or_else(|| Error::usage(format!("{}: map property without a key declaration", ctx)))?;

    match (&spec.declared, &spec.key_property) {
        (Some(_), Some(_)) => Err(Error::usage(format!(
            "{}: both a key value type and a key property declared",
            ctx
        ))),
        (Some(declared), None) => {
            if let MapKeyType::Ref(target) = declared {
                if !snapshot.contains_key(target) {
                    return Err(Error::usage(format!(
                        "{}: key reference target '{}' is not a known record type",
                        ctx, target
                    )));
                }
            }
            Ok(declared.clone())
        }
        (None, Some(key_prop)) => {
            // The key property lives in the element object schema, or in
            // the referred record type for reference maps.
            let key_def = match &prop.value {
                PropertyValue::Object(shape) => shape.properties.get(key_prop).ok_or_else(|| {
                    Error::usage(format!(
                        "{}: key property '{}' not found in element schema",
                        ctx, key_prop
                    ))
                })?,
                PropertyValue::Ref(shape) => {
                    if shape.is_polymorphic() {
                        return Err(Error::usage(format!(
                            "{}: key property derivation is not available for polymorphic references",
                            ctx
                        )));
                    }
                    let target = snapshot
                        .get(&shape.targets[0])
                        .expect("ref targets validated before key resolution");
                    target.properties.get(key_prop).ok_or_else(|| {
                        Error::usage(format!(
                            "{}: key property '{}' not found in record type '{}'",
                            ctx, key_prop, target.name
                        ))
                    })?
                }
                PropertyValue::Scalar(_) => {
                    return Err(Error::usage(format!(
                        "{}: scalar maps require a declared key value type",
                        ctx
                    )))
                }
            };
            if !key_def.is_scalar() {
                return Err(Error::usage(format!(
                    "{}: key property '{}' is not scalar-valued",
                    ctx, key_prop
                )));
            }
            match &key_def.value {
                PropertyValue::Scalar(ScalarType::String) => Ok(MapKeyType::String),
                PropertyValue::Scalar(ScalarType::Number) => Ok(MapKeyType::Number),
                PropertyValue::Scalar(ScalarType::Boolean) => Ok(MapKeyType::Boolean),
                PropertyValue::Scalar(ScalarType::Datetime) => Ok(MapKeyType::Datetime),
                PropertyValue::Ref(r) if !r.is_polymorphic() => {
                    Ok(MapKeyType::Ref(r.targets[0].clone()))
                }
                _ => Err(Error::usage(format!(
                    "{}: key property '{}' cannot serve as a map key",
                    ctx, key_prop
                ))),
            }
        }
        (None, None) => Err(Error::usage(format!(
            "{}: map property resolves to no key value type",
            ctx
        ))),
    }
}
