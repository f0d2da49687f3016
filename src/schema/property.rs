//! # Property Descriptors
//!
//! A [`PropertyDef`] describes one property of a record type along the
//! cardinality, value-type and polymorphism axes. Descriptors are built
//! with chained constructors (`PropertyDef::string("name").required()`)
//! and frozen when the owning catalog is built.

use indexmap::IndexMap;

/// Scalar value types understood by the built-in extractors, plus custom
/// types resolved through the extractor registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    Datetime,
    Custom(String),
}

impl ScalarType {
    /// The extractor registry name for this type.
    pub fn extractor_name(&self) -> &str {
        match self {
            ScalarType::String => "string",
            ScalarType::Number => "number",
            ScalarType::Boolean => "boolean",
            ScalarType::Datetime => "datetime",
            ScalarType::Custom(name) => name,
        }
    }
}

/// Property cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Scalar,
    Array,
    Map,
}

/// Key value type of a map property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapKeyType {
    String,
    Number,
    Boolean,
    Datetime,
    /// Reference key; the key cell holds the referred record's id and the
    /// stored key is the canonical `"<Type>#<id>"` string.
    Ref(String),
}

/// Shape of a nested object value: monomorphic property set, or a
/// discriminated union of subtypes over a shared base.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectShape {
    pub(crate) properties: IndexMap<String, PropertyDef>,
    pub(crate) type_property: Option<String>,
    pub(crate) subtypes: IndexMap<String, IndexMap<String, PropertyDef>>,
}

impl ObjectShape {
    pub fn is_polymorphic(&self) -> bool {
        self.type_property.is_some()
    }

    /// The discriminator property written into constructed subtype objects.
    pub fn type_property(&self) -> Option<&str> {
        self.type_property.as_deref()
    }

    pub fn properties(&self) -> &IndexMap<String, PropertyDef> {
        &self.properties
    }

    pub fn subtype(&self, name: &str) -> Option<&IndexMap<String, PropertyDef>> {
        self.subtypes.get(name)
    }
}

/// Shape of a reference value: one or more target record types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefShape {
    pub(crate) targets: Vec<String>,
}

impl RefShape {
    pub fn is_polymorphic(&self) -> bool {
        self.targets.len() > 1
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub(crate) fn has_target(&self, name: &str) -> bool {
        self.targets.iter().any(|t| t == name)
    }
}

/// Value type of a property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(ScalarType),
    Object(ObjectShape),
    Ref(RefShape),
}

/// Map key derivation: a declared literal type, or the name of a property
/// of the element object / referred record the key is read from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MapKeySpec {
    pub(crate) declared: Option<MapKeyType>,
    pub(crate) key_property: Option<String>,
    pub(crate) resolved: Option<MapKeyType>,
}

/// Descriptor of one record type property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub(crate) name: String,
    pub(crate) cardinality: Cardinality,
    pub(crate) value: PropertyValue,
    pub(crate) optional: bool,
    pub(crate) is_id: bool,
    pub(crate) key: Option<MapKeySpec>,
}

impl PropertyDef {
    fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        PropertyDef {
            name: name.into(),
            cardinality: Cardinality::Scalar,
            value: PropertyValue::Scalar(ty),
            optional: true,
            is_id: false,
            key: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarType::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarType::Boolean)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarType::Datetime)
    }

    /// A scalar whose extractor is resolved by `type_name` through the
    /// extractor registry.
    pub fn custom(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::scalar(name, ScalarType::Custom(type_name.into()))
    }

    /// A monomorphic nested object property.
    pub fn object(name: impl Into<String>, properties: Vec<PropertyDef>) -> Self {
        PropertyDef {
            name: name.into(),
            cardinality: Cardinality::Scalar,
            value: PropertyValue::Object(ObjectShape {
                properties: index_by_name(properties),
                type_property: None,
                subtypes: IndexMap::new(),
            }),
            optional: true,
            is_id: false,
            key: None,
        }
    }

    /// A polymorphic nested object property. Subtypes are added with
    /// [`with_subtype`](Self::with_subtype); `type_property` names the
    /// discriminator the parser writes into constructed objects.
    pub fn poly_object(name: impl Into<String>, type_property: impl Into<String>) -> Self {
        PropertyDef {
            name: name.into(),
            cardinality: Cardinality::Scalar,
            value: PropertyValue::Object(ObjectShape {
                properties: IndexMap::new(),
                type_property: Some(type_property.into()),
                subtypes: IndexMap::new(),
            }),
            optional: true,
            is_id: false,
            key: None,
        }
    }

    /// Adds a subtype property set to a polymorphic object property.
    pub fn with_subtype(mut self, subtype: impl Into<String>, properties: Vec<PropertyDef>) -> Self {
        match &mut self.value {
            PropertyValue::Object(shape) if shape.type_property.is_some() => {
                shape.subtypes.insert(subtype.into(), index_by_name(properties));
            }
            _ => panic!("with_subtype requires a poly_object property"),
        }
        self
    }

    /// Adds properties shared by every subtype of a polymorphic object.
    pub fn with_base_properties(mut self, properties: Vec<PropertyDef>) -> Self {
        match &mut self.value {
            PropertyValue::Object(shape) if shape.type_property.is_some() => {
                shape.properties = index_by_name(properties);
            }
            _ => panic!("with_base_properties requires a poly_object property"),
        }
        self
    }

    /// A monomorphic reference property.
    pub fn ref_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        PropertyDef {
            name: name.into(),
            cardinality: Cardinality::Scalar,
            value: PropertyValue::Ref(RefShape {
                targets: vec![target.into()],
            }),
            optional: true,
            is_id: false,
            key: None,
        }
    }

    /// A polymorphic reference property with two or more targets.
    pub fn poly_ref<S: Into<String>>(name: impl Into<String>, targets: Vec<S>) -> Self {
        PropertyDef {
            name: name.into(),
            cardinality: Cardinality::Scalar,
            value: PropertyValue::Ref(RefShape {
                targets: targets.into_iter().map(Into::into).collect(),
            }),
            optional: true,
            is_id: false,
            key: None,
        }
    }

    /// Marks this property as the record type's id. Id properties are
    /// implicitly non-optional.
    pub fn id(mut self) -> Self {
        self.is_id = true;
        self.optional = false;
        self
    }

    /// Marks this property as non-optional: a NULL cell where a value is
    /// required becomes a data error.
    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    /// Turns this property into an ordered array of its value type.
    pub fn array(mut self) -> Self {
        self.cardinality = Cardinality::Array;
        self
    }

    /// Turns this property into a map with a declared key value type.
    pub fn map_with_key(mut self, key: MapKeyType) -> Self {
        self.cardinality = Cardinality::Map;
        self.key = Some(MapKeySpec {
            declared: Some(key),
            key_property: None,
            resolved: None,
        });
        self
    }

    /// Turns this property into a map keyed by the named property of the
    /// element object or referred record.
    pub fn map_keyed_by(mut self, key_property: impl Into<String>) -> Self {
        self.cardinality = Cardinality::Map;
        self.key = Some(MapKeySpec {
            declared: None,
            key_property: Some(key_property.into()),
            resolved: None,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_id(&self) -> bool {
        self.is_id
    }

    pub fn is_scalar(&self) -> bool {
        self.cardinality == Cardinality::Scalar
    }

    pub fn is_array(&self) -> bool {
        self.cardinality == Cardinality::Array
    }

    pub fn is_map(&self) -> bool {
        self.cardinality == Cardinality::Map
    }

    pub fn is_ref(&self) -> bool {
        matches!(self.value, PropertyValue::Ref(_))
    }

    pub fn is_polymorph(&self) -> bool {
        match &self.value {
            PropertyValue::Object(shape) => shape.is_polymorphic(),
            PropertyValue::Ref(shape) => shape.is_polymorphic(),
            PropertyValue::Scalar(_) => false,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn scalar_value_type(&self) -> Option<&ScalarType> {
        match &self.value {
            PropertyValue::Scalar(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn object_shape(&self) -> Option<&ObjectShape> {
        match &self.value {
            PropertyValue::Object(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn ref_shape(&self) -> Option<&RefShape> {
        match &self.value {
            PropertyValue::Ref(shape) => Some(shape),
            _ => None,
        }
    }

    /// The resolved key value type of a map property.
    pub fn key_value_type(&self) -> Option<&MapKeyType> {
        self.key.as_ref().and_then(|k| k.resolved.as_ref())
    }

    /// The key property name of a map property, if key derivation was
    /// declared that way.
    pub fn key_property_name(&self) -> Option<&str> {
        self.key.as_ref().and_then(|k| k.key_property.as_deref())
    }
}

pub(crate) fn index_by_name(properties: Vec<PropertyDef>) -> IndexMap<String, PropertyDef> {
    properties
        .into_iter()
        .map(|p| (p.name.clone(), p))
        .collect()
}

/// A property lookup scope: a primary property set with an optional base
/// set behind it (polymorphic subtype tier over shared base properties).
#[derive(Clone, Copy)]
pub(crate) struct PropScope<'a> {
    pub(crate) primary: &'a IndexMap<String, PropertyDef>,
    pub(crate) base: Option<&'a IndexMap<String, PropertyDef>>,
}

impl<'a> PropScope<'a> {
    pub(crate) fn of(primary: &'a IndexMap<String, PropertyDef>) -> Self {
        PropScope {
            primary,
            base: None,
        }
    }

    pub(crate) fn with_base(
        primary: &'a IndexMap<String, PropertyDef>,
        base: &'a IndexMap<String, PropertyDef>,
    ) -> Self {
        PropScope {
            primary,
            base: Some(base),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&'a PropertyDef> {
        self.primary
            .get(name)
            .or_else(|| self.base.and_then(|b| b.get(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_axes_are_orthogonal() {
        let p = PropertyDef::string("name");
        assert!(p.is_scalar() && !p.is_ref() && !p.is_polymorph());

        let p = PropertyDef::ref_to("loc", "Location").array();
        assert!(p.is_array() && p.is_ref() && !p.is_polymorph());

        let p = PropertyDef::poly_ref("party", vec!["Person", "Company"]);
        assert!(p.is_scalar() && p.is_ref() && p.is_polymorph());

        let p = PropertyDef::poly_object("payment", "type")
            .with_subtype("CARD", vec![PropertyDef::string("last4")]);
        assert!(p.is_polymorph());
        assert_eq!(p.object_shape().unwrap().type_property(), Some("type"));
    }

    #[test]
    fn id_marker_implies_required() {
        let p = PropertyDef::number("id").id();
        assert!(p.is_id());
        assert!(!p.is_optional());
    }

    #[test]
    fn prop_scope_falls_back_to_base() {
        let base = index_by_name(vec![PropertyDef::string("shared")]);
        let primary = index_by_name(vec![PropertyDef::string("own")]);
        let scope = PropScope::with_base(&primary, &base);
        assert!(scope.get("own").is_some());
        assert!(scope.get("shared").is_some());
        assert!(scope.get("missing").is_none());
    }
}
