//! # Record Types Catalog
//!
//! This module provides the schema side of the parser: a catalog of record
//! type descriptions consumed by the markup compiler and the merge routine.
//!
//! ## Overview
//!
//! A [`RecordTypeCatalog`] maps type names to [`RecordTypeDef`]s. Each
//! property of a record type is described by a [`PropertyDef`] along three
//! orthogonal axes:
//!
//! - **Cardinality**: scalar, array or map
//! - **Value type**: string, number, boolean, datetime, custom scalar,
//!   nested object, or reference
//! - **Polymorphism**: monomorphic, or polymorphic (subtyped objects,
//!   multi-target references)
//!
//! ## Building a Catalog
//!
//! ```rust,ignore
//! use rsparser::schema::{PropertyDef, RecordTypeCatalog, RecordTypeDef};
//!
//! let catalog = RecordTypeCatalog::builder()
//!     .record_type(RecordTypeDef::new(
//!         "Person",
//!         vec![
//!             PropertyDef::number("id").id(),
//!             PropertyDef::string("firstName"),
//!             PropertyDef::ref_to("locationRef", "Location"),
//!         ],
//!     ))
//!     .record_type(RecordTypeDef::new(
//!         "Location",
//!         vec![PropertyDef::number("id").id(), PropertyDef::string("name")],
//!     ))
//!     .build()?;
//! ```
//!
//! ## Load-Time Invariants
//!
//! `build()` validates everything the row-walk machinery relies on, so the
//! handlers never re-check it:
//!
//! - every record type has exactly one id property, of scalar string or
//!   number type;
//! - an array-of-objects element schema has an id property; scalar and
//!   map-element object schemas have none;
//! - every reference target names a catalog type;
//! - every map property resolves to exactly one key value type (declared
//!   literal or derived from a key property), and object-typed keys are
//!   rejected.

mod catalog;
mod property;

pub use catalog::{CatalogBuilder, RecordTypeCatalog, RecordTypeDef};
pub use property::{Cardinality, MapKeyType, ObjectShape, PropertyDef, PropertyValue, RefShape, ScalarType};

pub(crate) use property::PropScope;
