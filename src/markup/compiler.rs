//! # Markup Compiler
//!
//! Recursive descent over the parsed label sequence. Each object level
//! consumes the run of columns carrying its own prefix and recurses into
//! deeper prefixes for nested objects, polymorphic tiers, fetched
//! referred records and collection elements. The compiler emits exactly
//! one [`HandlerPlan`] per column and wires the anchor chain as
//! collections are encountered.

use super::label::Label;
use crate::error::{Error, Result};
use crate::extract::{self, ExtractorFn};
use crate::handlers::{HandlerKind, HandlerPlan};
use crate::schema::{
    MapKeyType, ObjectShape, PropScope, PropertyDef, PropertyValue, RecordTypeCatalog,
    RecordTypeDef, RefShape, ScalarType,
};

/// Compiles a markup against the catalog into the per-column handler plan.
pub(crate) fn compile<'a>(
    catalog: &'a RecordTypeCatalog,
    labels: &'a [Label],
    top: &'a RecordTypeDef,
) -> Result<Vec<HandlerPlan>> {
    let mut compiler = Compiler {
        catalog,
        labels,
        pos: 0,
        plan: Vec::with_capacity(labels.len()),
    };
    compiler.top_level(top)?;
    if compiler.pos < labels.len() {
        return Err(Error::markup(
            compiler.pos,
            format!(
                "unexpected column prefix '{}'",
                labels[compiler.pos].prefix
            ),
        ));
    }
    Ok(compiler.plan)
}

struct Compiler<'a> {
    catalog: &'a RecordTypeCatalog,
    labels: &'a [Label],
    pos: usize,
    plan: Vec<HandlerPlan>,
}

impl<'a> Compiler<'a> {
    fn label(&self, col: usize) -> &'a Label {
        &self.labels[col]
    }

    fn push(&mut self, kind: HandlerKind, owner: usize, prop: &str, extractor: ExtractorFn, optional: bool) {
        let col = self.plan.len();
        self.plan.push(HandlerPlan {
            kind,
            owner,
            prop: prop.to_string(),
            extractor,
            optional,
            tail: col + 1,
            next_anchor: None,
        });
    }

    fn resolve_extractor(&self, ty: &ScalarType, col: usize) -> Result<ExtractorFn> {
        extract::lookup(ty.extractor_name()).ok_or_else(|| {
            Error::markup(
                col,
                format!("no extractor registered for value type '{}'", ty.extractor_name()),
            )
        })
    }

    fn id_extractor(&self, target: &str, col: usize) -> Result<ExtractorFn> {
        let def = self
            .catalog
            .record_type(target)
            .map_err(|_| Error::markup(col, format!("unknown reference target '{}'", target)))?;
        let ty = def
            .id_property()
            .scalar_value_type()
            .expect("id properties are scalar by catalog validation");
        self.resolve_extractor(ty, col)
    }

    /// Links `anchor -> new_col` in the anchor chain; a second child on
    /// the same anchor means two collection axes share a level.
    fn link_anchor(&mut self, anchor: usize, new_col: usize) -> Result<()> {
        if self.plan[anchor].next_anchor.is_some() {
            return Err(Error::markup(
                new_col,
                "more than one collection axis under the same anchor",
            ));
        }
        self.plan[anchor].next_anchor = Some(new_col);
        Ok(())
    }

    /// The prefix of the next column, which must be strictly deeper than
    /// `parent_prefix`.
    fn require_deeper(&self, parent_prefix: &str, at_col: usize) -> Result<&'a str> {
        match self.peek_deeper(parent_prefix) {
            Some(prefix) => Ok(prefix),
            None => Err(Error::markup(
                at_col,
                format!(
                    "expected a column prefix deeper than '{}' after column {}",
                    parent_prefix, at_col
                ),
            )),
        }
    }

    fn peek_deeper(&self, parent_prefix: &str) -> Option<&'a str> {
        let label = self.labels.get(self.pos)?;
        if label.prefix.len() > parent_prefix.len() {
            Some(&label.prefix)
        } else {
            None
        }
    }

    fn top_level(&mut self, top: &'a RecordTypeDef) -> Result<()> {
        let label = self.label(0);
        if !label.prefix.is_empty() || label.fetched || label.name != top.id_property_name() {
            return Err(Error::markup(
                0,
                format!(
                    "first column must be the id property '{}' of record type '{}'",
                    top.id_property_name(),
                    top.name()
                ),
            ));
        }
        let id_prop = top.id_property();
        let ty = id_prop
            .scalar_value_type()
            .expect("id properties are scalar by catalog validation");
        let extractor = self.resolve_extractor(ty, 0)?;
        self.push(HandlerKind::TopRecordId, 0, id_prop.name(), extractor, false);
        self.pos = 1;
        self.object_level("", PropScope::of(top.properties()), 0, 0)
    }

    /// Consumes the run of columns at `prefix` belonging to one object
    /// scope. `owner` is the handler whose record receives the writes,
    /// `anchor` the innermost anchor column in effect for this scope.
    fn object_level(
        &mut self,
        prefix: &str,
        scope: PropScope<'a>,
        owner: usize,
        anchor: usize,
    ) -> Result<()> {
        let mut exhausted = false;
        while self.pos < self.labels.len() && self.label(self.pos).prefix == prefix {
            let col = self.pos;
            if exhausted {
                return Err(Error::markup(
                    col,
                    "no further columns allowed at this level after a collection property",
                ));
            }
            let label = self.label(col);
            if label.name.is_empty() {
                return Err(Error::markup(col, "empty column name outside a collection"));
            }
            let prop = scope.get(&label.name).ok_or_else(|| {
                Error::markup(col, format!("unknown property '{}'", label.name))
            })?;

            if prop.is_scalar() {
                match &prop.value {
                    PropertyValue::Scalar(ty) => {
                        self.reject_fetched(label, col)?;
                        let extractor = self.resolve_extractor(ty, col)?;
                        self.push(HandlerKind::SingleValue, owner, prop.name(), extractor, prop.optional);
                        self.pos += 1;
                    }
                    PropertyValue::Ref(shape) if !shape.is_polymorphic() => {
                        let target = &shape.targets()[0];
                        let extractor = self.id_extractor(target, col)?;
                        if label.fetched {
                            self.single_fetched_ref(col, prop, target, extractor, owner, anchor, prefix)?;
                        } else {
                            self.push(
                                HandlerKind::SingleRef { target: target.clone() },
                                owner,
                                prop.name(),
                                extractor,
                                prop.optional,
                            );
                            self.pos += 1;
                        }
                    }
                    PropertyValue::Ref(shape) => {
                        self.push(HandlerKind::PolyRefDispatch, owner, prop.name(), extract::extract_is_null, prop.optional);
                        self.pos += 1;
                        self.ref_tier(col, prop, shape, owner, anchor, None, label.fetched, prefix)?;
                        self.plan[col].tail = self.pos;
                    }
                    PropertyValue::Object(shape) if !shape.is_polymorphic() => {
                        self.reject_fetched(label, col)?;
                        self.single_object(col, prop, shape, owner, anchor, prefix)?;
                    }
                    PropertyValue::Object(shape) => {
                        self.reject_fetched(label, col)?;
                        self.push(HandlerKind::PolyObjectDispatch, owner, prop.name(), extract::extract_is_null, prop.optional);
                        self.pos += 1;
                        self.object_tier(col, prop, shape, owner, anchor, None, prefix)?;
                        self.plan[col].tail = self.pos;
                    }
                }
            } else {
                self.collection(col, prop, owner, anchor, prefix)?;
                exhausted = true;
            }
        }
        Ok(())
    }

    fn reject_fetched(&self, label: &Label, col: usize) -> Result<()> {
        if label.fetched {
            return Err(Error::markup(
                col,
                format!("fetched marker on non-reference property '{}'", label.name),
            ));
        }
        Ok(())
    }

    fn single_object(
        &mut self,
        col: usize,
        prop: &'a PropertyDef,
        shape: &'a ObjectShape,
        owner: usize,
        anchor: usize,
        prefix: &str,
    ) -> Result<()> {
        self.push(HandlerKind::SingleObject, owner, prop.name(), extract::extract_is_null, prop.optional);
        self.pos += 1;
        let child = self.require_deeper(prefix, col)?;
        self.object_level(child, PropScope::of(shape.properties()), col, anchor)?;
        self.plan[col].tail = self.pos;
        Ok(())
    }

    fn single_fetched_ref(
        &mut self,
        col: usize,
        prop: &'a PropertyDef,
        target: &str,
        extractor: ExtractorFn,
        owner: usize,
        anchor: usize,
        prefix: &str,
    ) -> Result<()> {
        self.push(
            HandlerKind::SingleFetchedRef { target: target.to_string() },
            owner,
            prop.name(),
            extractor,
            prop.optional,
        );
        self.pos += 1;
        // A fetched reference without referred columns is legal; its
        // referred record surfaces with no properties of its own.
        if self.peek_deeper(prefix).is_some() {
            let child = self.label(self.pos).prefix.clone();
            let referred = self.catalog.record_type(target).expect("target validated");
            self.object_level(&child, PropScope::of(referred.properties()), col, anchor)?;
        }
        self.plan[col].tail = self.pos;
        Ok(())
    }

    /// Subtype tier of a polymorphic object. `element` carries the anchor
    /// column when the tier sits under a collection anchor.
    fn object_tier(
        &mut self,
        at_col: usize,
        prop: &'a PropertyDef,
        shape: &'a ObjectShape,
        owner: usize,
        anchor: usize,
        element: Option<usize>,
        prefix: &str,
    ) -> Result<()> {
        let type_prop = shape
            .type_property()
            .expect("polymorphic object shapes carry a type property");
        let tier_prefix = self.require_deeper(prefix, at_col)?;
        let mut members: Vec<usize> = Vec::new();
        while self.pos < self.labels.len() && self.label(self.pos).prefix == tier_prefix {
            let scol = self.pos;
            let slabel = self.label(scol);
            self.reject_fetched(slabel, scol)?;
            let sub_props = shape.subtype(&slabel.name).ok_or_else(|| {
                Error::markup(scol, format!("unknown subtype '{}'", slabel.name))
            })?;
            self.push(
                HandlerKind::PolyObjectType {
                    subtype: slabel.name.clone(),
                    type_prop: type_prop.to_string(),
                    dispatch: element.unwrap_or(at_col),
                    element: element.is_some(),
                    is_last: false,
                },
                owner,
                prop.name(),
                extract::extract_is_null,
                prop.optional,
            );
            self.pos += 1;
            if self.peek_deeper(tier_prefix).is_some() {
                let child = self.label(self.pos).prefix.clone();
                let scope = PropScope::with_base(sub_props, &shape.properties);
                self.object_level(&child, scope, scol, anchor)?;
            }
            self.plan[scol].tail = self.pos;
            members.push(scol);
        }
        let last = members.last().copied().ok_or_else(|| {
            Error::markup(at_col, "expected subtype columns for a polymorphic object")
        })?;
        if let HandlerKind::PolyObjectType { is_last, .. } = &mut self.plan[last].kind {
            *is_last = true;
        }
        Ok(())
    }

    /// Target tier of a polymorphic reference.
    fn ref_tier(
        &mut self,
        at_col: usize,
        prop: &'a PropertyDef,
        shape: &'a RefShape,
        owner: usize,
        anchor: usize,
        element: Option<usize>,
        prop_fetched: bool,
        prefix: &str,
    ) -> Result<()> {
        let tier_prefix = self.require_deeper(prefix, at_col)?;
        let mut members: Vec<usize> = Vec::new();
        while self.pos < self.labels.len() && self.label(self.pos).prefix == tier_prefix {
            let scol = self.pos;
            let slabel = self.label(scol);
            if !shape.has_target(&slabel.name) {
                return Err(Error::markup(
                    scol,
                    format!("unknown reference target '{}'", slabel.name),
                ));
            }
            let fetched = prop_fetched || slabel.fetched;
            let target = slabel.name.clone();
            let extractor = self.id_extractor(&target, scol)?;
            self.push(
                HandlerKind::PolyRefTarget {
                    target: target.clone(),
                    dispatch: element.unwrap_or(at_col),
                    element: element.is_some(),
                    fetched,
                    is_last: false,
                },
                owner,
                prop.name(),
                extractor,
                prop.optional,
            );
            self.pos += 1;
            if fetched && self.peek_deeper(tier_prefix).is_some() {
                let child = self.label(self.pos).prefix.clone();
                let referred = self.catalog.record_type(&target).expect("target validated");
                self.object_level(&child, PropScope::of(referred.properties()), scol, anchor)?;
            }
            self.plan[scol].tail = self.pos;
            members.push(scol);
        }
        let last = members.last().copied().ok_or_else(|| {
            Error::markup(at_col, "expected target columns for a polymorphic reference")
        })?;
        if let HandlerKind::PolyRefTarget { is_last, .. } = &mut self.plan[last].kind {
            *is_last = true;
        }
        Ok(())
    }

    /// A collection property: links the anchor chain and emits the anchor
    /// column plus its element machinery.
    fn collection(
        &mut self,
        col: usize,
        prop: &'a PropertyDef,
        owner: usize,
        anchor: usize,
        prefix: &str,
    ) -> Result<()> {
        self.link_anchor(anchor, col)?;
        let map = prop.is_map();
        let (key_extractor, key_ref) = if map {
            self.map_key_binding(prop, col)?
        } else {
            (extract::extract_is_null as ExtractorFn, None)
        };
        let label = self.label(col);

        match &prop.value {
            PropertyValue::Scalar(ty) => {
                self.reject_fetched(label, col)?;
                let anchor_extractor: ExtractorFn = if map { key_extractor } else { extract::extract_is_null };
                self.push(
                    HandlerKind::ValueAnchor { map, key_ref },
                    owner,
                    prop.name(),
                    anchor_extractor,
                    prop.optional,
                );
                self.pos += 1;
                let elem_extractor = self.resolve_extractor(ty, col)?;
                self.value_element(col, map, None, elem_extractor, prefix)?;
                self.plan[col].tail = self.pos;
            }
            PropertyValue::Ref(shape) if shape.is_polymorphic() => {
                let anchor_extractor: ExtractorFn = if map { key_extractor } else { extract::extract_string };
                self.push(
                    HandlerKind::ObjectAnchor { map, key_ref, alloc: false },
                    owner,
                    prop.name(),
                    anchor_extractor,
                    prop.optional,
                );
                self.pos += 1;
                self.ref_tier(col, prop, shape, owner, col, Some(col), label.fetched, prefix)?;
                self.plan[col].tail = self.pos;
            }
            PropertyValue::Ref(shape) => {
                let target = shape.targets()[0].clone();
                let elem_extractor = self.id_extractor(&target, col)?;
                // Fetchedness may sit on the property column or on the
                // element cell.
                let elem_fetched = self
                    .labels
                    .get(self.pos + 1)
                    .map(|l| l.fetched)
                    .unwrap_or(false);
                if label.fetched || elem_fetched {
                    let anchor_extractor: ExtractorFn = if map { key_extractor } else { extract::extract_string };
                    self.push(
                        HandlerKind::ObjectAnchor { map, key_ref, alloc: false },
                        owner,
                        prop.name(),
                        anchor_extractor,
                        prop.optional,
                    );
                    self.pos += 1;
                    let elem_col = self.pos;
                    let elem_prefix = self.require_deeper(prefix, col)?.to_string();
                    self.expect_element_cell(elem_col)?;
                    self.push(
                        HandlerKind::FetchedRefElement { anchor: col, target: target.clone() },
                        owner,
                        prop.name(),
                        elem_extractor,
                        prop.optional,
                    );
                    self.pos += 1;
                    if self.peek_deeper(&elem_prefix).is_some() {
                        let child = self.label(self.pos).prefix.clone();
                        let referred = self.catalog.record_type(&target).expect("target validated");
                        self.object_level(&child, PropScope::of(referred.properties()), elem_col, col)?;
                    }
                    self.plan[elem_col].tail = self.pos;
                    self.plan[col].tail = self.pos;
                } else {
                    let anchor_extractor: ExtractorFn = if map { key_extractor } else { extract::extract_is_null };
                    self.push(
                        HandlerKind::ValueAnchor { map, key_ref },
                        owner,
                        prop.name(),
                        anchor_extractor,
                        prop.optional,
                    );
                    self.pos += 1;
                    self.value_element(col, map, Some(target), elem_extractor, prefix)?;
                    self.plan[col].tail = self.pos;
                }
            }
            PropertyValue::Object(shape) if shape.is_polymorphic() => {
                self.reject_fetched(label, col)?;
                let anchor_extractor: ExtractorFn = if map { key_extractor } else { extract::extract_string };
                self.push(
                    HandlerKind::ObjectAnchor { map, key_ref, alloc: false },
                    owner,
                    prop.name(),
                    anchor_extractor,
                    prop.optional,
                );
                self.pos += 1;
                self.object_tier(col, prop, shape, owner, col, Some(col), prefix)?;
                self.plan[col].tail = self.pos;
            }
            PropertyValue::Object(shape) => {
                self.reject_fetched(label, col)?;
                let anchor_extractor: ExtractorFn = if map { key_extractor } else { extract::extract_string };
                self.push(
                    HandlerKind::ObjectAnchor { map, key_ref, alloc: true },
                    owner,
                    prop.name(),
                    anchor_extractor,
                    prop.optional,
                );
                self.pos += 1;
                let child = self.require_deeper(prefix, col)?.to_string();
                self.object_level(&child, PropScope::of(shape.properties()), col, col)?;
                self.plan[col].tail = self.pos;
            }
        }
        Ok(())
    }

    /// The empty-name value cell of a scalar-valued collection.
    fn value_element(
        &mut self,
        anchor: usize,
        map: bool,
        ref_target: Option<String>,
        extractor: ExtractorFn,
        prefix: &str,
    ) -> Result<()> {
        let elem_col = self.pos;
        self.require_deeper(prefix, anchor)?;
        self.expect_element_cell(elem_col)?;
        self.push(
            HandlerKind::ValueElement { anchor, map, ref_target },
            0,
            "",
            extractor,
            true,
        );
        self.pos += 1;
        Ok(())
    }

    fn expect_element_cell(&self, col: usize) -> Result<()> {
        let label = self.label(col);
        if !label.name.is_empty() {
            return Err(Error::markup(
                col,
                format!(
                    "expected an empty-name collection value column, found '{}'",
                    label.name
                ),
            ));
        }
        Ok(())
    }

    /// Extractor and reference target for a map anchor's key cell.
    fn map_key_binding(&self, prop: &'a PropertyDef, col: usize) -> Result<(ExtractorFn, Option<String>)> {
        let key_type = prop.key_value_type().ok_or_else(|| {
            Error::markup(col, format!("map property '{}' has no resolved key type", prop.name()))
        })?;
        match key_type {
            MapKeyType::Ref(target) => {
                Ok((self.id_extractor(target, col)?, Some(target.clone())))
            }
            MapKeyType::String => Ok((extract::extract_string, None)),
            MapKeyType::Number => Ok((extract::extract_number, None)),
            MapKeyType::Boolean => Ok((extract::extract_boolean, None)),
            MapKeyType::Datetime => Ok((extract::extract_datetime, None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PropertyDef, RecordTypeCatalog, RecordTypeDef};

    fn catalog() -> RecordTypeCatalog {
        RecordTypeCatalog::builder()
            .record_type(RecordTypeDef::new(
                "Person",
                vec![
                    PropertyDef::number("id").id(),
                    PropertyDef::string("firstName"),
                    PropertyDef::string("lastName"),
                    PropertyDef::number("scores").array(),
                    PropertyDef::object(
                        "address",
                        vec![PropertyDef::string("street"), PropertyDef::string("city")],
                    ),
                    PropertyDef::object(
                        "addresses",
                        vec![
                            PropertyDef::number("id").id(),
                            PropertyDef::string("street"),
                        ],
                    )
                    .array(),
                    PropertyDef::ref_to("locationRef", "Location"),
                ],
            ))
            .record_type(RecordTypeDef::new(
                "Location",
                vec![PropertyDef::number("id").id(), PropertyDef::string("name")],
            ))
            .build()
            .unwrap()
    }

    fn labels(raw: &[&str]) -> Vec<Label> {
        raw.iter()
            .enumerate()
            .map(|(i, l)| Label::parse(l, i).unwrap())
            .collect()
    }

    fn compile_for(raw: &[&str]) -> Result<Vec<HandlerPlan>> {
        let catalog = catalog();
        let top = catalog.record_type("Person").unwrap();
        compile(&catalog, &labels(raw), top)
    }

    #[test]
    fn flat_scalars_compile_to_one_handler_per_column() {
        let plan = compile_for(&["id", "firstName", "lastName"]).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].kind, HandlerKind::TopRecordId);
        assert_eq!(plan[1].kind, HandlerKind::SingleValue);
        assert_eq!(plan[2].prop, "lastName");
    }

    #[test]
    fn first_column_must_be_the_top_id() {
        let err = compile_for(&["firstName", "id"]).unwrap_err();
        assert!(err.is_markup());
        assert!(err.to_string().contains("first column"));
    }

    #[test]
    fn nested_object_columns_record_their_skip_target() {
        let plan = compile_for(&["id", "address", "a$street", "a$city", "lastName"]).unwrap();
        assert_eq!(plan[1].kind, HandlerKind::SingleObject);
        assert_eq!(plan[1].tail, 4, "skipping the subtree SHOULD land on 'lastName'");
        assert_eq!(plan[2].owner, 1);
    }

    #[test]
    fn nested_object_requires_deeper_prefix() {
        let err = compile_for(&["id", "address", "street"]).unwrap_err();
        assert!(err.to_string().contains("deeper"));
    }

    #[test]
    fn scalar_array_links_the_anchor_chain() {
        let plan = compile_for(&["id", "firstName", "scores", "a$"]).unwrap();
        assert_eq!(plan[0].next_anchor, Some(2));
        assert!(matches!(plan[2].kind, HandlerKind::ValueAnchor { map: false, .. }));
        assert!(matches!(plan[3].kind, HandlerKind::ValueElement { anchor: 2, .. }));
    }

    #[test]
    fn two_collection_axes_at_one_level_are_rejected() {
        let err = compile_for(&["id", "scores", "a$", "addresses", "b$id", "b$street"]).unwrap_err();
        assert!(err
            .to_string()
            .contains("no further columns allowed at this level after a collection"));
    }

    #[test]
    fn sibling_axes_in_nested_objects_collide_on_the_top_anchor() {
        let catalog = RecordTypeCatalog::builder()
            .record_type(RecordTypeDef::new(
                "Holder",
                vec![
                    PropertyDef::number("id").id(),
                    PropertyDef::object("a", vec![PropertyDef::number("xs").array()]),
                    PropertyDef::object("b", vec![PropertyDef::number("ys").array()]),
                ],
            ))
            .build()
            .unwrap();
        let top = catalog.record_type("Holder").unwrap();
        let ls = labels(&["id", "a", "a$xs", "aa$", "b", "b$ys", "ba$"]);
        let err = compile(&catalog, &ls, top).unwrap_err();
        assert!(err.to_string().contains("more than one collection axis"));
    }

    #[test]
    fn fetched_marker_on_non_reference_is_rejected() {
        let err = compile_for(&["id", "firstName:"]).unwrap_err();
        assert!(err.to_string().contains("fetched marker on non-reference"));
    }

    #[test]
    fn fetched_reference_recurses_into_the_referred_type() {
        let plan = compile_for(&["id", "locationRef:", "a$id", "a$name"]).unwrap();
        assert!(matches!(plan[1].kind, HandlerKind::SingleFetchedRef { .. }));
        assert_eq!(plan[1].tail, 4);
        assert_eq!(plan[2].owner, 1, "referred columns SHOULD write into the referred record");
    }

    #[test]
    fn unknown_property_is_a_markup_error() {
        let err = compile_for(&["id", "nickname"]).unwrap_err();
        assert!(err.to_string().contains("unknown property 'nickname'"));
    }

    #[test]
    fn leftover_columns_are_rejected() {
        let err = compile_for(&["id", "address", "a$street", "zz$street"]).unwrap_err();
        assert!(err.to_string().contains("unexpected column prefix"));
    }

    #[test]
    fn polymorphic_object_tier_marks_its_last_subtype() {
        let catalog = RecordTypeCatalog::builder()
            .record_type(RecordTypeDef::new(
                "Account",
                vec![
                    PropertyDef::number("id").id(),
                    PropertyDef::poly_object("paymentInfo", "type")
                        .with_subtype("CREDIT_CARD", vec![PropertyDef::string("last4Digits")])
                        .with_subtype("ACH_TRANSFER", vec![PropertyDef::string("accountType")]),
                ],
            ))
            .build()
            .unwrap();
        let top = catalog.record_type("Account").unwrap();
        let ls = labels(&[
            "id",
            "paymentInfo",
            "a$CREDIT_CARD",
            "aa$last4Digits",
            "a$ACH_TRANSFER",
            "ab$accountType",
        ]);
        let plan = compile(&catalog, &ls, top).unwrap();
        assert_eq!(plan[1].kind, HandlerKind::PolyObjectDispatch);
        assert!(matches!(
            &plan[2].kind,
            HandlerKind::PolyObjectType { is_last: false, .. }
        ));
        assert!(matches!(
            &plan[4].kind,
            HandlerKind::PolyObjectType { is_last: true, .. }
        ));
        assert_eq!(plan[2].tail, 4);
        assert_eq!(plan[4].tail, 6);
    }
}
