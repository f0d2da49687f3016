//! # Row Walk
//!
//! One `step` per column: the handler bound to the cursor's column reads
//! its cell, mutates the record tree and returns the column to resume at.
//! Handlers skip forward over absent subtrees and already-materialized
//! fetched referents; anchors transfer the cursor down the anchor chain
//! when their value repeats.
//!
//! Write targets are resolved by walking a handler's owner chain up to a
//! root (a top record or a referred record) and collecting the property
//! and element steps on the way; the resulting path is then descended in
//! the owned record tree. No handler holds a pointer into the tree.

use super::{Parser, RowSource, Span};
use crate::error::{Error, Result};
use crate::handlers::{AnchorLast, ElemKey, HandlerKind, HandlerPlan};
use crate::types::{Record, SourceValue, Value};
use smallvec::SmallVec;
use tracing::trace;

static NULL_CELL: SourceValue = SourceValue::Null;

/// Root of a write-target path.
enum Root {
    Top(usize),
    Referred(String),
}

/// One step of a write-target path.
enum PathStep {
    Prop(String),
    Elem(ElemKey),
}

type Path = SmallVec<[PathStep; 8]>;

/// Outcome of sighting a fetched referred record.
enum Begin {
    New,
    AlreadyMaterialized,
}

impl Parser {
    pub(crate) fn step<R: RowSource + ?Sized>(
        &mut self,
        plan: &[HandlerPlan],
        col: usize,
        row: &R,
        row_num: u64,
    ) -> Result<usize> {
        let p = &plan[col];
        let cell = row.cell(col, &self.labels[col]).unwrap_or(&NULL_CELL);

        match &p.kind {
            HandlerKind::TopRecordId => self.top_record_id(plan, col, cell, row_num),
            HandlerKind::SingleValue => {
                match (p.extractor)(cell, row_num, col)? {
                    None => {
                        if !p.optional {
                            return Err(null_required(row_num, col, &p.prop));
                        }
                    }
                    Some(v) => {
                        let prop = p.prop.clone();
                        self.target_record_mut(plan, p.owner, row_num, col)?.insert(prop, v);
                    }
                }
                Ok(col + 1)
            }
            HandlerKind::SingleObject => {
                if cell.is_null() {
                    if !p.optional {
                        return Err(null_required(row_num, col, &p.prop));
                    }
                    self.mark_empty(plan, col, p.tail);
                    Ok(p.tail)
                } else {
                    let prop = p.prop.clone();
                    self.target_record_mut(plan, p.owner, row_num, col)?
                        .insert(prop, Value::Object(Record::new()));
                    Ok(col + 1)
                }
            }
            HandlerKind::PolyObjectDispatch | HandlerKind::PolyRefDispatch => Ok(col + 1),
            HandlerKind::PolyObjectType {
                subtype,
                type_prop,
                dispatch,
                element,
                is_last,
            } => {
                let (dispatch, element, is_last) = (*dispatch, *element, *is_last);
                if cell.is_null() {
                    self.mark_empty(plan, col, p.tail);
                    if is_last && !self.state[dispatch].has_value {
                        if element {
                            return Err(Error::data(
                                row_num,
                                col,
                                "no value for a polymorphic collection element",
                            ));
                        }
                        if !p.optional {
                            return Err(null_required(row_num, col, &p.prop));
                        }
                    }
                    return Ok(p.tail);
                }
                if self.state[dispatch].has_value {
                    return Err(Error::data(
                        row_num,
                        col,
                        "more than one value for a polymorphic object",
                    ));
                }
                let mut rec = Record::new();
                rec.insert(type_prop.clone(), Value::String(subtype.clone()));
                if element {
                    self.anchor_got_value(plan, dispatch, Value::Object(rec), row_num, col)?;
                } else {
                    let prop = p.prop.clone();
                    self.target_record_mut(plan, p.owner, row_num, col)?
                        .insert(prop, Value::Object(rec));
                    self.state[dispatch].has_value = true;
                }
                Ok(col + 1)
            }
            HandlerKind::SingleRef { target } => {
                match (p.extractor)(cell, row_num, col)? {
                    None => {
                        if !p.optional {
                            return Err(null_required(row_num, col, &p.prop));
                        }
                    }
                    Some(id) => {
                        let reference = reference_value(target, &id, row_num, col)?;
                        let prop = p.prop.clone();
                        self.target_record_mut(plan, p.owner, row_num, col)?
                            .insert(prop, Value::Ref(reference));
                    }
                }
                Ok(col + 1)
            }
            HandlerKind::PolyRefTarget {
                target,
                dispatch,
                element,
                fetched,
                is_last,
            } => {
                let (dispatch, element, fetched, is_last) = (*dispatch, *element, *fetched, *is_last);
                match (p.extractor)(cell, row_num, col)? {
                    None => {
                        if fetched {
                            self.mark_empty(plan, col, p.tail);
                        }
                        if is_last && !self.state[dispatch].has_value {
                            if element {
                                return Err(Error::data(
                                    row_num,
                                    col,
                                    "no value for a polymorphic collection element",
                                ));
                            }
                            if !p.optional {
                                return Err(null_required(row_num, col, &p.prop));
                            }
                        }
                        Ok(p.tail)
                    }
                    Some(id) => {
                        if self.state[dispatch].has_value {
                            return Err(Error::data(
                                row_num,
                                col,
                                "more than one value for a polymorphic reference",
                            ));
                        }
                        let key = reference_value(target, &id, row_num, col)?;
                        if element {
                            self.anchor_got_value(plan, dispatch, Value::Ref(key.clone()), row_num, col)?;
                        } else {
                            let prop = p.prop.clone();
                            self.target_record_mut(plan, p.owner, row_num, col)?
                                .insert(prop, Value::Ref(key.clone()));
                            self.state[dispatch].has_value = true;
                        }
                        if !fetched {
                            return Ok(col + 1);
                        }
                        match self.begin_referred(key.clone(), col, p.tail == col + 1, row_num) {
                            Begin::AlreadyMaterialized => Ok(p.tail),
                            Begin::New => {
                                self.state[col].cur_ref = Some(key);
                                Ok(col + 1)
                            }
                        }
                    }
                }
            }
            HandlerKind::SingleFetchedRef { target } => {
                match (p.extractor)(cell, row_num, col)? {
                    None => {
                        if !p.optional {
                            return Err(null_required(row_num, col, &p.prop));
                        }
                        self.mark_empty(plan, col, p.tail);
                        Ok(p.tail)
                    }
                    Some(id) => {
                        let key = reference_value(target, &id, row_num, col)?;
                        let prop = p.prop.clone();
                        self.target_record_mut(plan, p.owner, row_num, col)?
                            .insert(prop, Value::Ref(key.clone()));
                        match self.begin_referred(key.clone(), col, p.tail == col + 1, row_num) {
                            Begin::AlreadyMaterialized => Ok(p.tail),
                            Begin::New => {
                                self.state[col].cur_ref = Some(key);
                                Ok(col + 1)
                            }
                        }
                    }
                }
            }
            HandlerKind::ValueAnchor { map, key_ref } => {
                self.value_anchor(plan, col, cell, row_num, *map, key_ref.clone())
            }
            HandlerKind::ValueElement {
                anchor,
                map,
                ref_target,
            } => {
                let (anchor, map) = (*anchor, *map);
                let value = match ((p.extractor)(cell, row_num, col)?, ref_target) {
                    (None, _) => None,
                    (Some(id), Some(target)) => {
                        Some(Value::Ref(reference_value(target, &id, row_num, col)?))
                    }
                    (Some(v), None) => Some(v),
                };
                if map {
                    // NULL map element values leave the key absent.
                    if let Some(v) = value {
                        let key = self.state[anchor]
                            .pending_key
                            .clone()
                            .ok_or_else(|| corrupt(row_num, col))?;
                        self.collection_value_mut(plan, anchor, row_num, col)?
                            .as_map_mut()
                            .ok_or_else(|| corrupt(row_num, col))?
                            .insert(key, v);
                    }
                } else {
                    self.collection_value_mut(plan, anchor, row_num, col)?
                        .as_array_mut()
                        .ok_or_else(|| corrupt(row_num, col))?
                        .push(value.unwrap_or(Value::Null));
                }
                Ok(col + 1)
            }
            HandlerKind::ObjectAnchor { map, key_ref, alloc } => {
                self.object_anchor(plan, col, cell, row_num, *map, key_ref.clone(), *alloc)
            }
            HandlerKind::FetchedRefElement { anchor, target } => {
                let anchor = *anchor;
                match (p.extractor)(cell, row_num, col)? {
                    None => {
                        let is_map = matches!(
                            plan[anchor].kind,
                            HandlerKind::ObjectAnchor { map: true, .. }
                        );
                        if !is_map {
                            self.anchor_got_value(plan, anchor, Value::Null, row_num, col)?;
                        }
                        self.mark_empty(plan, col, p.tail);
                        Ok(p.tail)
                    }
                    Some(id) => {
                        let key = reference_value(target, &id, row_num, col)?;
                        self.anchor_got_value(plan, anchor, Value::Ref(key.clone()), row_num, col)?;
                        match self.begin_referred(key.clone(), col, p.tail == col + 1, row_num) {
                            Begin::AlreadyMaterialized => Ok(p.tail),
                            Begin::New => {
                                self.state[col].cur_ref = Some(key);
                                Ok(col + 1)
                            }
                        }
                    }
                }
            }
        }
    }

    fn top_record_id(
        &mut self,
        plan: &[HandlerPlan],
        col: usize,
        cell: &SourceValue,
        row_num: u64,
    ) -> Result<usize> {
        let p = &plan[col];
        let id = (p.extractor)(cell, row_num, col)?
            .ok_or_else(|| Error::data(row_num, col, "NULL value in the top record id column"))?;
        let id_str = id
            .key_string()
            .ok_or_else(|| corrupt(row_num, col))?;
        if let AnchorLast::Value(prev) = &self.state[col].last {
            if *prev == id_str {
                return match p.next_anchor {
                    Some(next) => Ok(next),
                    None => Err(Error::data(
                        row_num,
                        col,
                        "at least one anchor must change in each row",
                    )),
                };
            }
        }
        self.reset_chain(col, row_num);
        let mut rec = Record::new();
        rec.insert(p.prop.clone(), id);
        self.records.push(rec);
        self.state[col].top_index = self.records.len() - 1;
        self.state[col].last = AnchorLast::Value(id_str);
        Ok(col + 1)
    }

    /// Single-row collection anchor: scalar and unfetched-ref collections
    /// append one element per row.
    fn value_anchor(
        &mut self,
        plan: &[HandlerPlan],
        col: usize,
        cell: &SourceValue,
        row_num: u64,
        map: bool,
        key_ref: Option<String>,
    ) -> Result<usize> {
        let p = &plan[col];
        let key = if map {
            self.anchor_string(p, cell, row_num, col, key_ref.as_deref())?
        } else if cell.is_null() {
            None
        } else {
            Some(String::new())
        };
        match (key, self.state[col].last.clone()) {
            (None, AnchorLast::Unseen) => {
                self.state[col].last = AnchorLast::Null;
                Ok(p.tail)
            }
            (None, AnchorLast::Null) => {
                Err(Error::data(row_num, col, "repeated NULL in anchor column"))
            }
            (None, AnchorLast::Value(_)) => Err(Error::data(
                row_num,
                col,
                "unexpected NULL in anchor column",
            )),
            (Some(_), AnchorLast::Null) => Err(Error::data(
                row_num,
                col,
                "NULL expected in anchor column",
            )),
            (Some(key), AnchorLast::Unseen) => {
                let prop = p.prop.clone();
                let empty = if map {
                    Value::Map(indexmap::IndexMap::new())
                } else {
                    Value::Array(Vec::new())
                };
                self.target_record_mut(plan, p.owner, row_num, col)?.insert(prop, empty);
                if map {
                    self.state[col].pending_key = Some(key.clone());
                }
                self.state[col].last = AnchorLast::Value(key);
                Ok(col + 1)
            }
            (Some(key), AnchorLast::Value(prev)) => {
                if map {
                    if key == prev {
                        return Err(Error::data(
                            row_num,
                            col,
                            format!("repeated key '{}' in map", key),
                        ));
                    }
                    let exists = self
                        .collection_value_mut(plan, col, row_num, col)?
                        .as_map_mut()
                        .ok_or_else(|| corrupt(row_num, col))?
                        .contains_key(&key);
                    if exists {
                        return Err(Error::data(
                            row_num,
                            col,
                            format!("repeated key '{}' in map", key),
                        ));
                    }
                    self.state[col].pending_key = Some(key.clone());
                    self.state[col].last = AnchorLast::Value(key);
                }
                Ok(col + 1)
            }
        }
    }

    /// Multi-row collection anchor: element boundaries are value changes.
    #[allow(clippy::too_many_arguments)]
    fn object_anchor(
        &mut self,
        plan: &[HandlerPlan],
        col: usize,
        cell: &SourceValue,
        row_num: u64,
        map: bool,
        key_ref: Option<String>,
        alloc: bool,
    ) -> Result<usize> {
        let p = &plan[col];
        let value = self.anchor_string(p, cell, row_num, col, key_ref.as_deref())?;
        match (value, self.state[col].last.clone()) {
            (None, AnchorLast::Unseen) => {
                // Subtree absent; collections are trailing, so the rest of
                // the row belongs to it.
                self.state[col].last = AnchorLast::Null;
                Ok(plan.len())
            }
            (None, AnchorLast::Null) => {
                Err(Error::data(row_num, col, "repeated NULL in anchor column"))
            }
            (None, AnchorLast::Value(_)) => Err(Error::data(
                row_num,
                col,
                "unexpected NULL in anchor column",
            )),
            (Some(_), AnchorLast::Null) => Err(Error::data(
                row_num,
                col,
                "NULL expected in anchor column",
            )),
            (Some(value), last) => {
                if let AnchorLast::Value(prev) = &last {
                    if *prev == value {
                        return match p.next_anchor {
                            Some(next) => Ok(next),
                            None => Err(Error::data(
                                row_num,
                                col,
                                "at least one anchor must change in each row",
                            )),
                        };
                    }
                }
                self.reset_chain(col, row_num);
                if last == AnchorLast::Unseen {
                    let prop = p.prop.clone();
                    let empty = if map {
                        Value::Map(indexmap::IndexMap::new())
                    } else {
                        Value::Array(Vec::new())
                    };
                    self.target_record_mut(plan, p.owner, row_num, col)?.insert(prop, empty);
                }
                self.state[col].has_value = false;
                self.state[col].elem = None;
                self.state[col].pending_key = None;
                if map {
                    let exists = self
                        .collection_value_mut(plan, col, row_num, col)?
                        .as_map_mut()
                        .ok_or_else(|| corrupt(row_num, col))?
                        .contains_key(&value);
                    if exists {
                        return Err(Error::data(
                            row_num,
                            col,
                            format!("repeated key '{}' in map", value),
                        ));
                    }
                }
                if alloc {
                    let elem = Value::Object(Record::new());
                    let coll = self.collection_value_mut(plan, col, row_num, col)?;
                    let key = if map {
                        coll.as_map_mut()
                            .ok_or_else(|| corrupt(row_num, col))?
                            .insert(value.clone(), elem);
                        ElemKey::Key(value.clone())
                    } else {
                        let arr = coll.as_array_mut().ok_or_else(|| corrupt(row_num, col))?;
                        arr.push(elem);
                        ElemKey::Index(arr.len() - 1)
                    };
                    self.state[col].elem = Some(key);
                } else if map {
                    self.state[col].pending_key = Some(value.clone());
                }
                self.state[col].last = AnchorLast::Value(value);
                Ok(col + 1)
            }
        }
    }

    /// Delivers a collection element produced by a tier or fetched-ref
    /// handler to its await-mode anchor.
    fn anchor_got_value(
        &mut self,
        plan: &[HandlerPlan],
        anchor: usize,
        value: Value,
        row_num: u64,
        col: usize,
    ) -> Result<()> {
        let map = matches!(plan[anchor].kind, HandlerKind::ObjectAnchor { map: true, .. });
        if map {
            let key = self.state[anchor]
                .pending_key
                .clone()
                .ok_or_else(|| corrupt(row_num, col))?;
            self.collection_value_mut(plan, anchor, row_num, col)?
                .as_map_mut()
                .ok_or_else(|| corrupt(row_num, col))?
                .insert(key.clone(), value);
            self.state[anchor].elem = Some(ElemKey::Key(key));
        } else {
            let arr_len = {
                let arr = self
                    .collection_value_mut(plan, anchor, row_num, col)?
                    .as_array_mut()
                    .ok_or_else(|| corrupt(row_num, col))?;
                arr.push(value);
                arr.len()
            };
            self.state[anchor].elem = Some(ElemKey::Index(arr_len - 1));
        }
        self.state[anchor].has_value = true;
        Ok(())
    }

    /// Canonical comparison/key string of an anchor cell.
    fn anchor_string(
        &self,
        p: &HandlerPlan,
        cell: &SourceValue,
        row_num: u64,
        col: usize,
        key_ref: Option<&str>,
    ) -> Result<Option<String>> {
        let value = match (p.extractor)(cell, row_num, col)? {
            None => return Ok(None),
            Some(v) => v,
        };
        let raw = value
            .key_string()
            .ok_or_else(|| Error::data(row_num, col, "anchor value is not scalar"))?;
        Ok(Some(match key_ref {
            Some(target) => format!("{}#{}", target, raw),
            None => raw,
        }))
    }

    /// Resets every handler past `from`, closing open referred-record
    /// spans on the way.
    pub(crate) fn reset_chain(&mut self, from: usize, row_num: u64) {
        for c in from + 1..self.state.len() {
            if let Some(key) = self.state[c].cur_ref.take() {
                self.close_span(key, c, row_num);
            }
            self.state[c].clear();
        }
    }

    fn close_span(&mut self, key: String, col: usize, row_num: u64) {
        if let Some(span) = self.spans.get_mut(&(key, col)) {
            if let Span::Open { start } = span {
                let rows = row_num.saturating_sub(*start).max(1);
                trace!(rows, "referred record span closed");
                *span = Span::Closed { rows };
            }
        }
    }

    /// Marks anchors inside a skipped subtree as seen-and-empty, so a
    /// later row reaching them directly trips the repeated-NULL check.
    fn mark_empty(&mut self, plan: &[HandlerPlan], from: usize, to: usize) {
        for c in from + 1..to.min(plan.len()) {
            if plan[c].kind.is_anchor() {
                self.state[c].last = AnchorLast::Null;
            }
        }
    }

    /// First or repeat sighting of a fetched referred record at a column.
    fn begin_referred(&mut self, key: String, col: usize, no_tail: bool, row_num: u64) -> Begin {
        if !self.referred.contains_key(&key) {
            trace!(key = %key, "referred record created");
            self.referred.insert(key.clone(), Record::new());
        } else {
            match self.spans.get(&(key.clone(), col)) {
                Some(Span::Closed { rows }) => {
                    if *rows > 1 {
                        self.skip_next_n_rows = rows - 1;
                        trace!(key = %key, skip = self.skip_next_n_rows, "referred record already materialized");
                    }
                    return Begin::AlreadyMaterialized;
                }
                Some(Span::NoSkip) => return Begin::AlreadyMaterialized,
                _ => {}
            }
        }
        let span = if no_tail {
            Span::NoSkip
        } else {
            Span::Open { start: row_num }
        };
        self.spans.insert((key, col), span);
        Begin::New
    }

    /// Resolves the record a handler writes into, by owner chain and then
    /// by descent of the owned tree.
    pub(crate) fn target_record_mut(
        &mut self,
        plan: &[HandlerPlan],
        handler: usize,
        row_num: u64,
        col: usize,
    ) -> Result<&mut Record> {
        let (root, path) = self.locate(plan, handler, row_num, col)?;
        let rec = match root {
            Root::Top(index) => self
                .records
                .get_mut(index)
                .ok_or_else(|| corrupt(row_num, col))?,
            Root::Referred(key) => self
                .referred
                .get_mut(&key)
                .ok_or_else(|| corrupt(row_num, col))?,
        };
        descend(rec, &path).ok_or_else(|| corrupt(row_num, col))
    }

    /// The collection value owned by an anchor column.
    fn collection_value_mut(
        &mut self,
        plan: &[HandlerPlan],
        anchor: usize,
        row_num: u64,
        col: usize,
    ) -> Result<&mut Value> {
        let prop = plan[anchor].prop.clone();
        let rec = self.target_record_mut(plan, plan[anchor].owner, row_num, col)?;
        rec.get_mut(&prop).ok_or_else(|| corrupt(row_num, col))
    }

    fn locate(
        &self,
        plan: &[HandlerPlan],
        handler: usize,
        row_num: u64,
        col: usize,
    ) -> Result<(Root, Path)> {
        let mut steps: Path = SmallVec::new();
        let mut current = handler;
        let root = loop {
            let p = &plan[current];
            let state = &self.state[current];
            match &p.kind {
                HandlerKind::TopRecordId => break Root::Top(state.top_index),
                HandlerKind::SingleObject => {
                    steps.push(PathStep::Prop(p.prop.clone()));
                    current = p.owner;
                }
                HandlerKind::PolyObjectType { element: false, .. } => {
                    steps.push(PathStep::Prop(p.prop.clone()));
                    current = p.owner;
                }
                HandlerKind::PolyObjectType { element: true, dispatch, .. } => {
                    current = *dispatch;
                }
                HandlerKind::ObjectAnchor { .. } => {
                    let elem = state.elem.clone().ok_or_else(|| corrupt(row_num, col))?;
                    steps.push(PathStep::Elem(elem));
                    steps.push(PathStep::Prop(p.prop.clone()));
                    current = p.owner;
                }
                HandlerKind::SingleFetchedRef { .. }
                | HandlerKind::FetchedRefElement { .. }
                | HandlerKind::PolyRefTarget { fetched: true, .. } => {
                    let key = state.cur_ref.clone().ok_or_else(|| corrupt(row_num, col))?;
                    break Root::Referred(key);
                }
                _ => return Err(corrupt(row_num, col)),
            }
        };
        steps.reverse();
        Ok((root, steps))
    }
}

/// Descends a record along an alternating property/element path.
fn descend<'r>(rec: &'r mut Record, steps: &[PathStep]) -> Option<&'r mut Record> {
    let mut cur: &'r mut Record = rec;
    let mut i = 0;
    while i < steps.len() {
        let PathStep::Prop(name) = &steps[i] else {
            return None;
        };
        let mut val = cur.get_mut(name)?;
        i += 1;
        if let Some(PathStep::Elem(key)) = steps.get(i) {
            i += 1;
            val = match (key, val) {
                (ElemKey::Index(index), Value::Array(items)) => items.get_mut(*index)?,
                (ElemKey::Key(k), Value::Map(map)) => map.get_mut(k)?,
                _ => return None,
            };
        }
        cur = val.as_object_mut()?;
    }
    Some(cur)
}

/// Canonical reference value for a referred id.
fn reference_value(target: &str, id: &Value, row_num: u64, col: usize) -> Result<String> {
    let raw = id
        .key_string()
        .ok_or_else(|| Error::data(row_num, col, "reference id is not scalar"))?;
    Ok(format!("{}#{}", target, raw))
}

fn null_required(row_num: u64, col: usize, prop: &str) -> Error {
    Error::data(
        row_num,
        col,
        format!("NULL value for non-optional property '{}'", prop),
    )
}

fn corrupt(row_num: u64, col: usize) -> Error {
    Error::data(row_num, col, "parser record tree is inconsistent")
}
