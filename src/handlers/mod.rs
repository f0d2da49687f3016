//! # Column Handlers
//!
//! One handler per markup column, produced once by the compiler and fixed
//! for the life of the parser. A handler is split into two halves:
//!
//! - [`HandlerPlan`]: the immutable configuration: variant tag, owner
//!   handler index, bound extractor, property name, skip target, anchor
//!   link. Cross-references between handlers are column indexes into the
//!   parser-owned plan vector; there are no back pointers.
//! - [`HandlerState`]: the mutable cells: anchor last-value tri-state,
//!   current collection element, open referred-record key, per-row flags.
//!   State is reset whenever an upstream anchor transitions.
//!
//! ## Variant Set
//!
//! | Variant | Column role |
//! |---------|-------------|
//! | TopRecordId | column 0, the top anchor |
//! | SingleValue | scalar property cell |
//! | SingleObject | nested object indicator |
//! | PolyObjectDispatch / PolyObjectType | polymorphic object and its subtype tier |
//! | SingleRef / SingleFetchedRef | reference id cells |
//! | PolyRefDispatch / PolyRefTarget | polymorphic reference and its target tier |
//! | ValueAnchor + ValueElement | scalar or unfetched-ref collection (single-row elements) |
//! | ObjectAnchor | object / poly / fetched-ref collection (multi-row elements) |
//! | FetchedRefElement | fetched reference id cell inside a collection |
//!
//! The row walk itself lives in [`crate::parser`]; it drives these
//! variants by matching on the plan kind.

use crate::extract::ExtractorFn;

/// Immutable per-column configuration, fixed at `init`.
#[derive(Debug, Clone)]
pub(crate) struct HandlerPlan {
    pub kind: HandlerKind,
    /// Handler whose record is the write target (or object owner).
    pub owner: usize,
    /// Property name written by this column. Empty for tier and element
    /// columns that write through their dispatcher or anchor.
    pub prop: String,
    pub extractor: ExtractorFn,
    pub optional: bool,
    /// First column after this handler's subtree; where the walk resumes
    /// when the subtree is absent or already materialized.
    pub tail: usize,
    /// The one downstream anchor chained to this anchor, if any.
    pub next_anchor: Option<usize>,
}

/// The tagged handler variant bound to a column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HandlerKind {
    TopRecordId,
    SingleValue,
    SingleObject,
    PolyObjectDispatch,
    PolyObjectType {
        subtype: String,
        type_prop: String,
        /// Column carrying the shared `has_value` flag: the dispatcher for
        /// scalar properties, the collection anchor for elements.
        dispatch: usize,
        element: bool,
        is_last: bool,
    },
    SingleRef {
        target: String,
    },
    PolyRefDispatch,
    PolyRefTarget {
        target: String,
        dispatch: usize,
        element: bool,
        fetched: bool,
        is_last: bool,
    },
    SingleFetchedRef {
        target: String,
    },
    /// Single-row collection anchor: scalar or unfetched-ref elements, one
    /// element appended per row.
    ValueAnchor {
        map: bool,
        key_ref: Option<String>,
    },
    /// The value cell paired with a `ValueAnchor`.
    ValueElement {
        anchor: usize,
        map: bool,
        ref_target: Option<String>,
    },
    /// Multi-row collection anchor; element boundaries are anchor value
    /// changes. `alloc` anchors create their element objects themselves;
    /// the rest wait for a tier or fetched-ref element to deliver one.
    ObjectAnchor {
        map: bool,
        key_ref: Option<String>,
        alloc: bool,
    },
    /// Fetched reference id cell paired with an `ObjectAnchor`.
    FetchedRefElement {
        anchor: usize,
        target: String,
    },
}

impl HandlerKind {
    /// Anchor columns take part in reset chains and empty marking.
    pub fn is_anchor(&self) -> bool {
        matches!(
            self,
            HandlerKind::TopRecordId
                | HandlerKind::ValueAnchor { .. }
                | HandlerKind::ObjectAnchor { .. }
        )
    }
}

/// Last value observed by an anchor column within the current scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) enum AnchorLast {
    #[default]
    Unseen,
    Null,
    Value(String),
}

/// Current collection element position of an anchor.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ElemKey {
    Index(usize),
    Key(String),
}

/// Mutable per-column state, reset on upstream anchor transitions.
#[derive(Debug, Clone, Default)]
pub(crate) struct HandlerState {
    pub last: AnchorLast,
    /// Top record index (TopRecordId only).
    pub top_index: usize,
    /// Current element of a collection anchor.
    pub elem: Option<ElemKey>,
    /// Extracted map key awaiting its element value (await-mode anchors).
    pub pending_key: Option<String>,
    /// Open referred record key (fetched handlers).
    pub cur_ref: Option<String>,
    /// A subtype or target produced a value (dispatchers and anchors).
    pub has_value: bool,
}

impl HandlerState {
    pub fn clear(&mut self) {
        *self = HandlerState::default();
    }
}
