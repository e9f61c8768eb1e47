//! Array relations (§3 `Array`, §4.3 step 7).
//!
//! A relation is a tuple `(obj1, kind, obj2)` where `obj1`/`obj2` index
//! into the owning array's child list (`-1` is a sentinel meaning "no
//! second operand", used by `INDEX_ARRAY`/`BOUND_ARRAY`/`UNTIE_ARRAY`
//! which take a single operand).

/// The eight relation kinds an `Array` may declare between its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Subtract `obj2` from `obj1`'s inner surface (carve a cavity).
    MinusInner,
    /// Subtract `obj2` from `obj1`'s outer surface (carve from outside).
    MinusOuter,
    /// One of a *pair* bracketing a run of `MINUS_INNER`/`MINUS_OUTER`
    /// relations against the same `obj1` target into one accumulation
    /// segment (`obj2` is unused — this relation is an enter/leave
    /// bracket, not a clipper of its own). At trace time the bracketed
    /// run is evaluated as a single boolean group rather than each
    /// clipper subtracting independently.
    MinusAccum,
    /// Narrows the left/right sub-array scope used to resolve the
    /// *following* relation's `obj1`/`obj2` indices (§4.3 step 7):
    /// whichever of `obj1`/`obj2` names a child that is itself an
    /// `Array` becomes that next relation's left-hand/right-hand child
    /// list instead of the immediate array's own children. One-shot —
    /// it narrows only the single relation right after it.
    IndexArray,
    /// Mark `obj1` as the bounding volume for `obj2` (sets `obj2`'s
    /// `bvnode`).
    BoundArray,
    /// Remove a previously established `BoundArray` relationship.
    UntieArray,
    /// Index-addressed variant of `BOUND_ARRAY`: `obj2` is resolved via
    /// array indexing rather than a direct child reference.
    BoundIndex,
    /// Index-addressed variant of `UNTIE_ARRAY`.
    UntieIndex,
}

impl RelationKind {
    /// Whether this relation kind participates in the boolean clip
    /// (subtracts one surface from another at trace time) as opposed to
    /// only affecting bounds bookkeeping.
    #[must_use]
    pub fn is_boolean_clip(self) -> bool {
        matches!(self, RelationKind::MinusInner | RelationKind::MinusOuter)
    }
}

/// One relation declared within an [`crate::node::ArrayData`] (§3 `Array`).
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    /// Index into the owning array's children, or `-1` for relations that
    /// take only one operand.
    pub obj1: i32,
    pub kind: RelationKind,
    /// Index into the owning array's children, or `-1` when unused.
    pub obj2: i32,
}

impl Relation {
    /// Returns whether `index` is a valid non-sentinel operand.
    #[must_use]
    pub fn is_valid_operand(index: i32, child_count: usize) -> bool {
        index >= 0 && (index as usize) < child_count
    }
}
