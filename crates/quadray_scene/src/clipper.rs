//! A surface's custom clipper list (§4.3 step 8).
//!
//! Incoming `MINUS_INNER`/`MINUS_OUTER`/`MINUS_ACCUM` relations are merged
//! into the target surface's clipper list as it is discovered during the
//! sequential Phase 0 walk. Whenever an incoming clipper's own `trnode`
//! differs from the one already open for the current accumulation
//! segment, a marker element is inserted ahead of it so the tracer can
//! later hoist one inverse-transform lookup across a whole run of
//! same-`trnode` clippers instead of paying for it per clipper.

use crate::ids::NodeId;
use crate::relation::RelationKind;

/// One element of a surface's custom clipper list.
#[derive(Debug, Clone, Copy)]
pub enum ClipperElement {
    /// Declares that every following clipper (up to the next marker or the
    /// list's end) shares this `trnode`, letting the tracer resolve the
    /// inverse transform once per run rather than once per clipper.
    TrnodeMarker(NodeId),
    /// A single clipping surface and the boolean role it plays against the
    /// owning surface.
    Clipper { surface: NodeId, kind: RelationKind },
    /// Opens an accumulation segment (§4.3 step 7, the first half of a
    /// `MINUS_ACCUM` pair): every `Clipper` up to the matching
    /// [`ClipperElement::AccumEnd`] is one "single boolean group" rather
    /// than independent subtractions.
    AccumStart,
    /// Closes the accumulation segment opened by the preceding
    /// [`ClipperElement::AccumStart`].
    AccumEnd,
}

/// Appends `clippers` (all sharing `trnode`, which may be `None` for
/// world-aligned surfaces) onto `list`, inserting a marker first unless
/// the list's current open segment already carries the same `trnode`.
pub fn merge_clippers(
    list: &mut Vec<ClipperElement>,
    trnode: Option<NodeId>,
    clippers: impl IntoIterator<Item = (NodeId, RelationKind)>,
) {
    let open_trnode = current_open_trnode(list);
    let mut clippers = clippers.into_iter().peekable();
    if clippers.peek().is_none() {
        return;
    }
    if open_trnode != trnode {
        if let Some(node) = trnode {
            list.push(ClipperElement::TrnodeMarker(node));
        }
    }
    for (surface, kind) in clippers {
        list.push(ClipperElement::Clipper { surface, kind });
    }
}

/// The `trnode` governing the list's trailing segment, or `None` if the
/// list is empty or its trailing segment has no marker (world-aligned).
fn current_open_trnode(list: &[ClipperElement]) -> Option<NodeId> {
    list.iter().rev().find_map(|el| match el {
        ClipperElement::TrnodeMarker(node) => Some(Some(*node)),
        ClipperElement::Clipper { .. } | ClipperElement::AccumStart | ClipperElement::AccumEnd => None,
    })?
}
