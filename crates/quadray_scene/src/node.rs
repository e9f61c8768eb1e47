//! The unified scene node (§3 `Object`).
//!
//! The original class hierarchy (`Object -> Node -> Array / Surface ->
//! Quadric -> Cylinder/...`) has exactly two polymorphism points — `update`
//! and `adjust_minmax` — so it is represented here as one struct of shared
//! `Object` fields plus a [`NodeKind`] tagged union carrying the
//! variant-specific payload, dispatched on in `quadray_render` rather than
//! through virtual calls.

use glam::{Affine3A, Vec3};
use smallvec::SmallVec;

use crate::camera::CameraData;
use crate::clipper::ClipperElement;
use crate::ids::{MaterialId, NodeId};
use crate::light::LightData;
use crate::relation::Relation;
use quadray_core::transform::Transform3D;

/// Hard caps on a generated bounding polyhedron (§7 `LimitExceeded`).
pub const VERTS_LIMIT: usize = 8;
pub const EDGES_LIMIT: usize = 12;
pub const FACES_LIMIT: usize = 6;

/// Axis label meaning "no dominant axis" — used on polyhedron edges/faces
/// whose vertices were transformed through a non-self `trnode` (§4.4 step
/// 3).
pub const NO_DOMINANT_AXIS: u8 = 3;

/// Per-frame animation hook: `(time, prev_time, transform) -> ()`, mutating
/// the node's local [`Transform3D`] in place (§6 scene literal format).
///
/// Bounded `Send + Sync` (rather than just `Send`) so the owning [`Scene`]
/// stays `Sync` as a whole — the render-phase thread dispatch (§5
/// "Sorting + Render") shares a read-only `&Scene` across workers, and a
/// non-`Sync` field anywhere in the node arena would poison that for the
/// whole struct even though animation closures are only ever called from
/// Phase 0's single coordinator thread.
///
/// [`Scene`]: crate::scene::Scene
pub type AnimationFn = Box<dyn FnMut(f32, f32, &mut Transform3D) + Send + Sync>;

/// The analytic shape a [`SurfaceData`] implements, carrying the one or
/// two extra scalars each non-quadric-uniform variant needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind {
    Plane,
    Cylinder,
    Sphere,
    Cone { ratio: f32 },
    Paraboloid { par: f32 },
    Hyperboloid { rat: f32, hyp: f32 },
}

impl ShapeKind {
    /// Number of polyhedron vertices this shape generates when its clipper
    /// box is finite (§4.4 step 3): 4 for a plane, 8 for any clipped
    /// quadric.
    #[must_use]
    pub fn vertex_count(self) -> usize {
        match self {
            ShapeKind::Plane => 4,
            _ => 8,
        }
    }

    #[must_use]
    pub fn edge_count(self) -> usize {
        match self {
            ShapeKind::Plane => 4,
            _ => EDGES_LIMIT,
        }
    }

    #[must_use]
    pub fn face_count(self) -> usize {
        match self {
            ShapeKind::Plane => 1,
            _ => FACES_LIMIT,
        }
    }
}

/// One side (outer or inner) of a surface: the material it shades with.
#[derive(Debug, Clone, Copy)]
pub struct Side {
    pub material: MaterialId,
}

/// A generated bounding polyhedron: vertex positions plus axis-labeled
/// edges and faces, capped at [`VERTS_LIMIT`]/[`EDGES_LIMIT`]/[`FACES_LIMIT`].
/// Backed by [`SmallVec`] rather than `Vec`: every instance is at or under
/// its cap (8/12/6 elements), so the common clipped-quadric case never
/// touches the heap.
#[derive(Debug, Clone, Default)]
pub struct Polyhedron {
    pub verts: SmallVec<[Vec3; VERTS_LIMIT]>,
    /// Each edge: `(v0, v1, axis_label)`.
    pub edges: SmallVec<[(u8, u8, u8); EDGES_LIMIT]>,
    /// Each face: `(vertex indices, axis_label)`.
    pub faces: SmallVec<[(SmallVec<[u8; 4]>, u8); FACES_LIMIT]>,
}

/// The SIMD side-car struct written during Phase 1 (§4.4 step 6): the
/// backend-facing packed form of a surface's per-frame state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimdSideCar {
    /// Axis-map bytes, offset by 3 when this surface sits under a non-self
    /// `trnode` (§4.4 step 6).
    pub axis_map: [u8; 3],
    pub axis_sgn: [f32; 3],
    pub coeffs: (f32, f32, f32),
    pub bmin: Vec3,
    pub bmax: Vec3,
    pub cmin: Vec3,
    pub cmax: Vec3,
}

/// Quadric-surface payload (§3 `Surface`).
#[derive(Debug, Clone)]
pub struct SurfaceData {
    pub shape: ShapeKind,
    pub coeffs: (f32, f32, f32),
    /// Local clipper box; components may be `±∞` (§3 invariant).
    pub clipper_min: Vec3,
    pub clipper_max: Vec3,
    pub outer: Side,
    pub inner: Option<Side>,
    /// World-frame bounding box after Phase 1 (`bmin <= bmax`).
    pub bbox_min: Vec3,
    pub bbox_max: Vec3,
    /// World-frame clipping box after Phase 1.
    pub cbox_min: Vec3,
    pub cbox_max: Vec3,
    pub bsphere_mid: Vec3,
    pub bsphere_rad: f32,
    pub custom_clippers: Vec<ClipperElement>,
    pub polyhedron: Polyhedron,
    pub simd: SimdSideCar,
    /// World-space inverse matrix, populated only for this surface's own
    /// `trnode` (§4.4 step 5).
    pub inverse: Option<Affine3A>,
}

impl SurfaceData {
    #[must_use]
    pub fn new(shape: ShapeKind, coeffs: (f32, f32, f32), outer: Side, inner: Option<Side>) -> Self {
        Self {
            shape,
            coeffs,
            clipper_min: Vec3::splat(f32::NEG_INFINITY),
            clipper_max: Vec3::splat(f32::INFINITY),
            outer,
            inner,
            bbox_min: Vec3::splat(f32::NEG_INFINITY),
            bbox_max: Vec3::splat(f32::INFINITY),
            cbox_min: Vec3::splat(f32::NEG_INFINITY),
            cbox_max: Vec3::splat(f32::INFINITY),
            bsphere_mid: Vec3::ZERO,
            bsphere_rad: f32::INFINITY,
            custom_clippers: Vec::new(),
            polyhedron: Polyhedron::default(),
            simd: SimdSideCar::default(),
            inverse: None,
        }
    }
}

/// Interior-node payload (§3 `Array`).
#[derive(Debug, Clone)]
pub struct ArrayData {
    pub children: Vec<NodeId>,
    pub relations: Vec<Relation>,
    /// World-space AABB enclosing every child (and any `bvnode`-attached
    /// grandchild), recomputed by `quadray_render` once Phase 1 has
    /// settled every descendant surface's own bbox (§4.4 step 1-2, "for
    /// each surface (or array) in parallel"). Not consulted by the tile
    /// projector itself (which walks surfaces directly per §4.5), but
    /// available for bvnode-aware culling built on top of this crate.
    pub bbox_min: Vec3,
    pub bbox_max: Vec3,
}

impl Default for ArrayData {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            relations: Vec::new(),
            bbox_min: Vec3::splat(f32::INFINITY),
            bbox_max: Vec3::splat(f32::NEG_INFINITY),
        }
    }
}

/// The variant-specific payload of a scene node.
pub enum NodeKind {
    Array(ArrayData),
    Surface(SurfaceData),
    Camera(CameraData),
    Light(LightData),
}

impl NodeKind {
    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayData> {
        match self {
            NodeKind::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array_mut(&mut self) -> Option<&mut ArrayData> {
        match self {
            NodeKind::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_surface(&self) -> Option<&SurfaceData> {
        match self {
            NodeKind::Surface(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_surface_mut(&mut self) -> Option<&mut SurfaceData> {
        match self {
            NodeKind::Surface(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_camera(&self) -> Option<&CameraData> {
        match self {
            NodeKind::Camera(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_camera_mut(&mut self) -> Option<&mut CameraData> {
        match self {
            NodeKind::Camera(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_light(&self) -> Option<&LightData> {
        match self {
            NodeKind::Light(l) => Some(l),
            _ => None,
        }
    }

    /// Whether a `trnode` is ever collapsed through this node when
    /// transform caching is disabled (§4.3 step 5): true for Camera and
    /// Light, which are leaves with no descendants that could reuse a
    /// cached transform.
    #[must_use]
    pub fn is_non_surface_non_array(&self) -> bool {
        matches!(self, NodeKind::Camera(_) | NodeKind::Light(_))
    }
}

/// A scene node: the shared `Object` fields plus its [`NodeKind`] payload
/// (§3 `Object`).
pub struct ObjectNode {
    pub transform: Transform3D,
    pub animation: Option<AnimationFn>,
    pub parent: Option<NodeId>,
    /// World-space matrix `M`.
    pub matrix: Affine3A,
    pub axis_map: [u8; 3],
    pub axis_sgn: [f32; 3],
    /// Nearest ancestor-or-self with a non-trivial transform; `None` means
    /// "axis-aligned relative to world" (§3 `Object`).
    pub trnode: Option<NodeId>,
    /// Ancestor `Array` that explicitly groups this node as a bounding
    /// volume (§9 Glossary `Bvnode`).
    pub bvnode: Option<NodeId>,
    /// Whether this node's own transform is non-trivial (§4.3 step 2).
    pub obj_has_trm: bool,
    /// Bitmask of which transform components (`SCL`/`ROT`) this node
    /// contributes to its children, independent of `obj_has_trm` (§4.3
    /// step 2, step 6).
    pub mtx_has_trm: TrmBits,
    pub kind: NodeKind,
}

bitflags::bitflags! {
    /// Which contribution categories a node's matrix carries, tracked
    /// separately from whether the node *is* its own `trnode` (§4.3 step 2,
    /// step 4 special case).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TrmBits: u8 {
        const SCL = 1 << 0;
        const ROT = 1 << 1;
    }
}

impl ObjectNode {
    #[must_use]
    pub fn new(transform: Transform3D, kind: NodeKind) -> Self {
        Self {
            transform,
            animation: None,
            parent: None,
            matrix: Affine3A::IDENTITY,
            axis_map: [0, 1, 2],
            axis_sgn: [1.0, 1.0, 1.0],
            trnode: None,
            bvnode: None,
            obj_has_trm: false,
            mtx_has_trm: TrmBits::empty(),
            kind,
        }
    }
}
