//! Scene literal format (§6): an in-memory tree the embedding application
//! builds once and hands to [`crate::scene::Scene::build`]. Kept distinct
//! from [`crate::node::ObjectNode`] because the literal is tag-dispatched
//! and owns not-yet-resolved animation closures, whereas the built scene
//! graph is arena-indexed and ready for Phase 0.

use glam::Vec3;

use crate::ids::MaterialId;
use crate::node::{AnimationFn, ShapeKind};
use crate::relation::Relation;
use quadray_core::transform::Transform3D;

/// One side of a surface literal: a material reference plus its UV
/// transform (the latter lives on [`crate::material::Material`] itself in
/// the built graph; the literal only needs the pointer).
pub struct SideLiteral {
    pub material: MaterialId,
}

/// A surface literal: shared fields for all six [`ShapeKind`] variants.
pub struct SurfaceLiteral {
    pub transform: Transform3D,
    pub animation: Option<AnimationFn>,
    pub shape: ShapeKind,
    pub coeffs: (f32, f32, f32),
    pub clipper_min: Vec3,
    pub clipper_max: Vec3,
    pub outer: SideLiteral,
    pub inner: Option<SideLiteral>,
}

/// An array literal: children plus optional relations, indexed by
/// position in `children` (§3 `Array`).
pub struct ArrayLiteral {
    pub transform: Transform3D,
    pub animation: Option<AnimationFn>,
    pub children: Vec<ObjectLiteral>,
    pub relations: Vec<Relation>,
}

/// A camera literal (§3 `Camera`).
pub struct CameraLiteral {
    pub transform: Transform3D,
    pub animation: Option<AnimationFn>,
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    pub pov: f32,
    pub pos_delta: Vec3,
    pub rot_delta: Vec3,
}

/// A light literal (§3 `Light`).
pub struct LightLiteral {
    pub transform: Transform3D,
    pub animation: Option<AnimationFn>,
    pub color: Vec3,
    pub lum: [f32; 2],
    pub atten: (f32, f32, f32, f32),
}

/// One node of the scene literal tree, tag-dispatched per §6 (`ARRAY`,
/// `PLANE`, `CYLINDER`, `SPHERE`, `CONE`, `PARABOLOID`, `HYPERBOLOID`,
/// `CAMERA`, `LIGHT`). Unrecognized tags are represented by
/// [`ObjectLiteral::Unsupported`] rather than failing to parse — the
/// builder skips them and counts them (§4.2 construction diagnostics).
pub enum ObjectLiteral {
    Array(ArrayLiteral),
    Surface(SurfaceLiteral),
    Camera(CameraLiteral),
    Light(LightLiteral),
    Unsupported,
}
