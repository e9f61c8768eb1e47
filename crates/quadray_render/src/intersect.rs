//! Analytic ray-surface intersection (§4.6).
//!
//! Every shape variant reduces to the same implicit form evaluated in
//! the surface's *local* frame:
//!
//! ```text
//! A*x^2 + B*y^2 + C*z^2 + D*z + E = 0
//! ```
//!
//! with `(A, B, C, D, E)` picked from the surface's `(sci, scj, sck)`
//! coefficients and its shape-specific scalar (`ratio`/`par`/`hyp`) by
//! [`implicit_form`]. Substituting the ray's parametric point `o + t*d`
//! yields a quadratic (or, for the plane, linear) in `t`, solved by
//! [`solve_local`]. This is the "packet contract" of §4.6: the analytic
//! test itself, not a specific SIMD instruction schedule.

use glam::{Affine3A, Vec3};

use quadray_scene::clipper::ClipperElement;
use quadray_scene::node::ShapeKind;
use quadray_scene::{NodeId, Scene};

/// Which side of a surface a [`Hit`] landed on — drives outer/inner
/// material selection (§3 `Surface`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideKind {
    Outer,
    Inner,
}

/// One analytic ray-surface intersection, in world space.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub t: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub surface: NodeId,
    pub side: SideKind,
}

/// The five implicit-form coefficients `(A, B, C, D, E)` for a shape
/// (§3 `Surface`, §4.6). Local axis of revolution/extrusion is always Z.
fn implicit_form(shape: ShapeKind, coeffs: (f32, f32, f32)) -> (f32, f32, f32, f32, f32) {
    let (sci, scj, sck) = coeffs;
    match shape {
        ShapeKind::Plane => (0.0, 0.0, 0.0, 1.0, 0.0),
        ShapeKind::Cylinder => (sci, scj, 0.0, 0.0, -sck),
        ShapeKind::Sphere => (sci, scj, sck, 0.0, -1.0),
        ShapeKind::Cone { ratio } => (sci, scj, -(ratio * ratio), 0.0, 0.0),
        ShapeKind::Paraboloid { par } => (sci, scj, 0.0, -par, 0.0),
        ShapeKind::Hyperboloid { rat, hyp } => (sci, scj, -(rat * rat), 0.0, -hyp),
    }
}

/// The implicit function's gradient at `p`, used as the analytic surface
/// normal (unnormalized) and, for the plane, simply `(0, 0, D)`.
fn gradient(form: (f32, f32, f32, f32, f32), p: Vec3) -> Vec3 {
    let (a, b, c, d, _e) = form;
    Vec3::new(2.0 * a * p.x, 2.0 * b * p.y, 2.0 * c * p.z + d)
}

/// Solves for the smallest `t > epsilon` at which a local-frame ray
/// `(origin, dir)` satisfies the shape's implicit form, without yet
/// applying the clipper box or custom clippers.
fn solve_local(shape: ShapeKind, coeffs: (f32, f32, f32), origin: Vec3, dir: Vec3, epsilon: f32) -> Option<(f32, Vec3)> {
    let (a, b, c, d, e) = implicit_form(shape, coeffs);

    let qa = a * dir.x * dir.x + b * dir.y * dir.y + c * dir.z * dir.z;
    let qb = 2.0 * a * origin.x * dir.x + 2.0 * b * origin.y * dir.y + 2.0 * c * origin.z * dir.z + d * dir.z;
    let qc = a * origin.x * origin.x + b * origin.y * origin.y + c * origin.z * origin.z + d * origin.z + e;

    let mut candidates = [f32::NAN; 2];
    if qa.abs() < 1e-9 {
        if qb.abs() < 1e-9 {
            return None;
        }
        candidates[0] = -qc / qb;
    } else {
        let disc = qb * qb - 4.0 * qa * qc;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        candidates[0] = (-qb - sqrt_disc) / (2.0 * qa);
        candidates[1] = (-qb + sqrt_disc) / (2.0 * qa);
    }

    let mut best: Option<f32> = None;
    for t in candidates {
        if t.is_finite() && t > epsilon {
            best = Some(best.map_or(t, |b: f32| b.min(t)));
        }
    }
    let t = best?;
    let p = origin + dir * t;
    Some((t, p))
}

/// Tests whether local-frame point `p` lies within `[min, max]`
/// componentwise (a clipping-box test, §3 `Surface` cbox; `±∞` bounds
/// always pass on that axis).
fn within_box(p: Vec3, min: Vec3, max: Vec3) -> bool {
    (p.x >= min.x && p.x <= max.x) && (p.y >= min.y && p.y <= max.y) && (p.z >= min.z && p.z <= max.z)
}

/// Transforms a world-space ray into a surface's local frame: through
/// the owning `trnode`'s inverse when the surface sits under one,
/// identity otherwise (axis-aligned surfaces skip the matrix multiply
/// entirely, §4.6 "this is why axis-map + trnode pointers are needed").
fn world_to_local(scene: &Scene, surface: NodeId, origin: Vec3, dir: Vec3) -> Option<(Vec3, Vec3, Affine3A)> {
    let node = scene.node(surface)?;
    match node.trnode {
        Some(trnode) => {
            // The trnode's own Phase 1 pass writes a cached inverse only
            // when it is a Surface (§4.4 step 5); Array trnodes have no
            // side-car to cache into, so this falls back to inverting
            // the node's world matrix directly — correct either way,
            // just uncached for the Array case.
            let trnode_node = scene.node(trnode)?;
            let inv = trnode_node
                .kind
                .as_surface()
                .and_then(|s| s.inverse)
                .unwrap_or_else(|| trnode_node.matrix.inverse());
            Some((inv.transform_point3(origin), inv.transform_vector3(dir), inv))
        }
        None => Some((origin, dir, Affine3A::IDENTITY)),
    }
}

/// Tests whether world point `p_world` falls inside clipper surface
/// `surface`'s own local bbox (the same axis-aligned stand-in
/// `bounds::build_polyhedron` already uses for the screen-space
/// footprint), transformed through `active_trnode` if the clipper sits
/// under one.
fn clipper_contains(scene: &Scene, active_trnode: Option<NodeId>, p_world: Vec3, surface: NodeId) -> bool {
    let Some(clip_node) = scene.node(surface) else { return false };
    let Some(clip_surface) = clip_node.kind.as_surface() else { return false };
    if !clip_surface.bbox_min.is_finite() || !clip_surface.bbox_max.is_finite() {
        return false;
    }
    let clip_local = if let Some(trnode) = active_trnode {
        match scene.node(trnode) {
            Some(n) => n.matrix.inverse().transform_point3(p_world),
            None => return false,
        }
    } else {
        p_world
    };
    within_box(clip_local, clip_surface.bbox_min, clip_surface.bbox_max)
}

/// Evaluates whether local-frame point `p` is clipped away by `surface`'s
/// custom-clipper list (§4.3 step 8, §4.6 "an accumulation segment
/// evaluates a boolean outside-any-of-these with short-circuit logic").
///
/// A `MINUS_OUTER`/`MINUS_INNER` clipper outside any bracket carves the
/// hit away on its own the moment the point falls inside its region. A
/// run bracketed between `AccumStart`/`AccumEnd` (a `MINUS_ACCUM` pair,
/// §4.3 step 7) instead acts as one "single boolean group": the point
/// only counts as clipped by the group once it falls inside *every*
/// bracketed clipper, short-circuiting to the group's `AccumEnd` the
/// moment one clipper in the run doesn't contain it.
fn clipped_by_custom_list(scene: &Scene, owner_local_to_world: Affine3A, clippers: &[ClipperElement], p_local: Vec3) -> bool {
    let p_world = owner_local_to_world.transform_point3(p_local);
    let mut active_trnode: Option<NodeId> = None;
    let mut i = 0;
    while i < clippers.len() {
        match &clippers[i] {
            ClipperElement::TrnodeMarker(node) => {
                active_trnode = Some(*node);
                i += 1;
            }
            ClipperElement::Clipper { surface, kind } => {
                if kind.is_boolean_clip() && clipper_contains(scene, active_trnode, p_world, *surface) {
                    return true;
                }
                i += 1;
            }
            ClipperElement::AccumStart => {
                let mut group_trnode = active_trnode;
                let mut all_contain = true;
                let mut j = i + 1;
                while j < clippers.len() {
                    match &clippers[j] {
                        ClipperElement::AccumEnd => break,
                        ClipperElement::TrnodeMarker(node) => group_trnode = Some(*node),
                        ClipperElement::Clipper { surface, kind } if kind.is_boolean_clip() => {
                            if !clipper_contains(scene, group_trnode, p_world, *surface) {
                                all_contain = false;
                                while j < clippers.len() && !matches!(clippers[j], ClipperElement::AccumEnd) {
                                    j += 1;
                                }
                                break;
                            }
                        }
                        _ => {}
                    }
                    j += 1;
                }
                if all_contain {
                    return true;
                }
                active_trnode = group_trnode;
                i = j + 1;
            }
            ClipperElement::AccumEnd => {
                i += 1;
            }
        }
    }
    false
}

/// Intersects a world-space ray against one surface (§4.6): transforms
/// through `trnode`'s inverse, solves the analytic quadratic, rejects
/// hits outside the clipping box or carved away by custom clippers, and
/// returns the closest surviving hit beyond `epsilon`.
#[must_use]
pub fn intersect_surface(
    scene: &Scene,
    surface: NodeId,
    ray_origin: Vec3,
    ray_dir: Vec3,
    epsilon: f32,
    t_max: f32,
) -> Option<Hit> {
    let node = scene.node(surface)?;
    let data = node.kind.as_surface()?;
    let (local_o, local_d, world_to_local_mtx) = world_to_local(scene, surface, ray_origin, ray_dir)?;
    let to_world = world_to_local_mtx.inverse();

    let (t, p_local) = solve_local(data.shape, data.coeffs, local_o, local_d, epsilon)?;
    if t >= t_max {
        return None;
    }
    if !within_box(p_local, data.cbox_min, data.cbox_max) {
        return None;
    }
    if !data.custom_clippers.is_empty() && clipped_by_custom_list(scene, to_world, &data.custom_clippers, p_local) {
        return None;
    }

    let form = implicit_form(data.shape, data.coeffs);
    let grad_local = gradient(form, p_local);
    // Normal transform is the inverse-transpose of the local->world
    // linear map; `world_to_local_mtx` already *is* that inverse, so its
    // transpose alone is the matrix we need.
    let normal_world = world_to_local_mtx.matrix3.transpose() * grad_local;
    let normal_world = if normal_world.length_squared() > f32::EPSILON {
        normal_world.normalize()
    } else {
        Vec3::Z
    };

    let world_point = ray_origin + ray_dir * t;
    let side = if grad_local.dot(local_d) > 0.0 {
        SideKind::Inner
    } else {
        SideKind::Outer
    };

    Some(Hit {
        t,
        point: world_point,
        normal: normal_world,
        surface,
        side,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadray_core::arena::Arena;
    use quadray_core::options::RenderOpts;
    use quadray_core::transform::Transform3D;
    use quadray_scene::literal::{ArrayLiteral, ObjectLiteral, SideLiteral, SurfaceLiteral};
    use quadray_scene::material::Material;

    fn build_single_sphere() -> (Scene, NodeId) {
        let mut scene = Scene::empty(RenderOpts::defaults());
        let material = scene.insert_material(Material::plain(Vec3::ONE));
        let surface_literal = SurfaceLiteral {
            transform: Transform3D::IDENTITY,
            animation: None,
            shape: ShapeKind::Sphere,
            coeffs: (1.0, 1.0, 1.0),
            clipper_min: Vec3::splat(-1.0),
            clipper_max: Vec3::splat(1.0),
            outer: SideLiteral { material },
            inner: None,
        };
        scene
            .attach_root(ArrayLiteral {
                transform: Transform3D::IDENTITY,
                animation: None,
                children: vec![ObjectLiteral::Surface(surface_literal)],
                relations: vec![],
            })
            .unwrap();
        quadray_scene::update_phase0(&mut scene, 0.0).unwrap();
        let id = scene.surfaces()[0];
        let mut scratch = Arena::new();
        crate::bounds::update_surface(&mut scene, id, &mut scratch).unwrap();
        (scene, id)
    }

    #[test]
    fn ray_through_unit_sphere_center_hits_at_unit_distance() {
        let (scene, id) = build_single_sphere();
        let hit = intersect_surface(&scene, id, Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 1e-4, f32::INFINITY).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-3);
        assert!((hit.point.z - (-1.0)).abs() < 1e-3);
    }

    #[test]
    fn ray_missing_sphere_returns_none() {
        let (scene, id) = build_single_sphere();
        let hit = intersect_surface(&scene, id, Vec3::new(5.0, 5.0, -5.0), Vec3::Z, 1e-4, f32::INFINITY);
        assert!(hit.is_none());
    }

    fn build_clipper_pair(box_a: (Vec3, Vec3), box_b: (Vec3, Vec3)) -> (Scene, NodeId, NodeId) {
        let mut scene = Scene::empty(RenderOpts::defaults());
        let material = scene.insert_material(Material::plain(Vec3::ONE));
        let lit = || SurfaceLiteral {
            transform: Transform3D::IDENTITY,
            animation: None,
            shape: ShapeKind::Sphere,
            coeffs: (1.0, 1.0, 1.0),
            clipper_min: Vec3::splat(-1.0),
            clipper_max: Vec3::splat(1.0),
            outer: SideLiteral { material },
            inner: None,
        };
        scene
            .attach_root(ArrayLiteral {
                transform: Transform3D::IDENTITY,
                animation: None,
                children: vec![ObjectLiteral::Surface(lit()), ObjectLiteral::Surface(lit())],
                relations: vec![],
            })
            .unwrap();
        quadray_scene::update_phase0(&mut scene, 0.0).unwrap();
        let ids = scene.surfaces().to_vec();
        let (a, b) = (ids[0], ids[1]);
        if let Some(surface) = scene.node_mut(a).and_then(|n| n.kind.as_surface_mut()) {
            surface.bbox_min = box_a.0;
            surface.bbox_max = box_a.1;
        }
        if let Some(surface) = scene.node_mut(b).and_then(|n| n.kind.as_surface_mut()) {
            surface.bbox_min = box_b.0;
            surface.bbox_max = box_b.1;
        }
        (scene, a, b)
    }

    #[test]
    fn unbracketed_clippers_subtract_independently() {
        use quadray_scene::RelationKind;

        let (scene, a, b) = build_clipper_pair(
            (Vec3::splat(-5.0), Vec3::splat(5.0)), // wide box, contains the origin
            (Vec3::splat(2.0), Vec3::splat(3.0)),  // tight box, does not contain the origin
        );
        let clippers = [
            ClipperElement::Clipper { surface: a, kind: RelationKind::MinusOuter },
            ClipperElement::Clipper { surface: b, kind: RelationKind::MinusOuter },
        ];
        assert!(clipped_by_custom_list(&scene, Affine3A::IDENTITY, &clippers, Vec3::ZERO));
    }

    #[test]
    fn accum_bracket_requires_every_member_to_contain_the_point() {
        use quadray_scene::RelationKind;

        let (scene, a, b) = build_clipper_pair(
            (Vec3::splat(-5.0), Vec3::splat(5.0)), // wide box, contains the origin
            (Vec3::splat(2.0), Vec3::splat(3.0)),  // tight box, does not contain the origin
        );
        let clippers = [
            ClipperElement::AccumStart,
            ClipperElement::Clipper { surface: a, kind: RelationKind::MinusOuter },
            ClipperElement::Clipper { surface: b, kind: RelationKind::MinusOuter },
            ClipperElement::AccumEnd,
        ];
        assert!(
            !clipped_by_custom_list(&scene, Affine3A::IDENTITY, &clippers, Vec3::ZERO),
            "one non-containing member must veto the whole accumulation group"
        );

        // Tighten `b` to also contain the origin: now the whole group agrees.
        let (scene, a, b) = build_clipper_pair((Vec3::splat(-5.0), Vec3::splat(5.0)), (Vec3::splat(-1.0), Vec3::splat(1.0)));
        let clippers = [
            ClipperElement::AccumStart,
            ClipperElement::Clipper { surface: a, kind: RelationKind::MinusOuter },
            ClipperElement::Clipper { surface: b, kind: RelationKind::MinusOuter },
            ClipperElement::AccumEnd,
        ];
        assert!(clipped_by_custom_list(&scene, Affine3A::IDENTITY, &clippers, Vec3::ZERO));
    }
}
