//! Phase 1: per-surface bound/clip/inverse/side-car recomputation (§4.4).
//!
//! Runs once per surface, independently of every other surface — the
//! parallelism boundary this crate's thread model assumes. Nothing here
//! mutates scene topology or any other surface's state; the clipper lists
//! Phase 0 built are read-only from this point on.

use glam::{Affine3A, Vec3};

use quadray_core::arena::Arena;
use quadray_core::{QuadRayError, Result};
use quadray_scene::node::{
    NO_DOMINANT_AXIS, Polyhedron, ShapeKind, SimdSideCar, EDGES_LIMIT, FACES_LIMIT, VERTS_LIMIT,
};
use quadray_scene::relation::RelationKind;
use quadray_scene::{NodeId, Scene};

/// Local-frame axis convention used by every shape's `adjust_minmax`: the
/// shape's analytic axis of revolution/extrusion is always local `Z`.
const AXIS_K: usize = 2;
const AXIS_I: usize = 0;
const AXIS_J: usize = 1;

/// Recomputes bounds, axis map, inverse matrix and SIMD side-car for one
/// surface (§4.4). `self_id` must be the key this surface is stored
/// under in `scene`. `scratch` is the calling worker's per-frame scratch
/// arena (§4.1, §5): [`build_polyhedron`] appends its vertex buffer into
/// it rather than heap-allocating a fresh `Vec` every call, and the
/// caller is responsible for resetting it once per frame, not per
/// surface.
pub fn update_surface(scene: &mut Scene, self_id: NodeId, scratch: &mut Arena<Vec3>) -> Result<()> {
    let opts = scene.opts;

    let (matrix, trnode, is_own_trnode) = {
        let node = scene.node(self_id).expect("surface id must be valid");
        (node.matrix, node.trnode, node.trnode == Some(self_id))
    };

    let axis_map = extract_axis_map(&matrix);

    let (shape, clipper_min, clipper_max, coeffs, has_custom_clippers) = {
        let node = scene.node(self_id).expect("surface id must be valid");
        let surface = node.kind.as_surface().expect("update_surface called on a non-surface node");
        (
            surface.shape,
            surface.clipper_min,
            surface.clipper_max,
            surface.coeffs,
            !surface.custom_clippers.is_empty(),
        )
    };

    let use_direct_path = !has_custom_clippers || is_own_trnode || !opts.contains(quadray_core::options::RenderOpts::ADJUST);

    let (bbox_min, bbox_max, cbox_min, cbox_max) = if use_direct_path {
        adjust_minmax(shape, clipper_min, clipper_max)
    } else {
        accumulate_clipped_minmax(scene, self_id, shape, clipper_min, clipper_max)?
    };

    let polyhedron = build_polyhedron(shape, bbox_min, bbox_max, trnode, self_id, matrix, scratch)?;
    let (bsphere_mid, bsphere_rad) = bounding_sphere(&polyhedron);

    let inverse = if is_own_trnode {
        Some(matrix.inverse())
    } else {
        None
    };

    let simd = SimdSideCar {
        axis_map: {
            let offset: u8 = if trnode.is_some() { 3 } else { 0 };
            [
                axis_map.0[0] + offset,
                axis_map.0[1] + offset,
                axis_map.0[2] + offset,
            ]
        },
        axis_sgn: axis_map.1,
        coeffs,
        bmin: bbox_min,
        bmax: bbox_max,
        cmin: cbox_min,
        cmax: cbox_max,
    };

    let node = scene.node_mut(self_id).expect("surface id must be valid");
    let surface = node.kind.as_surface_mut().expect("update_surface called on a non-surface node");
    surface.bbox_min = bbox_min;
    surface.bbox_max = bbox_max;
    surface.cbox_min = cbox_min;
    surface.cbox_max = cbox_max;
    surface.polyhedron = polyhedron;
    surface.bsphere_mid = bsphere_mid;
    surface.bsphere_rad = bsphere_rad;
    surface.inverse = inverse;
    surface.simd = simd;
    node.axis_map = axis_map.0;
    node.axis_sgn = axis_map.1;
    Ok(())
}

/// Extracts `(map[3], sgn[3])` from a matrix whose linear part is a pure
/// signed axis permutation (§4.4 step 1). Non axis-aligned matrices fall
/// back to the identity map — callers that need the true non-aligned
/// transform use `matrix`/`inverse` directly rather than the axis map.
fn extract_axis_map(matrix: &Affine3A) -> ([u8; 3], [f32; 3]) {
    let cols = [matrix.matrix3.x_axis, matrix.matrix3.y_axis, matrix.matrix3.z_axis];
    let mut map = [0u8, 1, 2];
    let mut sgn = [1.0f32, 1.0, 1.0];
    for (local_axis, col) in cols.iter().enumerate() {
        let abs = [col.x.abs(), col.y.abs(), col.z.abs()];
        let (world_axis, &max) = abs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap();
        if max < f32::EPSILON {
            continue;
        }
        map[local_axis] = world_axis as u8;
        sgn[local_axis] = col[world_axis].signum();
    }
    (map, sgn)
}

/// Shape-specific clamp of a local clipper box into `(bbox, cbox)`
/// (§4.4 step 2 bullet list).
fn adjust_minmax(shape: ShapeKind, smin: Vec3, smax: Vec3) -> (Vec3, Vec3, Vec3, Vec3) {
    match shape {
        ShapeKind::Plane => {
            let mut bmin = smin;
            let mut bmax = smax;
            bmin[AXIS_K] = 0.0;
            bmax[AXIS_K] = 0.0;
            let mut cmin = smin;
            let mut cmax = smax;
            cmin[AXIS_K] = f32::NEG_INFINITY;
            cmax[AXIS_K] = f32::INFINITY;
            (bmin, bmax, cmin, cmax)
        }
        ShapeKind::Cylinder => clamp_radial(smin, smax, nominal_radius(smin, smax)),
        ShapeKind::Sphere => {
            let rad = nominal_radius(smin, smax);
            let mut bmin = smin;
            let mut bmax = smax;
            let mut cmin = smin;
            let mut cmax = smax;
            // An axis whose own clipper box already cuts the sphere
            // tighter than its full radius shrinks the great-circle the
            // *other* two axes can reach: at `top` along axis k the
            // sphere's cross-section has radius `sqrt(rad^2 - top^2)`
            // (§4.4 "derive effective radii on the other two axes").
            let mut axis_limit = [rad; 3];
            for axis in [AXIS_I, AXIS_J, AXIS_K] {
                let top = smax[axis].abs().max(smin[axis].abs());
                if top < rad {
                    let other_rad = (rad * rad - top * top).max(0.0).sqrt();
                    for sibling in [AXIS_I, AXIS_J, AXIS_K] {
                        if sibling != axis {
                            axis_limit[sibling] = axis_limit[sibling].min(other_rad);
                        }
                    }
                }
            }
            for axis in [AXIS_I, AXIS_J, AXIS_K] {
                let limit = axis_limit[axis];
                bmin[axis] = smin[axis].clamp(-limit, limit);
                bmax[axis] = smax[axis].clamp(-limit, limit);
                cmin[axis] = if smin[axis] < -limit { f32::NEG_INFINITY } else { bmin[axis] };
                cmax[axis] = if smax[axis] > limit { f32::INFINITY } else { bmax[axis] };
            }
            (bmin, bmax, cmin, cmax)
        }
        ShapeKind::Cone { ratio } => {
            let top = smax[AXIS_K].abs().max(smin[AXIS_K].abs());
            clamp_radial(smin, smax, top * ratio.abs())
        }
        ShapeKind::Paraboloid { par } => {
            let top = if par > 0.0 { smax[AXIS_K] } else { -smin[AXIS_K] }.max(0.0);
            let rad = (top * par.abs()).max(0.0).sqrt();
            let (mut bmin, mut bmax, cmin, cmax) = clamp_radial(smin, smax, rad);
            if par > 0.0 {
                bmin[AXIS_K] = 0.0;
            } else {
                bmax[AXIS_K] = 0.0;
            }
            (bmin, bmax, cmin, cmax)
        }
        ShapeKind::Hyperboloid { rat, hyp } => {
            let top = smax[AXIS_K].abs().max(smin[AXIS_K].abs());
            let rad = (top * top * rat * rat + hyp).max(0.0).sqrt();
            clamp_radial(smin, smax, rad)
        }
    }
}

/// Clamps `i`/`j` to `±rad`, leaves `k` unchanged, and marks the clip box
/// bound unbounded on any axis where the source exceeded the radius
/// (shared by Cylinder/Cone/Hyperboloid, per §4.4 step 2).
fn clamp_radial(smin: Vec3, smax: Vec3, rad: f32) -> (Vec3, Vec3, Vec3, Vec3) {
    let mut bmin = smin;
    let mut bmax = smax;
    let mut cmin = smin;
    let mut cmax = smax;
    for axis in [AXIS_I, AXIS_J] {
        bmin[axis] = smin[axis].clamp(-rad, rad);
        bmax[axis] = smax[axis].clamp(-rad, rad);
        cmin[axis] = if smin[axis] < -rad { f32::NEG_INFINITY } else { bmin[axis] };
        cmax[axis] = if smax[axis] > rad { f32::INFINITY } else { bmax[axis] };
    }
    (bmin, bmax, cmin, cmax)
}

/// A unit-radius stand-in derived from the clipper box itself when the
/// shape carries no explicit radius parameter (Cylinder, Sphere): half
/// the smaller of the finite `i`/`j` extents, or `1.0` if both are
/// unbounded.
fn nominal_radius(smin: Vec3, smax: Vec3) -> f32 {
    let extent = |axis: usize| -> Option<f32> {
        if smin[axis].is_finite() && smax[axis].is_finite() {
            Some((smax[axis] - smin[axis]).abs() / 2.0)
        } else {
            None
        }
    };
    match (extent(AXIS_I), extent(AXIS_J)) {
        (Some(a), Some(b)) => a.min(b).max(f32::EPSILON),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => 1.0,
    }
}

/// The custom-clipper accumulation path (§4.4 step 2 "otherwise" branch).
fn accumulate_clipped_minmax(
    scene: &Scene,
    self_id: NodeId,
    shape: ShapeKind,
    smin: Vec3,
    smax: Vec3,
) -> Result<(Vec3, Vec3, Vec3, Vec3)> {
    let (baseline_bmin, baseline_bmax, _, _) = adjust_minmax(shape, smin, smax);
    let mut cmin = Vec3::splat(f32::NEG_INFINITY);
    let mut cmax = Vec3::splat(f32::INFINITY);

    let self_trnode = scene.node(self_id).and_then(|n| n.trnode);
    let surface = scene
        .node(self_id)
        .and_then(|n| n.kind.as_surface())
        .expect("accumulate_clipped_minmax called on a non-surface node");

    for element in &surface.custom_clippers {
        if let quadray_scene::clipper::ClipperElement::Clipper { surface: clip_id, kind } = element {
            if *kind != RelationKind::MinusOuter {
                continue;
            }
            let Some(clip_node) = scene.node(*clip_id) else { continue };
            if clip_node.trnode != self_trnode {
                continue;
            }
            let Some(clip_surface) = clip_node.kind.as_surface() else { continue };
            if matches!(clip_surface.shape, ShapeKind::Plane) {
                continue;
            }
            cmin = cmin.max(clip_surface.bbox_min);
            cmax = cmax.min(clip_surface.bbox_max);
        }
    }

    let source_min = baseline_bmin.max(cmin);
    let source_max = baseline_bmax.min(cmax);
    let (bmin, bmax, cmin2, cmax2) = adjust_minmax(shape, source_min, source_max);
    Ok((bmin, bmax, cmin2, cmax2))
}

/// Generates the bounding polyhedron from the surface's just-computed
/// `bbox` (§4.4 step 3). The engine uses the axis-aligned `bbox` corners
/// as a conservative stand-in for the original's exact per-shape
/// silhouette fit; this keeps the projector's input convex and correctly
/// containing, at the cost of a looser screen-space footprint for
/// strongly curved quadrics.
///
/// The local vertex list is built in `scratch` — the calling worker's
/// per-frame scratch arena (§4.1) — rather than a freshly heap-allocated
/// `Vec` per surface; only the final, capped result is copied into the
/// `Polyhedron`'s own `SmallVec` storage, which outlives the frame.
fn build_polyhedron(
    shape: ShapeKind,
    bmin: Vec3,
    bmax: Vec3,
    trnode: Option<NodeId>,
    self_id: NodeId,
    matrix: Affine3A,
    scratch: &mut Arena<Vec3>,
) -> Result<Polyhedron> {
    if !bmin.is_finite() || !bmax.is_finite() {
        return Ok(Polyhedron::default());
    }

    let under_non_self_trnode = matches!(trnode, Some(t) if t != self_id);
    let axis_label = |axis: u8| if under_non_self_trnode { NO_DOMINANT_AXIS } else { axis };
    let transform_vertex = |v: Vec3| if under_non_self_trnode { matrix.transform_point3(v) } else { v };

    let scratch_start = scratch.len();
    let (edges, faces): (Vec<(u8, u8, u8)>, Vec<(Vec<u8>, u8)>) = match shape {
        ShapeKind::Plane => {
            for v in [
                Vec3::new(bmin.x, bmin.y, 0.0),
                Vec3::new(bmax.x, bmin.y, 0.0),
                Vec3::new(bmax.x, bmax.y, 0.0),
                Vec3::new(bmin.x, bmax.y, 0.0),
            ] {
                scratch.alloc(v)?;
            }
            let edges = vec![
                (0, 1, axis_label(1)),
                (1, 2, axis_label(0)),
                (2, 3, axis_label(1)),
                (3, 0, axis_label(0)),
            ];
            let faces = vec![(vec![0, 1, 2, 3], axis_label(2))];
            (edges, faces)
        }
        _ => {
            for v in [
                Vec3::new(bmin.x, bmin.y, bmin.z),
                Vec3::new(bmax.x, bmin.y, bmin.z),
                Vec3::new(bmax.x, bmax.y, bmin.z),
                Vec3::new(bmin.x, bmax.y, bmin.z),
                Vec3::new(bmin.x, bmin.y, bmax.z),
                Vec3::new(bmax.x, bmin.y, bmax.z),
                Vec3::new(bmax.x, bmax.y, bmax.z),
                Vec3::new(bmin.x, bmax.y, bmax.z),
            ] {
                scratch.alloc(v)?;
            }
            let edges = vec![
                (0, 1, axis_label(0)),
                (1, 2, axis_label(1)),
                (2, 3, axis_label(0)),
                (3, 0, axis_label(1)),
                (4, 5, axis_label(0)),
                (5, 6, axis_label(1)),
                (6, 7, axis_label(0)),
                (7, 4, axis_label(1)),
                (0, 4, axis_label(2)),
                (1, 5, axis_label(2)),
                (2, 6, axis_label(2)),
                (3, 7, axis_label(2)),
            ];
            let faces = vec![
                (vec![0, 1, 2, 3], axis_label(2)),
                (vec![4, 5, 6, 7], axis_label(2)),
                (vec![0, 1, 5, 4], axis_label(1)),
                (vec![2, 3, 7, 6], axis_label(1)),
                (vec![0, 3, 7, 4], axis_label(0)),
                (vec![1, 2, 6, 5], axis_label(0)),
            ];
            (edges, faces)
        }
    };

    let local_verts = scratch.since(scratch_start);
    if local_verts.len() > VERTS_LIMIT || edges.len() > EDGES_LIMIT || faces.len() > FACES_LIMIT {
        return Err(QuadRayError::LimitExceeded(format!(
            "polyhedron exceeds caps: {} verts, {} edges, {} faces",
            local_verts.len(),
            edges.len(),
            faces.len()
        )));
    }

    let verts = local_verts.iter().copied().map(transform_vertex).collect();
    let edges = edges.into_iter().collect();
    let faces = faces.into_iter().map(|(verts, axis)| (verts.into(), axis)).collect();
    Ok(Polyhedron { verts, edges, faces })
}

/// Bounding sphere centered on the vertex centroid (§4.4 step 4).
fn bounding_sphere(polyhedron: &Polyhedron) -> (Vec3, f32) {
    if polyhedron.verts.is_empty() {
        return (Vec3::ZERO, f32::INFINITY);
    }
    let centroid: Vec3 = polyhedron.verts.iter().copied().sum::<Vec3>() / polyhedron.verts.len() as f32;
    let rad = polyhedron
        .verts
        .iter()
        .map(|v| (*v - centroid).length())
        .fold(0.0f32, f32::max);
    (centroid, rad)
}
