//! `Array` bound widening (§4.4 step 1-2's "for each surface (or array)"
//! clause, §9 Glossary `Bvnode`).
//!
//! Surfaces compute their own bbox/cbox independently and in parallel in
//! [`crate::bounds::update_surface`]. An `Array`'s bbox has no analytic
//! form of its own — it is simply the union of its children's bounds,
//! widened to include any grandchild a `BOUND_ARRAY`/`BOUND_INDEX`
//! relation attached via `bvnode` — so it is computed afterward, in a
//! single sequential bottom-up pass from the coordinator rather than as
//! a third parallel phase. This mirrors a top-down hierarchy walk's
//! level-order dependency: a parent's derived value cannot be computed
//! before its children's.

use glam::Vec3;

use quadray_core::Result;
use quadray_scene::{NodeId, Scene};

/// Recomputes every `Array`'s world-space `bbox` bottom-up from the
/// scene root, after Phase 1 has settled every surface's own bounds.
pub fn update_array_bounds(scene: &mut Scene) -> Result<()> {
    let root = scene.root();
    compute_bounds(scene, root);
    Ok(())
}

/// Returns `(bbox_min, bbox_max)` for `id`, computing and caching it on
/// `Array` nodes along the way. Surfaces are leaves: their Phase 1
/// bounds are transformed into world space and returned directly.
/// Cameras/Lights contribute nothing (their bbox is considered empty).
fn compute_bounds(scene: &mut Scene, id: NodeId) -> (Vec3, Vec3) {
    let Some(node) = scene.node(id) else {
        return (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY));
    };

    if let Some(surface) = node.kind.as_surface() {
        if !surface.bbox_min.is_finite() || !surface.bbox_max.is_finite() {
            return (Vec3::splat(f32::NEG_INFINITY), Vec3::splat(f32::INFINITY));
        }
        let matrix = node.matrix;
        let corners = corners_of(surface.bbox_min, surface.bbox_max);
        let mut wmin = Vec3::splat(f32::INFINITY);
        let mut wmax = Vec3::splat(f32::NEG_INFINITY);
        for c in corners {
            let w = matrix.transform_point3(c);
            wmin = wmin.min(w);
            wmax = wmax.max(w);
        }
        return (wmin, wmax);
    }

    let Some(children) = node.kind.as_array().map(|a| a.children.clone()) else {
        return (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY));
    };

    let mut bmin = Vec3::splat(f32::INFINITY);
    let mut bmax = Vec3::splat(f32::NEG_INFINITY);
    for child in children {
        let (cmin, cmax) = compute_bounds(scene, child);
        bmin = bmin.min(cmin);
        bmax = bmax.max(cmax);
    }

    if let Some(node) = scene.node_mut(id) {
        if let Some(array) = node.kind.as_array_mut() {
            array.bbox_min = bmin;
            array.bbox_max = bmax;
        }
    }
    (bmin, bmax)
}

fn corners_of(min: Vec3, max: Vec3) -> [Vec3; 8] {
    [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, max.y, max.z),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadray_core::arena::Arena;
    use quadray_core::options::RenderOpts;
    use quadray_core::transform::Transform3D;
    use quadray_scene::literal::{ArrayLiteral, ObjectLiteral, SideLiteral, SurfaceLiteral};
    use quadray_scene::material::Material;
    use quadray_scene::node::ShapeKind;

    #[test]
    fn array_bbox_encloses_its_surface_children() {
        let mut scene = Scene::empty(RenderOpts::defaults());
        let material = scene.insert_material(Material::plain(Vec3::ONE));

        let surface_literal = SurfaceLiteral {
            transform: Transform3D::new(Vec3::ONE, Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)),
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
        let surface_id = scene.surfaces()[0];
        let mut scratch = Arena::new();
        crate::bounds::update_surface(&mut scene, surface_id, &mut scratch).unwrap();
        update_array_bounds(&mut scene).unwrap();

        let root = scene.root();
        let array = scene.node(root).unwrap().kind.as_array().unwrap();
        assert!(array.bbox_min.x < 2.0 && array.bbox_max.x > 2.0);
    }
}
