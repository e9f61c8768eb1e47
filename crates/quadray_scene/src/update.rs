//! Phase 0 of the update pipeline: the sequential, top-down tree walk
//! that composes transform matrices, resolves `trnode`s, and rebuilds
//! every surface's custom clipper list (§4.3).
//!
//! Phase 0 must run single-threaded: it mutates the shared clipper-list
//! structures that Phase 1 (`quadray_render`) later reads in parallel,
//! and a node's matrix depends on its parent's just-computed one.

use glam::{Affine3A, Vec3};

use quadray_core::options::RenderOpts;
use quadray_core::transform::Transform3D;
use quadray_core::Result;

use crate::clipper::{merge_clippers, ClipperElement};
use crate::ids::NodeId;
use crate::node::{NodeKind, TrmBits};
use crate::relation::RelationKind;
use crate::scene::Scene;

struct UpdateCtx {
    time: f32,
    time_changed: bool,
    parent_matrix: Affine3A,
    parent_trm: TrmBits,
    parent_trnode: Option<NodeId>,
    parent_changed: bool,
}

/// Runs Phase 0 from the scene root. Returns once every node's matrix,
/// `trnode`, and (for arrays) clipper lists have been rebuilt for `time`.
pub fn update_phase0(scene: &mut Scene, time: f32) -> Result<()> {
    let time_changed = scene.last_time != Some(time);
    let root = scene.root();
    let ctx = UpdateCtx {
        time,
        time_changed,
        parent_matrix: Affine3A::IDENTITY,
        parent_trm: TrmBits::empty(),
        parent_trnode: None,
        parent_changed: false,
    };
    update_node(scene, root, None, &ctx)?;
    scene.last_time = Some(time);
    Ok(())
}

/// Computes `obj_has_trm` for a transform (§4.3 step 2): the union of
/// `SCL` and `ROT` contributions, with the `FSCALE`-off promotion rule
/// (a non-trivial scale with `FSCALE` disabled also sets `ROT`, forcing
/// the full-matrix path).
fn obj_has_trm(transform: &Transform3D, opts: RenderOpts) -> TrmBits {
    let mut bits = TrmBits::empty();
    if transform.has_scale_contribution() {
        bits |= TrmBits::SCL;
        if !opts.contains(RenderOpts::FSCALE) {
            bits |= TrmBits::ROT;
        }
    }
    if transform.has_rotation_contribution() {
        bits |= TrmBits::ROT;
    }
    bits
}

fn update_node(
    scene: &mut Scene,
    id: NodeId,
    parent_id: Option<NodeId>,
    ctx: &UpdateCtx,
) -> Result<(TrmBits, bool)> {
    let opts = scene.opts;

    let (own_trm, changed, matrix, trnode, children, relations) = {
        let node = scene
            .nodes
            .get_mut(id)
            .expect("node id must be valid within its owning scene");

        let mut fired = false;
        if let Some(anim) = node.animation.as_mut() {
            if ctx.time_changed {
                anim(ctx.time, scene.last_time.unwrap_or(ctx.time), &mut node.transform);
                fired = true;
            }
        }
        let changed = fired || ctx.parent_changed;

        let own_trm = obj_has_trm(&node.transform, opts);
        node.obj_has_trm = !own_trm.is_empty();
        node.mtx_has_trm = own_trm | ctx.parent_trm;

        let local = node.transform.to_affine();
        let (matrix, trnode) = if node.obj_has_trm {
            let matrix = match ctx.parent_trnode {
                Some(pt) if Some(pt) != parent_id => {
                    let trnode_matrix = scene.nodes.get(pt).map(|n| n.matrix).unwrap_or(Affine3A::IDENTITY);
                    trnode_matrix * ctx.parent_matrix * local
                }
                _ => ctx.parent_matrix * local,
            };
            (matrix, Some(id))
        } else {
            (ctx.parent_matrix * local, ctx.parent_trnode)
        };

        let node = scene.nodes.get_mut(id).expect("node still present");
        node.matrix = matrix;
        node.trnode = trnode;
        node.axis_map = [0, 1, 2];
        node.axis_sgn = [1.0, 1.0, 1.0];

        if let Some(camera) = node.kind.as_camera_mut() {
            camera.basis = Some(camera_basis(&matrix));
        }

        let children = node.kind.as_array().map(|a| a.children.clone());
        let relations = node.kind.as_array().map(|a| a.relations.clone());
        (own_trm, changed, matrix, trnode, children, relations)
    };

    let child_ctx = UpdateCtx {
        time: ctx.time,
        time_changed: ctx.time_changed,
        parent_matrix: matrix,
        parent_trm: own_trm | ctx.parent_trm,
        parent_trnode: trnode,
        parent_changed: changed,
    };

    if let Some(children) = children {
        for child in &children {
            update_node(scene, *child, Some(id), &child_ctx)?;
        }
        if let Some(relations) = relations {
            apply_relations(scene, &children, &relations)?;
        }
    }

    Ok((own_trm, changed))
}

/// Derives a camera's `(right, up, forward)` unit basis from its
/// world matrix: local `+X`/`+Y`/`+Z` columns, normalized. `up` is
/// negated so increasing screen row (`py`) moves downward in world
/// space, matching the row-major, top-to-bottom framebuffer layout
/// (§4.5, §4.7 `CameraFrame`).
fn camera_basis(matrix: &Affine3A) -> (Vec3, Vec3, Vec3) {
    let axis_or = |v: Vec3, fallback: Vec3| -> Vec3 {
        let n = v.normalize_or_zero();
        if n.length_squared() > f32::EPSILON {
            n
        } else {
            fallback
        }
    };
    let right = axis_or(Vec3::from(matrix.matrix3.x_axis), Vec3::X);
    let up = axis_or(Vec3::from(matrix.matrix3.y_axis), Vec3::Y);
    let forward = axis_or(Vec3::from(matrix.matrix3.z_axis), Vec3::Z);
    (right, -up, forward)
}

/// Applies an array's relation list (§4.3 step 7/8) against its
/// already-updated children.
///
/// Two pieces of cross-relation state are threaded through the walk:
/// `index_scope` holds the one-shot left/right sub-array narrowing a
/// preceding `INDEX_ARRAY` relation leaves for the relation right after
/// it, and `open_accum` tracks the target of a currently-open
/// `MINUS_ACCUM` bracket so its matching close can be recognized.
fn apply_relations(scene: &mut Scene, children: &[NodeId], relations: &[crate::relation::Relation]) -> Result<()> {
    let mut index_scope: (Option<Vec<NodeId>>, Option<Vec<NodeId>>) = (None, None);
    let mut open_accum: Option<NodeId> = None;

    for relation in relations {
        let (left_override, right_override) = (index_scope.0.take(), index_scope.1.take());
        let left_children: &[NodeId] = left_override.as_deref().unwrap_or(children);
        let right_children: &[NodeId] = right_override.as_deref().unwrap_or(children);

        match relation.kind {
            RelationKind::IndexArray => {
                index_scope = (
                    sub_array_children(scene, operand(relation.obj1, left_children)),
                    sub_array_children(scene, operand(relation.obj2, right_children)),
                );
            }
            RelationKind::MinusAccum => {
                let Some(target) = operand(relation.obj1, left_children) else {
                    continue;
                };
                if open_accum == Some(target) {
                    push_clipper_marker(scene, target, ClipperElement::AccumEnd);
                    open_accum = None;
                } else {
                    push_clipper_marker(scene, target, ClipperElement::AccumStart);
                    open_accum = Some(target);
                }
            }
            RelationKind::MinusInner | RelationKind::MinusOuter => {
                let (Some(target), Some(clipper)) =
                    (operand(relation.obj1, left_children), operand(relation.obj2, right_children))
                else {
                    continue;
                };
                let clipper_trnode = scene.nodes.get(clipper).and_then(|n| n.trnode);
                if let Some(target_node) = scene.nodes.get_mut(target) {
                    if let Some(surface) = target_node.kind.as_surface_mut() {
                        merge_clippers(
                            &mut surface.custom_clippers,
                            clipper_trnode,
                            [(clipper, relation.kind)],
                        );
                    }
                }
            }
            RelationKind::BoundArray | RelationKind::BoundIndex => {
                if let (Some(bounder), Some(bounded)) =
                    (operand(relation.obj1, left_children), operand(relation.obj2, right_children))
                {
                    if let Some(node) = scene.nodes.get_mut(bounded) {
                        node.bvnode = Some(bounder);
                    }
                }
            }
            RelationKind::UntieArray | RelationKind::UntieIndex => {
                if let Some(bounded) =
                    operand(relation.obj2, right_children).or_else(|| operand(relation.obj1, left_children))
                {
                    if let Some(node) = scene.nodes.get_mut(bounded) {
                        node.bvnode = None;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Resolves `INDEX_ARRAY`'s operand into the child list of the array it
/// names, or `None` if the operand is absent or not itself an `Array`
/// (in which case the following relation falls back to its default
/// scope, the immediate array's children).
fn sub_array_children(scene: &Scene, operand: Option<NodeId>) -> Option<Vec<NodeId>> {
    let node = scene.nodes.get(operand?)?;
    Some(node.kind.as_array()?.children.clone())
}

/// Pushes an accumulation-bracket marker directly onto `target`'s clipper
/// list, bypassing `merge_clippers`'s trnode-marker insertion — the
/// bracket itself carries no surface reference to key a trnode off of.
fn push_clipper_marker(scene: &mut Scene, target: NodeId, marker: ClipperElement) {
    if let Some(node) = scene.nodes.get_mut(target) {
        if let Some(surface) = node.kind.as_surface_mut() {
            surface.custom_clippers.push(marker);
        }
    }
}

fn operand(index: i32, children: &[NodeId]) -> Option<NodeId> {
    if index < 0 {
        return None;
    }
    children.get(index as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::{ArrayLiteral, CameraLiteral, ObjectLiteral, SideLiteral, SurfaceLiteral};
    use crate::material::Material;
    use crate::node::ShapeKind;
    use crate::relation::Relation;
    use crate::scene::Scene;

    fn build_camera_scene() -> Scene {
        let camera = CameraLiteral {
            transform: Transform3D::IDENTITY,
            animation: None,
            ambient_color: Vec3::ONE,
            ambient_intensity: 0.1,
            pov: 1.0,
            pos_delta: Vec3::ZERO,
            rot_delta: Vec3::ZERO,
        };
        Scene::build(
            ArrayLiteral {
                transform: Transform3D::IDENTITY,
                animation: None,
                children: vec![ObjectLiteral::Camera(camera)],
                relations: vec![],
            },
            RenderOpts::defaults(),
        )
        .unwrap()
    }

    #[test]
    fn phase0_fills_camera_basis() {
        let mut scene = build_camera_scene();
        update_phase0(&mut scene, 0.0).unwrap();
        let cam_id = scene.cameras()[0];
        let camera = scene.node(cam_id).unwrap().kind.as_camera().unwrap();
        let (right, up, forward) = camera.basis.expect("phase0 must fill in camera basis");
        assert!((right.length() - 1.0).abs() < 1e-4);
        assert!((up.length() - 1.0).abs() < 1e-4);
        assert!((forward.length() - 1.0).abs() < 1e-4);
        assert!(right.dot(forward).abs() < 1e-4);
    }

    #[test]
    fn identity_camera_looks_down_positive_z_with_screen_down_negative_y() {
        let mut scene = build_camera_scene();
        update_phase0(&mut scene, 0.0).unwrap();
        let cam_id = scene.cameras()[0];
        let camera = scene.node(cam_id).unwrap().kind.as_camera().unwrap();
        let (right, up, forward) = camera.basis.unwrap();
        assert!((right - Vec3::X).length() < 1e-4);
        assert!((up - (-Vec3::Y)).length() < 1e-4);
        assert!((forward - Vec3::Z).length() < 1e-4);
    }

    fn sphere_literal(material: crate::ids::MaterialId) -> SurfaceLiteral {
        SurfaceLiteral {
            transform: Transform3D::IDENTITY,
            animation: None,
            shape: ShapeKind::Sphere,
            coeffs: (1.0, 1.0, 1.0),
            clipper_min: Vec3::splat(-1.0),
            clipper_max: Vec3::splat(1.0),
            outer: SideLiteral { material },
            inner: None,
        }
    }

    #[test]
    fn index_array_narrows_only_the_following_relation_and_then_resets() {
        let mut scene = Scene::empty(RenderOpts::defaults());
        let material = scene.insert_material(Material::plain(Vec3::ONE));

        // root.children = [nested (0), target (1)]; nested.children = [sphere_a (0), sphere_b (1)]
        scene
            .attach_root(ArrayLiteral {
                transform: Transform3D::IDENTITY,
                animation: None,
                children: vec![
                    ObjectLiteral::Array(ArrayLiteral {
                        transform: Transform3D::IDENTITY,
                        animation: None,
                        children: vec![
                            ObjectLiteral::Surface(sphere_literal(material)),
                            ObjectLiteral::Surface(sphere_literal(material)),
                        ],
                        relations: vec![],
                    }),
                    ObjectLiteral::Surface(sphere_literal(material)),
                ],
                relations: vec![
                    Relation {
                        obj1: 0,
                        kind: RelationKind::IndexArray,
                        obj2: -1,
                    },
                    // Narrowed: obj1=0 now means nested.children[0] (sphere_a),
                    // not the nested array itself. obj2 was never narrowed, so
                    // it still means root.children[1] (target).
                    Relation {
                        obj1: 0,
                        kind: RelationKind::MinusOuter,
                        obj2: 1,
                    },
                    // No preceding INDEX_ARRAY here: scope must have reset, so
                    // obj1=0 now means the nested array again, which has no
                    // surface payload and silently accepts nothing.
                    Relation {
                        obj1: 0,
                        kind: RelationKind::MinusOuter,
                        obj2: 1,
                    },
                ],
            })
            .unwrap();

        update_phase0(&mut scene, 0.0).unwrap();

        let root = scene.node(scene.root()).unwrap().kind.as_array().unwrap();
        let nested_id = root.children[0];
        let target_id = root.children[1];
        let nested = scene.node(nested_id).unwrap().kind.as_array().unwrap();
        let sphere_a_id = nested.children[0];
        let sphere_b_id = nested.children[1];

        let sphere_a = scene.node(sphere_a_id).unwrap().kind.as_surface().unwrap();
        assert_eq!(sphere_a.custom_clippers.len(), 1, "only the narrowed relation should land a clipper");
        assert!(matches!(
            sphere_a.custom_clippers[0],
            ClipperElement::Clipper { surface, kind: RelationKind::MinusOuter } if surface == target_id
        ));

        let sphere_b = scene.node(sphere_b_id).unwrap().kind.as_surface().unwrap();
        assert!(sphere_b.custom_clippers.is_empty());

        let target = scene.node(target_id).unwrap().kind.as_surface().unwrap();
        assert!(target.custom_clippers.is_empty());
    }

    #[test]
    fn minus_accum_pair_brackets_its_clippers_into_one_group() {
        let mut scene = Scene::empty(RenderOpts::defaults());
        let material = scene.insert_material(Material::plain(Vec3::ONE));

        scene
            .attach_root(ArrayLiteral {
                transform: Transform3D::IDENTITY,
                animation: None,
                children: vec![
                    ObjectLiteral::Surface(sphere_literal(material)),
                    ObjectLiteral::Surface(sphere_literal(material)),
                    ObjectLiteral::Surface(sphere_literal(material)),
                ],
                relations: vec![
                    Relation {
                        obj1: 0,
                        kind: RelationKind::MinusAccum,
                        obj2: -1,
                    },
                    Relation {
                        obj1: 0,
                        kind: RelationKind::MinusOuter,
                        obj2: 1,
                    },
                    Relation {
                        obj1: 0,
                        kind: RelationKind::MinusOuter,
                        obj2: 2,
                    },
                    Relation {
                        obj1: 0,
                        kind: RelationKind::MinusAccum,
                        obj2: -1,
                    },
                ],
            })
            .unwrap();

        update_phase0(&mut scene, 0.0).unwrap();

        let root = scene.node(scene.root()).unwrap().kind.as_array().unwrap();
        let target_id = root.children[0];
        let clipper_a = root.children[1];
        let clipper_b = root.children[2];
        let target = scene.node(target_id).unwrap().kind.as_surface().unwrap();

        assert_eq!(target.custom_clippers.len(), 4);
        assert!(matches!(target.custom_clippers[0], ClipperElement::AccumStart));
        assert!(matches!(
            target.custom_clippers[1],
            ClipperElement::Clipper { surface, kind: RelationKind::MinusOuter } if surface == clipper_a
        ));
        assert!(matches!(
            target.custom_clippers[2],
            ClipperElement::Clipper { surface, kind: RelationKind::MinusOuter } if surface == clipper_b
        ));
        assert!(matches!(target.custom_clippers[3], ClipperElement::AccumEnd));
    }
}
