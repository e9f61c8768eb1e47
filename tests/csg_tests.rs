//! Constructive-subtraction (`MINUS_*` relation) tests exercised at the
//! `quadray_scene`/`quadray_render` level, below the `quadray` facade,
//! since they inspect clipper lists and per-surface bounds that the
//! facade does not expose.

use glam::Vec3;

use quadray_core::arena::Arena;
use quadray_core::options::RenderOpts;
use quadray_core::transform::Transform3D;
use quadray_scene::literal::{ArrayLiteral, ObjectLiteral, SideLiteral, SurfaceLiteral};
use quadray_scene::material::Material;
use quadray_scene::node::ShapeKind;
use quadray_scene::relation::{Relation, RelationKind};
use quadray_scene::{clipper::ClipperElement, Scene};

#[test]
fn cylinder_minus_sphere_shrinks_along_its_own_axis() -> anyhow::Result<()> {
    let mut scene = Scene::empty(RenderOpts::defaults());
    let material = scene.insert_material(Material::plain(Vec3::ONE));

    // Children order: [sphere (index 0), cylinder (index 1)], matching
    // relation {1, MINUS_OUTER, 0}: subtract the sphere from the
    // cylinder's outer surface.
    let sphere = SurfaceLiteral {
        transform: Transform3D::IDENTITY,
        animation: None,
        shape: ShapeKind::Sphere,
        coeffs: (1.0, 1.0, 1.0),
        clipper_min: Vec3::splat(-1.0),
        clipper_max: Vec3::splat(1.0),
        outer: SideLiteral { material },
        inner: None,
    };
    let cylinder = SurfaceLiteral {
        transform: Transform3D::IDENTITY,
        animation: None,
        shape: ShapeKind::Cylinder,
        coeffs: (1.0, 1.0, 0.0),
        clipper_min: Vec3::new(-1.5, -1.5, -4.5),
        clipper_max: Vec3::new(1.5, 1.5, 4.5),
        outer: SideLiteral { material },
        inner: None,
    };

    scene.attach_root(ArrayLiteral {
        transform: Transform3D::IDENTITY,
        animation: None,
        children: vec![ObjectLiteral::Surface(sphere), ObjectLiteral::Surface(cylinder)],
        relations: vec![Relation {
            obj1: 1,
            kind: RelationKind::MinusOuter,
            obj2: 0,
        }],
    })?;

    quadray_scene::update_phase0(&mut scene, 0.0)?;
    let surfaces = scene.surfaces().to_vec();
    let sphere_id = surfaces[0];
    let cylinder_id = surfaces[1];

    // The sphere's own bounds must settle first: the cylinder's clipped
    // accumulation path reads them.
    let mut scratch = Arena::new();
    quadray_render::update_surface(&mut scene, sphere_id, &mut scratch)?;
    quadray_render::update_surface(&mut scene, cylinder_id, &mut scratch)?;

    let cylinder = scene.node(cylinder_id).unwrap().kind.as_surface().unwrap();
    let unclipped_extent = 9.0; // the cylinder's declared length along K
    let clipped_extent = cylinder.bbox_max.z - cylinder.bbox_min.z;
    assert!(
        clipped_extent < unclipped_extent,
        "cylinder bbox K extent ({clipped_extent}) should shrink once the sphere clips it"
    );
    Ok(())
}

#[test]
fn mutually_subtracting_hyperboloids_each_keep_one_clipper_and_an_8_vertex_bound() -> anyhow::Result<()> {
    let mut scene = Scene::empty(RenderOpts::defaults());
    let material = scene.insert_material(Material::plain(Vec3::ONE));
    let hyperboloid = |coeffs: (f32, f32, f32)| SurfaceLiteral {
        transform: Transform3D::IDENTITY,
        animation: None,
        shape: ShapeKind::Hyperboloid { rat: 0.5, hyp: 1.0 },
        coeffs,
        clipper_min: Vec3::splat(-2.0),
        clipper_max: Vec3::splat(2.0),
        outer: SideLiteral { material },
        inner: None,
    };

    scene.attach_root(ArrayLiteral {
        transform: Transform3D::IDENTITY,
        animation: None,
        children: vec![
            ObjectLiteral::Surface(hyperboloid((1.0, 1.0, -1.0))),
            ObjectLiteral::Surface(hyperboloid((1.0, 1.0, -1.0))),
        ],
        relations: vec![
            Relation {
                obj1: 1,
                kind: RelationKind::MinusOuter,
                obj2: 0,
            },
            Relation {
                obj1: 0,
                kind: RelationKind::MinusInner,
                obj2: 1,
            },
        ],
    })?;

    quadray_scene::update_phase0(&mut scene, 0.0)?;
    let surfaces = scene.surfaces().to_vec();
    assert_eq!(surfaces.len(), 2);

    let mut scratch = Arena::new();
    for &id in &surfaces {
        quadray_render::update_surface(&mut scene, id, &mut scratch)?;
    }

    for &id in &surfaces {
        let surface = scene.node(id).unwrap().kind.as_surface().unwrap();
        let clipper_count = surface
            .custom_clippers
            .iter()
            .filter(|el| matches!(el, ClipperElement::Clipper { .. }))
            .count();
        assert_eq!(clipper_count, 1, "each hyperboloid should carry exactly one clipper");
        assert_eq!(
            surface.polyhedron.verts.len(),
            8,
            "a clipped quadric's bounding polyhedron must have 8 vertices"
        );
    }
    Ok(())
}
