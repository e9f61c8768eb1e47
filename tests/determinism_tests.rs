//! Cross-cutting determinism properties Engine is expected to hold
//! regardless of how much parallelism or packet width it is given.

use glam::Vec3;

use quadray::{
    ArrayLiteral, CameraAction, CameraLiteral, Engine, EngineConfig, LightLiteral, Material, ObjectLiteral, Scene,
    ShapeKind, SideLiteral, SimdWidth, SurfaceLiteral,
};
use quadray_core::options::RenderOpts;
use quadray_core::transform::Transform3D;

/// A small scene with both a diffuse surface and a light, so the
/// rendered image carries real structure rather than flat ambient only.
fn sample_scene(opts: RenderOpts) -> Scene {
    let mut scene = Scene::empty(opts);
    let sphere_material = scene.insert_material(Material::plain(Vec3::new(0.6, 0.3, 0.2)));
    scene
        .attach_root(ArrayLiteral {
            transform: Transform3D::IDENTITY,
            animation: None,
            children: vec![
                ObjectLiteral::Surface(SurfaceLiteral {
                    transform: Transform3D::new(Vec3::ONE, Vec3::ZERO, Vec3::new(0.0, 0.0, 6.0)),
                    animation: None,
                    shape: ShapeKind::Sphere,
                    coeffs: (1.0, 1.0, 1.0),
                    clipper_min: Vec3::splat(-2.0),
                    clipper_max: Vec3::splat(2.0),
                    outer: SideLiteral { material: sphere_material },
                    inner: None,
                }),
                ObjectLiteral::Light(LightLiteral {
                    transform: Transform3D::new(Vec3::ONE, Vec3::ZERO, Vec3::new(3.0, -2.0, 0.0)),
                    animation: None,
                    color: Vec3::ONE,
                    lum: [0.0, 4.0],
                    atten: (0.0, 1.0, 0.0, 0.0),
                }),
                ObjectLiteral::Camera(CameraLiteral {
                    transform: Transform3D::IDENTITY,
                    animation: None,
                    ambient_color: Vec3::splat(0.05),
                    ambient_intensity: 1.0,
                    pov: 4.0,
                    pos_delta: Vec3::splat(0.5),
                    rot_delta: Vec3::splat(5.0),
                }),
            ],
            relations: vec![],
        })
        .unwrap();
    scene
}

fn render_once(thnum: usize) -> anyhow::Result<Vec<u32>> {
    let mut config = EngineConfig::default();
    config.xres = 32;
    config.yres = 24;
    config.thnum = thnum;
    config.depth = 1;

    let mut engine = Engine::with_rayon_pool(sample_scene(config.opts), config)?;
    engine.update(0.0, CameraAction::None);
    engine.render(0.0)?;
    Ok(engine.get_frame().to_vec())
}

#[test]
fn thread_count_does_not_change_rendered_pixels() -> anyhow::Result<()> {
    let single = render_once(1)?;
    let dual = render_once(2)?;
    let quad = render_once(4)?;

    assert_eq!(single, dual, "a 2-thread render must match the 1-thread render pixel for pixel");
    assert_eq!(single, quad, "a 4-thread render must match the 1-thread render pixel for pixel");
    Ok(())
}

#[test]
fn simd_width_switch_preserves_pixel_values() -> anyhow::Result<()> {
    let mut config = EngineConfig::default();
    config.xres = 32;
    config.yres = 24;
    config.thnum = 1;
    config.depth = 1;
    config.simd = SimdWidth::W4;

    let mut engine = Engine::with_rayon_pool(sample_scene(config.opts), config)?;
    engine.render(0.0)?;
    let before = engine.get_frame().to_vec();

    let selected = engine.set_simd(32);
    assert_eq!(selected, SimdWidth::W32);
    engine.render(0.016)?;
    let after = engine.get_frame().to_vec();

    // The reference tracer's math never depends on lane width, only the
    // framebuffer's row stride does; the pixel content itself must be
    // unchanged across the switch.
    assert_eq!(before, after);
    Ok(())
}
