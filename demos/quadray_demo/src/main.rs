//! Non-interactive demo harness.
//!
//! Builds a fixed scene (a plane under a single point light, the same
//! setup as the core render-correctness scenario), drives [`quadray::Engine`]
//! for a requested number of frames with no windowing layer, and logs the
//! final frame's dimensions plus a checksum so a human or a test script can
//! eyeball determinism across runs.

use clap::Parser;
use glam::Vec3;

use quadray::{
    ArrayLiteral, CameraAction, CameraLiteral, Engine, EngineConfig, FsaaMode, LightLiteral, Material, ObjectLiteral,
    Scene, ShapeKind, SideLiteral, SurfaceLiteral,
};
use quadray_core::options::RenderOpts;
use quadray_core::transform::Transform3D;

#[derive(Parser, Debug)]
#[command(name = "quadray_demo", about = "Renders a fixed scene through the quadray engine")]
struct Args {
    /// Output width in pixels.
    #[arg(short = 'x', long, default_value_t = 800)]
    width: u32,
    /// Output height in pixels.
    #[arg(short = 'y', long, default_value_t = 480)]
    height: u32,
    /// Worker thread count.
    #[arg(short = 't', long, default_value_t = 1)]
    threads: usize,
    /// Number of frames to render.
    #[arg(short = 'f', long, default_value_t = 1)]
    frames: u32,
    /// Enable 4x full-scene antialiasing.
    #[arg(long, default_value_t = false)]
    fsaa: bool,
    /// Maximum reflection/refraction bounce depth.
    #[arg(short = 'd', long, default_value_t = 1)]
    depth: u32,
}

/// Builds the plane-under-light seed scenario as a fully constructed
/// [`Scene`]: a 10x10 plane at z=5, a single point light, and a camera
/// looking at both from an angle, with the plane's material minted from
/// the same registry its literal is attached into.
fn plane_under_light_scene(opts: RenderOpts) -> Scene {
    let mut scene = Scene::empty(opts);
    let plane_material = scene.insert_material(Material::plain(Vec3::new(0.7, 0.7, 0.8)));
    scene
        .attach_root(ArrayLiteral {
            transform: Transform3D::IDENTITY,
            animation: None,
            children: vec![
                ObjectLiteral::Surface(SurfaceLiteral {
                    transform: Transform3D::new(Vec3::ONE, Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0)),
                    animation: None,
                    shape: ShapeKind::Plane,
                    coeffs: (0.0, 0.0, 1.0),
                    clipper_min: Vec3::new(-5.0, -5.0, f32::NEG_INFINITY),
                    clipper_max: Vec3::new(5.0, 5.0, f32::INFINITY),
                    outer: SideLiteral { material: plane_material },
                    inner: None,
                }),
                ObjectLiteral::Light(LightLiteral {
                    transform: Transform3D::new(Vec3::ONE, Vec3::ZERO, Vec3::new(0.0, -2.8, 3.3)),
                    animation: None,
                    color: Vec3::ONE,
                    lum: [0.1, 1.0],
                    atten: (0.0, 1.0, 0.0, 0.0),
                }),
                ObjectLiteral::Camera(CameraLiteral {
                    transform: Transform3D::new(Vec3::ONE, Vec3::new(-90.0, 0.0, 45.0), Vec3::new(2.0, -2.0, 0.0)),
                    animation: None,
                    ambient_color: Vec3::splat(0.1),
                    ambient_intensity: 1.0,
                    pov: 4.0,
                    pos_delta: Vec3::splat(0.5),
                    rot_delta: Vec3::splat(5.0),
                }),
            ],
            relations: vec![],
        })
        .expect("seed literal always attaches");
    scene
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = EngineConfig::default();
    config.xres = args.width;
    config.yres = args.height;
    config.thnum = args.threads.max(1);
    config.depth = args.depth;
    config.fsaa = if args.fsaa { FsaaMode::X4 } else { FsaaMode::No };

    let mut engine =
        Engine::with_rayon_pool(plane_under_light_scene(config.opts), config).expect("scene must build");

    let dt = 1.0 / 60.0;
    for frame in 0..args.frames.max(1) {
        let time = frame as f32 * dt;
        engine.update(time, CameraAction::None);
        engine.render(time).expect("render must not fail");
        log::info!(
            "frame {frame}: {}x{} pixels, checksum {:#x}",
            engine.xres(),
            engine.yres(),
            checksum(engine.get_frame()),
        );
    }
}

fn checksum(pixels: &[u32]) -> u64 {
    pixels.iter().fold(0xcbf29ce484222325u64, |acc, &p| {
        (acc ^ u64::from(p)).wrapping_mul(0x100000001b3)
    })
}
