//! The packetized tracer backend (§4.6, §9 "SIMD backend dispatch").
//!
//! The original engine's packet is a fixed-width SIMD register group;
//! the instruction schedule that fills it is explicitly out of scope
//! (§1, §4.6). What *is* specified is the contract: a group of `W` rays
//! sharing one origin, traced in lockstep with per-lane masking,
//! recursing through reflection/refraction up to `depth` bounces. This
//! module models that contract with [`PacketTracer`], a capability
//! trait callers register implementations against (§9's "register
//! implementations at startup" redesign note), and [`ScalarPacketTracer`],
//! a reference implementation that traces each lane independently —
//! correct by construction, and exactly as parallel as the registered
//! backend chooses to make the per-lane loop.

use glam::Vec3;

use quadray_core::options::{FsaaMode, SimdWidth};
use quadray_scene::material::MaterialProps;
use quadray_scene::{NodeId, Scene};

use crate::intersect::intersect_surface;
use crate::shade::direct_lighting;

/// A single ray: world-space origin and (not necessarily normalized)
/// direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

/// A packet of `W` rays sharing one camera origin, traced in lockstep
/// (§4.6 "Packet" glossary entry). `W` is a runtime count (the active
/// [`SimdWidth`]'s lane count) rather than a const generic, so the same
/// tracer handles every registered width without monomorphizing per
/// width.
#[derive(Debug, Clone)]
pub struct RayPacket {
    pub rays: Vec<Ray>,
}

impl RayPacket {
    #[must_use]
    pub fn new(rays: Vec<Ray>) -> Self {
        Self { rays }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.rays.len()
    }
}

/// A registered rendering backend (§9 "expose a capability trait").
/// `width()` reports the lane count this implementation was built for;
/// `trace` evaluates one packet and returns one color per lane.
pub trait PacketTracer: Send + Sync {
    fn width(&self) -> SimdWidth;

    /// Traces `packet` against `surfaces` (a tile's front-to-back
    /// surface list), consulting `lights` for direct illumination, up to
    /// `depth` bounces, returning one linear color per lane.
    fn trace(
        &self,
        packet: &RayPacket,
        scene: &Scene,
        surfaces: &[NodeId],
        lights: &[NodeId],
        depth: u32,
        ambient: Vec3,
    ) -> Vec<Vec3>;
}

/// The reference backend: traces each lane's ray independently through
/// [`trace_ray`]. Any SIMD-specific backend a caller registers is free
/// to batch the per-lane analytic tests across real vector registers;
/// the *result* must match this function lane-for-lane (§8 "SIMD
/// switch" testable property).
pub struct ScalarPacketTracer {
    width: SimdWidth,
}

impl ScalarPacketTracer {
    #[must_use]
    pub fn new(width: SimdWidth) -> Self {
        Self { width }
    }
}

impl PacketTracer for ScalarPacketTracer {
    fn width(&self) -> SimdWidth {
        self.width
    }

    fn trace(
        &self,
        packet: &RayPacket,
        scene: &Scene,
        surfaces: &[NodeId],
        lights: &[NodeId],
        depth: u32,
        ambient: Vec3,
    ) -> Vec<Vec3> {
        packet
            .rays
            .iter()
            .map(|ray| trace_ray(scene, *ray, surfaces, lights, depth, ambient))
            .collect()
    }
}

const EPSILON: f32 = 1e-3;

/// Intersects `ray` against every surface in `surfaces`, in order,
/// keeping the closest hit beyond `EPSILON` (§4.6 "track the minimum
/// valid t per lane").
fn closest_hit(scene: &Scene, ray: Ray, surfaces: &[NodeId]) -> Option<crate::intersect::Hit> {
    let mut best: Option<crate::intersect::Hit> = None;
    for &surface in surfaces {
        if let Some(hit) = intersect_surface(scene, surface, ray.origin, ray.dir, EPSILON, f32::INFINITY) {
            if best.map_or(true, |b| hit.t < b.t) {
                best = Some(hit);
            }
        }
    }
    best
}

/// Traces one ray through up to `depth` bounces (§4.6). Lanes whose ray
/// misses everything receive the global ambient color; a hit shades via
/// [`direct_lighting`] and recurses through reflection/refraction.
/// `depth = 0` disables both (§8 boundary behavior).
#[must_use]
pub fn trace_ray(scene: &Scene, ray: Ray, surfaces: &[NodeId], lights: &[NodeId], depth: u32, ambient: Vec3) -> Vec3 {
    let Some(hit) = closest_hit(scene, ray, surfaces) else {
        return ambient;
    };

    let view_dir = -ray.dir.normalize_or_zero();
    let mut color = direct_lighting(scene, surfaces, lights, &hit, view_dir, ambient);

    if depth == 0 {
        return color;
    }

    let Some(node) = scene.node(hit.surface) else { return color };
    let Some(surface) = node.kind.as_surface() else { return color };
    let side_material = match hit.side {
        crate::intersect::SideKind::Inner => surface.inner.unwrap_or(surface.outer),
        crate::intersect::SideKind::Outer => surface.outer,
    };
    let Some(material) = scene.material(side_material.material) else {
        return color;
    };

    if material.props.contains(MaterialProps::REFLECT) {
        let reflect_dir = ray.dir - hit.normal * (2.0 * ray.dir.dot(hit.normal));
        let origin = hit.point + hit.normal * (2.0 * EPSILON);
        let reflected = trace_ray(
            scene,
            Ray { origin, dir: reflect_dir },
            surfaces,
            lights,
            depth - 1,
            ambient,
        );
        color += reflected * material.reflection;
    }

    if material.props.contains(MaterialProps::REFRACT) || material.props.contains(MaterialProps::TRANSP) {
        if let Some(refract_dir) = refract(ray.dir.normalize_or_zero(), hit.normal, material.refraction_index) {
            let origin = hit.point - hit.normal * (2.0 * EPSILON);
            let refracted = trace_ray(
                scene,
                Ray { origin, dir: refract_dir },
                surfaces,
                lights,
                depth - 1,
                ambient,
            );
            let opacity = material.opacity.clamp(0.0, 1.0);
            color = color * opacity + refracted * (1.0 - opacity);
        }
    }

    color
}

/// Snell's-law refraction direction, or `None` on total internal
/// reflection.
fn refract(incident: Vec3, normal: Vec3, ior: f32) -> Option<Vec3> {
    let mut cos_i = incident.dot(normal).clamp(-1.0, 1.0);
    let (mut n, eta) = if cos_i < 0.0 {
        (normal, 1.0 / ior.max(f32::EPSILON))
    } else {
        (-normal, ior)
    };
    cos_i = cos_i.abs();
    let sin_t2 = eta * eta * (1.0 - cos_i * cos_i);
    if sin_t2 > 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin_t2).max(0.0).sqrt();
    n = -n;
    Some(incident * eta + n * (eta * cos_i - cos_t))
}

/// Sub-pixel offsets for FSAA `4X`, in normalized pixel units (§4.6, §3
/// `FsaaMode`).
#[must_use]
pub fn fsaa_offsets(mode: FsaaMode) -> &'static [(f32, f32)] {
    match mode {
        FsaaMode::No => &[(0.5, 0.5)],
        FsaaMode::X4 => &[(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fsaa_4x_averages_four_samples() {
        let samples = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::ZERO,
        ];
        let mean: Vec3 = samples.iter().copied().sum::<Vec3>() / 4.0;
        assert!((mean - Vec3::new(0.25, 0.25, 0.25)).length() < 1e-6);
    }

    #[test]
    fn refract_through_matched_ior_keeps_direction() {
        let incident = Vec3::new(0.0, 0.0, 1.0);
        let normal = Vec3::new(0.0, 0.0, -1.0);
        let dir = refract(incident, normal, 1.0).unwrap();
        assert!((dir - incident).length() < 1e-4);
    }

    #[test]
    fn total_internal_reflection_returns_none() {
        let incident = Vec3::new(1.0, 0.0, 0.01).normalize();
        let normal = Vec3::new(0.0, 0.0, -1.0);
        assert!(refract(incident, normal, 1.5).is_none());
    }
}
