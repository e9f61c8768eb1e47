//! Material/light evaluation at a [`crate::intersect::Hit`] (§4.6).
//!
//! Kept free of any recursion into reflection/refraction — that loop
//! lives in [`crate::packet`], which calls [`direct_lighting`] once per
//! bounce and adds the recursive contributions itself.

use glam::Vec3;

use quadray_scene::camera::CLIP_THRESHOLD;
use quadray_scene::material::{Material, MaterialProps};
use quadray_scene::node::SurfaceData;
use quadray_scene::{NodeId, Scene};

use crate::intersect::{intersect_surface, Hit, SideKind};

/// Unpacks a `0xXRGB` texel into a linear `[0, 1]` color.
fn unpack_xrgb(xrgb: u32) -> Vec3 {
    let r = ((xrgb >> 16) & 0xFF) as f32 / 255.0;
    let g = ((xrgb >> 8) & 0xFF) as f32 / 255.0;
    let b = (xrgb & 0xFF) as f32 / 255.0;
    Vec3::new(r, g, b)
}

/// Derives local-frame UV for a hit point on `surface`, per the same
/// axis convention `intersect`/`bounds` use (local Z is the shape's
/// axis of revolution/extrusion): `u` wraps the azimuth around Z, `v`
/// tracks normalized height within the surface's bbox.
fn local_uv(surface: &SurfaceData, local_point: Vec3) -> (f32, f32) {
    let u = (local_point.y.atan2(local_point.x) / std::f32::consts::TAU).rem_euclid(1.0);
    let height = surface.bbox_max.z - surface.bbox_min.z;
    let v = if height.is_finite() && height.abs() > f32::EPSILON {
        ((local_point.z - surface.bbox_min.z) / height).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (u, v)
}

/// Resolves the material governing `hit`'s side (§3 `Surface` outer/
/// inner `Side`), falling back to the outer material if no inner side
/// was declared.
fn resolve_material<'a>(scene: &'a Scene, surface: &SurfaceData, hit: &Hit) -> Option<&'a Material> {
    let side = match hit.side {
        SideKind::Inner => surface.inner.unwrap_or(surface.outer),
        SideKind::Outer => surface.outer,
    };
    scene.material(side.material)
}

/// Samples diffuse color (texture or flat) and applies the material's
/// UV transform (§3 `Material`, §4.6 "diffuse from texture lookup").
fn diffuse_color(scene: &Scene, material: &Material, surface: &SurfaceData, local_point: Vec3) -> Vec3 {
    if !material.props.contains(MaterialProps::TEXTURE) {
        return material.diffuse;
    }
    let Some(texture_id) = material.texture else {
        return material.diffuse;
    };
    let Some(texture) = scene.texture(texture_id) else {
        return material.diffuse;
    };
    let (u, v) = local_uv(surface, local_point);
    let uv = material.uv_transform.apply(glam::Vec2::new(u, v));
    unpack_xrgb(texture.sample(uv.x, uv.y)) * material.diffuse
}

/// Whether `origin` can see `light_world_pos` unobstructed, tested as a
/// shadow ray through the same per-surface intersection machinery the
/// primary rays use, restricted to `t_max = 1` along the light direction
/// (§4.6 "a shadow ray packet ... restricted to a t_max=1 range").
fn in_shadow(scene: &Scene, surfaces: &[NodeId], origin: Vec3, light_world_pos: Vec3) -> bool {
    let to_light = light_world_pos - origin;
    let dist = to_light.length();
    if dist <= f32::EPSILON {
        return false;
    }
    let dir = to_light / dist;
    let epsilon = 2.0 * CLIP_THRESHOLD;
    surfaces
        .iter()
        .any(|&id| intersect_surface(scene, id, origin, dir, epsilon, 1.0 - epsilon).is_some())
}

/// Evaluates direct lighting (diffuse + specular, over every light,
/// shadow-tested) plus global ambient for a miss. Does not recurse into
/// reflection/refraction; the caller (`packet::trace_ray`) adds those.
#[must_use]
pub fn direct_lighting(scene: &Scene, surfaces: &[NodeId], lights: &[NodeId], hit: &Hit, view_dir: Vec3, ambient: Vec3) -> Vec3 {
    let Some(node) = scene.node(hit.surface) else {
        return ambient;
    };
    let Some(surface) = node.kind.as_surface() else {
        return ambient;
    };
    let Some(material) = resolve_material(scene, surface, hit) else {
        return ambient;
    };

    let local_point = node.matrix.inverse().transform_point3(hit.point);
    let base_diffuse = diffuse_color(scene, material, surface, local_point);

    let mut color = ambient * base_diffuse;
    for &light_id in lights {
        let Some(light_node) = scene.node(light_id) else { continue };
        let Some(light) = light_node.kind.as_light() else { continue };
        let light_pos: Vec3 = light_node.matrix.translation.into();

        if in_shadow(scene, surfaces, hit.point + hit.normal * (2.0 * CLIP_THRESHOLD), light_pos) {
            continue;
        }

        let to_light = light_pos - hit.point;
        let dist = to_light.length();
        if dist <= f32::EPSILON {
            continue;
        }
        let light_dir = to_light / dist;
        let n_dot_l = hit.normal.dot(light_dir).max(0.0);
        if n_dot_l <= 0.0 {
            continue;
        }
        let intensity = light.intensity_at(dist);
        color += base_diffuse * light.color * (n_dot_l * intensity);

        if material.props.contains(MaterialProps::SPECULAR) {
            let half = (light_dir + view_dir).normalize_or_zero();
            let n_dot_h = hit.normal.dot(half).max(0.0);
            if n_dot_h > 0.0 {
                let spec = n_dot_h.powf(material.power.max(1.0));
                color += material.specular * light.color * (spec * intensity);
            }
        }
    }
    color
}
