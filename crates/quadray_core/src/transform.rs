//! `Transform3D`: scale + Euler rotation + position (§3).
//!
//! Unlike a renderer-facing `scene::Transform`, which stores rotation as a
//! `Quat`, `Transform3D` stores rotation as degrees-Euler because the
//! triviality test ("every rotation component a multiple of 90 degrees")
//! is defined in that space. The
//! quaternion/matrix form is derived on demand via [`Transform3D::to_affine`].

use glam::{Affine3A, EulerRot, Quat, Vec3};

/// Scale + Euler rotation (degrees) + position, as specified in §3.
///
/// # Triviality
///
/// A transform is *trivial* when every scale component is `±1` and every
/// rotation component is a multiple of 90 degrees — the transform then
/// reduces to a signed axis permutation (see [`Transform3D::is_trivial`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3D {
    /// Per-axis scale.
    pub scale: Vec3,
    /// Euler rotation in degrees, extrinsic XYZ order, each component
    /// normalized to `(-180, +180]` by [`Transform3D::normalized`].
    pub rotation: Vec3,
    /// World-space position offset.
    pub position: Vec3,
}

impl Transform3D {
    /// The identity transform: unit scale, zero rotation, origin position.
    pub const IDENTITY: Self = Self {
        scale: Vec3::ONE,
        rotation: Vec3::ZERO,
        position: Vec3::ZERO,
    };

    /// Creates a new transform, normalizing the rotation components.
    #[must_use]
    pub fn new(scale: Vec3, rotation: Vec3, position: Vec3) -> Self {
        Self {
            scale,
            rotation,
            position,
        }
        .normalized()
    }

    /// Normalizes each rotation component into `(-180, +180]`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.rotation = Vec3::new(
            normalize_angle(self.rotation.x),
            normalize_angle(self.rotation.y),
            normalize_angle(self.rotation.z),
        );
        self
    }

    /// Returns whether every scale component is `±1`.
    #[must_use]
    pub fn has_trivial_scale(&self) -> bool {
        [self.scale.x, self.scale.y, self.scale.z]
            .iter()
            .all(|s| (s.abs() - 1.0).abs() < f32::EPSILON)
    }

    /// Returns whether every rotation component is a multiple of 90 degrees.
    #[must_use]
    pub fn has_trivial_rotation(&self) -> bool {
        const TRIVIAL_ANGLES: [f32; 7] = [-270.0, -180.0, -90.0, 0.0, 90.0, 180.0, 270.0];
        let r = self.normalized().rotation;
        [r.x, r.y, r.z]
            .iter()
            .all(|a| TRIVIAL_ANGLES.iter().any(|t| (a - t).abs() < 1e-3))
    }

    /// A transform is trivial (pure axis remap + sign flips) when both its
    /// scale and rotation are trivial (§3 `Transform3D` invariant).
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.has_trivial_scale() && self.has_trivial_rotation()
    }

    /// Whether this transform has any non-trivial scale component (the
    /// `SCL` contribution of §4.3 step 2).
    #[must_use]
    pub fn has_scale_contribution(&self) -> bool {
        !self.has_trivial_scale()
    }

    /// Whether this transform has any non-trivial rotation component (the
    /// `ROT` contribution of §4.3 step 2).
    #[must_use]
    pub fn has_rotation_contribution(&self) -> bool {
        !self.has_trivial_rotation()
    }

    /// Builds the affine matrix for this transform.
    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        let rot = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x.to_radians(),
            self.rotation.y.to_radians(),
            self.rotation.z.to_radians(),
        );
        Affine3A::from_scale_rotation_translation(self.scale, rot, self.position)
    }

    /// Builds the affine matrix for the scale-only portion of this
    /// transform, used when only axis-remap + scale need to be propagated
    /// separately from rotation (§4.3 step 6, "separated axis-remap
    /// matrix").
    #[must_use]
    pub fn scale_only_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, Quat::IDENTITY, Vec3::ZERO)
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Normalizes an angle in degrees to `(-180, +180]`.
#[must_use]
pub fn normalize_angle(mut a: f32) -> f32 {
    a %= 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_trivial() {
        assert!(Transform3D::IDENTITY.is_trivial());
    }

    #[test]
    fn ninety_degree_rotation_is_trivial() {
        let t = Transform3D::new(Vec3::ONE, Vec3::new(0.0, 90.0, 0.0), Vec3::ZERO);
        assert!(t.is_trivial());
    }

    #[test]
    fn arbitrary_rotation_is_not_trivial() {
        let t = Transform3D::new(Vec3::ONE, Vec3::new(0.0, 45.0, 0.0), Vec3::ZERO);
        assert!(!t.is_trivial());
    }

    #[test]
    fn negative_scale_of_one_is_trivial() {
        let t = Transform3D::new(Vec3::new(-1.0, 1.0, 1.0), Vec3::ZERO, Vec3::ZERO);
        assert!(t.is_trivial());
    }

    #[test]
    fn non_unit_scale_is_not_trivial() {
        let t = Transform3D::new(Vec3::splat(2.0), Vec3::ZERO, Vec3::ZERO);
        assert!(!t.is_trivial());
    }

    #[test]
    fn angle_normalization_wraps_into_range() {
        assert!((normalize_angle(270.0) - (-90.0)).abs() < 1e-4);
        assert!((normalize_angle(-270.0) - 90.0).abs() < 1e-4);
        assert!((normalize_angle(540.0) - 180.0).abs() < 1e-4);
    }
}
