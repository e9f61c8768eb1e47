//! Materials: a tag plus a property bit-set plus the shading parameters
//! those bits gate (§3 `Material`).

use bitflags::bitflags;
use glam::{Mat3, Vec2, Vec3};

use crate::ids::TextureId;

/// Broad material role. Orthogonal to [`MaterialProps`]: the tag picks the
/// shading model, the bits pick which of that model's inputs are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialTag {
    /// Ordinary diffuse/specular surface.
    Plain,
    /// Emissive surface usable as an area-light proxy.
    Light,
    /// Mirror-like surface with Fresnel-free full reflectance.
    Metal,
}

bitflags! {
    /// Which shading inputs are active for a material (§3 `Material`
    /// property bits).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MaterialProps: u32 {
        /// Sample `texture` instead of (or to modulate) `diffuse`.
        const TEXTURE  = 1 << 0;
        /// Trace a reflection ray (`reflection` weight > 0).
        const REFLECT  = 1 << 1;
        /// Trace a refraction ray (`refraction_index` != 1).
        const REFRACT  = 1 << 2;
        /// Evaluate the specular lobe (`power` > 0).
        const SPECULAR = 1 << 3;
        /// Fully opaque: skip the transparency blend entirely.
        const OPAQUE   = 1 << 4;
        /// Partially transparent: blend with `opacity` (§9(b)).
        const TRANSP   = 1 << 5;
        /// Emissive: contributes to scene illumination rather than
        /// receiving it (`MaterialTag::Light` surfaces always set this).
        const LIGHT    = 1 << 6;
        /// Perturb the shading normal from the texture's alpha/height
        /// channel.
        const NORMAL   = 1 << 7;
        /// Mirror-like reflectance tinted by `specular` rather than white
        /// (`MaterialTag::Metal` surfaces always set this).
        const METAL    = 1 << 8;
    }
}

/// A 2D affine transform applied to surface UVs before texture sampling
/// (§3 `Side`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTransform {
    pub scale: Vec2,
    pub offset: Vec2,
    pub rotation: f32,
}

impl UvTransform {
    pub const IDENTITY: Self = Self {
        scale: Vec2::ONE,
        offset: Vec2::ZERO,
        rotation: 0.0,
    };

    /// Builds the 2x3 affine matrix (as a `Mat3` with an implicit
    /// homogeneous last row) mapping surface-local UV to texture UV.
    #[must_use]
    pub fn to_mat3(&self) -> Mat3 {
        let (s, c) = self.rotation.to_radians().sin_cos();
        let rot = Mat3::from_cols_array(&[c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0]);
        let scale = Mat3::from_scale(self.scale);
        let translate = Mat3::from_translation(self.offset);
        translate * rot * scale
    }

    /// Applies the transform to a UV coordinate.
    #[must_use]
    pub fn apply(&self, uv: Vec2) -> Vec2 {
        self.to_mat3().transform_point2(uv)
    }
}

impl Default for UvTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A surface's shading parameters (§3 `Material`).
#[derive(Debug, Clone)]
pub struct Material {
    pub tag: MaterialTag,
    pub props: MaterialProps,
    pub texture: Option<TextureId>,
    pub uv_transform: UvTransform,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub power: f32,
    pub reflection: f32,
    /// Opacity in `[0, 1]`; `1.0` means fully opaque and drives `OPAQUE`
    /// rather than `TRANSP` (§9(b) Open Question resolution).
    pub opacity: f32,
    pub refraction_index: f32,
}

impl Material {
    /// Builds a plain diffuse material with no texture, reflection or
    /// transparency — the common case for procedural test scenes.
    #[must_use]
    pub fn plain(diffuse: Vec3) -> Self {
        Self {
            tag: MaterialTag::Plain,
            props: MaterialProps::OPAQUE,
            texture: None,
            uv_transform: UvTransform::IDENTITY,
            diffuse,
            specular: Vec3::ZERO,
            power: 0.0,
            reflection: 0.0,
            opacity: 1.0,
            refraction_index: 1.0,
        }
    }

    /// Recomputes [`MaterialProps`] from the current parameter values
    /// (§4.2 construction step: derive bits, don't trust caller-supplied
    /// ones blindly). Tag-implied bits (`LIGHT`, `METAL`) are always set.
    pub fn derive_props(&mut self) {
        let mut props = MaterialProps::empty();
        if self.texture.is_some() {
            props |= MaterialProps::TEXTURE;
        }
        if self.reflection > 0.0 {
            props |= MaterialProps::REFLECT;
        }
        if (self.refraction_index - 1.0).abs() > f32::EPSILON {
            props |= MaterialProps::REFRACT;
        }
        if self.power > 0.0 {
            props |= MaterialProps::SPECULAR;
        }
        if self.opacity >= 1.0 {
            props |= MaterialProps::OPAQUE;
        } else if self.opacity > 0.0 {
            props |= MaterialProps::TRANSP;
        }
        match self.tag {
            MaterialTag::Light => props |= MaterialProps::LIGHT,
            MaterialTag::Metal => props |= MaterialProps::METAL,
            MaterialTag::Plain => {}
        }
        self.props = props;
    }
}
