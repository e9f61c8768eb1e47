//! Camera objects (§3 `Camera`).

use glam::Vec3;

/// Lower bound on `pov`: the near-clip threshold used throughout the
/// render pipeline, doubled so the image plane never sits inside the
/// clip range of any ray it spawns (§3 `Camera` invariant).
pub const CLIP_THRESHOLD: f32 = 1e-4;

/// A camera: global-ambient color/intensity, a focal distance, and
/// per-unit-time position/rotation deltas used to advance the camera
/// between frames without an explicit animation callback.
#[derive(Debug, Clone, Copy)]
pub struct CameraData {
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    pub pov: f32,
    pub pos_delta: Vec3,
    pub rot_delta: Vec3,
    /// Image-plane basis derived from this frame's world matrix: the
    /// horizontal, vertical and forward (normal) axes, in that order.
    /// Recomputed every Phase 0 walk; `None` until the first update.
    pub basis: Option<(Vec3, Vec3, Vec3)>,
}

impl CameraData {
    #[must_use]
    pub fn new(ambient_color: Vec3, ambient_intensity: f32, pov: f32) -> Self {
        Self {
            ambient_color,
            ambient_intensity,
            pov: pov.max(2.0 * CLIP_THRESHOLD),
            pos_delta: Vec3::ZERO,
            rot_delta: Vec3::ZERO,
            basis: None,
        }
    }

    /// Returns whether `pov` still satisfies its invariant; construction
    /// clamps it, but a later mutation could violate it.
    #[must_use]
    pub fn has_valid_pov(&self) -> bool {
        self.pov >= 2.0 * CLIP_THRESHOLD
    }
}
