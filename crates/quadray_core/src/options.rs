//! Engine-wide option bits and enumerations.
//!
//! A small bit-set for cheap membership tests, plus explicit enums (rather
//! than modular-arithmetic cycling over an undocumented constant) for the
//! handful of render-mode knobs.

use bitflags::bitflags;

bitflags! {
    /// Update-pipeline optimization toggles (§4.3, §4.4).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct RenderOpts: u32 {
        /// When clear, any non-trivial scale is promoted to imply a
        /// non-trivial rotation, forcing the full-matrix path (§4.3 step 2).
        const FSCALE      = 1 << 0;
        /// Enables transform caching via `trnode` collapsing (§4.3 step 5).
        /// When clear, every non-surface/non-array node collapses its
        /// matrix through the trnode immediately.
        const TARRAY      = 1 << 1;
        /// Enables the custom-clipper bbox/cbox accumulation fast path
        /// (§4.4 step 2). When clear, `adjust_minmax` is always applied
        /// directly to the surface's own clipper box.
        const ADJUST      = 1 << 2;
        /// Static-update mode: after frame 0, Phase 1's heavy bound
        /// recomputation is skipped for surfaces whose transform and
        /// clipper lists did not change (§8 scenario 4).
        const STATIC      = 1 << 3;
    }
}

impl RenderOpts {
    /// The default bit-set used by a freshly constructed scene: all
    /// optimizations enabled, static-update mode off.
    #[must_use]
    pub fn defaults() -> Self {
        Self::FSCALE | Self::TARRAY | Self::ADJUST
    }
}

/// Full-scene antialiasing mode (§3 `Scene`, §4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FsaaMode {
    /// One sample per pixel.
    #[default]
    No,
    /// Four sub-pixel samples per pixel, averaged.
    X4,
}

/// SIMD packet lane width, enumerated explicitly (§9(c) Open Question
/// resolution) rather than cycled with undocumented modular arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SimdWidth {
    /// 4 lanes (e.g. SSE-class).
    W4,
    /// 8 lanes (e.g. AVX-class).
    W8,
    /// 16 lanes (e.g. AVX-512-class).
    W16,
    /// 32 lanes (wide GPU-style packet).
    W32,
    /// 64 lanes (maximal packet width).
    W64,
}

impl SimdWidth {
    /// All supported widths in declaration order.
    pub const ALL: [SimdWidth; 5] = [
        SimdWidth::W4,
        SimdWidth::W8,
        SimdWidth::W16,
        SimdWidth::W32,
        SimdWidth::W64,
    ];

    /// Number of lanes this width represents.
    #[must_use]
    pub fn lanes(self) -> usize {
        match self {
            SimdWidth::W4 => 4,
            SimdWidth::W8 => 8,
            SimdWidth::W16 => 16,
            SimdWidth::W32 => 32,
            SimdWidth::W64 => 64,
        }
    }

    /// Cycles to the next registered width in declaration order, wrapping
    /// around. Used by the `F8` keyboard shortcut in the CLI surface (§6).
    #[must_use]
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|w| *w == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Finds the closest supported width to a requested lane count, used by
    /// `set_simd` to honor "return the actually-selected value" (§4.7, §7).
    #[must_use]
    pub fn closest_to(requested: usize) -> Self {
        *Self::ALL
            .iter()
            .min_by_key(|w| (w.lanes() as isize - requested as isize).abs())
            .unwrap_or(&SimdWidth::W4)
    }
}

impl Default for SimdWidth {
    fn default() -> Self {
        SimdWidth::W8
    }
}
