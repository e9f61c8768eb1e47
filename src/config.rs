//! Facade-level configuration for constructing an [`crate::Engine`].
//!
//! Mirrors a flat `RendererSettings`-style shape: one plain, `Copy`-able
//! struct the caller fills in and hands to the constructor, rather than
//! a builder with a dozen chained setters. The
//! CLI flags of §6 (`-x`, `-y`, `-t`, `-q`/`-s`/`-v`, …) map onto this
//! struct's fields one-for-one in the `demos` harness; the core itself
//! never parses argv.

use quadray_core::options::{FsaaMode, RenderOpts, SimdWidth};

/// Construction-time configuration for an [`crate::Engine`] (§4.7 `new`).
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Output width in pixels (§6 `-x`).
    pub xres: u32,
    /// Output height in pixels (§6 `-y`).
    pub yres: u32,
    /// Worker thread count (§6 `-t`, §5).
    pub thnum: usize,
    /// Update-pipeline optimization toggles (§3 `RenderOpts`).
    pub opts: RenderOpts,
    /// Antialiasing mode (§6 `F2` toggle).
    pub fsaa: FsaaMode,
    /// Packet lane width (§6 `-q`/`-s`/`-v`, `F8` cycle).
    pub simd: SimdWidth,
    /// Maximum reflection/refraction bounce count (§4.6); `0` disables both.
    pub depth: u32,
    /// Tile width in pixels (§4.5).
    pub tile_w: u32,
    /// Tile height in pixels (§4.5).
    pub tile_h: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            xres: 800,
            yres: 480,
            thnum: 1,
            opts: RenderOpts::defaults(),
            fsaa: FsaaMode::No,
            simd: SimdWidth::default(),
            depth: 2,
            tile_w: 64,
            tile_h: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_internally_consistent() {
        let cfg = EngineConfig::default();
        assert!(cfg.xres > 0 && cfg.yres > 0);
        assert!(cfg.tile_w > 0 && cfg.tile_h > 0);
    }
}
