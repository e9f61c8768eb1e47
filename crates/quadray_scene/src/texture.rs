//! Textures: a solid XRGB color or a width/height pixel buffer, interned
//! by name (§3 `Texture`).

use std::sync::Arc;

/// A texture, either a flat color or a sampled pixel buffer.
#[derive(Debug, Clone)]
pub enum Texture {
    /// A single packed `0xXRGB` color, used by materials that reference no
    /// image (the common case for procedural scenes).
    Solid(u32),
    /// A `width x height` buffer of packed `0xXRGB` pixels, row-major,
    /// shared via `Arc` so every material referencing the same named
    /// texture shares one allocation.
    Image {
        width: u32,
        height: u32,
        pixels: Arc<[u32]>,
    },
}

impl Texture {
    /// Samples at normalized UV coordinates, wrapping both axes (§4.6
    /// texture sampling). Solid textures ignore `u`/`v` entirely.
    #[must_use]
    pub fn sample(&self, u: f32, v: f32) -> u32 {
        match self {
            Texture::Solid(xrgb) => *xrgb,
            Texture::Image {
                width,
                height,
                pixels,
            } => {
                if *width == 0 || *height == 0 {
                    return 0;
                }
                let uu = u.rem_euclid(1.0);
                let vv = v.rem_euclid(1.0);
                let x = ((uu * *width as f32) as u32).min(width - 1);
                let y = ((vv * *height as f32) as u32).min(height - 1);
                pixels[(y * *width + x) as usize]
            }
        }
    }
}
