//! The packed-pixel framebuffer (§3 `Scene`, §4.6).

use glam::Vec3;

/// A row-major `0xXRGB` framebuffer whose row stride may exceed `xres`
/// (rounded up to the active SIMD width, so packet writes never cross a
/// row boundary mid-store).
pub struct FrameBuffer {
    pub xres: u32,
    pub yres: u32,
    pub row_stride: u32,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    /// Builds a buffer sized for `xres x yres`, with `row_stride` rounded
    /// up to `simd_lanes`.
    #[must_use]
    pub fn new(xres: u32, yres: u32, simd_lanes: u32) -> Self {
        let row_stride = xres.div_ceil(simd_lanes).max(1) * simd_lanes;
        Self {
            xres,
            yres,
            row_stride,
            pixels: vec![0; (row_stride * yres) as usize],
        }
    }

    /// Re-rounds `row_stride` to a new SIMD width and reallocates if the
    /// new stride differs (`set_simd`, §4.7).
    pub fn retile(&mut self, simd_lanes: u32) {
        let row_stride = self.xres.div_ceil(simd_lanes).max(1) * simd_lanes;
        if row_stride != self.row_stride {
            self.row_stride = row_stride;
            self.pixels = vec![0; (row_stride * self.yres) as usize];
        }
    }

    /// Writes a packed `0xXRGB` pixel at `(col, row)`.
    pub fn set_pixel(&mut self, col: u32, row: u32, xrgb: u32) {
        let idx = (row * self.row_stride + col) as usize;
        if idx < self.pixels.len() {
            self.pixels[idx] = xrgb;
        }
    }

    #[must_use]
    pub fn get_pixel(&self, col: u32, row: u32) -> u32 {
        self.pixels[(row * self.row_stride + col) as usize]
    }

    /// Borrows one scanline, including any stride padding (`get_x_row`,
    /// §4.7).
    #[must_use]
    pub fn row(&self, row: u32) -> &[u32] {
        let start = (row * self.row_stride) as usize;
        &self.pixels[start..start + self.row_stride as usize]
    }

    /// Borrows the whole frame buffer (`get_frame`, §4.7).
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// A disjoint mutable view of the rows `[row_start, row_end)`, so
    /// distinct tile-row workers can write without aliasing (§5
    /// "Sorting + Render").
    pub fn row_range_mut(&mut self, row_start: u32, row_end: u32) -> &mut [u32] {
        let start = (row_start * self.row_stride) as usize;
        let end = (row_end * self.row_stride) as usize;
        &mut self.pixels[start..end]
    }

    /// Splits the whole buffer into `n` disjoint, row-aligned mutable
    /// bands covering every row exactly once, each tagged with the
    /// `[row_start, row_end)` range it owns (§5 "Sorting + Render": "No
    /// two workers write the same pixel"). Built with repeated
    /// `split_at_mut` rather than raw pointers, so the disjointness the
    /// render dispatch relies on is checked by the borrow checker, not
    /// merely documented.
    pub fn row_bands_mut(&mut self, n: usize) -> Vec<(u32, u32, &mut [u32])> {
        let band_count = n.max(1) as u32;
        let rows_per_band = self.yres.div_ceil(band_count).max(1);
        let stride = self.row_stride;
        let mut bands = Vec::new();
        let mut remaining: &mut [u32] = &mut self.pixels;
        let mut row = 0u32;
        while row < self.yres {
            let band_rows = rows_per_band.min(self.yres - row);
            let split_at = ((band_rows * stride) as usize).min(remaining.len());
            let (band, rest) = remaining.split_at_mut(split_at);
            bands.push((row, row + band_rows, band));
            remaining = rest;
            row += band_rows;
        }
        bands
    }
}

/// Packs an HDR linear color into clamped 8-bit-per-channel `0xXRGB`
/// (§4.6 final accumulation step).
#[must_use]
pub fn pack_xrgb(color: Vec3) -> u32 {
    let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
    (to_u8(color.x) << 16) | (to_u8(color.y) << 8) | to_u8(color.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_xrgb_clamps_out_of_range_channels() {
        assert_eq!(pack_xrgb(Vec3::new(2.0, -1.0, 0.5)), 0x00FF0080);
    }

    #[test]
    fn row_bands_mut_covers_every_row_disjointly() {
        let mut fb = FrameBuffer::new(4, 10, 4);
        let bands = fb.row_bands_mut(3);
        let mut covered = 0u32;
        for (start, end, band) in &bands {
            assert_eq!(band.len(), ((end - start) * 4) as usize);
            covered += end - start;
        }
        assert_eq!(covered, 10);
        assert_eq!(bands[0].0, 0);
        assert_eq!(bands.last().unwrap().1, 10);
    }

    #[test]
    fn row_range_mut_matches_row_accessor() {
        let mut fb = FrameBuffer::new(4, 2, 4);
        fb.set_pixel(1, 1, 0xAA);
        let via_range: Vec<u32> = fb.row_range_mut(1, 2).to_vec();
        assert_eq!(via_range, fb.row(1));
    }
}
