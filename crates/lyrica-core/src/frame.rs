use crate::Color;

/// A raster drawing target: straight-alpha RGBA8 pixels, row-major.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Raw pixel data, 4 bytes per pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with zeros (transparent black).
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width as usize) * (height as usize) * 4;
        Self {
            data: vec![0u8; size],
            width,
            height,
        }
    }

    /// Create a frame buffer filled with a solid color.
    pub fn solid(width: u32, height: u32, color: &Color) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    /// Overwrite every pixel with `color`.
    pub fn fill(&mut self, color: &Color) {
        let pixel = color.to_rgba8();
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&pixel);
        }
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let o = self.offset(x, y);
        Some([
            self.data[o],
            self.data[o + 1],
            self.data[o + 2],
            self.data[o + 3],
        ])
    }


    /// Porter-Duff "over" of `color` scaled by `coverage` (0..1) onto the
    /// pixel at signed coordinates. Out-of-bounds coordinates are ignored.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: &Color, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let [sr, sg, sb, sa] = color.to_rgba8();
        let sa = ((sa as f32) * coverage.clamp(0.0, 1.0)).round() as u32;
        if sa == 0 {
            return;
        }
        let o = self.offset(x as u32, y as u32);
        let d = &mut self.data[o..o + 4];
        if sa == 255 {
            d.copy_from_slice(&[sr, sg, sb, 255]);
            return;
        }

        let da = d[3] as u32;
        let inv_sa = 255 - sa;
        let out_a = sa + (da * inv_sa) / 255;
        if out_a == 0 {
            return;
        }
        let mix = |s: u8, d: u8| -> u8 {
            ((s as u32 * sa * 255 + d as u32 * da * inv_sa) / (out_a * 255)) as u8
        };
        d[0] = mix(sr, d[0]);
        d[1] = mix(sg, d[1]);
        d[2] = mix(sb, d[2]);
        d[3] = out_a as u8;
    }

    /// Blend an axis-aligned rectangle given in (possibly fractional) pixels.
    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: &Color) {
        let x0 = x.floor() as i64;
        let y0 = y.floor() as i64;
        let x1 = (x + width).ceil() as i64;
        let y1 = (y + height).ceil() as i64;
        for py in y0.max(0)..y1.min(self.height as i64) {
            for px in x0.max(0)..x1.min(self.width as i64) {
                self.blend_pixel(px, py, color, 1.0);
            }
        }
    }
}
