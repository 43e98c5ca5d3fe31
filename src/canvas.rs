// Software drawing surface
// Frames are composed here in BGRA byte order (ARGB8888 little-endian) and
// then handed to the shm buffer or uploaded to the GPU as one texture

use crate::geometry::Rect;

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    fn to_bgra(self) -> [u8; 4] {
        [self.b, self.g, self.r, self.a]
    }
}

/// Drawable image: BGRA pixels, 4 bytes per pixel, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Texture {
    /// Wrap a BGRA buffer; returns `None` if the buffer does not match the size
    pub fn from_bgra(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Fully transparent texture
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width as usize * height as usize {
            pixels.extend_from_slice(&color.to_bgra());
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

/// CPU-side frame the viewer and menu draw into
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Resize the frame; contents are undefined until the next clear
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels
            .resize(width as usize * height as usize * 4, 0);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Read back one pixel; `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        let p = &self.pixels[idx..idx + 4];
        Some(Color::rgba(p[2], p[1], p[0], p[3]))
    }

    pub fn clear(&mut self, color: Color) {
        let bgra = color.to_bgra();
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&bgra);
        }
    }

    /// Write a single pixel, blending when the color is translucent
    fn put_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        blend_into(&mut self.pixels[idx..idx + 4], color);
    }

    /// Intersection of a rect with the frame, as pixel ranges
    fn clip(&self, rect: Rect) -> Option<(i32, i32, i32, i32)> {
        let x0 = rect.x.max(0);
        let y0 = rect.y.max(0);
        let x1 = rect.right().min(self.width as i32);
        let y1 = rect.bottom().min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0, y0, x1, y1))
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        let bgra = color.to_bgra();
        let width = self.width as usize;
        for y in y0..y1 {
            let row = y as usize * width;
            for x in x0..x1 {
                let idx = (row + x as usize) * 4;
                blend_into(&mut self.pixels[idx..idx + 4], bgra);
            }
        }
    }

    /// One-pixel outline inside the rect
    pub fn stroke_rect(&mut self, rect: Rect, color: Color) {
        if rect.is_empty() {
            return;
        }
        let right = rect.right() - 1;
        let bottom = rect.bottom() - 1;
        self.draw_line(rect.x, rect.y, right, rect.y, color);
        self.draw_line(rect.x, bottom, right, bottom, color);
        self.draw_line(rect.x, rect.y, rect.x, bottom, color);
        self.draw_line(right, rect.y, right, bottom, color);
    }

    /// Bresenham line, both endpoints inclusive
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let bgra = color.to_bgra();
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            self.put_pixel(x, y, bgra);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Draw a texture stretched to `dest` with nearest-neighbor sampling
    pub fn draw_image(&mut self, texture: &Texture, dest: Rect) {
        if dest.is_empty() || texture.width == 0 || texture.height == 0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip(dest) else {
            return;
        };

        // 16.16 fixed-point source step per destination pixel
        let scale_x_fp = ((texture.width as u64) << 16) / dest.w as u64;
        let scale_y_fp = ((texture.height as u64) << 16) / dest.h as u64;
        let src_stride = texture.width as usize * 4;

        // Source column for every visible destination column
        let x_lut: Vec<usize> = (x0..x1)
            .map(|x| {
                let rel = (x - dest.x) as u64;
                (((rel * scale_x_fp) >> 16) as u32).min(texture.width - 1) as usize
            })
            .collect();

        let width = self.width as usize;
        for y in y0..y1 {
            let rel = (y - dest.y) as u64;
            let src_y = (((rel * scale_y_fp) >> 16) as u32).min(texture.height - 1) as usize;
            let src_row = src_y * src_stride;
            let dst_row = y as usize * width;

            for (i, &src_x) in x_lut.iter().enumerate() {
                let src_idx = src_row + src_x * 4;
                let dst_idx = (dst_row + x0 as usize + i) * 4;
                let src = [
                    texture.pixels[src_idx],
                    texture.pixels[src_idx + 1],
                    texture.pixels[src_idx + 2],
                    texture.pixels[src_idx + 3],
                ];
                blend_into(&mut self.pixels[dst_idx..dst_idx + 4], src);
            }
        }
    }

    /// Draw a texture at its natural size with its top-left corner at (x, y)
    pub fn blit(&mut self, texture: &Texture, x: i32, y: i32) {
        let dest = Rect::new(x, y, texture.width as i32, texture.height as i32);
        self.draw_image(texture, dest);
    }
}

/// Source-over blend of one BGRA pixel onto an opaque destination
fn blend_into(dst: &mut [u8], src: [u8; 4]) {
    match src[3] {
        255 => dst.copy_from_slice(&src),
        0 => {}
        alpha => {
            let a = alpha as u32;
            let inv = 255 - a;
            for c in 0..3 {
                dst[c] = ((src[c] as u32 * a + dst[c] as u32 * inv + 127) / 255) as u8;
            }
            dst[3] = 255;
        }
    }
}
