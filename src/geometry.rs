// Geometry helpers shared by the menu, the image collection and the canvas

/// Reference resolution the UI scale factor is measured against
pub const REFERENCE_WIDTH: f32 = 800.0;
pub const REFERENCE_HEIGHT: f32 = 600.0;

/// Bounds of the UI scale factor
pub const MIN_UI_SCALE: f32 = 0.5;
pub const MAX_UI_SCALE: f32 = 3.0;

/// Axis-aligned rectangle in window pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Half-open containment test: the right and bottom edges are outside
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x as f64
            && x < (self.x + self.w) as f64
            && y >= self.y as f64
            && y < (self.y + self.h) as f64
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
}

/// Window area the current image is laid out in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    /// Space reserved at the top for the menu bar
    pub top_inset: u32,
}

impl Viewport {
    pub fn available_width(&self) -> i32 {
        self.width as i32
    }

    pub fn available_height(&self) -> i32 {
        self.height as i32 - self.top_inset as i32
    }
}

/// UI scale factor for a window size, relative to 800x600 and clamped to [0.5, 3.0]
pub fn scale_factor_for(width: u32, height: u32) -> f32 {
    let width_scale = width as f32 / REFERENCE_WIDTH;
    let height_scale = height as f32 / REFERENCE_HEIGHT;
    width_scale
        .min(height_scale)
        .clamp(MIN_UI_SCALE, MAX_UI_SCALE)
}
