// Text rendering service
// Shapes and rasterizes UI strings into drawable textures with cosmic-text

use crate::canvas::{Canvas, Color, Texture};
use crate::error::TextError;
use crate::geometry::Rect;
use cosmic_text::{Attrs, Buffer, FontSystem, Metrics, Shaping, SwashCache};
use log::{debug, info};
use std::path::Path;

/// Logical text sizes used across the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
    XLarge,
    XXLarge,
}

impl SizeClass {
    /// Pixel size at a UI scale of 1.0
    pub fn base_px(self) -> f32 {
        match self {
            SizeClass::Small => 12.0,
            SizeClass::Medium => 14.0,
            SizeClass::Large => 18.0,
            SizeClass::XLarge => 24.0,
            SizeClass::XXLarge => 32.0,
        }
    }

    pub fn px(self, scale: f32) -> f32 {
        (self.base_px() * scale).max(1.0)
    }
}

/// Measures strings and renders them to textures
pub trait TextRenderer {
    /// Width and height of the rendered string in pixels
    fn measure(&mut self, text: &str, size: SizeClass, scale: f32) -> (u32, u32);

    /// Render a string to a texture of exactly `measure` size, transparent outside the glyphs
    fn render_to_image(&mut self, text: &str, color: Color, size: SizeClass, scale: f32)
        -> Texture;
}

/// Color, size class and UI scale for one piece of text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub size: SizeClass,
    pub scale: f32,
}

impl TextStyle {
    pub fn new(color: Color, size: SizeClass, scale: f32) -> Self {
        Self { color, size, scale }
    }
}

/// Draw `text` centered inside `rect`
pub fn draw_centered(
    canvas: &mut Canvas,
    text_renderer: &mut dyn TextRenderer,
    text: &str,
    rect: Rect,
    style: TextStyle,
) {
    let texture = text_renderer.render_to_image(text, style.color, style.size, style.scale);
    let x = rect.x + (rect.w - texture.width() as i32) / 2;
    let y = rect.y + (rect.h - texture.height() as i32) / 2;
    canvas.blit(&texture, x, y);
}

/// Draw `text` with its top-left corner at (x, y)
pub fn draw_at(
    canvas: &mut Canvas,
    text_renderer: &mut dyn TextRenderer,
    text: &str,
    x: i32,
    y: i32,
    style: TextStyle,
) {
    let texture = text_renderer.render_to_image(text, style.color, style.size, style.scale);
    canvas.blit(&texture, x, y);
}

/// cosmic-text backed renderer; owns the loaded font database and glyph cache
pub struct CosmicText {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl CosmicText {
    /// Load system fonts plus an optional extra font file
    pub fn init(extra_font: Option<&Path>) -> Result<Self, TextError> {
        let mut font_system = FontSystem::new();

        if let Some(path) = extra_font {
            font_system
                .db_mut()
                .load_font_file(path)
                .map_err(|source| TextError::FontFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            info!("Loaded font file: {}", path.display());
        }

        let faces = font_system.db().len();
        if faces == 0 {
            return Err(TextError::NoFonts);
        }
        info!("Text service initialized with {} font faces", faces);

        Ok(Self {
            font_system,
            swash_cache: SwashCache::new(),
        })
    }

    /// Release the font database and glyph cache
    pub fn shutdown(self) {
        debug!("Text service shut down");
    }

    fn shape(&mut self, text: &str, size: SizeClass, scale: f32) -> (Buffer, u32, u32) {
        let font_size = size.px(scale);
        let line_height = (font_size * 1.3).ceil();
        let mut buffer = Buffer::new(&mut self.font_system, Metrics::new(font_size, line_height));
        buffer.set_size(&mut self.font_system, None, None);
        buffer.set_text(&mut self.font_system, text, Attrs::new(), Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let mut width = 0.0f32;
        let mut lines = 0u32;
        for run in buffer.layout_runs() {
            width = width.max(run.line_w);
            lines += 1;
        }
        let height = (lines.max(1) as f32 * line_height).ceil() as u32;
        (buffer, width.ceil() as u32, height)
    }
}

impl TextRenderer for CosmicText {
    fn measure(&mut self, text: &str, size: SizeClass, scale: f32) -> (u32, u32) {
        let (_, width, height) = self.shape(text, size, scale);
        (width, height)
    }

    fn render_to_image(
        &mut self,
        text: &str,
        color: Color,
        size: SizeClass,
        scale: f32,
    ) -> Texture {
        let (buffer, width, height) = self.shape(text, size, scale);
        let mut texture = Texture::transparent(width, height);
        if width == 0 || height == 0 {
            return texture;
        }

        let text_color = cosmic_text::Color::rgba(color.r, color.g, color.b, color.a);
        let pixels = texture.pixels_mut();
        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            text_color,
            |x, y, w, h, glyph_color| {
                let alpha = glyph_color.a();
                if alpha == 0 {
                    return;
                }
                for py in y.max(0)..(y + h as i32).min(height as i32) {
                    for px in x.max(0)..(x + w as i32).min(width as i32) {
                        let idx = ((py as u32 * width + px as u32) * 4) as usize;
                        // Overlapping glyph edges keep the strongest coverage
                        if pixels[idx + 3] < alpha {
                            pixels[idx] = glyph_color.b();
                            pixels[idx + 1] = glyph_color.g();
                            pixels[idx + 2] = glyph_color.r();
                            pixels[idx + 3] = alpha;
                        }
                    }
                }
            },
        );
        texture
    }
}
