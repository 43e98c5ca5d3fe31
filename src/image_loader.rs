// Image loading module
// Decodes image files into BGRA pixel buffers and uploads them as drawable textures

use crate::canvas::Texture;
use crate::error::LoadError;
use image::DynamicImage;
use log::debug;
use std::borrow::Borrow;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Largest texture edge accepted by `upload`
pub const MAX_TEXTURE_SIZE: u32 = 16384;

/// A successfully decoded and uploaded image
#[derive(Debug)]
pub struct Decoded<H> {
    pub handle: H,
    pub width: u32,
    pub height: u32,
}

/// Decode-and-upload backend used by the image collection
///
/// The handle is released when it is dropped.
pub trait ImageSource {
    type Handle: Borrow<Texture>;

    fn load(&mut self, path: &Path) -> Result<Decoded<Self::Handle>, LoadError>;
}

/// Decoded pixels, not yet turned into a texture
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Raw BGRA pixel data (4 bytes per pixel)
    pub bgra_data: Vec<u8>,
}

/// Production backend built on the `image` crate
#[derive(Debug, Default)]
pub struct Decoder;

impl Decoder {
    /// Read and decode a file, auto-detecting the format from its contents
    pub fn decode_file(&self, path: &Path) -> Result<PixelBuffer, LoadError> {
        let data = fs::read(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let img = load_from_bytes(&data).map_err(|source| LoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        // Convert to RGBA first, then swap to BGRA (Wayland expects ARGB in little-endian)
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut bgra_data = rgba.into_raw();
        for pixel in bgra_data.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }

        Ok(PixelBuffer {
            width,
            height,
            bgra_data,
        })
    }

    /// Turn decoded pixels into a drawable texture
    pub fn upload(&self, path: &Path, buffer: PixelBuffer) -> Result<Texture, LoadError> {
        let upload_error = |reason: String| LoadError::Upload {
            path: path.to_path_buf(),
            reason,
        };

        if buffer.width == 0 || buffer.height == 0 {
            return Err(upload_error("image has no pixels".to_string()));
        }
        if buffer.width > MAX_TEXTURE_SIZE || buffer.height > MAX_TEXTURE_SIZE {
            return Err(upload_error(format!(
                "{}x{} exceeds the maximum texture size of {}",
                buffer.width, buffer.height, MAX_TEXTURE_SIZE
            )));
        }

        Texture::from_bgra(buffer.width, buffer.height, buffer.bgra_data)
            .ok_or_else(|| upload_error("pixel buffer does not match its dimensions".to_string()))
    }
}

impl ImageSource for Decoder {
    type Handle = Texture;

    fn load(&mut self, path: &Path) -> Result<Decoded<Texture>, LoadError> {
        let buffer = self.decode_file(path)?;
        let texture = self.upload(path, buffer)?;
        debug!(
            "Decoded {} ({}x{})",
            path.display(),
            texture.width(),
            texture.height()
        );
        Ok(Decoded {
            width: texture.width(),
            height: texture.height(),
            handle: texture,
        })
    }
}

/// Load an image from raw bytes, auto-detecting the format
fn load_from_bytes(data: &[u8]) -> Result<DynamicImage, image::ImageError> {
    let format = image::guess_format(data)?;
    image::load(Cursor::new(data), format)
}
