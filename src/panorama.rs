// panorama.rs — equirectangular source raster

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView, RgbaImage};
use log::{info, warn};

use crate::error::{InputError, Result};

/// A read-only equirectangular RGBA source.
///
/// Cheap to clone; the pixels are shared, so one source can feed any number
/// of concurrent renders without locking. A 2:1 aspect is expected but not
/// enforced.
#[derive(Debug, Clone)]
pub struct Panorama {
    image: Arc<RgbaImage>,
}

impl Panorama {
    pub fn new(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(InputError::Empty { width, height }.into());
        }
        if width != height * 2 {
            warn!("panorama is {width}x{height}, not 2:1; output will be stretched");
        }
        Ok(Self {
            image: Arc::new(image),
        })
    }

    /// Wraps a row-major RGBA buffer.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let len = pixels.len();
        match RgbaImage::from_raw(width, height, pixels) {
            Some(image) => Self::new(image),
            None => Err(InputError::BufferSize { len, width, height }.into()),
        }
    }

    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        Self::new(image.to_rgba8())
    }

    /// Decodes an image file, sniffing the format from its contents. Decoder
    /// allocation limits are off.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| unavailable(format!("{}: {e}", path.display())))?;
        let image = ImageReader::new(BufReader::new(file))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)
            .and_then(|mut r| {
                r.no_limits();
                r.decode()
            })
            .map_err(|e| unavailable(format!("{}: {e}", path.display())))?;
        let (w, h) = image.dimensions();
        info!("decoded {} ({w}x{h})", path.display());
        Self::from_dynamic(image)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Bilinear sample at fractional equirectangular coordinates.
    #[inline]
    pub fn sample(&self, u: f64, v: f64) -> image::Rgba<u8> {
        crate::sampler::sample(&self.image, u, v)
    }
}

/// Host-side decode failures reach the core as an unavailable input.
pub fn unavailable(reason: impl std::fmt::Display) -> crate::Error {
    InputError::Unavailable(reason.to_string()).into()
}
