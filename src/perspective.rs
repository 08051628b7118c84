// perspective.rs — ray-cast perspective views out of an equirectangular source

use glam::DMat3;
use image::RgbaImage;
use rayon::prelude::*;

use crate::error::{ConfigError, Result};
use crate::orientation::Orientation;
use crate::panorama::Panorama;
use crate::projection::{direction_to_equirect, Direction, Pinhole};

/// Supported field-of-view range, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FovRange {
    pub min: f64,
    pub max: f64,
}

impl FovRange {
    pub const DEFAULT: FovRange = FovRange {
        min: 60.0,
        max: 120.0,
    };

    pub fn contains(&self, fov: f64) -> bool {
        fov.is_finite() && fov >= self.min && fov <= self.max
    }

    pub fn clamp(&self, fov: f64) -> f64 {
        if fov.is_finite() {
            fov.clamp(self.min, self.max)
        } else {
            self.min
        }
    }

    pub fn check(&self, fov: f64) -> Result<f64> {
        if self.contains(fov) {
            Ok(fov)
        } else {
            Err(ConfigError::FovOutOfRange {
                fov,
                min: self.min,
                max: self.max,
            }
            .into())
        }
    }
}

impl Default for FovRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything one perspective render depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSpec {
    /// Vertical field of view in degrees.
    pub fov: f64,
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
}

impl ViewSpec {
    pub fn new(fov: f64, width: u32, height: u32, orientation: Orientation) -> Self {
        Self {
            fov,
            width,
            height,
            orientation,
        }
    }

    pub fn square(size: u32, fov: f64, orientation: Orientation) -> Self {
        Self::new(fov, size, size, orientation)
    }

    pub fn pinhole(&self) -> Pinhole {
        Pinhole::new(self.width, self.height, self.fov)
    }

    /// Rejects an empty viewport or a FOV outside `range`.
    pub fn validate(&self, range: FovRange) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyViewport {
                width: self.width,
                height: self.height,
            }
            .into());
        }
        range.check(self.fov)?;
        Ok(())
    }

    /// World-space ray through an output pixel.
    #[inline]
    pub fn world_ray(&self, pinhole: &Pinhole, camera: &DMat3, x: u32, y: u32) -> Direction {
        *camera * pinhole.ray(x as f64, y as f64)
    }
}

/// A source panorama seen through a fixed world-to-source rotation.
#[derive(Debug, Clone, Copy)]
pub struct SourceFrame<'a> {
    panorama: &'a Panorama,
    world_to_source: DMat3,
}

impl<'a> SourceFrame<'a> {
    /// The source sampled as-is.
    pub fn level(panorama: &'a Panorama) -> Self {
        Self {
            panorama,
            world_to_source: DMat3::IDENTITY,
        }
    }

    /// The source un-rotated by `orientation`: a world direction `d` reads
    /// the source at `orientation.inverse_rotate(d)`.
    pub fn oriented(panorama: &'a Panorama, orientation: &Orientation) -> Self {
        Self {
            panorama,
            world_to_source: orientation.to_rotation_matrix().transpose(),
        }
    }

    #[inline]
    pub fn sample(&self, world: Direction) -> [u8; 4] {
        let d = self.world_to_source * world;
        let (u, v) = direction_to_equirect(d, self.panorama.width(), self.panorama.height());
        self.panorama.sample(u, v).0
    }
}

/// Fills a `width x height` raster by evaluating `pixel` once per output
/// pixel. Rows run in parallel; each row slice is owned by one worker, so the
/// result does not depend on scheduling.
pub(crate) fn fill_rows<F>(width: u32, height: u32, pixel: F) -> RgbaImage
where
    F: Fn(u32, u32) -> [u8; 4] + Sync,
{
    fill_rows_from(width, height, 0, pixel)
}

/// As [`fill_rows`], but the raster's first row is output row `first_row`.
pub(crate) fn fill_rows_from<F>(width: u32, height: u32, first_row: u32, pixel: F) -> RgbaImage
where
    F: Fn(u32, u32) -> [u8; 4] + Sync,
{
    let mut out = RgbaImage::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }
    let stride = width as usize * 4;
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(stride).enumerate().for_each(|(row, bytes)| {
        let y = first_row + row as u32;
        let texels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(bytes);
        for (x, texel) in texels.iter_mut().enumerate() {
            *texel = pixel(x as u32, y);
        }
    });
    out
}

/// Renders the perspective view described by `view`.
///
/// A zero-sized viewport yields an empty raster.
pub fn render_view(view: &ViewSpec, panorama: &Panorama) -> RgbaImage {
    render_view_of(view, &SourceFrame::level(panorama))
}

/// Renders `view` from a source seen through its own frame.
pub fn render_view_of(view: &ViewSpec, source: &SourceFrame<'_>) -> RgbaImage {
    let pinhole = view.pinhole();
    let camera = view.orientation.to_rotation_matrix();
    fill_rows(view.width, view.height, |x, y| {
        source.sample(view.world_ray(&pinhole, &camera, x, y))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> Panorama {
        Panorama::new(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 255 / (width - 1)) as u8, (y * 255 / (height - 1)) as u8, 40, 255])
        }))
        .unwrap()
    }

    fn render_sequential(view: &ViewSpec, panorama: &Panorama) -> RgbaImage {
        let source = SourceFrame::level(panorama);
        let pinhole = view.pinhole();
        let camera = view.orientation.to_rotation_matrix();
        RgbaImage::from_fn(view.width, view.height, |x, y| {
            Rgba(source.sample(view.world_ray(&pinhole, &camera, x, y)))
        })
    }

    #[test]
    fn empty_viewport_gives_empty_raster() {
        let pano = gradient(64, 32);
        let out = render_view(&ViewSpec::new(90.0, 0, 10, Orientation::IDENTITY), &pano);
        assert_eq!(out.dimensions(), (0, 10));
        assert!(out.as_raw().is_empty());
    }

    #[test]
    fn parallel_matches_sequential() {
        let pano = gradient(128, 64);
        let view = ViewSpec::new(75.0, 61, 37, Orientation::new(12.0, -140.0, 8.0));
        assert_eq!(render_view(&view, &pano), render_sequential(&view, &pano));
    }

    #[test]
    fn validate_rejects_bad_specs() {
        let range = FovRange::DEFAULT;
        assert!(ViewSpec::square(256, 90.0, Orientation::IDENTITY)
            .validate(range)
            .is_ok());
        let err = ViewSpec::square(0, 90.0, Orientation::IDENTITY)
            .validate(range)
            .unwrap_err();
        assert!(err.is_configuration());
        let err = ViewSpec::square(256, 150.0, Orientation::IDENTITY)
            .validate(range)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Configuration(ConfigError::FovOutOfRange { .. })
        ));
    }

    #[test]
    fn fov_range_clamps() {
        let range = FovRange::DEFAULT;
        assert_eq!(range.clamp(30.0), 60.0);
        assert_eq!(range.clamp(200.0), 120.0);
        assert_eq!(range.clamp(f64::NAN), 60.0);
        assert_eq!(range.clamp(90.0), 90.0);
    }

    #[test]
    fn oriented_source_reads_rotated_direction() {
        // A source oriented at yaw -90° shows its centre to a camera looking west.
        let pano = gradient(256, 128);
        let yawed = Orientation::new(0.0, -90.0, 0.0);
        let source = SourceFrame::oriented(&pano, &yawed);
        let west = crate::projection::direction_from_lon_lat(-std::f64::consts::FRAC_PI_2, 0.0);
        assert_eq!(source.sample(west), pano.sample(128.0, 64.0).0);
    }
}
