// compare.rs — two independently oriented panoramas through one camera

use image::RgbaImage;

use crate::error::{ConfigError, Result};
use crate::orientation::Orientation;
use crate::panorama::Panorama;
use crate::perspective::{fill_rows, render_view_of, SourceFrame, ViewSpec};

/// How the two sources are combined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareMode {
    A,
    B,
    /// `alpha · A + (1 - alpha) · B` per channel.
    Blend { alpha: f32 },
    /// Columns left of `boundary` from A, the rest from B. `None` splits at
    /// the viewport midline.
    Split { boundary: Option<u32> },
}

impl CompareMode {
    pub fn blend(alpha: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(ConfigError::BlendAlpha(alpha).into());
        }
        Ok(CompareMode::Blend { alpha })
    }

    pub fn split_at(boundary: u32) -> Self {
        CompareMode::Split {
            boundary: Some(boundary),
        }
    }

    pub fn split_midline() -> Self {
        CompareMode::Split { boundary: None }
    }
}

/// One side of a comparison: a source and the orientation that levels it.
#[derive(Debug, Clone)]
pub struct CompareSource {
    pub panorama: Panorama,
    pub orientation: Orientation,
}

impl CompareSource {
    pub fn new(panorama: Panorama, orientation: Orientation) -> Self {
        Self {
            panorama,
            orientation,
        }
    }

    pub fn frame(&self) -> SourceFrame<'_> {
        SourceFrame::oriented(&self.panorama, &self.orientation)
    }
}

#[derive(Debug, Clone)]
pub struct CompareState {
    pub a: CompareSource,
    pub b: CompareSource,
    pub mode: CompareMode,
}

impl CompareState {
    pub fn new(a: CompareSource, b: CompareSource) -> Self {
        Self {
            a,
            b,
            mode: CompareMode::A,
        }
    }

    pub fn with_mode(mut self, mode: CompareMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
    }

    /// Renders the composite frame for `camera`. The per-source orientations
    /// pick which part of each sphere is sampled; the camera is shared.
    pub fn composite(&self, camera: &ViewSpec) -> RgbaImage {
        composite(&self.a.frame(), &self.b.frame(), self.mode, camera)
    }
}

#[inline]
fn mix(a: [u8; 4], b: [u8; 4], alpha: f32) -> [u8; 4] {
    let mut out = [0u8; 4];
    for c in 0..4 {
        let value = alpha * a[c] as f32 + (1.0 - alpha) * b[c] as f32;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Combines two source frames seen through `camera` according to `mode`.
pub fn composite(
    a: &SourceFrame<'_>,
    b: &SourceFrame<'_>,
    mode: CompareMode,
    camera: &ViewSpec,
) -> RgbaImage {
    let pinhole = camera.pinhole();
    let rotation = camera.orientation.to_rotation_matrix();
    match mode {
        CompareMode::A => render_view_of(camera, a),
        CompareMode::B => render_view_of(camera, b),
        CompareMode::Blend { alpha } => {
            let alpha = if alpha.is_nan() {
                0.5
            } else {
                alpha.clamp(0.0, 1.0)
            };
            fill_rows(camera.width, camera.height, |x, y| {
                let d = camera.world_ray(&pinhole, &rotation, x, y);
                mix(a.sample(d), b.sample(d), alpha)
            })
        }
        CompareMode::Split { boundary } => {
            let boundary = boundary.unwrap_or(camera.width / 2);
            fill_rows(camera.width, camera.height, |x, y| {
                let d = camera.world_ray(&pinhole, &rotation, x, y);
                if x < boundary {
                    a.sample(d)
                } else {
                    b.sample(d)
                }
            })
        }
    }
}
