// session.rs — interactive viewing state owned by the host
//
// Holds the shared camera, the two optional sources with their own
// orientations and the compare mode. The host feeds it input deltas and asks
// for frames; nothing here touches a window or a GPU.

use image::RgbaImage;

use crate::compare::{composite, CompareMode, CompareSource};
use crate::error::Result;
use crate::orientation::Orientation;
use crate::panorama::Panorama;
use crate::perspective::{render_view_of, FovRange, ViewSpec};

pub const DEFAULT_FOV: f64 = 90.0;
/// Degrees of FOV per wheel notch.
pub const ZOOM_STEP: f64 = 2.5;

/// Which compare source an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

#[derive(Debug, Clone)]
pub struct ViewerSession {
    /// Shared camera; roll stays 0 under drag.
    pub camera: Orientation,
    pub fov: f64,
    pub fov_range: FovRange,
    /// Multiplier on drag speed.
    pub sensitivity_scale: f64,
    pub mode: CompareMode,
    a: Option<CompareSource>,
    b: Option<CompareSource>,
}

impl Default for ViewerSession {
    fn default() -> Self {
        Self::new(DEFAULT_FOV, FovRange::DEFAULT)
    }
}

impl ViewerSession {
    pub fn new(fov: f64, fov_range: FovRange) -> Self {
        Self {
            camera: Orientation::IDENTITY,
            fov: fov_range.clamp(fov),
            fov_range,
            sensitivity_scale: 1.0,
            mode: CompareMode::A,
            a: None,
            b: None,
        }
    }

    pub fn source(&self, slot: Slot) -> Option<&CompareSource> {
        match slot {
            Slot::A => self.a.as_ref(),
            Slot::B => self.b.as_ref(),
        }
    }

    fn source_mut(&mut self, slot: Slot) -> Option<&mut CompareSource> {
        match slot {
            Slot::A => self.a.as_mut(),
            Slot::B => self.b.as_mut(),
        }
    }

    /// Installs a freshly loaded panorama. The slot's orientation resets.
    pub fn set_source(&mut self, slot: Slot, panorama: Panorama) {
        let source = Some(CompareSource::new(panorama, Orientation::IDENTITY));
        match slot {
            Slot::A => self.a = source,
            Slot::B => self.b = source,
        }
    }

    pub fn swap_sources(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
    }

    pub fn has_pair(&self) -> bool {
        self.a.is_some() && self.b.is_some()
    }

    pub fn orientation(&self, slot: Slot) -> Option<Orientation> {
        self.source(slot).map(|s| s.orientation)
    }

    pub fn set_orientation(&mut self, slot: Slot, orientation: Orientation) {
        if let Some(source) = self.source_mut(slot) {
            source.orientation = orientation.normalized();
        }
    }

    pub fn adjust_orientation(&mut self, slot: Slot, d_pitch: f64, d_yaw: f64, d_roll: f64) {
        if let Some(source) = self.source_mut(slot) {
            source.orientation = source.orientation.rotated(d_pitch, d_yaw, d_roll);
        }
    }

    pub fn set_blend(&mut self, alpha: f32) -> Result<()> {
        self.mode = CompareMode::blend(alpha)?;
        Ok(())
    }

    /// Pans the camera by a cursor delta in pixels so the picture follows
    /// the pointer across a `width x height` viewport.
    pub fn drag(&mut self, dx: f64, dy: f64, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (width, height) = (width as f64, height as f64);
        let v_f = self.fov.to_radians();
        let h_f = 2.0 * ((v_f / 2.0).tan() * width / height).atan();

        let yaw_per_px = (h_f / width).to_degrees();
        let pitch_per_px = (v_f / height).to_degrees();

        let yaw = self.camera.yaw() - dx * yaw_per_px * self.sensitivity_scale;
        let pitch = (self.camera.pitch() + dy * pitch_per_px * self.sensitivity_scale)
            .clamp(-90.0, 90.0);
        self.camera = Orientation::new(pitch, yaw, self.camera.roll());
    }

    /// Wheel zoom; positive `scroll` narrows the view.
    pub fn zoom(&mut self, scroll: f64) {
        self.fov = self.fov_range.clamp(self.fov - scroll * ZOOM_STEP);
    }

    pub fn reset_view(&mut self) {
        self.camera = Orientation::IDENTITY;
        self.fov = self.fov_range.clamp(DEFAULT_FOV);
    }

    pub fn view_spec(&self, width: u32, height: u32) -> ViewSpec {
        ViewSpec::new(self.fov, width, height, self.camera)
    }

    /// Renders the current frame. With only one source loaded that source is
    /// shown regardless of mode; with none there is nothing to draw.
    pub fn frame(&self, width: u32, height: u32) -> Option<RgbaImage> {
        let view = self.view_spec(width, height);
        match (&self.a, &self.b) {
            (Some(a), Some(b)) => Some(composite(&a.frame(), &b.frame(), self.mode, &view)),
            (Some(only), None) | (None, Some(only)) => Some(render_view_of(&view, &only.frame())),
            (None, None) => None,
        }
    }
}
