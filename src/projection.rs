// projection.rs — spherical ray mapping
//
// Equirectangular pixel `u` sits at longitude `(u / W - 0.5) · 2π`, row `v` at
// latitude `(0.5 - v / H) · π`. Directions use the frame documented in
// `orientation.rs`. All angle math is f64.

use std::f64::consts::{PI, TAU};

use glam::DVec3;

/// Unit vector on the sphere.
pub type Direction = DVec3;

pub fn direction_from_lon_lat(lon: f64, lat: f64) -> Direction {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    DVec3::new(cos_lat * sin_lon, sin_lat, cos_lat * cos_lon)
}

/// Longitude in `(-π, π]` and latitude in `[-π/2, π/2]` of a direction.
pub fn lon_lat(d: Direction) -> (f64, f64) {
    let len = d.length();
    let y = if len > 0.0 { d.y / len } else { 0.0 };
    (d.x.atan2(d.z), y.clamp(-1.0, 1.0).asin())
}

pub fn equirect_to_direction(u: f64, v: f64, width: u32, height: u32) -> Direction {
    let lon = (u / width as f64 - 0.5) * TAU;
    let lat = (0.5 - v / height as f64) * PI;
    direction_from_lon_lat(lon, lat)
}

/// Inverse of [`equirect_to_direction`]. `u` wraps into `[0, width)` at the
/// ±180° seam; `v` is clamped to `[0, height - 1]` at the poles.
pub fn direction_to_equirect(d: Direction, width: u32, height: u32) -> (f64, f64) {
    let (w, h) = (width as f64, height as f64);
    let (lon, lat) = lon_lat(d);
    let u = (lon / TAU + 0.5) * w;
    let v = (0.5 - lat / PI) * h;
    (u.rem_euclid(w.max(1.0)), v.clamp(0.0, (h - 1.0).max(0.0)))
}

/// Pinhole intrinsics of a perspective viewport.
///
/// `fov_degrees` is the vertical field of view; the horizontal extent follows
/// the aspect ratio. NDC is taken at pixel centres so that adjacent tiles meet
/// exactly at their frustum planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pinhole {
    width: u32,
    height: u32,
    half_w: f64,
    half_h: f64,
}

impl Pinhole {
    pub fn new(width: u32, height: u32, fov_degrees: f64) -> Self {
        let half_h = (fov_degrees.to_radians() * 0.5).tan();
        let aspect = if height > 0 {
            width as f64 / height as f64
        } else {
            1.0
        };
        Self {
            width,
            height,
            half_w: half_h * aspect,
            half_h,
        }
    }

    /// Camera-space ray through pixel `(px, py)`; +Z forward, +Y up, +X right.
    #[inline]
    pub fn ray(&self, px: f64, py: f64) -> Direction {
        let ndc_x = 2.0 * (px + 0.5) / self.width as f64 - 1.0;
        let ndc_y = 1.0 - 2.0 * (py + 0.5) / self.height as f64;
        DVec3::new(ndc_x * self.half_w, ndc_y * self.half_h, 1.0).normalize()
    }

    /// True when a camera-space direction falls inside the frustum.
    pub fn contains(&self, d: Direction) -> bool {
        d.z > 0.0 && d.x.abs() <= self.half_w * d.z && d.y.abs() <= self.half_h * d.z
    }
}

/// Camera-space ray for one perspective pixel, before any orientation.
pub fn perspective_to_direction(
    px: f64,
    py: f64,
    viewport_width: u32,
    viewport_height: u32,
    fov_degrees: f64,
) -> Direction {
    Pinhole::new(viewport_width, viewport_height, fov_degrees).ray(px, py)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_centre_is_forward() {
        let d = equirect_to_direction(4.0, 2.0, 8, 4);
        assert!((d - DVec3::Z).length() < 1e-12);
        let (u, v) = direction_to_equirect(DVec3::Z, 8, 4);
        assert!((u - 4.0).abs() < 1e-12 && (v - 2.0).abs() < 1e-12);
    }

    #[test]
    fn east_is_three_quarters_across() {
        let (u, v) = direction_to_equirect(DVec3::X, 2048, 1024);
        assert!((u - 1536.0).abs() < 1e-9);
        assert!((v - 512.0).abs() < 1e-9);
    }

    #[test]
    fn seam_wraps_into_range() {
        // Just west of the seam lands near the right edge, just east near 0.
        let west = direction_from_lon_lat(-PI + 1e-6, 0.0);
        let east = direction_from_lon_lat(PI - 1e-6, 0.0);
        let (uw, _) = direction_to_equirect(west, 100, 50);
        let (ue, _) = direction_to_equirect(east, 100, 50);
        assert!(uw >= 0.0 && uw < 0.01);
        assert!(ue < 100.0 && ue > 99.99);
    }

    #[test]
    fn poles_clamp_rows() {
        let (_, v) = direction_to_equirect(DVec3::Y, 64, 32);
        assert_eq!(v, 0.0);
        let (_, v) = direction_to_equirect(-DVec3::Y, 64, 32);
        assert_eq!(v, 31.0);
    }

    #[test]
    fn centre_pixel_pair_is_symmetric() {
        let pin = Pinhole::new(256, 256, 90.0);
        let a = pin.ray(127.0, 127.0);
        let b = pin.ray(128.0, 128.0);
        assert!((a.x + b.x).abs() < 1e-12);
        assert!((a.y + b.y).abs() < 1e-12);
        assert!(a.x < 0.0 && a.y > 0.0);
    }

    #[test]
    fn edge_rays_hit_half_fov() {
        // Left edge of pixel 0 is exactly at -fov/2.
        let d = perspective_to_direction(-0.5, 31.5, 64, 64, 90.0);
        let angle = d.x.atan2(d.z).to_degrees();
        assert!((angle + 45.0).abs() < 1e-9);
    }

    #[test]
    fn aspect_widens_horizontal_extent() {
        let d = perspective_to_direction(-0.5, 49.5, 200, 100, 90.0);
        assert!((d.x / d.z + 2.0).abs() < 1e-9);
    }
}
