// sampler.rs — bilinear RGBA fetch with longitude wrap and latitude clamp

use image::{Rgba, RgbaImage};

#[inline]
fn wrap_column(x: i64, width: u32) -> u32 {
    x.rem_euclid(width as i64) as u32
}

#[inline]
fn clamp_row(y: i64, height: u32) -> u32 {
    y.clamp(0, height as i64 - 1) as u32
}

/// Samples `image` at fractional pixel coordinates.
///
/// Columns wrap modulo the width (longitude is cyclic), rows clamp to
/// `[0, height - 1]` (no folding across the poles). Channels are interpolated
/// independently, straight alpha. An empty image yields transparent black.
#[inline]
pub fn sample(image: &RgbaImage, u: f64, v: f64) -> Rgba<u8> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let u = if u.is_finite() { u } else { 0.0 };
    let v = if v.is_finite() { v } else { 0.0 };

    let u0 = u.floor();
    let v0 = v.floor();
    let fu = (u - u0) as f32;
    let fv = (v - v0) as f32;

    let x0 = wrap_column(u0 as i64, width);
    let x1 = wrap_column(u0 as i64 + 1, width);
    let y0 = clamp_row(v0 as i64, height);
    let y1 = clamp_row(v0 as i64 + 1, height);

    let p00 = image.get_pixel(x0, y0).0;
    let p10 = image.get_pixel(x1, y0).0;
    let p01 = image.get_pixel(x0, y1).0;
    let p11 = image.get_pixel(x1, y1).0;

    let w00 = (1.0 - fu) * (1.0 - fv);
    let w10 = fu * (1.0 - fv);
    let w01 = (1.0 - fu) * fv;
    let w11 = fu * fv;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let value = p00[c] as f32 * w00
            + p10[c] as f32 * w10
            + p01[c] as f32 * w01
            + p11[c] as f32 * w11;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> RgbaImage {
        // 4x3, red encodes the column, green the row.
        RgbaImage::from_fn(4, 3, |x, y| Rgba([(x * 60) as u8, (y * 100) as u8, 7, 255]))
    }

    #[test]
    fn integer_coordinates_hit_pixels() {
        let img = ramp();
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(sample(&img, x as f64, y as f64), *img.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn midpoint_averages_neighbours() {
        let img = ramp();
        let p = sample(&img, 1.5, 0.5);
        assert_eq!(p, Rgba([90, 50, 7, 255]));
    }

    #[test]
    fn columns_wrap_across_the_seam() {
        let img = ramp();
        // Halfway between the last column (180) and the first (0).
        assert_eq!(sample(&img, 3.5, 0.0).0[0], 90);
        assert_eq!(sample(&img, -0.5, 0.0).0[0], 90);
        assert_eq!(sample(&img, 4.0, 1.0), *img.get_pixel(0, 1));
    }

    #[test]
    fn rows_clamp_at_the_poles() {
        let img = ramp();
        assert_eq!(sample(&img, 2.0, -3.7), sample(&img, 2.0, 0.0));
        assert_eq!(sample(&img, 2.0, 2.6), *img.get_pixel(2, 2));
        assert_eq!(sample(&img, 2.0, 40.0), *img.get_pixel(2, 2));
    }

    #[test]
    fn empty_image_is_transparent() {
        let img = RgbaImage::new(0, 0);
        assert_eq!(sample(&img, 1.0, 1.0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn non_finite_coordinates_do_not_panic() {
        let img = ramp();
        assert_eq!(sample(&img, f64::NAN, f64::INFINITY), *img.get_pixel(0, 0));
    }
}
