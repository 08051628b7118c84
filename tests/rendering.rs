use std::f64::consts::TAU;

use image::{Rgba, RgbaImage};
use panoview::collage::{cube_cross, CubeFaces};
use panoview::perspective::{render_view_of, SourceFrame};
use panoview::{
    align_pair, composite, plan, render_tiles, render_view, reproject, CancelToken, CompareMode,
    CompareSource, CompareState, Layout, Orientation, Panorama, PlanParams, Progress, ViewSpec,
};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

/// Red channel equals the column index; green is constant.
fn horizontal_gradient() -> Panorama {
    Panorama::new(RgbaImage::from_fn(256, 128, |x, _| Rgba([x as u8, 90, 0, 255]))).unwrap()
}

fn checker(width: u32, height: u32, cell: u32) -> Panorama {
    Panorama::new(RgbaImage::from_fn(width, height, |x, y| {
        let on = (x / cell + y / cell) % 2 == 0;
        if on {
            Rgba([240, 200, 40, 255])
        } else {
            Rgba([20, 60, 180, 255])
        }
    }))
    .unwrap()
}

#[test]
fn identity_view_reproduces_the_centre_strip() {
    let pano = horizontal_gradient();
    let view = ViewSpec::square(64, 90.0, Orientation::IDENTITY);
    let out = render_view(&view, &pano);
    assert_eq!(out.dimensions(), (64, 64));

    for x in 0..64 {
        // fov 90 puts the image plane at z = 1 with half-extent 1.
        let ndc_x = 2.0 * (x as f64 + 0.5) / 64.0 - 1.0;
        let lon = ndc_x.atan2(1.0);
        let u = (lon / TAU + 0.5) * 256.0;
        let p = out.get_pixel(x, 31).0;
        assert!((p[0] as f64 - u).abs() <= 1.0, "x={x}: got {} want {u}", p[0]);
        assert_eq!(&p[1..], &[90, 0, 255]);
    }
    assert!(out.get_pixel(31, 31).0[0] <= 128);
    assert!(out.get_pixel(32, 31).0[0] >= 128);
    for x in 1..64 {
        assert!(out.get_pixel(x, 31).0[0] >= out.get_pixel(x - 1, 31).0[0]);
    }
}

#[test]
fn single_blue_pixel_lands_in_the_middle() {
    let mut source = RgbaImage::from_pixel(8, 4, Rgba(RED));
    source.put_pixel(4, 2, Rgba(BLUE));
    let pano = Panorama::new(source).unwrap();

    let out = render_view(&ViewSpec::square(256, 90.0, Orientation::IDENTITY), &pano);

    for (x, y) in [(0, 0), (255, 0), (0, 255), (255, 255)] {
        assert_eq!(out.get_pixel(x, y).0, RED, "corner ({x}, {y})");
    }

    let blue = |x: u32, y: u32| out.get_pixel(x, y).0[2];
    let centre = [blue(127, 127), blue(128, 127), blue(127, 128), blue(128, 128)];
    let peak = *centre.iter().max().unwrap();
    assert!(peak > 200, "centre blue {centre:?}");
    for c in centre {
        assert!(peak - c <= 1, "centre not symmetric: {centre:?}");
    }
    assert!(out.pixels().all(|p| p.0[2] <= peak));
    assert!(blue(64, 128) < peak && blue(128, 64) < peak);
}

#[test]
fn blend_extremes_match_pure_modes() {
    let a = CompareSource::new(horizontal_gradient(), Orientation::new(5.0, 20.0, 0.0));
    let b = CompareSource::new(checker(256, 128, 16), Orientation::new(-10.0, -35.0, 3.0));
    let camera = ViewSpec::new(75.0, 48, 32, Orientation::new(12.0, 160.0, 0.0));

    let only_a = composite(&a.frame(), &b.frame(), CompareMode::A, &camera);
    let only_b = composite(&a.frame(), &b.frame(), CompareMode::B, &camera);
    let alpha_one = composite(&a.frame(), &b.frame(), CompareMode::blend(1.0).unwrap(), &camera);
    let alpha_zero = composite(&a.frame(), &b.frame(), CompareMode::blend(0.0).unwrap(), &camera);

    assert_eq!(alpha_one, only_a);
    assert_eq!(alpha_zero, only_b);
    assert_eq!(only_a, render_view_of(&camera, &a.frame()));
    assert_ne!(only_a, only_b);
}

#[test]
fn split_frame_takes_each_half_from_its_source() {
    let state = CompareState::new(
        CompareSource::new(horizontal_gradient(), Orientation::IDENTITY),
        CompareSource::new(checker(256, 128, 8), Orientation::new(0.0, 90.0, 0.0)),
    )
    .with_mode(CompareMode::split_midline());
    let camera = ViewSpec::new(90.0, 40, 20, Orientation::IDENTITY);
    let out = state.composite(&camera);
    let a = render_view_of(&camera, &state.a.frame());
    let b = render_view_of(&camera, &state.b.frame());
    for (x, y, p) in out.enumerate_pixels() {
        let expected = if x < 20 { a.get_pixel(x, y) } else { b.get_pixel(x, y) };
        assert_eq!(p, expected);
    }
}

#[test]
fn oriented_source_matches_its_levelled_copy_at_identity() {
    // Levelling a source and then viewing it straight reads the same texels
    // as viewing the original through its orientation, up to resampling.
    let pano = horizontal_gradient();
    let o = Orientation::new(0.0, 30.0, 0.0);
    let levelled = Panorama::new(reproject(&o, &pano)).unwrap();
    let camera = ViewSpec::square(32, 60.0, Orientation::IDENTITY);
    let direct = render_view_of(&camera, &SourceFrame::oriented(&pano, &o));
    let via_copy = render_view(&camera, &levelled);
    for (a, b) in direct.pixels().zip(via_copy.pixels()) {
        assert!((a.0[0] as i32 - b.0[0] as i32).abs() <= 1);
    }
}

#[test]
fn aligned_pair_matches_individual_passes() {
    let a = horizontal_gradient();
    let b = checker(128, 64, 8);
    let oa = Orientation::new(10.0, 0.0, -4.0);
    let ob = Orientation::new(0.0, 45.0, 0.0);
    let (la, lb) = align_pair((&a, &oa), (&b, &ob));
    assert_eq!(la, reproject(&oa, &a));
    assert_eq!(lb, reproject(&ob, &b));
}

#[test]
fn cube_cross_shows_sky_on_top() {
    let pano = Panorama::new(RgbaImage::from_fn(64, 32, |_, y| {
        if y < 16 {
            Rgba([250, 250, 250, 255])
        } else {
            Rgba([10, 10, 10, 255])
        }
    }))
    .unwrap();
    let params = PlanParams {
        size: 16,
        ..PlanParams::default()
    };
    let tiles = plan(Layout::CubeMap, &params).unwrap();
    let rendered = render_tiles(&pano, &tiles, &CancelToken::new(), &Progress::new())
        .completed()
        .unwrap();
    let faces = CubeFaces::from_tiles(&rendered).unwrap();
    let sheet = cube_cross(&faces).unwrap();
    assert_eq!(sheet.dimensions(), (64, 48));
    assert_eq!(sheet.get_pixel(24, 8).0, [250, 250, 250, 255]);
    assert_eq!(sheet.get_pixel(24, 40).0, [10, 10, 10, 255]);
}
