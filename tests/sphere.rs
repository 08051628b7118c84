use std::f64::consts::PI;

use panoview::projection::{direction_to_equirect, equirect_to_direction, Direction};
use panoview::{plan, Layout, PlanParams, TileSpec};

/// Deterministic, near-uniform directions on the unit sphere.
fn fibonacci_sphere(n: usize) -> Vec<Direction> {
    let golden = PI * (3.0 - 5f64.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f64;
            Direction::new(r * theta.cos(), y, r * theta.sin())
        })
        .collect()
}

#[test]
fn equirect_round_trip_within_one_pixel() {
    let dirs = fibonacci_sphere(4000);
    for height in [64u32, 100, 257] {
        let width = height * 2;
        let tolerance = PI / height as f64 + 1e-9;
        for d in &dirs {
            let (u, v) = direction_to_equirect(*d, width, height);
            assert!((0.0..width as f64).contains(&u), "u={u}");
            assert!((0.0..=(height - 1) as f64).contains(&v), "v={v}");
            let back = equirect_to_direction(u, v, width, height);
            let error = d.angle_between(back);
            assert!(error <= tolerance, "{d:?} -> {back:?} off by {error} at H={height}");
        }
    }
}

#[test]
fn poles_and_seam_land_on_the_raster() {
    let (w, h) = (512, 256);
    let (_, v_north) = direction_to_equirect(Direction::Y, w, h);
    let (_, v_south) = direction_to_equirect(-Direction::Y, w, h);
    assert_eq!(v_north, 0.0);
    assert_eq!(v_south, 255.0);
    let (u_back, _) = direction_to_equirect(-Direction::Z, w, h);
    assert_eq!(u_back, 0.0);
}

fn uncovered(tiles: &[TileSpec], dirs: &[Direction]) -> usize {
    dirs.iter()
        .filter(|d| !tiles.iter().any(|t| t.covers(**d)))
        .count()
}

#[test]
fn standard_grid_covers_the_sphere() {
    let tiles = plan(Layout::STANDARD_GRID, &PlanParams::default()).unwrap();
    assert_eq!(tiles.len(), 32);
    assert_eq!(uncovered(&tiles, &fibonacci_sphere(10_000)), 0);
}

#[test]
fn dense_and_derived_grids_cover_the_sphere() {
    let dirs = fibonacci_sphere(10_000);
    for layout in [
        Layout::DENSE_GRID,
        Layout::Grid { cols: 8, rows: 4 },
        Layout::Grid { cols: 12, rows: 6 },
        Layout::Grid { cols: 6, rows: 3 },
        Layout::CubeMap,
    ] {
        let tiles = plan(layout, &PlanParams::default()).unwrap();
        assert_eq!(uncovered(&tiles, &dirs), 0, "{layout:?}");
    }
}

#[test]
fn equator_band_leaves_the_poles_uncovered() {
    let tiles = plan(Layout::Equator { count: 4 }, &PlanParams::default()).unwrap();
    assert!(!tiles.iter().any(|t| t.covers(Direction::Y)));
    assert!(tiles.iter().any(|t| t.covers(Direction::X)));
}

#[test]
fn planning_is_deterministic() {
    let params = PlanParams::default();
    for layout in [
        Layout::STANDARD_GRID,
        Layout::Grid { cols: 7, rows: 3 },
        Layout::Equator { count: 5 },
        Layout::CubeMap,
    ] {
        assert_eq!(plan(layout, &params).unwrap(), plan(layout, &params).unwrap());
    }
}

#[test]
fn grid_order_is_bands_top_down_then_eastward() {
    let tiles = plan(Layout::Grid { cols: 6, rows: 3 }, &PlanParams::default()).unwrap();
    let pitches: Vec<f64> = tiles.chunks(6).map(|band| band[0].pitch).collect();
    assert_eq!(pitches, vec![45.0, 0.0, -45.0]);
    for band in tiles.chunks(6) {
        assert!(band.iter().all(|t| t.pitch == band[0].pitch));
        let yaws: Vec<f64> = band.iter().map(|t| t.yaw).collect();
        assert_eq!(yaws, vec![0.0, 60.0, 120.0, 180.0, -120.0, -60.0]);
    }
    assert!(tiles.iter().all(|t| t.fov == 100.0));
}
