// tiles.rs — tile grid planning and batch tile rendering
//
// Tiles come out row-major: elevation bands top to bottom, azimuth ascending
// eastward from yaw 0 within a band. Exported names and archive order depend
// on this.

use image::RgbaImage;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{ConfigError, Result};
use crate::job::{CancelToken, JobOutcome, Progress};
use crate::orientation::{wrap_degrees, Orientation};
use crate::panorama::Panorama;
use crate::perspective::{render_view, FovRange, ViewSpec};
use crate::projection::Direction;

/// One planned perspective view.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSpec {
    /// Degrees, positive up.
    pub pitch: f64,
    /// Degrees in `[-180, 180]`, positive east.
    pub yaw: f64,
    pub fov: f64,
    pub size: u32,
    pub label: String,
}

impl TileSpec {
    pub fn orientation(&self) -> Orientation {
        Orientation::new(self.pitch, self.yaw, 0.0)
    }

    pub fn view(&self) -> ViewSpec {
        ViewSpec::square(self.size, self.fov, self.orientation())
    }

    /// True when the world direction `d` lies inside this tile's frustum.
    pub fn covers(&self, d: Direction) -> bool {
        let camera = self.orientation().inverse_rotate(d);
        self.view().pinhole().contains(camera)
    }
}

/// Which set of view directions to plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Layout {
    /// `count` views around the horizon.
    Equator { count: u32 },
    /// Four horizon faces plus straight up and straight down.
    CubeMap,
    /// `cols x rows` grid with a FOV derived from the grid spacing.
    Grid { cols: u32, rows: u32 },
    /// `cols x rows` grid with a caller-chosen FOV, validated not clamped.
    Custom { cols: u32, rows: u32, fov: f64 },
}

impl Layout {
    /// 8x4 views at 90°.
    pub const STANDARD_GRID: Layout = Layout::Custom {
        cols: 8,
        rows: 4,
        fov: 90.0,
    };
    /// 12x6 views at 75°.
    pub const DENSE_GRID: Layout = Layout::Custom {
        cols: 12,
        rows: 6,
        fov: 75.0,
    };
}

/// Planner tuning. `default_fov` feeds the equator band and cube map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanParams {
    pub size: u32,
    pub default_fov: f64,
    pub fov_range: FovRange,
    /// Multiplier applied to the raw grid spacing when deriving a grid FOV.
    pub grid_fov_overlap: f64,
    /// Derived grid FOVs are rounded up to a multiple of this.
    pub fov_step: f64,
    /// Degrees of elevation, centred on the horizon, that grid bands span.
    pub vertical_range: f64,
}

impl Default for PlanParams {
    fn default() -> Self {
        Self {
            size: 512,
            default_fov: 90.0,
            fov_range: FovRange::DEFAULT,
            grid_fov_overlap: 1.1,
            fov_step: 5.0,
            vertical_range: 180.0,
        }
    }
}

/// Azimuth (0..360, east of yaw 0) of column `index` out of `count`.
fn azimuth(index: u32, count: u32) -> f64 {
    index as f64 * 360.0 / count as f64
}

/// Band pitches, top to bottom, evenly spaced over `range` with its edges
/// (the exact poles for a full range) excluded.
fn band_pitches(rows: u32, range: f64) -> Vec<f64> {
    let step = range / (rows as f64 + 1.0);
    (0..rows)
        .map(|k| range / 2.0 - step * (k as f64 + 1.0))
        .collect()
}

/// Smallest FOV, in multiples of `fov_step`, that closes the gaps of a
/// `cols x rows` grid; clamped into the supported range.
pub fn derive_grid_fov(cols: u32, rows: u32, params: &PlanParams) -> f64 {
    let yaw_step = 360.0 / cols.max(1) as f64;
    // The outer bands also have to reach the range edges, one band step away.
    let pitch_span = 2.0 * params.vertical_range / (rows.max(1) as f64 + 1.0);
    let raw = yaw_step.max(pitch_span) * params.grid_fov_overlap;
    let step = if params.fov_step > 0.0 { params.fov_step } else { 1.0 };
    let rounded = (raw / step).ceil() * step;
    let fov = params.fov_range.clamp(rounded);
    if fov < rounded {
        warn!(
            "{cols}x{rows} grid wants a {rounded}° FOV, clamped to {fov}°; coverage will have gaps"
        );
    }
    fov
}

fn check_grid(cols: u32, rows: u32) -> Result<()> {
    if cols < 1 || rows < 1 {
        return Err(ConfigError::GridDimensions {
            cols: cols.into(),
            rows: rows.into(),
        }
        .into());
    }
    Ok(())
}

fn check_vertical_range(range: f64) -> Result<()> {
    if !(range > 0.0 && range <= 180.0) {
        return Err(ConfigError::VerticalRange(range).into());
    }
    Ok(())
}

// Labels truncate toward zero, so p+38.6 is written p+38.
fn grid_tiles(cols: u32, rows: u32, fov: f64, params: &PlanParams) -> Vec<TileSpec> {
    let size = params.size;
    let mut tiles = Vec::with_capacity(cols as usize * rows as usize);
    for pitch in band_pitches(rows, params.vertical_range) {
        for h in 0..cols {
            let az = azimuth(h, cols);
            let number = tiles.len() + 1;
            tiles.push(TileSpec {
                pitch,
                yaw: wrap_degrees(az),
                fov,
                size,
                label: format!(
                    "view_{number:03}_y{:03}_p{:+03}",
                    az.trunc() as i64,
                    pitch.trunc() as i64
                ),
            });
        }
    }
    tiles
}

/// Enumerates the tiles of `layout`.
///
/// Explicit grid dimensions below 1, a zero tile size and custom FOVs
/// outside the supported range are reported, never clamped.
pub fn plan(layout: Layout, params: &PlanParams) -> Result<Vec<TileSpec>> {
    let size = params.size;
    if size == 0 {
        return Err(ConfigError::EmptyViewport {
            width: size,
            height: size,
        }
        .into());
    }
    let tiles = match layout {
        Layout::Equator { count } => {
            check_grid(count, 1)?;
            let fov = params.fov_range.check(params.default_fov)?;
            (0..count)
                .map(|i| {
                    let az = azimuth(i, count);
                    TileSpec {
                        pitch: 0.0,
                        yaw: wrap_degrees(az),
                        fov,
                        size,
                        label: format!("equator_{:02}_y{:03}", i + 1, az.trunc() as i64),
                    }
                })
                .collect()
        }
        Layout::CubeMap => {
            let fov = params.fov_range.check(params.default_fov)?;
            let face = |name: &str, pitch: f64, yaw: f64| TileSpec {
                pitch,
                yaw,
                fov,
                size,
                label: format!("cube_{name}"),
            };
            vec![
                face("up", 90.0, 0.0),
                face("front", 0.0, 0.0),
                face("right", 0.0, 90.0),
                face("back", 0.0, 180.0),
                face("left", 0.0, -90.0),
                face("down", -90.0, 0.0),
            ]
        }
        Layout::Grid { cols, rows } => {
            check_grid(cols, rows)?;
            check_vertical_range(params.vertical_range)?;
            grid_tiles(cols, rows, derive_grid_fov(cols, rows, params), params)
        }
        Layout::Custom { cols, rows, fov } => {
            check_grid(cols, rows)?;
            check_vertical_range(params.vertical_range)?;
            let fov = params.fov_range.check(fov)?;
            grid_tiles(cols, rows, fov, params)
        }
    };
    debug!("planned {} tiles for {layout:?}", tiles.len());
    Ok(tiles)
}

/// A rendered tile, named after its spec.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTile {
    pub name: String,
    pub spec: TileSpec,
    pub image: RgbaImage,
}

/// Lazily renders planned tiles one at a time, in plan order.
///
/// Each `next` renders a single tile (internally row-parallel) and checks the
/// cancel token first, so a host loop can interleave other work between
/// tiles.
pub struct TileRenderer<'a> {
    panorama: &'a Panorama,
    tiles: std::slice::Iter<'a, TileSpec>,
    cancel: CancelToken,
}

impl<'a> TileRenderer<'a> {
    pub fn new(panorama: &'a Panorama, tiles: &'a [TileSpec], cancel: CancelToken) -> Self {
        Self {
            panorama,
            tiles: tiles.iter(),
            cancel,
        }
    }
}

impl Iterator for TileRenderer<'_> {
    type Item = RenderedTile;

    fn next(&mut self) -> Option<RenderedTile> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let spec = self.tiles.next()?;
        Some(RenderedTile {
            name: spec.label.clone(),
            spec: spec.clone(),
            image: render_view(&spec.view(), self.panorama),
        })
    }
}

/// Renders every tile, tiles in parallel. Results land in the slot of their
/// plan index, so output order equals plan order regardless of which worker
/// finishes first. Returns `Cancelled` (and drops all output) if the token
/// fires before the last tile completes.
pub fn render_tiles(
    panorama: &Panorama,
    tiles: &[TileSpec],
    cancel: &CancelToken,
    progress: &Progress,
) -> JobOutcome<Vec<RenderedTile>> {
    info!("rendering {} tiles", tiles.len());
    progress.start(tiles.len());
    let rendered: Vec<Option<RenderedTile>> = tiles
        .par_iter()
        .map(|spec| {
            if cancel.is_cancelled() {
                return None;
            }
            let image = render_view(&spec.view(), panorama);
            progress.advance(1);
            debug!("rendered {}", spec.label);
            Some(RenderedTile {
                name: spec.label.clone(),
                spec: spec.clone(),
                image,
            })
        })
        .collect();

    if cancel.is_cancelled() {
        info!("tile job cancelled");
        return JobOutcome::Cancelled;
    }
    match rendered.into_iter().collect::<Option<Vec<_>>>() {
        Some(all) => JobOutcome::Completed(all),
        None => JobOutcome::Cancelled,
    }
}
