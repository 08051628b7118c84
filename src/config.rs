// config.rs — recognized options and where they come from
//
// - Options live in a JSON file (`panoview.json`), every field optional.
// - Lookup order: explicit path -> $PANOVIEW_CONFIG -> <exe_dir>/panoview.json
//   -> ./panoview.json -> built-in defaults.
// - FOV and view size are clamped into range (with a warning); grid
//   dimensions below 1 and blend alpha outside [0, 1] are rejected.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::compare::CompareMode;
use crate::error::{ConfigError, Result};
use crate::perspective::FovRange;
use crate::tiles::{Layout, PlanParams};

pub const CONFIG_FILE: &str = "panoview.json";
pub const CONFIG_ENV: &str = "PANOVIEW_CONFIG";

pub const VIEW_SIZE_MIN: u32 = 256;
pub const VIEW_SIZE_MAX: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Equator,
    Cubemap,
    Grid,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareKind {
    A,
    B,
    Blend,
    Split,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Field of view in degrees for tiles and the live view.
    pub fov: f64,
    pub fov_min: f64,
    pub fov_max: f64,
    /// Edge length of square tiles, in pixels.
    pub view_size: u32,
    pub layout: LayoutKind,
    pub grid_cols: i64,
    pub grid_rows: i64,
    pub equator_count: i64,
    pub mode: CompareKind,
    pub blend_alpha: f32,
    /// Viewport column where split mode switches from A to B.
    pub split_boundary: Option<u32>,
    /// Rows per re-projection chunk.
    pub chunk_rows: u32,
    pub grid_fov_overlap: f64,
    pub fov_step: f64,
    /// Degrees of elevation the grid bands are spread over.
    pub vertical_range: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fov: 90.0,
            fov_min: FovRange::DEFAULT.min,
            fov_max: FovRange::DEFAULT.max,
            view_size: 512,
            layout: LayoutKind::Grid,
            grid_cols: 8,
            grid_rows: 4,
            equator_count: 4,
            mode: CompareKind::Blend,
            blend_alpha: 0.5,
            split_boundary: None,
            chunk_rows: 64,
            grid_fov_overlap: 1.1,
            fov_step: 5.0,
            vertical_range: 180.0,
        }
    }
}

/// Clamps a viewport edge into `[VIEW_SIZE_MIN, VIEW_SIZE_MAX]`.
pub fn clamp_view_size(size: u32) -> u32 {
    let clamped = size.clamp(VIEW_SIZE_MIN, VIEW_SIZE_MAX);
    if clamped != size {
        warn!("view size {size} clamped to {clamped}");
    }
    clamped
}

fn find_config_file() -> Option<PathBuf> {
    if let Ok(v) = std::env::var(CONFIG_ENV) {
        if !v.trim().is_empty() {
            return Some(PathBuf::from(v));
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join(CONFIG_FILE);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from(CONFIG_FILE);
    if p.exists() {
        return Some(p);
    }

    None
}

fn dims(cols: i64, rows: i64) -> Result<(u32, u32)> {
    match (u32::try_from(cols), u32::try_from(rows)) {
        (Ok(c), Ok(r)) if c >= 1 && r >= 1 => Ok((c, r)),
        _ => Err(ConfigError::GridDimensions { cols, rows }.into()),
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        let config = Self::from_json(&text)?;
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `explicit` if given, otherwise the first config file found on
    /// the search path, otherwise the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit.map(Path::to_path_buf).or_else(find_config_file) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn fov_range(&self) -> FovRange {
        let (min, max) = if self.fov_min <= self.fov_max {
            (self.fov_min, self.fov_max)
        } else {
            (self.fov_max, self.fov_min)
        };
        FovRange { min, max }
    }

    /// Applies the clamp policy. A custom layout keeps its FOV untouched so
    /// the planner can reject it.
    pub fn sanitized(&self) -> Config {
        let mut c = self.clone();
        let range = self.fov_range();
        c.fov_min = range.min;
        c.fov_max = range.max;

        if c.layout != LayoutKind::Custom && !range.contains(c.fov) {
            let clamped = range.clamp(c.fov);
            warn!("fov {} clamped to {clamped}", c.fov);
            c.fov = clamped;
        }
        c.view_size = clamp_view_size(c.view_size);
        if c.chunk_rows == 0 {
            warn!("chunk_rows must be at least 1");
            c.chunk_rows = 1;
        }
        if !(c.grid_fov_overlap.is_finite() && c.grid_fov_overlap >= 1.0) {
            warn!("grid_fov_overlap {} raised to 1.0", c.grid_fov_overlap);
            c.grid_fov_overlap = 1.0;
        }
        if !(c.fov_step.is_finite() && c.fov_step > 0.0) {
            warn!("fov_step {} reset to 1.0", c.fov_step);
            c.fov_step = 1.0;
        }
        c
    }

    pub fn plan_params(&self) -> PlanParams {
        PlanParams {
            size: self.view_size,
            default_fov: self.fov,
            fov_range: self.fov_range(),
            grid_fov_overlap: self.grid_fov_overlap,
            fov_step: self.fov_step,
            vertical_range: self.vertical_range,
        }
    }

    /// The planner request for the configured layout. Grid dimensions are
    /// checked here; the FOV of a custom grid is checked by the planner.
    pub fn layout(&self) -> Result<Layout> {
        Ok(match self.layout {
            LayoutKind::Equator => {
                let (count, _) = dims(self.equator_count, 1)?;
                Layout::Equator { count }
            }
            LayoutKind::Cubemap => Layout::CubeMap,
            LayoutKind::Grid => {
                let (cols, rows) = dims(self.grid_cols, self.grid_rows)?;
                Layout::Grid { cols, rows }
            }
            LayoutKind::Custom => {
                let (cols, rows) = dims(self.grid_cols, self.grid_rows)?;
                Layout::Custom {
                    cols,
                    rows,
                    fov: self.fov,
                }
            }
        })
    }

    pub fn plan_request(&self) -> Result<(Layout, PlanParams)> {
        Ok((self.layout()?, self.plan_params()))
    }

    pub fn compare_mode(&self) -> Result<CompareMode> {
        Ok(match self.mode {
            CompareKind::A => CompareMode::A,
            CompareKind::B => CompareMode::B,
            CompareKind::Blend => CompareMode::blend(self.blend_alpha)?,
            CompareKind::Split => CompareMode::Split {
                boundary: self.split_boundary,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let c = Config::from_json(r#"{"layout": "cubemap", "view_size": 300}"#).unwrap();
        assert_eq!(c.layout, LayoutKind::Cubemap);
        assert_eq!(c.view_size, 300);
        assert_eq!(c.grid_cols, 8);
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        let err = Config::from_json(r#"{"layout": "hexagons"}"#).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Configuration(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn sanitize_clamps_fov_and_size() {
        let c = Config {
            fov: 150.0,
            view_size: 64,
            chunk_rows: 0,
            ..Config::default()
        }
        .sanitized();
        assert_eq!(c.fov, 120.0);
        assert_eq!(c.view_size, 256);
        assert_eq!(c.chunk_rows, 1);
    }

    #[test]
    fn view_size_clamps_at_both_ends() {
        assert_eq!(clamp_view_size(0), VIEW_SIZE_MIN);
        assert_eq!(clamp_view_size(700), 700);
        assert_eq!(clamp_view_size(4096), VIEW_SIZE_MAX);
    }

    #[test]
    fn vertical_range_reaches_the_planner() {
        let c = Config::from_json(r#"{"vertical_range": 120}"#).unwrap();
        assert_eq!(c.plan_params().vertical_range, 120.0);
        let c = Config {
            vertical_range: 0.0,
            ..Config::default()
        };
        let (layout, params) = c.plan_request().unwrap();
        assert!(crate::tiles::plan(layout, &params).unwrap_err().is_configuration());
    }

    #[test]
    fn custom_layout_fov_is_rejected_not_clamped() {
        let c = Config {
            layout: LayoutKind::Custom,
            fov: 150.0,
            ..Config::default()
        }
        .sanitized();
        assert_eq!(c.fov, 150.0);
        let (layout, params) = c.plan_request().unwrap();
        let err = crate::tiles::plan(layout, &params).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn non_positive_grid_is_rejected() {
        let c = Config {
            grid_cols: -2,
            ..Config::default()
        };
        assert_eq!(
            c.layout().unwrap_err(),
            crate::Error::Configuration(ConfigError::GridDimensions { cols: -2, rows: 4 })
        );
    }

    #[test]
    fn compare_mode_from_config() {
        let c = Config {
            mode: CompareKind::Split,
            split_boundary: Some(100),
            ..Config::default()
        };
        assert_eq!(c.compare_mode().unwrap(), CompareMode::split_at(100));
        let c = Config {
            blend_alpha: 2.0,
            ..Config::default()
        };
        assert!(c.compare_mode().is_err());
    }

    #[test]
    fn explicit_missing_file_is_reported() {
        let err = Config::discover(Some(Path::new("/nonexistent/panoview.json"))).unwrap_err();
        assert!(err.is_configuration());
    }
}
