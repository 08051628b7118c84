// error.rs — error taxonomy shared by the planner, renderers and binaries

/// Invalid caller-supplied parameters. Reported before any rendering starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("grid dimensions must be at least 1x1 (got {cols}x{rows})")]
    GridDimensions { cols: i64, rows: i64 },
    #[error("field of view {fov}° outside supported range [{min}°, {max}°]")]
    FovOutOfRange { fov: f64, min: f64, max: f64 },
    #[error("vertical range {0}° outside (0°, 180°]")]
    VerticalRange(f64),
    #[error("viewport must be non-empty (got {width}x{height})")]
    EmptyViewport { width: u32, height: u32 },
    #[error("blend alpha {0} outside [0, 1]")]
    BlendAlpha(f32),
    #[error("could not parse configuration: {0}")]
    Parse(String),
}

/// Missing or unusable source rasters. No partial output is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("source image is empty ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("source image unavailable: {0}")]
    Unavailable(String),
    #[error("pixel buffer holds {len} bytes, expected {width}x{height} RGBA")]
    BufferSize { len: usize, width: u32, height: u32 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("degenerate input: {0}")]
    DegenerateInput(#[from] InputError),
}

impl Error {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn is_degenerate_input(&self) -> bool {
        matches!(self, Error::DegenerateInput(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
