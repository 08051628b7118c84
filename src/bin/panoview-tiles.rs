// panoview-tiles — batch tiles, single views, alignment and comparisons from the shell

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use image::RgbaImage;
use log::{error, info, warn};

use panoview::collage::{cube_cross, cube_grid, CubeFaces};
use panoview::config::{clamp_view_size, CompareKind, Config, LayoutKind};
use panoview::reproject::aligned_output_path;
use panoview::{
    composite, plan, render_tiles, render_view, reproject_chunked, CancelToken, CompareSource,
    JobOutcome, Layout, Orientation, OrientationMetadata, Panorama, Progress, ViewSpec,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Perspective tiles, aligned panoramas and A/B comparisons.")]
struct Cli {
    /// Configuration file (defaults to $PANOVIEW_CONFIG or panoview.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a planned set of perspective tiles into a directory.
    Tiles(TilesArgs),
    /// Render one perspective view.
    View(ViewArgs),
    /// Re-project a panorama so its recorded orientation becomes level.
    Align(AlignArgs),
    /// Composite two panoramas through one camera.
    Compare(CompareArgs),
    /// Render the six cube faces into a single sheet.
    Collage(CollageArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LayoutArg {
    Equator,
    Cubemap,
    Grid,
    Custom,
    /// 8x4 at 90°
    Standard,
    /// 12x6 at 75°
    Dense,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    A,
    B,
    Blend,
    Split,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CollageStyle {
    /// 3x2 sheet
    Grid,
    /// 4x3 cross
    Cross,
}

/// Orientation of one source: explicit angles or a metadata file.
#[derive(Args, Debug, Clone)]
struct OrientationArgs {
    /// Pitch,yaw,roll in degrees, e.g. `--orientation=5,-30,0`
    #[arg(long, value_parser = parse_orientation, allow_hyphen_values = true)]
    orientation: Option<Orientation>,

    /// JSON orientation record (`{"pitch": .., "yaw": .., "roll": ..}` or `[p, y, r]`)
    #[arg(long, conflicts_with = "orientation")]
    metadata: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TilesArgs {
    input: PathBuf,

    #[arg(short, long, default_value = "tiles")]
    output: PathBuf,

    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    #[arg(long)]
    cols: Option<i64>,

    #[arg(long)]
    rows: Option<i64>,

    /// Number of views for the equator layout
    #[arg(long)]
    count: Option<i64>,

    /// FOV for equator, cube map and custom layouts
    #[arg(long)]
    fov: Option<f64>,

    /// Tile edge length in pixels
    #[arg(long)]
    size: Option<u32>,

    /// Output file extension
    #[arg(long, default_value = "png")]
    format: String,

    #[command(flatten)]
    orient: OrientationArgs,
}

#[derive(Args, Debug)]
struct ViewArgs {
    input: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pitch: f64,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    yaw: f64,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    roll: f64,

    #[arg(long)]
    fov: Option<f64>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,
}

#[derive(Args, Debug)]
struct AlignArgs {
    input: PathBuf,

    /// Defaults to `<stem>_aligned.<ext>` beside the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    orient: OrientationArgs,

    #[arg(long)]
    chunk_rows: Option<u32>,
}

#[derive(Args, Debug)]
struct CompareArgs {
    a: PathBuf,
    b: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    #[arg(long)]
    alpha: Option<f32>,

    /// Split column; defaults to the midline
    #[arg(long)]
    split: Option<u32>,

    #[arg(long, value_parser = parse_orientation, allow_hyphen_values = true)]
    orient_a: Option<Orientation>,

    #[arg(long, value_parser = parse_orientation, allow_hyphen_values = true)]
    orient_b: Option<Orientation>,

    /// Camera pitch,yaw,roll
    #[arg(long, value_parser = parse_orientation, allow_hyphen_values = true)]
    camera: Option<Orientation>,

    #[arg(long)]
    fov: Option<f64>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,
}

#[derive(Args, Debug)]
struct CollageArgs {
    input: PathBuf,

    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, value_enum, default_value = "grid")]
    style: CollageStyle,

    /// White frame width for the grid style
    #[arg(long, default_value_t = 0)]
    border: u32,

    #[arg(long)]
    size: Option<u32>,

    #[arg(long)]
    fov: Option<f64>,

    #[command(flatten)]
    orient: OrientationArgs,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] panoview::Error),
    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("job cancelled")]
    Cancelled,
}

fn parse_orientation(text: &str) -> Result<Orientation, String> {
    let parts: Vec<f64> = text
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("expected pitch,yaw,roll: {e}"))?;
    match parts.as_slice() {
        [pitch, yaw, roll] => Ok(Orientation::new(*pitch, *yaw, *roll)),
        _ => Err(format!("expected 3 comma-separated angles, got {}", parts.len())),
    }
}

impl OrientationArgs {
    fn resolve(&self) -> Result<Orientation, CliError> {
        if let Some(o) = self.orientation {
            return Ok(o);
        }
        match &self.metadata {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(OrientationMetadata::from_json(&text)?.orientation())
            }
            None => Ok(Orientation::IDENTITY),
        }
    }
}

fn save(image: &RgbaImage, path: &Path) -> Result<(), CliError> {
    image.save(path).map_err(|source| CliError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    info!("wrote {}", path.display());
    Ok(())
}

fn completed<T>(outcome: JobOutcome<T>) -> Result<T, CliError> {
    outcome.completed().ok_or(CliError::Cancelled)
}

/// The source with its recorded orientation baked out.
fn levelled(
    panorama: Panorama,
    orientation: &Orientation,
    config: &Config,
) -> Result<Panorama, CliError> {
    if orientation.is_identity() {
        return Ok(panorama);
    }
    let image = completed(reproject_chunked(
        orientation,
        &panorama,
        config.chunk_rows,
        &CancelToken::new(),
        &Progress::new(),
    ))?;
    Ok(Panorama::new(image)?)
}

fn run_tiles(args: TilesArgs, mut config: Config) -> Result<(), CliError> {
    let preset = match args.layout {
        Some(LayoutArg::Standard) => Some(Layout::STANDARD_GRID),
        Some(LayoutArg::Dense) => Some(Layout::DENSE_GRID),
        Some(LayoutArg::Equator) => {
            config.layout = LayoutKind::Equator;
            None
        }
        Some(LayoutArg::Cubemap) => {
            config.layout = LayoutKind::Cubemap;
            None
        }
        Some(LayoutArg::Grid) => {
            config.layout = LayoutKind::Grid;
            None
        }
        Some(LayoutArg::Custom) => {
            config.layout = LayoutKind::Custom;
            None
        }
        None => None,
    };
    if let Some(cols) = args.cols {
        config.grid_cols = cols;
    }
    if let Some(rows) = args.rows {
        config.grid_rows = rows;
    }
    if let Some(count) = args.count {
        config.equator_count = count;
    }
    if let Some(fov) = args.fov {
        config.fov = fov;
    }
    if let Some(size) = args.size {
        config.view_size = size;
    }
    let config = config.sanitized();
    let (layout, params) = config.plan_request()?;
    let tiles = plan(preset.unwrap_or(layout), &params)?;

    let orientation = args.orient.resolve()?;
    let panorama = levelled(Panorama::open(&args.input)?, &orientation, &config)?;

    std::fs::create_dir_all(&args.output).map_err(|source| CliError::Io {
        path: args.output.clone(),
        source,
    })?;
    let rendered = completed(render_tiles(
        &panorama,
        &tiles,
        &CancelToken::new(),
        &Progress::new(),
    ))?;
    for tile in &rendered {
        save(
            &tile.image,
            &args.output.join(format!("{}.{}", tile.name, args.format)),
        )?;
    }
    info!("{} tiles written to {}", rendered.len(), args.output.display());
    Ok(())
}

/// Output size from the flags, falling back to the configured view size.
fn viewport(width: Option<u32>, height: Option<u32>, config: &Config) -> (u32, u32) {
    (
        clamp_view_size(width.unwrap_or(config.view_size)),
        clamp_view_size(height.unwrap_or(config.view_size)),
    )
}

fn run_view(args: ViewArgs, config: Config) -> Result<(), CliError> {
    let config = config.sanitized();
    let range = config.fov_range();
    let (width, height) = viewport(args.width, args.height, &config);
    let view = ViewSpec::new(
        args.fov.unwrap_or(config.fov),
        width,
        height,
        Orientation::new(args.pitch, args.yaw, args.roll),
    );
    view.validate(range)?;
    let panorama = Panorama::open(&args.input)?;
    save(&render_view(&view, &panorama), &args.output)
}

fn run_align(args: AlignArgs, mut config: Config) -> Result<(), CliError> {
    if let Some(rows) = args.chunk_rows {
        config.chunk_rows = rows;
    }
    let config = config.sanitized();
    let orientation = args.orient.resolve()?;
    let panorama = Panorama::open(&args.input)?;
    let image = completed(reproject_chunked(
        &orientation,
        &panorama,
        config.chunk_rows,
        &CancelToken::new(),
        &Progress::new(),
    ))?;
    let output = args
        .output
        .unwrap_or_else(|| aligned_output_path(&args.input));
    save(&image, &output)
}

fn run_compare(args: CompareArgs, mut config: Config) -> Result<(), CliError> {
    if let Some(mode) = args.mode {
        config.mode = match mode {
            ModeArg::A => CompareKind::A,
            ModeArg::B => CompareKind::B,
            ModeArg::Blend => CompareKind::Blend,
            ModeArg::Split => CompareKind::Split,
        };
    }
    if let Some(alpha) = args.alpha {
        config.blend_alpha = alpha;
    }
    if args.split.is_some() {
        config.split_boundary = args.split;
    }
    let config = config.sanitized();
    let mode = config.compare_mode()?;
    let (width, height) = viewport(args.width, args.height, &config);
    let camera = ViewSpec::new(
        args.fov.unwrap_or(config.fov),
        width,
        height,
        args.camera.unwrap_or_default(),
    );
    camera.validate(config.fov_range())?;

    let a = CompareSource::new(Panorama::open(&args.a)?, args.orient_a.unwrap_or_default());
    let b = CompareSource::new(Panorama::open(&args.b)?, args.orient_b.unwrap_or_default());
    save(&composite(&a.frame(), &b.frame(), mode, &camera), &args.output)
}

fn run_collage(args: CollageArgs, mut config: Config) -> Result<(), CliError> {
    config.layout = LayoutKind::Cubemap;
    if let Some(fov) = args.fov {
        config.fov = fov;
    }
    if let Some(size) = args.size {
        config.view_size = size;
    }
    let config = config.sanitized();
    let (layout, params) = config.plan_request()?;
    let tiles = plan(layout, &params)?;

    let orientation = args.orient.resolve()?;
    let panorama = levelled(Panorama::open(&args.input)?, &orientation, &config)?;
    let rendered = completed(render_tiles(
        &panorama,
        &tiles,
        &CancelToken::new(),
        &Progress::new(),
    ))?;
    let faces = CubeFaces::from_tiles(&rendered)?;
    let sheet = match args.style {
        CollageStyle::Grid => cube_grid(&faces, args.border)?,
        CollageStyle::Cross => {
            if args.border > 0 {
                warn!("--border only applies to the grid style");
            }
            cube_cross(&faces)?
        }
    };
    save(&sheet, &args.output)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::discover(cli.config.as_deref())?;
    match cli.command {
        Command::Tiles(args) => run_tiles(args, config),
        Command::View(args) => run_view(args, config),
        Command::Align(args) => run_align(args, config),
        Command::Compare(args) => run_compare(args, config),
        Command::Collage(args) => run_collage(args, config),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
