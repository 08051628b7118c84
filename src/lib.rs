//! Geometric core of a 360° panorama viewer.
//!
//! Equirectangular sources are sampled through explicit pitch / yaw / roll
//! orientations to produce perspective views, planned tile batches, levelled
//! re-projections and A/B comparison frames. Everything here is CPU-side and
//! free of window or GPU state; the `panoview` and `panoview-tiles` binaries
//! drive it.

pub mod collage;
pub mod compare;
pub mod config;
pub mod error;
pub mod job;
pub mod orientation;
pub mod panorama;
pub mod perspective;
pub mod projection;
pub mod reproject;
pub mod sampler;
pub mod session;
pub mod tiles;

pub use compare::{composite, CompareMode, CompareSource, CompareState};
pub use config::Config;
pub use error::{ConfigError, Error, InputError, Result};
pub use job::{CancelToken, JobOutcome, Progress};
pub use orientation::{Orientation, OrientationMetadata};
pub use panorama::Panorama;
pub use perspective::{render_view, FovRange, ViewSpec};
pub use reproject::{align_pair, reproject, reproject_chunked};
pub use session::{Slot, ViewerSession};
pub use tiles::{plan, render_tiles, Layout, PlanParams, RenderedTile, TileSpec};
