// reproject.rs — bake an orientation into a full equirectangular raster
//
// Output pixel `(u, v)` reads the source at
// `orientation.inverse_rotate(equirect_to_direction(u, v))`, so a capture
// tagged with its misalignment comes out level.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::{debug, info};

use crate::job::{CancelToken, JobOutcome, Progress};
use crate::orientation::Orientation;
use crate::panorama::Panorama;
use crate::perspective::{fill_rows, fill_rows_from, SourceFrame};
use crate::projection::equirect_to_direction;

/// Rows `first_row .. first_row + image.height()` of a re-projected raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChunk {
    pub first_row: u32,
    pub image: RgbaImage,
}

/// Lazy row-chunk sequence for one re-projection pass.
///
/// Finite and not restartable: build a new one for a fresh pass. The cancel
/// token is checked before each chunk; once it fires the sequence ends early.
pub struct ReprojectChunks<'a> {
    source: SourceFrame<'a>,
    width: u32,
    height: u32,
    chunk_rows: u32,
    next_row: u32,
    cancel: CancelToken,
}

impl<'a> ReprojectChunks<'a> {
    pub fn new(
        orientation: &Orientation,
        panorama: &'a Panorama,
        chunk_rows: u32,
        cancel: CancelToken,
    ) -> Self {
        let (width, height) = panorama.dimensions();
        Self {
            source: SourceFrame::oriented(panorama, orientation),
            width,
            height,
            chunk_rows: chunk_rows.max(1),
            next_row: 0,
            cancel,
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.height.div_ceil(self.chunk_rows) as usize
    }

    /// True once every row has been produced.
    pub fn is_finished(&self) -> bool {
        self.next_row >= self.height
    }
}

impl Iterator for ReprojectChunks<'_> {
    type Item = RowChunk;

    fn next(&mut self) -> Option<RowChunk> {
        if self.is_finished() || self.cancel.is_cancelled() {
            return None;
        }
        let first_row = self.next_row;
        let rows = self.chunk_rows.min(self.height - first_row);
        let (width, height) = (self.width, self.height);
        let source = &self.source;
        let image = fill_rows_from(width, rows, first_row, |x, y| {
            source.sample(equirect_to_direction(x as f64, y as f64, width, height))
        });
        self.next_row += rows;
        debug!("re-projected rows {first_row}..{}", self.next_row);
        Some(RowChunk { first_row, image })
    }
}

/// Re-projects the whole raster in one pass.
pub fn reproject(orientation: &Orientation, panorama: &Panorama) -> RgbaImage {
    let (width, height) = panorama.dimensions();
    let source = SourceFrame::oriented(panorama, orientation);
    fill_rows(width, height, |x, y| {
        source.sample(equirect_to_direction(x as f64, y as f64, width, height))
    })
}

/// Re-projects chunk by chunk, checking `cancel` between chunks. The result
/// is identical to [`reproject`]; on cancellation nothing is returned.
pub fn reproject_chunked(
    orientation: &Orientation,
    panorama: &Panorama,
    chunk_rows: u32,
    cancel: &CancelToken,
    progress: &Progress,
) -> JobOutcome<RgbaImage> {
    let (width, height) = panorama.dimensions();
    let mut chunks = ReprojectChunks::new(orientation, panorama, chunk_rows, cancel.clone());
    info!(
        "re-projecting {width}x{height} with {orientation:?} in {} chunks",
        chunks.total_chunks()
    );
    progress.start(chunks.total_chunks());

    let mut out = RgbaImage::new(width, height);
    let stride = width as usize * 4;
    {
        let buf: &mut [u8] = &mut out;
        for chunk in chunks.by_ref() {
            let start = chunk.first_row as usize * stride;
            let bytes = chunk.image.as_raw();
            buf[start..start + bytes.len()].copy_from_slice(bytes);
            progress.advance(1);
        }
    }

    if chunks.is_finished() && !cancel.is_cancelled() {
        JobOutcome::Completed(out)
    } else {
        info!("re-projection cancelled");
        JobOutcome::Cancelled
    }
}

/// Levels both compare sources, each by its own orientation.
pub fn align_pair(
    a: (&Panorama, &Orientation),
    b: (&Panorama, &Orientation),
) -> (RgbaImage, RgbaImage) {
    rayon::join(|| reproject(a.1, a.0), || reproject(b.1, b.0))
}

/// `<stem>_aligned.<ext>` beside `input`; a missing extension becomes `png`.
pub fn aligned_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "panorama".to_string());
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    input.with_file_name(format!("{stem}_aligned.{ext}"))
}
