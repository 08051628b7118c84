// collage.rs — single-image layouts of the six cube faces

use image::{imageops, Rgba, RgbaImage};

use crate::error::{InputError, Result};
use crate::tiles::RenderedTile;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);
const BORDER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// The six faces of a cube-map render, all the same size.
#[derive(Debug, Clone, Copy)]
pub struct CubeFaces<'a> {
    pub up: &'a RgbaImage,
    pub front: &'a RgbaImage,
    pub right: &'a RgbaImage,
    pub back: &'a RgbaImage,
    pub left: &'a RgbaImage,
    pub down: &'a RgbaImage,
}

impl<'a> CubeFaces<'a> {
    /// Picks the faces out of a cube-map tile batch by name.
    pub fn from_tiles(tiles: &'a [RenderedTile]) -> Result<Self> {
        let find = |name: &str| {
            tiles
                .iter()
                .find(|t| t.name == name)
                .map(|t| &t.image)
                .ok_or_else(|| InputError::Unavailable(format!("missing cube face {name}")))
        };
        let faces = Self {
            up: find("cube_up")?,
            front: find("cube_front")?,
            right: find("cube_right")?,
            back: find("cube_back")?,
            left: find("cube_left")?,
            down: find("cube_down")?,
        };
        faces.edge()?;
        Ok(faces)
    }

    fn all(&self) -> [&'a RgbaImage; 6] {
        [self.up, self.front, self.right, self.back, self.left, self.down]
    }

    /// Common square edge length of the faces.
    fn edge(&self) -> Result<u32> {
        let (w, h) = self.front.dimensions();
        if w == 0 || w != h || self.all().iter().any(|f| f.dimensions() != (w, h)) {
            return Err(InputError::Unavailable(
                "cube faces must be non-empty squares of one size".to_string(),
            )
            .into());
        }
        Ok(w)
    }
}

fn paste(canvas: &mut RgbaImage, face: &RgbaImage, x: u32, y: u32) {
    imageops::replace(canvas, face, x as i64, y as i64);
}

/// 3x2 sheet: back, left, front on top; right, down, up below. A non-zero
/// `border` frames every face in white.
pub fn cube_grid(faces: &CubeFaces<'_>, border: u32) -> Result<RgbaImage> {
    let edge = faces.edge()?;
    let fill = if border > 0 { BORDER } else { BACKGROUND };
    let mut sheet = RgbaImage::from_pixel(edge * 3 + border * 4, edge * 2 + border * 3, fill);
    let order = [
        [faces.back, faces.left, faces.front],
        [faces.right, faces.down, faces.up],
    ];
    for (row, line) in order.iter().enumerate() {
        for (col, face) in line.iter().enumerate() {
            let (row, col) = (row as u32, col as u32);
            paste(
                &mut sheet,
                face,
                border * (col + 1) + edge * col,
                border * (row + 1) + edge * row,
            );
        }
    }
    Ok(sheet)
}

/// 4x3 cross: up above front; left, front, right, back across; down below.
pub fn cube_cross(faces: &CubeFaces<'_>) -> Result<RgbaImage> {
    let edge = faces.edge()?;
    let mut sheet = RgbaImage::from_pixel(edge * 4, edge * 3, BACKGROUND);
    let cells = [
        (faces.up, 1, 0),
        (faces.left, 0, 1),
        (faces.front, 1, 1),
        (faces.right, 2, 1),
        (faces.back, 3, 1),
        (faces.down, 1, 2),
    ];
    for (face, col, row) in cells {
        paste(&mut sheet, face, col * edge, row * edge);
    }
    Ok(sheet)
}
