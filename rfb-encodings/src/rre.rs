//! RRE and CoRRE encoding decoders.
//!
//! RRE (type 2) sends a background colour for the whole rectangle followed
//! by a list of solid sub-rectangles. CoRRE (type 4) is identical except the
//! sub-rectangle geometry is packed into single bytes, which limits
//! rectangles to 255x255 but saves six bytes per sub-rectangle.
//!
//! # Wire Format
//!
//! ```text
//! +------------------+
//! | num_subrects     |  4 bytes (u32)
//! | background       |  bytes_per_pixel bytes
//! +------------------+
//! | per subrect:     |
//! |   colour         |  bytes_per_pixel bytes
//! |   x, y, w, h     |  u16 each (RRE) / u8 each (CoRRE)
//! +------------------+
//! ```
//!
//! The header is demanded first; once the sub-rectangle count is known the
//! entire sub-rectangle list is demanded as one block.

use crate::{DecodeState, Step};
use anyhow::{anyhow, Context, Result};
use rfb_common::Rect;
use rfb_pixelbuffer::Surface;
use rfb_protocol::{PixelFormat, Rectangle};

/// Which geometry layout the sub-rectangles use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoordSize {
    /// RRE: u16 coordinates, 8 geometry bytes per subrect.
    Wide,
    /// CoRRE: u8 coordinates, 4 geometry bytes per subrect.
    Compact,
}

impl CoordSize {
    fn geometry_bytes(self) -> usize {
        match self {
            CoordSize::Wide => 8,
            CoordSize::Compact => 4,
        }
    }
}

/// RRE/CoRRE decode in progress.
#[derive(Debug)]
pub struct RreState {
    rect: Rectangle,
    coords: CoordSize,
    phase: Phase,
}

#[derive(Debug)]
enum Phase {
    /// Waiting for the count + background header.
    Header,
    /// Waiting for the packed sub-rectangle list.
    Subrects,
}

/// Start decoding an RRE rectangle.
pub fn begin_rre(rect: Rectangle, format: &PixelFormat) -> Step {
    begin(rect, format, CoordSize::Wide)
}

/// Start decoding a CoRRE rectangle.
pub fn begin_corre(rect: Rectangle, format: &PixelFormat) -> Step {
    begin(rect, format, CoordSize::Compact)
}

fn begin(rect: Rectangle, format: &PixelFormat, coords: CoordSize) -> Step {
    Step::Read(
        4 + format.bytes_per_pixel(),
        DecodeState::Rre(RreState {
            rect,
            coords,
            phase: Phase::Header,
        }),
    )
}

pub(crate) fn step(
    state: RreState,
    block: &[u8],
    format: &PixelFormat,
    surface: &mut dyn Surface,
) -> Result<Step> {
    let bypp = format.bytes_per_pixel();
    let rect = state.rect;

    match state.phase {
        Phase::Header => {
            let subrects = u32::from_be_bytes([block[0], block[1], block[2], block[3]]);
            let background = &block[4..4 + bypp];

            surface
                .fill_rect(
                    Rect::new(rect.x as i32, rect.y as i32, rect.width as u32, rect.height as u32),
                    background,
                    format,
                )
                .context("failed to fill RRE background")?;

            if subrects == 0 {
                return Ok(Step::Done);
            }
            let per_subrect = bypp + state.coords.geometry_bytes();
            Ok(Step::Read(
                subrects as usize * per_subrect,
                DecodeState::Rre(RreState {
                    rect,
                    coords: state.coords,
                    phase: Phase::Subrects,
                }),
            ))
        }
        Phase::Subrects => {
            let per_subrect = bypp + state.coords.geometry_bytes();
            for (i, chunk) in block.chunks_exact(per_subrect).enumerate() {
                let colour = &chunk[..bypp];
                let geom = &chunk[bypp..];
                let (x, y, w, h) = match state.coords {
                    CoordSize::Wide => (
                        u16::from_be_bytes([geom[0], geom[1]]),
                        u16::from_be_bytes([geom[2], geom[3]]),
                        u16::from_be_bytes([geom[4], geom[5]]),
                        u16::from_be_bytes([geom[6], geom[7]]),
                    ),
                    CoordSize::Compact => {
                        (geom[0] as u16, geom[1] as u16, geom[2] as u16, geom[3] as u16)
                    }
                };

                if x as u32 + w as u32 > rect.width as u32
                    || y as u32 + h as u32 > rect.height as u32
                {
                    return Err(anyhow!(
                        "RRE subrect {} [{},{} {}x{}] exceeds rectangle {}x{}",
                        i,
                        x,
                        y,
                        w,
                        h,
                        rect.width,
                        rect.height
                    ));
                }

                surface
                    .fill_rect(
                        Rect::new(
                            rect.x as i32 + x as i32,
                            rect.y as i32 + y as i32,
                            w as u32,
                            h as u32,
                        ),
                        colour,
                        format,
                    )
                    .with_context(|| format!("failed to fill RRE subrect {}", i))?;
            }
            Ok(Step::Done)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bgrx, bgrx_px, run_to_completion, CanvasSurface};
    use crate::ZrleStream;

    fn rect_8x8() -> Rectangle {
        Rectangle {
            x: 0,
            y: 0,
            width: 8,
            height: 8,
            encoding: crate::ENCODING_RRE,
        }
    }

    #[test]
    fn test_rre_background_only() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&0u32.to_be_bytes());
        payload.extend_from_slice(&bgrx_px(0, 0, 200));

        let mut surface = CanvasSurface::new(8, 8);
        let mut zlib = ZrleStream::new();
        run_to_completion(
            begin_rre(rect_8x8(), &bgrx()),
            &payload,
            &bgrx(),
            &mut zlib,
            &mut surface,
        )
        .unwrap();

        assert_eq!(surface.canvas.pixel(0, 0), [0, 0, 200]);
        assert_eq!(surface.canvas.pixel(7, 7), [0, 0, 200]);
    }

    #[test]
    fn test_rre_subrects_over_background() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&2u32.to_be_bytes());
        payload.extend_from_slice(&bgrx_px(1, 1, 1)); // background
        // Subrect 1: red 2x2 at (1, 1)
        payload.extend_from_slice(&bgrx_px(255, 0, 0));
        for v in [1u16, 1, 2, 2] {
            payload.extend_from_slice(&v.to_be_bytes());
        }
        // Subrect 2: green 1x4 at (5, 0)
        payload.extend_from_slice(&bgrx_px(0, 255, 0));
        for v in [5u16, 0, 1, 4] {
            payload.extend_from_slice(&v.to_be_bytes());
        }

        let mut surface = CanvasSurface::new(8, 8);
        let mut zlib = ZrleStream::new();
        run_to_completion(
            begin_rre(rect_8x8(), &bgrx()),
            &payload,
            &bgrx(),
            &mut zlib,
            &mut surface,
        )
        .unwrap();

        assert_eq!(surface.canvas.pixel(0, 0), [1, 1, 1]);
        assert_eq!(surface.canvas.pixel(2, 2), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(5, 3), [0, 255, 0]);
    }

    #[test]
    fn test_corre_compact_coordinates() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_be_bytes());
        payload.extend_from_slice(&bgrx_px(0, 0, 0)); // background
        payload.extend_from_slice(&bgrx_px(9, 8, 7));
        payload.extend_from_slice(&[3, 4, 2, 1]); // x, y, w, h as single bytes

        let mut rect = rect_8x8();
        rect.encoding = crate::ENCODING_CORRE;

        let mut surface = CanvasSurface::new(8, 8);
        let mut zlib = ZrleStream::new();
        run_to_completion(
            begin_corre(rect, &bgrx()),
            &payload,
            &bgrx(),
            &mut zlib,
            &mut surface,
        )
        .unwrap();

        assert_eq!(surface.canvas.pixel(3, 4), [9, 8, 7]);
        assert_eq!(surface.canvas.pixel(4, 4), [9, 8, 7]);
        assert_eq!(surface.canvas.pixel(3, 5), [0, 0, 0]);
    }

    #[test]
    fn test_rre_subrect_out_of_bounds_fails() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_be_bytes());
        payload.extend_from_slice(&bgrx_px(0, 0, 0));
        payload.extend_from_slice(&bgrx_px(1, 2, 3));
        for v in [7u16, 0, 2, 1] {
            // x + w == 9 > 8
            payload.extend_from_slice(&v.to_be_bytes());
        }

        let mut surface = CanvasSurface::new(8, 8);
        let mut zlib = ZrleStream::new();
        let result = run_to_completion(
            begin_rre(rect_8x8(), &bgrx()),
            &payload,
            &bgrx(),
            &mut zlib,
            &mut surface,
        );
        assert!(result.is_err());
    }
}
