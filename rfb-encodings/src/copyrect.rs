//! CopyRect encoding decoder - copy from another screen region.
//!
//! CopyRect (type 1) carries only a 4-byte source position; the pixels are
//! taken from the client's own framebuffer. The rectangle header names the
//! destination.

use crate::{DecodeState, Step};
use anyhow::{Context, Result};
use rfb_common::Rect;
use rfb_pixelbuffer::Surface;
use rfb_protocol::Rectangle;

/// CopyRect decode in progress; waiting for the 4-byte source position.
#[derive(Debug)]
pub struct CopyRectState {
    rect: Rectangle,
}

/// Start decoding a CopyRect rectangle.
pub fn begin(rect: Rectangle) -> Step {
    Step::Read(4, DecodeState::CopyRect(CopyRectState { rect }))
}

pub(crate) fn step(
    state: CopyRectState,
    block: &[u8],
    surface: &mut dyn Surface,
) -> Result<Step> {
    let src_x = u16::from_be_bytes([block[0], block[1]]);
    let src_y = u16::from_be_bytes([block[2], block[3]]);
    let rect = state.rect;

    surface
        .copy_rect(
            src_x,
            src_y,
            Rect::new(rect.x as i32, rect.y as i32, rect.width as u32, rect.height as u32),
        )
        .with_context(|| {
            format!(
                "failed to copy [{},{} {}x{}] from ({}, {})",
                rect.x, rect.y, rect.width, rect.height, src_x, src_y
            )
        })?;
    Ok(Step::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bgrx, bgrx_px, run_to_completion, CanvasSurface};
    use crate::ZrleStream;

    #[test]
    fn test_copyrect_moves_pixels() {
        let mut surface = CanvasSurface::new(8, 8);
        surface
            .canvas
            .fill(Rect::new(0, 0, 2, 2), &bgrx_px(200, 10, 10), &bgrx())
            .unwrap();

        let rect = Rectangle {
            x: 4,
            y: 4,
            width: 2,
            height: 2,
            encoding: crate::ENCODING_COPY_RECT,
        };
        let payload = [0u8, 0, 0, 0]; // source (0, 0)
        let mut zlib = ZrleStream::new();
        run_to_completion(begin(rect), &payload, &bgrx(), &mut zlib, &mut surface).unwrap();

        assert_eq!(surface.canvas.pixel(4, 4), [200, 10, 10]);
        assert_eq!(surface.canvas.pixel(5, 5), [200, 10, 10]);
        // Source untouched.
        assert_eq!(surface.canvas.pixel(0, 0), [200, 10, 10]);
    }

    #[test]
    fn test_copyrect_same_src_and_dst_is_noop() {
        let mut surface = CanvasSurface::new(4, 4);
        surface
            .canvas
            .fill(Rect::new(1, 1, 2, 2), &bgrx_px(1, 2, 3), &bgrx())
            .unwrap();
        let before = surface.canvas.data().to_vec();

        let rect = Rectangle {
            x: 1,
            y: 1,
            width: 2,
            height: 2,
            encoding: crate::ENCODING_COPY_RECT,
        };
        let payload = [0u8, 1, 0, 1]; // source (1, 1) == destination
        let mut zlib = ZrleStream::new();
        run_to_completion(begin(rect), &payload, &bgrx(), &mut zlib, &mut surface).unwrap();

        assert_eq!(surface.canvas.data(), &before[..]);
    }
}
