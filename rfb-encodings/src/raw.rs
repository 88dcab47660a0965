//! Raw encoding decoder - uncompressed pixel data.
//!
//! Raw encoding (type 0) transmits the rectangle as
//! `width * height * bytes_per_pixel` bytes of pixels in the negotiated
//! wire format, row-major, no padding. The whole payload is demanded as a
//! single block.

use crate::{DecodeState, Step};
use anyhow::{Context, Result};
use rfb_common::Rect;
use rfb_pixelbuffer::Surface;
use rfb_protocol::{PixelFormat, Rectangle};

/// Raw decode in progress; waiting for the pixel payload.
#[derive(Debug)]
pub struct RawState {
    rect: Rectangle,
}

/// Start decoding a raw rectangle. The rectangle must be non-empty.
pub fn begin(rect: Rectangle, format: &PixelFormat) -> Step {
    let n = rect.pixel_count() * format.bytes_per_pixel();
    Step::Read(n, DecodeState::Raw(RawState { rect }))
}

pub(crate) fn step(
    state: RawState,
    block: &[u8],
    format: &PixelFormat,
    surface: &mut dyn Surface,
) -> Result<Step> {
    let rect = state.rect;
    surface
        .update_rect(
            Rect::new(rect.x as i32, rect.y as i32, rect.width as u32, rect.height as u32),
            block,
            format,
        )
        .with_context(|| {
            format!(
                "failed to apply raw rectangle [{},{} {}x{}]",
                rect.x, rect.y, rect.width, rect.height
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
    fn test_raw_demand_size() {
        let rect = Rectangle {
            x: 0,
            y: 0,
            width: 10,
            height: 4,
            encoding: crate::ENCODING_RAW,
        };
        match begin(rect, &bgrx()) {
            Step::Read(n, _) => assert_eq!(n, 10 * 4 * 4),
            Step::Done => panic!("raw rectangle must demand its payload"),
        }
    }

    #[test]
    fn test_raw_decode_pixels() {
        let rect = Rectangle {
            x: 1,
            y: 1,
            width: 2,
            height: 2,
            encoding: crate::ENCODING_RAW,
        };

        let mut payload = Vec::new();
        payload.extend_from_slice(&bgrx_px(255, 0, 0));
        payload.extend_from_slice(&bgrx_px(0, 255, 0));
        payload.extend_from_slice(&bgrx_px(0, 0, 255));
        payload.extend_from_slice(&bgrx_px(9, 9, 9));

        let mut surface = CanvasSurface::new(4, 4);
        let mut zlib = ZrleStream::new();
        run_to_completion(
            begin(rect, &bgrx()),
            &payload,
            &bgrx(),
            &mut zlib,
            &mut surface,
        )
        .unwrap();

        assert_eq!(surface.canvas.pixel(1, 1), [255, 0, 0]);
        assert_eq!(surface.canvas.pixel(2, 1), [0, 255, 0]);
        assert_eq!(surface.canvas.pixel(1, 2), [0, 0, 255]);
        assert_eq!(surface.canvas.pixel(2, 2), [9, 9, 9]);
        // Untouched neighbour.
        assert_eq!(surface.canvas.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_raw_update_is_idempotent() {
        let rect = Rectangle {
            x: 0,
            y: 0,
            width: 2,
            height: 1,
            encoding: crate::ENCODING_RAW,
        };
        let mut payload = Vec::new();
        payload.extend_from_slice(&bgrx_px(10, 20, 30));
        payload.extend_from_slice(&bgrx_px(40, 50, 60));

        let mut surface = CanvasSurface::new(2, 1);
        let mut zlib = ZrleStream::new();
        for _ in 0..2 {
            run_to_completion(
                begin(rect, &bgrx()),
                &payload,
                &bgrx(),
                &mut zlib,
                &mut surface,
            )
            .unwrap();
        }
        assert_eq!(surface.canvas.pixel(0, 0), [10, 20, 30]);
        assert_eq!(surface.canvas.pixel(1, 0), [40, 50, 60]);
    }
}
