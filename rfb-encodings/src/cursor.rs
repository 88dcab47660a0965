//! Cursor pseudo-encoding decoder (-239).
//!
//! The rectangle header carries the hotspot in its position fields and the
//! cursor size in its dimensions. The payload is `width * height * bypp`
//! bytes of image in the wire pixel format followed by a 1-bpp mask with
//! rows padded to a byte boundary.
//!
//! The image is converted to RGBX on decode so the compositor never needs
//! the wire format again.

use crate::{DecodeState, Step};
use anyhow::Result;
use rfb_common::Point;
use rfb_pixelbuffer::{CursorShape, Surface};
use rfb_protocol::{PixelFormat, Rectangle};

/// Cursor decode in progress; waiting for image + mask.
#[derive(Debug)]
pub struct CursorState {
    rect: Rectangle,
}

/// Payload size for a cursor rectangle.
pub fn payload_len(rect: &Rectangle, format: &PixelFormat) -> usize {
    let image = rect.pixel_count() * format.bytes_per_pixel();
    let mask = (rect.width as usize + 7) / 8 * rect.height as usize;
    image + mask
}

/// Start decoding a cursor update. The cursor must have a non-zero size;
/// zero-size cursor updates clear the cursor and carry no payload.
pub fn begin(rect: Rectangle, format: &PixelFormat) -> Step {
    Step::Read(
        payload_len(&rect, format),
        DecodeState::Cursor(CursorState { rect }),
    )
}

pub(crate) fn step(
    state: CursorState,
    block: &[u8],
    format: &PixelFormat,
    surface: &mut dyn Surface,
) -> Result<Step> {
    let rect = state.rect;
    let bypp = format.bytes_per_pixel();
    let image_len = rect.pixel_count() * bypp;
    let (wire_image, mask) = block.split_at(image_len);

    // Convert the image to RGBX once, at decode time.
    let mut image = Vec::with_capacity(rect.pixel_count() * 4);
    for pixel in wire_image.chunks_exact(bypp) {
        let rgb = format.to_rgb(pixel);
        image.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 0xFF]);
    }

    surface.update_cursor(Some(CursorShape {
        hotspot: Point::new(rect.x as i32, rect.y as i32),
        width: rect.width,
        height: rect.height,
        image,
        mask: mask.to_vec(),
    }));
    Ok(Step::Done)
}
