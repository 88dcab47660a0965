//! The RGB canvas backing the client's view of the remote desktop.

use anyhow::{anyhow, Result};
use rfb_common::Rect;
use rfb_protocol::{ChannelOrder, PixelFormat};

/// Bytes per canvas pixel (packed RGB24).
pub const CANVAS_BYPP: usize = 3;

/// An owned RGB24 canvas.
///
/// The canvas is stored row-major with a stride equal to the width. Paste
/// and fill convert incoming pixels from the wire format to RGB; writes that
/// extend past the current edge grow the canvas rather than failing, because
/// some servers (VMware ESXi is the known case) paint the initial screen in
/// chunks larger than the advertised geometry.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Default for Canvas {
    /// An empty canvas; the first update or desktop-size message sizes it.
    fn default() -> Self {
        Canvas::new(0, 0)
    }
}

impl Canvas {
    /// Create a black canvas of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * CANVAS_BYPP],
        }
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Canvas dimensions.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGB24 pixel data, row-major, stride = width.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The RGB value at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = (y as usize * self.width as usize + x as usize) * CANVAS_BYPP;
        [self.data[offset], self.data[offset + 1], self.data[offset + 2]]
    }

    /// Write an RGB value at (x, y). Out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CANVAS_BYPP;
        self.data[offset..offset + CANVAS_BYPP].copy_from_slice(&rgb);
    }

    /// Grow the canvas to at least `width` x `height`, preserving existing
    /// content at the top-left and filling new area with black. Never
    /// shrinks.
    pub fn grow_to(&mut self, width: u32, height: u32) {
        let new_w = self.width.max(width);
        let new_h = self.height.max(height);
        if new_w == self.width && new_h == self.height {
            return;
        }

        let mut data = vec![0u8; new_w as usize * new_h as usize * CANVAS_BYPP];
        let old_row = self.width as usize * CANVAS_BYPP;
        let new_row = new_w as usize * CANVAS_BYPP;
        for y in 0..self.height as usize {
            data[y * new_row..y * new_row + old_row]
                .copy_from_slice(&self.data[y * old_row..(y + 1) * old_row]);
        }

        self.width = new_w;
        self.height = new_h;
        self.data = data;
    }

    /// Grow the canvas if `rect` extends past the current edge.
    fn ensure_contains(&mut self, rect: Rect) -> Result<()> {
        if rect.x < 0 || rect.y < 0 {
            return Err(anyhow!("rectangle origin out of range: {:?}", rect));
        }
        if rect.right() as u32 > self.width || rect.bottom() as u32 > self.height {
            self.grow_to(rect.right() as u32, rect.bottom() as u32);
        }
        Ok(())
    }

    /// Paste decoded pixels over `rect`, converting from `format` to RGB.
    ///
    /// `pixels` is tightly packed, `rect.width * rect.height` pixels of
    /// `format.bytes_per_pixel()` bytes each.
    pub fn paste(&mut self, rect: Rect, pixels: &[u8], format: &PixelFormat) -> Result<()> {
        if rect.is_empty() {
            return Ok(());
        }
        let bypp = format.bytes_per_pixel();
        let expected = rect.area() as usize * bypp;
        if pixels.len() < expected {
            return Err(anyhow!(
                "pixel data too short: got {} bytes, need {}",
                pixels.len(),
                expected
            ));
        }
        self.ensure_contains(rect)?;

        let canvas_row = self.width as usize * CANVAS_BYPP;
        let src_row = rect.width as usize * bypp;
        let dst_row_len = rect.width as usize * CANVAS_BYPP;
        let fast_rgb = format.channel_order() == ChannelOrder::Rgb;

        for row in 0..rect.height as usize {
            let src = &pixels[row * src_row..(row + 1) * src_row];
            let dst_offset =
                (rect.y as usize + row) * canvas_row + rect.x as usize * CANVAS_BYPP;
            let dst = &mut self.data[dst_offset..dst_offset + dst_row_len];

            if fast_rgb {
                dst.copy_from_slice(src);
            } else {
                for (px, chunk) in src.chunks_exact(bypp).enumerate() {
                    dst[px * CANVAS_BYPP..(px + 1) * CANVAS_BYPP]
                        .copy_from_slice(&format.to_rgb(chunk));
                }
            }
        }
        Ok(())
    }

    /// Solid-fill `rect` with a single pixel sample in `format`.
    pub fn fill(&mut self, rect: Rect, color: &[u8], format: &PixelFormat) -> Result<()> {
        if rect.is_empty() {
            return Ok(());
        }
        if color.len() != format.bytes_per_pixel() {
            return Err(anyhow!(
                "fill colour is {} bytes, format needs {}",
                color.len(),
                format.bytes_per_pixel()
            ));
        }
        self.ensure_contains(rect)?;

        let rgb = format.to_rgb(color);
        let canvas_row = self.width as usize * CANVAS_BYPP;
        for row in 0..rect.height as usize {
            let dst_offset =
                (rect.y as usize + row) * canvas_row + rect.x as usize * CANVAS_BYPP;
            for px in 0..rect.width as usize {
                self.data[dst_offset + px * CANVAS_BYPP..dst_offset + (px + 1) * CANVAS_BYPP]
                    .copy_from_slice(&rgb);
            }
        }
        Ok(())
    }

    /// Copy the `dst`-sized region at (src_x, src_y) onto `dst`.
    ///
    /// Both regions must lie within the canvas. Overlapping copies are safe:
    /// rows are processed in an order that never reads an already-written
    /// row, and each row copy is a `copy_within` (memmove).
    pub fn copy_within_canvas(&mut self, src_x: u16, src_y: u16, dst: Rect) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        let src = Rect::new(src_x as i32, src_y as i32, dst.width, dst.height);
        for r in [&src, &dst] {
            if r.right() as u32 > self.width || r.bottom() as u32 > self.height {
                return Err(anyhow!(
                    "copy rectangle out of bounds: {:?} (canvas {}x{})",
                    r,
                    self.width,
                    self.height
                ));
            }
        }

        let canvas_row = self.width as usize * CANVAS_BYPP;
        let row_len = dst.width as usize * CANVAS_BYPP;
        let offset_of = |x: i32, y: i32, row: usize| {
            (y as usize + row) * canvas_row + x as usize * CANVAS_BYPP
        };

        if src.y >= dst.y {
            for row in 0..dst.height as usize {
                let from = offset_of(src.x, src.y, row);
                let to = offset_of(dst.x, dst.y, row);
                self.data.copy_within(from..from + row_len, to);
            }
        } else {
            for row in (0..dst.height as usize).rev() {
                let from = offset_of(src.x, src.y, row);
                let to = offset_of(dst.x, dst.y, row);
                self.data.copy_within(from..from + row_len, to);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgrx() -> PixelFormat {
        PixelFormat {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_color: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    #[test]
    fn test_new_canvas_is_black() {
        let canvas = Canvas::new(4, 3);
        assert_eq!(canvas.size(), (4, 3));
        assert!(canvas.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_paste_converts_bgrx() {
        let mut canvas = Canvas::new(4, 4);
        // One red pixel in BGRX memory order.
        let pixels = [0x00, 0x00, 0xFF, 0xFF];
        canvas
            .paste(Rect::new(1, 2, 1, 1), &pixels, &bgrx())
            .unwrap();
        assert_eq!(canvas.pixel(1, 2), [255, 0, 0]);
        assert_eq!(canvas.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_fill_converts_color() {
        let mut canvas = Canvas::new(4, 4);
        canvas
            .fill(Rect::new(0, 0, 4, 2), &[0x00, 0xFF, 0x00, 0x00], &bgrx())
            .unwrap();
        assert_eq!(canvas.pixel(3, 1), [0, 255, 0]);
        assert_eq!(canvas.pixel(0, 2), [0, 0, 0]);
    }

    #[test]
    fn test_paste_at_edge_no_grow() {
        let mut canvas = Canvas::new(4, 4);
        // x + w == width: fits exactly, no resize.
        canvas
            .paste(Rect::new(3, 3, 1, 1), &[0, 0, 0xFF, 0], &bgrx())
            .unwrap();
        assert_eq!(canvas.size(), (4, 4));
    }

    #[test]
    fn test_paste_past_edge_grows() {
        let mut canvas = Canvas::new(4, 4);
        canvas
            .fill(Rect::new(0, 0, 4, 4), &[0, 0, 0xFF, 0], &bgrx())
            .unwrap();

        // x + w == width + 1: must grow by one column only.
        canvas
            .paste(Rect::new(4, 0, 1, 1), &[0xFF, 0, 0, 0], &bgrx())
            .unwrap();
        assert_eq!(canvas.size(), (5, 4));
        // Old content preserved at the top-left.
        assert_eq!(canvas.pixel(0, 0), [255, 0, 0]);
        // New pixel landed, new area below it is black.
        assert_eq!(canvas.pixel(4, 0), [0, 0, 255]);
        assert_eq!(canvas.pixel(4, 3), [0, 0, 0]);
    }

    #[test]
    fn test_grow_never_shrinks() {
        let mut canvas = Canvas::new(8, 8);
        canvas.grow_to(4, 16);
        assert_eq!(canvas.size(), (8, 16));
    }

    #[test]
    fn test_copy_non_overlapping() {
        let mut canvas = Canvas::new(8, 8);
        canvas
            .fill(Rect::new(0, 0, 2, 2), &[0, 0, 0xFF, 0], &bgrx())
            .unwrap();
        canvas.copy_within_canvas(0, 0, Rect::new(4, 4, 2, 2)).unwrap();
        assert_eq!(canvas.pixel(5, 5), [255, 0, 0]);
        assert_eq!(canvas.pixel(3, 3), [0, 0, 0]);
    }

    #[test]
    fn test_copy_overlapping_down() {
        let mut canvas = Canvas::new(4, 8);
        for y in 0..4 {
            canvas
                .fill(
                    Rect::new(0, y, 4, 1),
                    &[0, 0, (y * 10) as u8, 0],
                    &bgrx(),
                )
                .unwrap();
        }
        // Shift rows 0..4 down by two; destination overlaps the source.
        canvas.copy_within_canvas(0, 0, Rect::new(0, 2, 4, 4)).unwrap();
        for y in 0..4u32 {
            assert_eq!(canvas.pixel(0, y + 2), [(y * 10) as u8, 0, 0]);
        }
    }

    #[test]
    fn test_copy_to_self_is_noop() {
        let mut canvas = Canvas::new(4, 4);
        canvas
            .fill(Rect::new(1, 1, 2, 2), &[0, 0xFF, 0, 0], &bgrx())
            .unwrap();
        let before = canvas.data().to_vec();
        canvas.copy_within_canvas(1, 1, Rect::new(1, 1, 2, 2)).unwrap();
        assert_eq!(canvas.data(), &before[..]);
    }

    #[test]
    fn test_copy_out_of_bounds_fails() {
        let mut canvas = Canvas::new(4, 4);
        assert!(canvas
            .copy_within_canvas(3, 3, Rect::new(0, 0, 2, 2))
            .is_err());
    }

    #[test]
    fn test_paste_short_data_fails() {
        let mut canvas = Canvas::new(4, 4);
        assert!(canvas
            .paste(Rect::new(0, 0, 2, 2), &[0u8; 8], &bgrx())
            .is_err());
    }
}
