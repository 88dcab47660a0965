//! Abstract draw primitives emitted by the protocol engine and decoders.

use crate::cursor::CursorShape;
use anyhow::Result;
use rfb_common::Rect;
use rfb_protocol::PixelFormat;

/// Receiver for decoded framebuffer operations.
///
/// The protocol engine translates every server message into calls on this
/// trait. Pixel-bearing primitives carry the [`PixelFormat`] describing
/// their payload; implementations convert on write.
///
/// Within one framebuffer update, primitives arrive in wire order between a
/// [`begin_update`](Surface::begin_update) / [`commit_update`](Surface::commit_update)
/// pair; `commit_update` receives the rectangles the update touched.
pub trait Surface {
    /// A framebuffer update message is starting.
    fn begin_update(&mut self) {}

    /// Write decoded pixels over `rect`.
    fn update_rect(&mut self, rect: Rect, pixels: &[u8], format: &PixelFormat) -> Result<()>;

    /// Copy the `dst`-sized region with its top-left at (src_x, src_y) onto `dst`.
    fn copy_rect(&mut self, src_x: u16, src_y: u16, dst: Rect) -> Result<()>;

    /// Solid-fill `rect` with a single pixel sample.
    fn fill_rect(&mut self, rect: Rect, color: &[u8], format: &PixelFormat) -> Result<()>;

    /// Replace the cursor shape; `None` clears it.
    fn update_cursor(&mut self, shape: Option<CursorShape>) {
        let _ = shape;
    }

    /// The server announced a new desktop size.
    fn resize_desktop(&mut self, width: u16, height: u16) {
        let _ = (width, height);
    }

    /// All rectangles of the current update have been applied.
    fn commit_update(&mut self, rects: &[Rect]) {
        let _ = rects;
    }

    /// The server rang the bell.
    fn bell(&mut self) {}

    /// The server published clipboard text.
    fn cut_text(&mut self, text: String) {
        let _ = text;
    }
}
