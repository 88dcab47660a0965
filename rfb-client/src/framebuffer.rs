//! The client's framebuffer: canvas, cursor and frame rendering.

use anyhow::Result;
use rfb_capture::FrameSource;
use rfb_common::{Point, Rect};
use rfb_pixelbuffer::{Canvas, CursorShape, Surface};
use rfb_protocol::PixelFormat;

/// Client-side state of the remote desktop.
///
/// Implements [`Surface`], so the protocol engine draws straight into it,
/// and [`FrameSource`], so the recorder can sample it. The cursor is kept
/// separate from the canvas and composited only when a frame is rendered;
/// desktop content underneath the cursor is never lost.
#[derive(Default)]
pub struct Framebuffer {
    canvas: Canvas,
    cursor: Option<CursorShape>,
    /// Last pointer position sent to the server, if any. Without it the
    /// cursor has no anchor and is not drawn.
    pointer: Option<Point>,
    /// Updates committed since the connection opened.
    updates_committed: u64,
    /// Clipboard text most recently published by the server.
    server_cut_text: Option<String>,
}

impl Framebuffer {
    /// Create an empty framebuffer; ServerInit sizes it.
    pub fn new() -> Self {
        Self::default()
    }

    /// The canvas itself.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Current cursor shape, if the server has sent one.
    pub fn cursor(&self) -> Option<&CursorShape> {
        self.cursor.as_ref()
    }

    /// Updates committed since the connection opened.
    pub fn updates_committed(&self) -> u64 {
        self.updates_committed
    }

    /// Clipboard text most recently published by the server.
    pub fn server_cut_text(&self) -> Option<&str> {
        self.server_cut_text.as_deref()
    }

    /// Record the pointer position (the anchor for cursor compositing).
    pub fn set_pointer(&mut self, x: u16, y: u16) {
        self.pointer = Some(Point::new(x as i32, y as i32));
    }

    /// Render the current frame: the canvas with the cursor composited at
    /// the last-known pointer position.
    pub fn render(&self) -> Canvas {
        let mut frame = self.canvas.clone();
        if let (Some(cursor), Some(pointer)) = (&self.cursor, self.pointer) {
            cursor.overlay(&mut frame, pointer);
        }
        frame
    }
}

impl Surface for Framebuffer {
    fn update_rect(&mut self, rect: Rect, pixels: &[u8], format: &PixelFormat) -> Result<()> {
        self.canvas.paste(rect, pixels, format)
    }

    fn copy_rect(&mut self, src_x: u16, src_y: u16, dst: Rect) -> Result<()> {
        self.canvas.copy_within_canvas(src_x, src_y, dst)
    }

    fn fill_rect(&mut self, rect: Rect, color: &[u8], format: &PixelFormat) -> Result<()> {
        self.canvas.fill(rect, color, format)
    }

    fn update_cursor(&mut self, shape: Option<CursorShape>) {
        self.cursor = shape;
    }

    fn resize_desktop(&mut self, width: u16, height: u16) {
        // Desktop geometry only ever extends the canvas; shrinking would
        // discard content other updates may still reference.
        self.canvas.grow_to(width as u32, height as u32);
    }

    fn commit_update(&mut self, rects: &[Rect]) {
        self.updates_committed += 1;
        tracing::trace!("update committed: {} rectangles", rects.len());
    }

    fn bell(&mut self) {
        tracing::info!("bell");
    }

    fn cut_text(&mut self, text: String) {
        self.server_cut_text = Some(text);
    }
}

impl FrameSource for Framebuffer {
    fn frame_size(&self) -> (u32, u32) {
        self.canvas.size()
    }

    fn render_bgr(&self) -> Vec<u8> {
        let frame = self.render();
        let rgb = frame.data();
        let mut bgr = vec![0u8; rgb.len()];
        for (dst, src) in bgr.chunks_exact_mut(3).zip(rgb.chunks_exact(3)) {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
        }
        bgr
    }
}
