//! Decoders for the RFB (VNC) wire encodings.
//!
//! The protocol engine is incremental: it never blocks waiting for bytes,
//! it registers a byte demand with the stream reassembler and resumes when a
//! complete block arrives. Decoders therefore cannot read from a stream;
//! each one is a small state machine that, given the block it asked for,
//! applies draw primitives to a [`Surface`] and returns a [`Step`] naming
//! either its next demand or completion.
//!
//! One decoder exists per wire encoding:
//!
//! - [`raw`] (0): uncompressed pixel data
//! - [`copyrect`] (1): copy from another screen region
//! - [`rre`] (2 and 4): rise-and-run-length, plus the compact CoRRE variant
//! - [`hextile`] (5): 16x16 tiles with per-tile sub-encodings
//! - [`zrle`] (16): zlib + RLE in 64x64 tiles over a connection-lifetime
//!   zlib stream
//! - [`cursor`] (-239): cursor shape pseudo-encoding
//!
//! The desktop-size pseudo-encoding (-223) carries no payload and is
//! handled by the engine directly.

use anyhow::Result;
use rfb_pixelbuffer::Surface;
use rfb_protocol::PixelFormat;

pub mod copyrect;
pub mod cursor;
pub mod hextile;
pub mod raw;
pub mod rre;
pub mod zrle;

pub use zrle::ZrleStream;

// Re-export the encoding constants decoders are registered under.
pub use rfb_protocol::messages::types::{
    ENCODING_COPY_RECT, ENCODING_CORRE, ENCODING_HEXTILE, ENCODING_RAW, ENCODING_RRE,
    ENCODING_ZRLE, PSEUDO_ENCODING_CURSOR, PSEUDO_ENCODING_DESKTOP_SIZE,
};

/// What a decoder wants next.
#[derive(Debug)]
pub enum Step {
    /// Deliver exactly this many bytes to the contained state.
    Read(usize, DecodeState),
    /// The rectangle is fully decoded.
    Done,
}

/// In-progress decode of a single rectangle.
///
/// Constructed by the per-encoding `begin` functions; driven by
/// [`DecodeState::step`] with each demanded block until [`Step::Done`].
#[derive(Debug)]
pub enum DecodeState {
    Raw(raw::RawState),
    CopyRect(copyrect::CopyRectState),
    Rre(rre::RreState),
    Hextile(hextile::HextileState),
    Zrle(zrle::ZrleState),
    Cursor(cursor::CursorState),
}

impl DecodeState {
    /// Feed the block this state demanded and advance.
    ///
    /// `zlib` is the connection's persistent ZRLE stream; it is only touched
    /// by ZRLE states. Errors are fatal to the connection - a decoder that
    /// fails mid-rectangle leaves the byte stream unsynchronized.
    pub fn step(
        self,
        block: &[u8],
        format: &PixelFormat,
        zlib: &mut ZrleStream,
        surface: &mut dyn Surface,
    ) -> Result<Step> {
        match self {
            DecodeState::Raw(state) => raw::step(state, block, format, surface),
            DecodeState::CopyRect(state) => copyrect::step(state, block, surface),
            DecodeState::Rre(state) => rre::step(state, block, format, surface),
            DecodeState::Hextile(state) => hextile::step(state, block, format, surface),
            DecodeState::Zrle(state) => zrle::step(state, block, zlib, surface),
            DecodeState::Cursor(state) => cursor::step(state, block, format, surface),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use rfb_common::Rect;
    use rfb_pixelbuffer::{Canvas, CursorShape};

    /// Drives a decode state machine over an in-memory payload, delivering
    /// exactly the demanded block sizes, and asserts the payload is consumed
    /// in full.
    pub fn run_to_completion(
        first: Step,
        payload: &[u8],
        format: &PixelFormat,
        zlib: &mut ZrleStream,
        surface: &mut dyn Surface,
    ) -> Result<()> {
        let mut offset = 0;
        let mut step = first;
        loop {
            match step {
                Step::Read(n, state) => {
                    assert!(
                        offset + n <= payload.len(),
                        "decoder demanded {} bytes at offset {} but payload is {} bytes",
                        n,
                        offset,
                        payload.len()
                    );
                    step = state.step(&payload[offset..offset + n], format, zlib, surface)?;
                    offset += n;
                }
                Step::Done => break,
            }
        }
        assert_eq!(offset, payload.len(), "decoder left trailing payload bytes");
        Ok(())
    }

    /// Surface implementation over a plain canvas, for pixel-level
    /// assertions.
    pub struct CanvasSurface {
        pub canvas: Canvas,
        pub cursor: Option<CursorShape>,
    }

    impl CanvasSurface {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                canvas: Canvas::new(width, height),
                cursor: None,
            }
        }
    }

    impl Surface for CanvasSurface {
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
    }

    /// The standard BGRX wire format used by most tests.
    pub fn bgrx() -> PixelFormat {
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

    /// A BGRX pixel sample for the given RGB value.
    pub fn bgrx_px(r: u8, g: u8, b: u8) -> [u8; 4] {
        [b, g, r, 0]
    }
}
