//! Client-to-server RFB messages.
//!
//! Writers append the wire form of each message to a [`BytesMut`] owned by
//! the caller; the connection drains that buffer to the socket.

use super::types::PixelFormat;
use bytes::{BufMut, BytesMut};

/// ClientInit message - sent after the security handshake.
///
/// # Wire Format
///
/// - 1 byte: shared flag (0 = exclusive, 1 = shared)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientInit {
    pub shared: bool,
}

impl ClientInit {
    /// Append this message to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.shared as u8);
    }
}

/// SetPixelFormat message - change the update pixel format.
///
/// # Wire Format
///
/// - 1 byte: message type (0)
/// - 3 bytes: padding
/// - 16 bytes: PixelFormat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPixelFormat {
    pub pixel_format: PixelFormat,
}

impl SetPixelFormat {
    /// Append this message to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(0);
        buf.put_bytes(0, 3);
        self.pixel_format.write_wire(buf);
    }
}

/// SetEncodings message - declare supported encodings in preference order.
///
/// # Wire Format
///
/// - 1 byte: message type (2)
/// - 1 byte: padding
/// - 2 bytes: number of encodings
/// - N * 4 bytes: encoding types (signed i32 each)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetEncodings {
    pub encodings: Vec<i32>,
}

impl SetEncodings {
    /// Append this message to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(2);
        buf.put_u8(0);
        buf.put_u16(self.encodings.len() as u16);
        for encoding in &self.encodings {
            buf.put_i32(*encoding);
        }
    }
}

/// FramebufferUpdateRequest message - pull the next update.
///
/// # Wire Format
///
/// - 1 byte: message type (3)
/// - 1 byte: incremental (0 = full update, 1 = deltas only)
/// - 2 bytes each: x, y, width, height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferUpdateRequest {
    pub incremental: bool,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl FramebufferUpdateRequest {
    /// Append this message to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(3);
        buf.put_u8(self.incremental as u8);
        buf.put_u16(self.x);
        buf.put_u16(self.y);
        buf.put_u16(self.width);
        buf.put_u16(self.height);
    }
}

/// KeyEvent message - keyboard input.
///
/// For ordinary keys the keysym equals the ASCII value; see the `keysym`
/// constants below for the common special keys.
///
/// # Wire Format
///
/// - 1 byte: message type (4)
/// - 1 byte: down flag
/// - 2 bytes: padding
/// - 4 bytes: X11 keysym
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub down: bool,
    pub key: u32,
}

impl KeyEvent {
    /// Append this message to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(4);
        buf.put_u8(self.down as u8);
        buf.put_bytes(0, 2);
        buf.put_u32(self.key);
    }
}

/// PointerEvent message - pointer position and button state.
///
/// Bits 0-7 of `button_mask` represent buttons 1-8, 1 = pressed.
///
/// # Wire Format
///
/// - 1 byte: message type (5)
/// - 1 byte: button mask
/// - 2 bytes each: x, y
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub button_mask: u8,
    pub x: u16,
    pub y: u16,
}

impl PointerEvent {
    /// Append this message to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(5);
        buf.put_u8(self.button_mask);
        buf.put_u16(self.x);
        buf.put_u16(self.y);
    }
}

/// ClientCutText message - publish clipboard text to the server.
///
/// # Wire Format
///
/// - 1 byte: message type (6)
/// - 3 bytes: padding
/// - 4 bytes: text length
/// - N bytes: text (Latin-1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCutText {
    pub text: String,
}

impl ClientCutText {
    /// Append this message to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(6);
        buf.put_bytes(0, 3);
        buf.put_u32(self.text.len() as u32);
        buf.put_slice(self.text.as_bytes());
    }
}

/// X11 keysym values for the common special keys.
pub mod keysym {
    pub const BACKSPACE: u32 = 0xFF08;
    pub const TAB: u32 = 0xFF09;
    pub const RETURN: u32 = 0xFF0D;
    pub const ESCAPE: u32 = 0xFF1B;
    pub const INSERT: u32 = 0xFF63;
    pub const DELETE: u32 = 0xFFFF;
    pub const HOME: u32 = 0xFF50;
    pub const END: u32 = 0xFF57;
    pub const PAGE_UP: u32 = 0xFF55;
    pub const PAGE_DOWN: u32 = 0xFF56;
    pub const LEFT: u32 = 0xFF51;
    pub const UP: u32 = 0xFF52;
    pub const RIGHT: u32 = 0xFF53;
    pub const DOWN: u32 = 0xFF54;
    pub const F1: u32 = 0xFFBE;
    pub const F2: u32 = 0xFFBF;
    pub const F3: u32 = 0xFFC0;
    pub const F4: u32 = 0xFFC1;
    pub const F5: u32 = 0xFFC2;
    pub const F6: u32 = 0xFFC3;
    pub const F7: u32 = 0xFFC4;
    pub const F8: u32 = 0xFFC5;
    pub const F9: u32 = 0xFFC6;
    pub const F10: u32 = 0xFFC7;
    pub const F11: u32 = 0xFFC8;
    pub const F12: u32 = 0xFFC9;
    pub const SHIFT_LEFT: u32 = 0xFFE1;
    pub const SHIFT_RIGHT: u32 = 0xFFE2;
    pub const CONTROL_LEFT: u32 = 0xFFE3;
    pub const CONTROL_RIGHT: u32 = 0xFFE4;
    pub const META_LEFT: u32 = 0xFFE7;
    pub const META_RIGHT: u32 = 0xFFE8;
    pub const ALT_LEFT: u32 = 0xFFE9;
    pub const ALT_RIGHT: u32 = 0xFFEA;
}
