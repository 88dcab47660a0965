//! Core RFB wire types.
//!
//! This module defines the fundamental types used throughout the protocol:
//! - [`PixelFormat`] - pixel encoding description with RGB conversion helpers
//! - [`ChannelOrder`] - the abstract channel-ordering tag derived from a format
//! - [`Rectangle`] - rectangle header with encoding type
//! - Encoding, security and message-type constants

use std::io;

/// RFB pixel format specification.
///
/// Describes how pixels are encoded on the wire: bit depth, endianness, and
/// the size and position of each colour channel.
///
/// # Wire Format
///
/// PixelFormat is 16 bytes on the wire:
/// - 1 byte: bits_per_pixel
/// - 1 byte: depth
/// - 1 byte: big_endian (0 or 1)
/// - 1 byte: true_color (0 or 1)
/// - 2 bytes: red_max
/// - 2 bytes: green_max
/// - 2 bytes: blue_max
/// - 1 byte: red_shift
/// - 1 byte: green_shift
/// - 1 byte: blue_shift
/// - 3 bytes: padding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub big_endian: bool,
    pub true_color: bool,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl PixelFormat {
    /// Bytes per pixel (bits_per_pixel / 8, rounded up).
    pub fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel.div_ceil(8) as usize
    }

    /// The fixed RGBX format used for decoded ZRLE cpixels and cursor images:
    /// 32bpp little-endian true colour with bytes `[R, G, B, X]` in memory.
    pub const fn rgbx() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_color: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 0,
            green_shift: 8,
            blue_shift: 16,
        }
    }

    /// Parse a PixelFormat from its 16-byte wire form.
    ///
    /// # Errors
    ///
    /// Fails if the slice is not 16 bytes or the boolean fields are not 0/1.
    pub fn from_wire(block: &[u8]) -> io::Result<Self> {
        if block.len() != 16 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("pixel format must be 16 bytes, got {}", block.len()),
            ));
        }
        if block[2] > 1 || block[3] > 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "pixel format boolean fields must be 0 or 1 (big_endian={}, true_color={})",
                    block[2], block[3]
                ),
            ));
        }
        Ok(Self {
            bits_per_pixel: block[0],
            depth: block[1],
            big_endian: block[2] == 1,
            true_color: block[3] == 1,
            red_max: u16::from_be_bytes([block[4], block[5]]),
            green_max: u16::from_be_bytes([block[6], block[7]]),
            blue_max: u16::from_be_bytes([block[8], block[9]]),
            red_shift: block[10],
            green_shift: block[11],
            blue_shift: block[12],
        })
    }

    /// Append the 16-byte wire form to `buf`.
    pub fn write_wire(&self, buf: &mut bytes::BytesMut) {
        use bytes::BufMut;
        buf.put_u8(self.bits_per_pixel);
        buf.put_u8(self.depth);
        buf.put_u8(self.big_endian as u8);
        buf.put_u8(self.true_color as u8);
        buf.put_u16(self.red_max);
        buf.put_u16(self.green_max);
        buf.put_u16(self.blue_max);
        buf.put_u8(self.red_shift);
        buf.put_u8(self.green_shift);
        buf.put_u8(self.blue_shift);
        buf.put_bytes(0, 3);
    }

    /// Derive the abstract channel-ordering tag for this format.
    ///
    /// Only supported true-colour layouts get a specific tag; anything else
    /// is [`ChannelOrder::Other`], which callers should treat as a signal to
    /// renegotiate the format.
    pub fn channel_order(&self) -> ChannelOrder {
        if !self.true_color || self.big_endian {
            return ChannelOrder::Other;
        }
        if self.bits_per_pixel == 16
            && self.red_max == 31
            && self.green_max == 63
            && self.blue_max == 31
            && self.red_shift == 11
            && self.green_shift == 5
            && self.blue_shift == 0
        {
            return ChannelOrder::Bgr16;
        }
        if self.depth != 24 || self.red_max != 255 || self.green_max != 255 || self.blue_max != 255
        {
            return ChannelOrder::Other;
        }
        // Byte offset of each channel within a little-endian pixel.
        let offsets = (
            self.red_shift / 8,
            self.green_shift / 8,
            self.blue_shift / 8,
        );
        match (self.bytes_per_pixel(), offsets) {
            (3, (0, 1, 2)) => ChannelOrder::Rgb,
            (3, (2, 1, 0)) => ChannelOrder::Bgr,
            (4, (0, 1, 2)) => ChannelOrder::Rgbx,
            (4, (2, 1, 0)) => ChannelOrder::Bgrx,
            (4, (1, 2, 3)) => ChannelOrder::Xrgb,
            (4, (3, 2, 1)) => ChannelOrder::Xbgr,
            _ => ChannelOrder::Other,
        }
    }

    /// Convert one pixel in this format to 8-bit RGB.
    ///
    /// # Panics
    ///
    /// Panics if `pixel.len()` does not equal `bytes_per_pixel()` or a
    /// channel max is zero. Formats are validated when they are adopted, so
    /// neither can occur on the decode path.
    pub fn to_rgb(&self, pixel: &[u8]) -> [u8; 3] {
        let bypp = self.bytes_per_pixel();
        assert_eq!(pixel.len(), bypp, "pixel length does not match format");
        assert!(
            self.red_max > 0 && self.green_max > 0 && self.blue_max > 0,
            "channel max must be > 0"
        );

        let mut value = 0u32;
        if self.big_endian {
            for &byte in pixel.iter().take(bypp) {
                value = (value << 8) | byte as u32;
            }
        } else {
            for (i, &byte) in pixel.iter().take(bypp).enumerate() {
                value |= (byte as u32) << (i * 8);
            }
        }

        let r = ((value >> self.red_shift) & self.red_max as u32) as u16;
        let g = ((value >> self.green_shift) & self.green_max as u32) as u16;
        let b = ((value >> self.blue_shift) & self.blue_max as u32) as u16;

        [
            ((r as u32 * 255) / self.red_max as u32) as u8,
            ((g as u32 * 255) / self.green_max as u32) as u8,
            ((b as u32 * 255) / self.blue_max as u32) as u8,
        ]
    }

    /// Encode an 8-bit RGB triple as one pixel in this format.
    pub fn from_rgb(&self, rgb: [u8; 3]) -> Vec<u8> {
        let r = (rgb[0] as u32 * self.red_max as u32) / 255;
        let g = (rgb[1] as u32 * self.green_max as u32) / 255;
        let b = (rgb[2] as u32 * self.blue_max as u32) / 255;
        let mut value = (r << self.red_shift) | (g << self.green_shift) | (b << self.blue_shift);

        let bypp = self.bytes_per_pixel();
        let mut out = vec![0u8; bypp];
        if self.big_endian {
            for i in 0..bypp {
                out[bypp - 1 - i] = (value & 0xFF) as u8;
                value >>= 8;
            }
        } else {
            for byte in out.iter_mut().take(bypp) {
                *byte = (value & 0xFF) as u8;
                value >>= 8;
            }
        }
        out
    }

    /// True for formats the client can decode without renegotiation.
    pub fn is_supported(&self) -> bool {
        self.true_color
            && matches!(self.bits_per_pixel, 8 | 16 | 32)
            && self.red_max > 0
            && self.green_max > 0
            && self.blue_max > 0
    }
}

/// Abstract channel-ordering tag for supported pixel layouts.
///
/// Derived from a [`PixelFormat`]; used for fast-path conversion and
/// diagnostics. The letters name memory byte order, `X` is padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
    Rgbx,
    Bgrx,
    Xrgb,
    Xbgr,
    /// 16bpp little-endian 5-6-5.
    Bgr16,
    /// Anything else; the session renegotiates to RGBX.
    Other,
}

/// Rectangle header for framebuffer updates.
///
/// # Wire Format
///
/// 12 bytes: x, y, width, height as u16, then the encoding as i32.
/// Negative encodings are pseudo-encodings carrying capability payloads
/// rather than pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub encoding: i32,
}

impl Rectangle {
    /// Parse a rectangle header from its 12-byte wire form.
    pub fn from_wire(block: &[u8]) -> io::Result<Self> {
        if block.len() != 12 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("rectangle header must be 12 bytes, got {}", block.len()),
            ));
        }
        Ok(Self {
            x: u16::from_be_bytes([block[0], block[1]]),
            y: u16::from_be_bytes([block[2], block[3]]),
            width: u16::from_be_bytes([block[4], block[5]]),
            height: u16::from_be_bytes([block[6], block[7]]),
            encoding: i32::from_be_bytes([block[8], block[9], block[10], block[11]]),
        })
    }

    /// True if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel count, as a usize with no overflow.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

//
// Encoding type constants
//

/// Raw encoding - uncompressed pixel data.
pub const ENCODING_RAW: i32 = 0;

/// CopyRect encoding - copy from another screen region.
pub const ENCODING_COPY_RECT: i32 = 1;

/// RRE (Rise-and-Run-length Encoding).
pub const ENCODING_RRE: i32 = 2;

/// CoRRE - RRE with compact single-byte subrectangle coordinates.
pub const ENCODING_CORRE: i32 = 4;

/// Hextile encoding - 16x16 tile-based compression.
pub const ENCODING_HEXTILE: i32 = 5;

/// ZRLE (Zlib Run-Length Encoding) - zlib + RLE in 64x64 tiles.
pub const ENCODING_ZRLE: i32 = 16;

/// Pseudo-encoding: cursor shape update. The rectangle position carries the
/// hotspot, the payload is an image plus a 1-bpp mask.
pub const PSEUDO_ENCODING_CURSOR: i32 = -239;

/// Pseudo-encoding: desktop size change notification. No payload.
pub const PSEUDO_ENCODING_DESKTOP_SIZE: i32 = -223;

//
// Security type constants
//

/// No authentication.
pub const SECURITY_TYPE_NONE: u8 = 1;

/// VNC authentication - DES challenge-response with password.
pub const SECURITY_TYPE_VNC_AUTH: u8 = 2;

//
// Server-to-client message types
//

/// FramebufferUpdate message.
pub const SERVER_MSG_FRAMEBUFFER_UPDATE: u8 = 0;

/// Bell message.
pub const SERVER_MSG_BELL: u8 = 2;

/// ServerCutText message.
pub const SERVER_MSG_CUT_TEXT: u8 = 3;
