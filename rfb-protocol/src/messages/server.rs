//! Server-to-client RFB message headers.
//!
//! The protocol engine reads server messages incrementally, so only the
//! fixed-size leading portions are parsed here; variable-length tails (the
//! desktop name, cut text) are demanded separately once their length is
//! known.

use super::types::PixelFormat;
use std::io;

/// The fixed 24-byte head of the ServerInit message.
///
/// # Wire Format
///
/// - 2 bytes: framebuffer width
/// - 2 bytes: framebuffer height
/// - 16 bytes: PixelFormat
/// - 4 bytes: desktop name length (name bytes follow)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerInitHead {
    pub width: u16,
    pub height: u16,
    pub pixel_format: PixelFormat,
    pub name_len: u32,
}

impl ServerInitHead {
    /// Parse the 24-byte ServerInit head.
    pub fn from_wire(block: &[u8]) -> io::Result<Self> {
        if block.len() != 24 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("ServerInit head must be 24 bytes, got {}", block.len()),
            ));
        }
        Ok(Self {
            width: u16::from_be_bytes([block[0], block[1]]),
            height: u16::from_be_bytes([block[2], block[3]]),
            pixel_format: PixelFormat::from_wire(&block[4..20])?,
            name_len: u32::from_be_bytes([block[20], block[21], block[22], block[23]]),
        })
    }
}

/// Parse the ServerCutText head (3 padding bytes + 4-byte length), returning
/// the length of the text that follows.
pub fn cut_text_len(block: &[u8]) -> io::Result<u32> {
    if block.len() != 7 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("ServerCutText head must be 7 bytes, got {}", block.len()),
        ));
    }
    Ok(u32::from_be_bytes([block[3], block[4], block[5], block[6]]))
}
