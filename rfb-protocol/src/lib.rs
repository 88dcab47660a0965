//! RFB (Remote Framebuffer) wire-format layer.
//!
//! This crate provides the byte-level building blocks for a VNC client:
//!
//! - [`Reassembler`] - chunk accumulation and exact-size block delivery for
//!   the incremental protocol state machine
//! - [`messages`] - pixel formats, rectangle headers, protocol constants and
//!   client-to-server message writers
//! - [`auth`] - the VNC DES challenge-response
//!
//! Everything here is sans-IO: parsing consumes byte slices, writers append
//! to a [`bytes::BytesMut`]. The caller owns the socket.

pub mod auth;
pub mod messages;
pub mod reassembler;

// Re-export commonly used types
pub use messages::types::{ChannelOrder, PixelFormat, Rectangle};
pub use reassembler::Reassembler;
