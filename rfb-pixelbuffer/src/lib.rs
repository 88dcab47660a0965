//! Framebuffer model for the RFB client.
//!
//! This crate owns the client-side picture of the remote desktop:
//!
//! - [`Canvas`] - an owned RGB24 canvas with paste / fill / copy and
//!   automatic growth when updates land past the current edge
//! - [`CursorShape`] - a cursor sprite with a 1-bpp mask, composited
//!   non-destructively over snapshots
//! - [`Surface`] - the abstract draw primitives that encoding decoders emit
//!
//! Decoded pixel data arrives in whatever wire format the connection
//! negotiated; every primitive carries the [`rfb_protocol::PixelFormat`]
//! describing its payload and the canvas converts to RGB on write.

pub mod canvas;
pub mod cursor;
pub mod surface;

pub use canvas::Canvas;
pub use cursor::CursorShape;
pub use surface::Surface;
