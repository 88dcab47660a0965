//! RFB protocol messages and wire types.

pub mod client;
pub mod server;
pub mod types;

pub use client::{
    ClientCutText, ClientInit, FramebufferUpdateRequest, KeyEvent, PointerEvent, SetEncodings,
    SetPixelFormat,
};
pub use server::ServerInitHead;
pub use types::{ChannelOrder, PixelFormat, Rectangle};
