//! RFB (VNC) client with a capture-oriented surface.
//!
//! The heart of this crate is [`Engine`], an incremental protocol state
//! machine: bytes go in through [`Engine::on_data`], draw primitives come
//! out through a [`rfb_pixelbuffer::Surface`], and client messages
//! accumulate in an outbound buffer the caller drains to the socket. The
//! engine never performs I/O and never blocks, which makes the whole decode
//! path deterministic under arbitrary chunking of the inbound stream.
//!
//! Around the engine:
//!
//! - [`Framebuffer`] - the `Surface` implementation: RGB canvas, cursor
//!   state, pointer tracking, frame rendering for the recorder
//! - [`Session`] - connection lifecycle: TCP, handshake bootstrap, the
//!   10 Hz recorder tick, reconnect-with-backoff on connection loss
//! - [`Config`] - TOML-loadable configuration with a builder
//!
//! # Quick Start
//!
//! ```no_run
//! use rfb_capture::CaptureControl;
//! use rfb_client::{Config, Session};
//!
//! # async fn example() -> Result<(), rfb_client::RfbError> {
//! let config = Config::builder()
//!     .host("localhost")
//!     .port(5900)
//!     .password("secret")
//!     .build()?;
//!
//! let control = CaptureControl::new();
//! control.arm(rfb_capture::RecordTarget {
//!     filename: "capture.mp4".into(),
//!     folder: ".".into(),
//! });
//!
//! Session::new(config, control).run().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod framebuffer;
pub mod protocol;
pub mod session;

pub use config::Config;
pub use errors::RfbError;
pub use framebuffer::Framebuffer;
pub use protocol::Engine;
pub use session::Session;
