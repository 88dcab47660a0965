//! The capture pipeline: a paced recorder fed by the RFB client.
//!
//! The recorder samples the decoded framebuffer at a fixed 10 Hz and
//! appends each sample to an H.264/MP4 video sink. Recording is armed and
//! disarmed through a [`CaptureControl`] handle that an external control
//! surface (HTTP, console) owns; the flags are rising-edge triggered and
//! observed only at tick boundaries, so the sink is opened and closed at
//! frame edges and never mid-update.
//!
//! - [`CaptureControl`] - thread-safe arm/disarm/target handle
//! - [`Recorder`] - the per-tick state machine
//! - [`FfmpegBackend`] - H.264/MP4 sink backed by an ffmpeg child process
//! - [`FrameSource`] - what the recorder samples (implemented by the
//!   client's framebuffer)

pub mod control;
pub mod recorder;
pub mod sink;

pub use control::{CaptureControl, RecordTarget};
pub use recorder::{FrameSource, Recorder, TICK_INTERVAL};
pub use sink::{FfmpegBackend, SinkBackend, SinkSpec, VideoSink};
