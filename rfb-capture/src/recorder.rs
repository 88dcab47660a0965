//! The 10 Hz paced recorder.
//!
//! The recorder runs on the same cooperative scheduler as the protocol
//! session; the session owns a `tokio::time::interval` and calls
//! [`Recorder::tick`] on each firing. A tick observes the arm/disarm
//! flags, opens or closes the sink accordingly, and while recording
//! samples one frame from the [`FrameSource`]. Ticks are rescheduled
//! relative to the current time, so a late tick shifts the cadence instead
//! of producing a burst of catch-up frames.
//!
//! Sink errors stop the recording and are reported through the control
//! handle; the protocol session keeps running.

use crate::control::CaptureControl;
use crate::sink::{SinkBackend, SinkSpec, VideoSink};
use std::time::Duration;

/// Sampling interval: 10 frames per second.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// What the recorder samples: a consistent BGR24 view of the canvas with
/// the cursor composited in.
pub trait FrameSource {
    /// Current canvas size; (0, 0) while nothing has been decoded yet.
    fn frame_size(&self) -> (u32, u32);

    /// Render the current canvas as packed BGR24.
    fn render_bgr(&self) -> Vec<u8>;
}

/// Per-session recording state machine.
pub struct Recorder<B: SinkBackend> {
    backend: B,
    control: CaptureControl,
    sink: Option<B::Sink>,
    sink_size: (u32, u32),
    default_size: (u32, u32),
    fps: u32,
    frames_written: u64,
}

impl<B: SinkBackend> Recorder<B> {
    /// Create a recorder using `backend` for sinks.
    ///
    /// `default_size` is used when recording is armed before the first
    /// framebuffer update has sized the canvas.
    pub fn new(backend: B, control: CaptureControl, default_size: (u32, u32)) -> Self {
        Self {
            backend,
            control,
            sink: None,
            sink_size: (0, 0),
            default_size,
            fps: 1000 / TICK_INTERVAL.as_millis() as u32,
            frames_written: 0,
        }
    }

    /// Whether a sink is currently open.
    pub fn is_recording(&self) -> bool {
        self.sink.is_some()
    }

    /// Frames written to the current or last sink.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// One 10 Hz tick: observe control flags, then sample a frame if
    /// recording. Never fails; sink errors disarm and are reported through
    /// the control handle.
    pub async fn tick(&mut self, source: &impl FrameSource) {
        if self.control.take_arm() && self.sink.is_none() {
            self.open_sink(source).await;
        }

        if self.control.take_disarm() {
            if let Some(mut sink) = self.sink.take() {
                if let Err(error) = sink.finish().await {
                    self.control.set_error(format!("failed to close sink: {:#}", error));
                }
                self.control.set_recording(false);
            }
        }

        if self.sink.is_some() {
            self.write_frame(source).await;
        }
    }

    /// Close any open sink, e.g. on connection loss.
    pub async fn close(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            if let Err(error) = sink.finish().await {
                self.control.set_error(format!("failed to close sink: {:#}", error));
            }
            self.control.set_recording(false);
        }
    }

    async fn open_sink(&mut self, source: &impl FrameSource) {
        let target = self.control.target();
        let mut size = source.frame_size();
        if size.0 == 0 || size.1 == 0 {
            size = self.default_size;
        }

        let spec = SinkSpec {
            path: target.path(),
            width: size.0,
            height: size.1,
            fps: self.fps,
        };
        match self.backend.open(&spec).await {
            Ok(sink) => {
                self.sink = Some(sink);
                self.sink_size = size;
                self.frames_written = 0;
                self.control.set_recording(true);
            }
            Err(error) => {
                self.control
                    .set_error(format!("failed to open {}: {:#}", spec.path.display(), error));
            }
        }
    }

    async fn write_frame(&mut self, source: &impl FrameSource) {
        let frame = fit_frame(&source.render_bgr(), source.frame_size(), self.sink_size);
        let sink = self.sink.as_mut().expect("checked by caller");
        match sink.append(&frame).await {
            Ok(()) => self.frames_written += 1,
            Err(error) => {
                // A sink failure only stops the recording.
                self.control
                    .set_error(format!("failed to write frame: {:#}", error));
                if let Some(mut sink) = self.sink.take() {
                    let _ = sink.finish().await;
                }
                self.control.set_recording(false);
            }
        }
    }
}

/// Crop or pad a BGR24 frame to the sink geometry.
///
/// The canvas can grow after the sink is opened; the sink geometry is fixed
/// for the life of the file, so later frames are cropped at the right and
/// bottom, and smaller frames are padded with black.
fn fit_frame(src: &[u8], src_size: (u32, u32), dst_size: (u32, u32)) -> Vec<u8> {
    if src_size == dst_size {
        return src.to_vec();
    }
    let (src_w, src_h) = (src_size.0 as usize, src_size.1 as usize);
    let (dst_w, dst_h) = (dst_size.0 as usize, dst_size.1 as usize);

    let mut out = vec![0u8; dst_w * dst_h * 3];
    let copy_w = src_w.min(dst_w) * 3;
    for y in 0..src_h.min(dst_h) {
        let src_off = y * src_w * 3;
        let dst_off = y * dst_w * 3;
        out[dst_off..dst_off + copy_w].copy_from_slice(&src[src_off..src_off + copy_w]);
    }
    out
}
