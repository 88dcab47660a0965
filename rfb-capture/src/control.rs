//! The control handle the external control surface drives.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where the next recording goes.
#[derive(Debug, Clone, Default)]
pub struct RecordTarget {
    /// Output file name, joined onto `folder`.
    pub filename: String,
    /// Output directory.
    pub folder: PathBuf,
}

impl RecordTarget {
    /// Full output path.
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.filename)
    }
}

/// Handle for arming and disarming the recorder.
///
/// Clones share state. The arm/disarm flags are rising-edge triggered: the
/// recorder observes and clears them at its next tick, so a signal takes
/// effect at a frame boundary. Nothing is surfaced to the caller as an
/// error; it observes [`last_error`](Self::last_error) and
/// [`is_recording`](Self::is_recording) instead.
#[derive(Clone, Default)]
pub struct CaptureControl {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    arm: AtomicBool,
    disarm: AtomicBool,
    recording: AtomicBool,
    target: Mutex<RecordTarget>,
    last_error: Mutex<Option<String>>,
}

impl CaptureControl {
    /// Create a fresh control handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that recording starts at the next tick, writing to `target`.
    pub fn arm(&self, target: RecordTarget) {
        *self.inner.target.lock() = target;
        self.inner.disarm.store(false, Ordering::SeqCst);
        self.inner.arm.store(true, Ordering::SeqCst);
    }

    /// Request that recording stops at the next tick.
    pub fn disarm(&self) {
        self.inner.arm.store(false, Ordering::SeqCst);
        self.inner.disarm.store(true, Ordering::SeqCst);
    }

    /// Whether a recording is currently in progress.
    pub fn is_recording(&self) -> bool {
        self.inner.recording.load(Ordering::SeqCst)
    }

    /// The most recent error, if any.
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().clone()
    }

    /// Record an error for the control surface to observe.
    pub fn set_error(&self, error: impl Into<String>) {
        let error = error.into();
        tracing::error!("{}", error);
        *self.inner.last_error.lock() = Some(error);
    }

    /// Observe-and-clear the arm flag.
    pub(crate) fn take_arm(&self) -> bool {
        self.inner.arm.swap(false, Ordering::SeqCst)
    }

    /// Observe-and-clear the disarm flag.
    pub(crate) fn take_disarm(&self) -> bool {
        self.inner.disarm.swap(false, Ordering::SeqCst)
    }

    /// Current recording target.
    pub(crate) fn target(&self) -> RecordTarget {
        self.inner.target.lock().clone()
    }

    pub(crate) fn set_recording(&self, recording: bool) {
        self.inner.recording.store(recording, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_edge_triggered() {
        let control = CaptureControl::new();
        control.arm(RecordTarget {
            filename: "out.mp4".into(),
            folder: "/tmp".into(),
        });

        assert!(control.take_arm());
        assert!(!control.take_arm()); // cleared on observation
        assert!(!control.take_disarm());

        control.disarm();
        assert!(control.take_disarm());
        assert!(!control.take_disarm());
    }

    #[test]
    fn test_arm_clears_pending_disarm() {
        let control = CaptureControl::new();
        control.disarm();
        control.arm(RecordTarget::default());
        assert!(!control.take_disarm());
        assert!(control.take_arm());
    }

    #[test]
    fn test_target_path_joins() {
        let target = RecordTarget {
            filename: "capture.mp4".into(),
            folder: "/videos".into(),
        };
        assert_eq!(target.path(), PathBuf::from("/videos/capture.mp4"));
    }

    #[test]
    fn test_clones_share_state() {
        let a = CaptureControl::new();
        let b = a.clone();
        a.set_recording(true);
        assert!(b.is_recording());
        b.set_error("boom");
        assert_eq!(a.last_error().as_deref(), Some("boom"));
    }
}
