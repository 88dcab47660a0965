//! Video sinks.
//!
//! A sink accepts packed BGR24 frames of a fixed size and writes them to a
//! container. The production backend pipes raw frames into an `ffmpeg`
//! child process encoding H.264 into MP4; tests substitute their own
//! backend through the [`SinkBackend`] trait.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};

/// Geometry and destination of one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSpec {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// An open video file accepting BGR24 frames.
#[allow(async_fn_in_trait)]
pub trait VideoSink {
    /// Append one frame of exactly `width * height * 3` bytes.
    async fn append(&mut self, frame_bgr: &[u8]) -> Result<()>;

    /// Finalize and close the file.
    async fn finish(&mut self) -> Result<()>;
}

/// Opens sinks; one per recording session.
#[allow(async_fn_in_trait)]
pub trait SinkBackend {
    type Sink: VideoSink;

    async fn open(&mut self, spec: &SinkSpec) -> Result<Self::Sink>;
}

/// H.264/MP4 sink backed by an ffmpeg child process.
///
/// Raw BGR24 frames are streamed over the child's stdin; closing stdin
/// finalizes the container.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    /// Path or name of the ffmpeg executable.
    pub ffmpeg_path: String,
    /// H.264 constant rate factor (lower is higher quality).
    pub crf: u32,
    /// libx264 preset name.
    pub preset: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            crf: 23,
            preset: "veryfast".to_string(),
        }
    }
}

impl SinkBackend for FfmpegBackend {
    type Sink = FfmpegSink;

    async fn open(&mut self, spec: &SinkSpec) -> Result<FfmpegSink> {
        let size = format!("{}x{}", spec.width, spec.height);
        let fps = spec.fps.to_string();

        let mut child = Command::new(&self.ffmpeg_path)
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "bgr24",
                "-video_size",
                &size,
                "-r",
                &fps,
                "-i",
                "pipe:0",
                "-an",
                "-c:v",
                "libx264",
                "-preset",
                &self.preset,
                "-crf",
                &self.crf.to_string(),
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(&spec.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.ffmpeg_path))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("ffmpeg child has no stdin"))?;

        tracing::info!(
            "recording to {} ({}x{} @ {} fps)",
            spec.path.display(),
            spec.width,
            spec.height,
            spec.fps
        );

        Ok(FfmpegSink {
            child,
            stdin: Some(stdin),
        })
    }
}

/// A running ffmpeg encode.
pub struct FfmpegSink {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl VideoSink for FfmpegSink {
    async fn append(&mut self, frame_bgr: &[u8]) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("sink already finished"))?;
        stdin
            .write_all(frame_bgr)
            .await
            .context("failed to write frame to ffmpeg")?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        // Closing stdin tells ffmpeg to finalize the container.
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }
        let status = self
            .child
            .wait()
            .await
            .context("failed to wait for ffmpeg")?;
        if !status.success() {
            return Err(anyhow!("ffmpeg exited with {}", status));
        }
        tracing::info!("recording closed");
        Ok(())
    }
}
