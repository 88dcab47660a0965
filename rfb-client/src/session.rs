//! Session lifecycle: connect, drive the engine, pace the recorder,
//! reconnect on loss.
//!
//! Everything runs on one cooperative scheduler. A single task multiplexes
//! socket reads and the 10 Hz recorder tick with `tokio::select!`; the
//! engine and the recorder never run concurrently, so the recorder always
//! samples the canvas between complete handler invocations and decoders
//! never write to the video sink themselves.

use crate::config::Config;
use crate::errors::RfbError;
use crate::framebuffer::Framebuffer;
use crate::protocol::{Engine, EngineOptions};
use rfb_capture::{CaptureControl, FfmpegBackend, Recorder, TICK_INTERVAL};
use rfb_protocol::PixelFormat;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::MissedTickBehavior;

/// A capture session against one VNC server.
///
/// [`run`](Self::run) owns the whole lifecycle: it connects, performs the
/// handshake through the engine, pulls updates, feeds the recorder, and on
/// loss of an established connection closes the sink and reconnects with
/// bounded exponential backoff. A failure to establish the initial
/// connection is surfaced through the control handle and not retried, and
/// authentication failures are never retried.
pub struct Session {
    config: Config,
    control: CaptureControl,
}

impl Session {
    /// Create a session; nothing happens until [`run`](Self::run).
    pub fn new(config: Config, control: CaptureControl) -> Self {
        Self { config, control }
    }

    /// Run the session to completion.
    ///
    /// Returns only on a fatal error (or exhausted reconnect attempts); the
    /// error is also recorded on the control handle for the control surface
    /// to observe.
    pub async fn run(&self) -> Result<(), RfbError> {
        self.config.validate()?;

        let mut established_once = false;
        let mut attempts = 0u32;
        let mut backoff = Duration::from_millis(self.config.reconnect.backoff_ms);
        let max_backoff = Duration::from_millis(self.config.reconnect.max_backoff_ms);

        loop {
            let mut established = false;
            let error = match self.run_connection(&mut established).await {
                Ok(never) => match never {},
                Err(error) => error,
            };

            if established {
                established_once = true;
                attempts = 0;
                backoff = Duration::from_millis(self.config.reconnect.backoff_ms);
            }

            let retry = self.config.reconnect.enabled
                && established_once
                && error.is_retryable()
                && attempts < self.config.reconnect.max_retries;
            if !retry {
                self.control.set_error(error.to_string());
                return Err(error);
            }

            attempts += 1;
            tracing::warn!(
                "connection lost ({}); reconnecting in {:?} (attempt {}/{})",
                error,
                backoff,
                attempts,
                self.config.reconnect.max_retries
            );
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(max_backoff);
        }
    }

    /// Drive one connection until it fails. Sets `established` once the
    /// handshake completes.
    async fn run_connection(&self, established: &mut bool) -> Result<std::convert::Infallible, RfbError> {
        let address = (
            self.config.connection.host.as_str(),
            self.config.connection.port,
        );
        let mut stream = tokio::time::timeout(self.config.timeout(), TcpStream::connect(address))
            .await
            .map_err(|_| {
                RfbError::Transport(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect to {}:{} timed out", address.0, address.1),
                ))
            })??;
        tracing::info!("connected to {}:{}", address.0, address.1);

        let mut engine = Engine::new(EngineOptions {
            password: self.config.connection.password.clone(),
            shared: self.config.connection.shared,
        });
        let mut framebuffer = Framebuffer::new();
        // Fresh recorder per connection: the sink must close with the
        // connection that fed it.
        let mut recorder = Recorder::new(
            FfmpegBackend {
                ffmpeg_path: self.config.recording.ffmpeg_path.clone(),
                crf: self.config.recording.crf,
                preset: self.config.recording.preset.clone(),
            },
            self.control.clone(),
            (
                self.config.recording.default_width,
                self.config.recording.default_height,
            ),
        );

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        // Late ticks shift the cadence forward instead of bursting.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut buf = vec![0u8; 16 * 1024];
        let result: RfbError = loop {
            tokio::select! {
                read = stream.read(&mut buf) => {
                    let n = match read {
                        Ok(0) => break RfbError::Transport(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "server closed the connection",
                        )),
                        Ok(n) => n,
                        Err(error) => break RfbError::Transport(error),
                    };
                    if let Err(error) = engine.on_data(&buf[..n], &mut framebuffer) {
                        break error;
                    }
                    if engine.poll_ready() {
                        *established = true;
                        self.initialize(&mut engine);
                    }
                }
                _ = ticker.tick(), if engine.is_ready() => {
                    recorder.tick(&framebuffer).await;
                    engine.send_framebuffer_update_request(true);
                }
            }

            if engine.has_outbound() {
                let outbound = engine.take_outbound();
                if let Err(error) = stream.write_all(&outbound).await {
                    break RfbError::Transport(error);
                }
            }
        };

        recorder.close().await;
        Err(result)
    }

    /// First messages after the handshake: pick a decodable pixel format,
    /// advertise encodings, request the initial full update.
    fn initialize(&self, engine: &mut Engine) {
        let format = *engine.pixel_format();
        if !format.is_supported()
            || format.channel_order() == rfb_protocol::ChannelOrder::Other
        {
            tracing::info!(
                "server pixel format {:?} not directly decodable; forcing RGBX",
                format
            );
            engine.send_set_pixel_format(PixelFormat::rgbx());
        }
        engine.send_set_encodings(&self.config.display.encodings);
        engine.send_framebuffer_update_request(false);
    }
}
