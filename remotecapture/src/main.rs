//! Reference driver for the capture library.
//!
//! Connects to a VNC server and records the desktop to an MP4 file until
//! the duration elapses or Ctrl-C arrives. The HTTP control surface and the
//! console key poller of the full product drive the same
//! [`CaptureControl`] handle this binary uses.

use anyhow::Result;
use clap::Parser;
use rfb_capture::{CaptureControl, RecordTarget};
use rfb_client::{Config, Session};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "remotecapture", about = "Record a VNC desktop to video")]
struct Args {
    /// VNC server hostname or IP address.
    host: String,

    /// VNC server port.
    #[arg(long, default_value_t = 5900)]
    port: u16,

    /// VNC password, if the server requires authentication.
    #[arg(long, env = "RFB_PASSWORD")]
    password: Option<String>,

    /// Request a shared session instead of an exclusive one.
    #[arg(long)]
    shared: bool,

    /// Output directory.
    #[arg(long, default_value = ".")]
    folder: PathBuf,

    /// Output file name.
    #[arg(long, default_value = "output.mp4")]
    filename: String,

    /// Stop recording after this many seconds; runs until Ctrl-C if omitted.
    #[arg(long)]
    duration: Option<u64>,

    /// Connect and decode without recording.
    #[arg(long)]
    no_record: bool,

    /// Path of the ffmpeg executable.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut builder = Config::builder()
        .host(&args.host)
        .port(args.port)
        .shared(args.shared);
    if let Some(password) = &args.password {
        builder = builder.password(password);
    }
    let mut config = builder.build()?;
    config.recording.ffmpeg_path = args.ffmpeg.clone();

    let control = CaptureControl::new();
    if !args.no_record {
        control.arm(RecordTarget {
            filename: args.filename.clone(),
            folder: args.folder.clone(),
        });
    }

    let session = Session::new(config, control.clone());
    let shutdown = shutdown_signal(args.duration);

    let mut running = std::pin::pin!(session.run());
    tokio::select! {
        result = &mut running => {
            result?;
        }
        _ = shutdown => {
            tracing::info!("stopping");
            control.disarm();
            // Keep the session alive long enough for the next tick to
            // observe the disarm and close the sink.
            let _ = tokio::time::timeout(Duration::from_millis(400), &mut running).await;
        }
    }

    if let Some(error) = control.last_error() {
        tracing::warn!("finished with error: {}", error);
    }
    Ok(())
}

async fn shutdown_signal(duration: Option<u64>) {
    match duration {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
