//! Error types.
//!
//! Three families, matching where things can go wrong:
//!
//! - [`LoadError`] — a material set could not be fetched or decoded. Always
//!   recovered: the previously active set stays bound and the error is logged.
//! - [`ConfigError`] — the viewer configuration could not be read or is
//!   semantically invalid. Reported before any GPU work starts.
//! - [`InitError`] — window, surface, adapter or device acquisition failed.
//!   Unrecoverable; propagated out of [`Viewer::run`](crate::app::Viewer::run).

use std::path::PathBuf;

use thiserror::Error;

/// Failure while fetching or decoding one of the five texture maps of a set.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read '{location}': {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode '{location}': {source}")]
    Decode {
        location: String,
        #[source]
        source: image::ImageError,
    },
    #[error("material set '{set_id}': {channel} map is {width}x{height}, larger than the device limit of {max}")]
    TooLarge {
        set_id: String,
        channel: &'static str,
        width: u32,
        height: u32,
        max: u32,
    },
    #[error("material loader thread exited without reporting a result")]
    WorkerLost,
}

/// Failure while reading or validating a [`ViewerConfig`](crate::config::ViewerConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failure while bringing up the window or the GPU.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}
