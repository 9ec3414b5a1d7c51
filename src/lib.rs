//! camera-session: single-owner orchestration for a hardware capture device.
//!
//! All configuration and capture commands for one device are serialized onto
//! a dedicated home thread. Results and live state come back as streams that
//! any thread or runtime can consume.
//!
//! # Features
//! - Strict FIFO command ordering per session handle
//! - Transactional session reconfiguration (begin / mutate / commit)
//! - Timed front/back device switching that hides the swap from the preview
//! - Replaying state streams (torch, flash, position) and code detection
//! - Safe hand-off of preview sinks between threads
//!
//! # Usage
//! ```rust,ignore
//! use camera_session::{CameraSession, SessionConfig, FlashMode};
//! use futures::StreamExt;
//!
//! let session = CameraSession::new(SessionConfig::standard(), my_backend)?;
//! session.start();
//! session.set_flash_mode(FlashMode::Auto);
//! let mut flash = session.flash_mode();
//! while let Some(mode) = flash.next().await {
//!     println!("flash is {:?}", mode);
//! }
//! ```
pub mod backend;
pub mod config;
pub mod errors;
pub mod events;
pub mod facade;
pub mod handoff;
pub mod session;
pub mod types;

// Testing utilities - in-memory backend for offline testing
pub mod testing;

pub use backend::{
    CaptureBackend, CaptureOutput, CaptureSession, DeviceHandle, OutputSet, PortBindings,
    PreviewSink, Transaction,
};
pub use config::SessionConfig;
pub use errors::{CameraError, Fault, FaultSink, LogFaults, SessionError};
pub use events::{BroadcastPublisher, EventStream, Reply, StatePublisher};
pub use facade::{CameraSession, SessionBuilder};
pub use handoff::{Handoff, ReleaseContext};
pub use session::{FrameIngest, SwitchState};
pub use types::{
    ArtifactId, CodeRecord, FaceObservation, FlashMode, FrameBuffer, FrameHints, PhotoResult,
    Point, Position, ResolutionPreset, Rotation, SinkKind, VideoOrientation,
};

/// Initialize logging for the session orchestrator
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "camera_session=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
