//! Contracts for the capture collaborators.
//!
//! The session context never talks to hardware directly. A [`CaptureBackend`]
//! builds the platform pieces on the home context and the context drives them
//! through these traits.

use crate::config::SessionConfig;
use crate::errors::CameraError;
use crate::session::FrameIngest;
use crate::types::{
    ArtifactId, ExposureMode, FaceObservation, FlashMode, FocusMode, FrameBuffer, FrameHints,
    PhotoResult, Point, Position, VideoOrientation,
};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use std::time::Duration;

/// The live capture pipeline.
pub trait CaptureSession: Send + 'static {
    fn begin_configuration(&mut self);
    fn commit_configuration(&mut self);
    fn start_running(&mut self) -> Result<(), CameraError>;
    fn stop_running(&mut self);
    fn is_running(&self) -> bool;
}

/// Bracketed configuration change. Commits when dropped.
///
/// Port mutations take a `&mut Transaction`, so the graph can only be edited
/// while one is open.
pub struct Transaction<'a, S: CaptureSession> {
    session: &'a mut S,
}

impl<'a, S: CaptureSession> Transaction<'a, S> {
    pub fn begin(session: &'a mut S) -> Self {
        session.begin_configuration();
        Self { session }
    }

    pub fn session(&mut self) -> &mut S {
        self.session
    }

    pub fn commit(self) {}
}

impl<S: CaptureSession> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        self.session.commit_configuration();
    }
}

/// One physical capture device.
pub trait DeviceHandle: Send + 'static {
    fn configure_for_session(&mut self, position: Position) -> Result<(), CameraError>;
    fn invalidate(&mut self);
    fn position(&self) -> Position;
    fn set_focus(
        &mut self,
        point: Point,
        focus: FocusMode,
        exposure: ExposureMode,
        monitor_subject_area_change: bool,
    ) -> Result<(), CameraError>;
    fn set_fps(&mut self, fps: f64) -> Result<(), CameraError>;
    fn set_zoom(&mut self, level: f64) -> Result<(), CameraError>;
    fn set_torch_active(&mut self, active: bool) -> Result<(), CameraError>;
    /// Replaying stream of torch availability for this device.
    fn torch_availability(&self) -> BoxStream<'static, bool>;
}

/// Outputs requested when the session graph is first assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSet {
    pub photo: bool,
    pub video: bool,
    pub metadata: bool,
    pub frames: bool,
}

impl OutputSet {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            photo: config.photo_enabled,
            video: true,
            metadata: config.metadata_enabled,
            frames: true,
        }
    }
}

/// Attaches media streams and consumers to the session graph.
pub trait PortBindings: Send + 'static {
    type Session: CaptureSession;
    type Device: DeviceHandle;

    fn attach_input(
        &mut self,
        txn: &mut Transaction<'_, Self::Session>,
        device: &Self::Device,
        audio: bool,
    ) -> Result<(), CameraError>;
    fn detach_input(&mut self, txn: &mut Transaction<'_, Self::Session>);
    fn attach_outputs(
        &mut self,
        txn: &mut Transaction<'_, Self::Session>,
        outputs: OutputSet,
    ) -> Result<(), CameraError>;
    fn detach_all(&mut self, txn: &mut Transaction<'_, Self::Session>);
}

/// Photo/video/detection outputs. Delivers frames through the bound
/// [`FrameIngest`] on its own thread.
pub trait CaptureOutput: Send + 'static {
    fn bind(&mut self, ingest: FrameIngest);
    fn take_photo(
        &mut self,
        orientation: VideoOrientation,
        flash: FlashMode,
    ) -> BoxFuture<'static, PhotoResult>;
    /// Elapsed-time ticks until the recording stops.
    fn start_recording(&mut self) -> BoxStream<'static, Duration>;
    fn stop_recording(&mut self) -> BoxFuture<'static, Option<ArtifactId>>;
    fn flash_active(&self) -> BoxStream<'static, bool>;
}

/// Builds every collaborator for one session. Moved to and used only on the
/// home context.
pub trait CaptureBackend: Send + 'static {
    type Session: CaptureSession;
    type Device: DeviceHandle;
    type Ports: PortBindings<Session = Self::Session, Device = Self::Device>;
    type Output: CaptureOutput;

    fn create_session(&mut self, config: &SessionConfig) -> Result<Self::Session, CameraError>;
    fn create_device(&mut self) -> Self::Device;
    fn create_ports(&mut self) -> Self::Ports;
    fn create_output(&mut self, config: &SessionConfig) -> Self::Output;
}

/// External frame consumer (preview node or view).
///
/// Called on the output's delivery thread.
pub trait PreviewSink: Send + Sync + 'static {
    fn display(&self, frame: &FrameBuffer, hints: FrameHints);

    fn faces(&self, _faces: &[FaceObservation]) {}
}
