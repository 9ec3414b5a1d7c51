//! The externally visible session handle.
//!
//! [`CameraSession`] owns a dedicated home thread running a current-thread
//! tokio runtime. Every method enqueues a message for that thread and returns
//! immediately, so calls are safe from any thread and never block.
//!
//! ```text
//! caller ──▶ CameraSession ──mpsc──▶ home thread ──▶ SessionContext
//!                 ▲                                     │
//!                 └──── EventStream / Reply ◀───────────┘
//! ```

use crate::backend::{CaptureBackend, PreviewSink};
use crate::config::SessionConfig;
use crate::errors::{FaultSink, LogFaults, SessionError};
use crate::events::{EventStream, Reply};
use crate::handoff::{Handoff, ReleaseContext};
use crate::session::message::{Command, Message, Topic};
use crate::session::SessionContext;
use crate::types::{
    ArtifactId, CodeRecord, FlashMode, PhotoResult, Point, Position, SinkKind,
};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Configures and spawns a [`CameraSession`].
pub struct SessionBuilder<B: CaptureBackend> {
    config: SessionConfig,
    backend: B,
    faults: Box<dyn FaultSink>,
    release: Option<ReleaseContext>,
}

impl<B: CaptureBackend> SessionBuilder<B> {
    pub fn new(config: SessionConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            faults: Box::new(LogFaults),
            release: None,
        }
    }

    /// Receive collaborator failures instead of logging them.
    pub fn fault_sink(mut self, sink: impl FaultSink) -> Self {
        self.faults = Box::new(sink);
        self
    }

    /// Share a release context between sessions. By default each session
    /// spawns its own.
    pub fn release_context(mut self, release: ReleaseContext) -> Self {
        self.release = Some(release);
        self
    }

    pub fn spawn(self) -> Result<CameraSession, SessionError> {
        self.config.validate().map_err(SessionError::InvalidConfig)?;

        let id = Uuid::new_v4();
        let tag = id.simple().to_string()[..8].to_string();

        let release = match self.release {
            Some(release) => release,
            None => {
                let name = format!("camera-session-release-{tag}");
                ReleaseContext::spawn(name.clone())
                    .map_err(|source| SessionError::Spawn { name, source })?
            }
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SessionError::Runtime)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let home = tx.clone();
        let config = self.config.clone();
        let backend = self.backend;
        let faults = self.faults;
        let fallback = release.clone();

        let name = format!("camera-session-home-{tag}");
        let thread = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                runtime.block_on(run_home(id, config, backend, faults, fallback, home, rx))
            })
            .map_err(|source| SessionError::Spawn { name, source })?;

        log::info!("session {}: spawned", id);

        Ok(CameraSession {
            id,
            config: self.config,
            home: tx,
            release,
            thread: Some(thread),
        })
    }
}

async fn run_home<B: CaptureBackend>(
    id: Uuid,
    config: SessionConfig,
    backend: B,
    faults: Box<dyn FaultSink>,
    release: ReleaseContext,
    home: mpsc::UnboundedSender<Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    let mut context = SessionContext::build(id, config, backend, home, faults, release);
    if context.is_none() {
        log::warn!("session {}: no capture session, commands will be ignored", id);
    }

    while let Some(message) = rx.recv().await {
        match message {
            Message::Shutdown => break,
            Message::Command(command) => match context.as_mut() {
                Some(context) => context.handle_command(command),
                None => log::debug!("session {}: dropping {}", id, command.name()),
            },
            Message::Event(event) => {
                if let Some(context) = context.as_mut() {
                    context.handle_event(event);
                }
            }
        }
    }

    if let Some(context) = context.as_mut() {
        context.teardown();
    }
    drop(context);
    log::info!("session {}: home context stopped", id);
}

/// Handle to one camera session.
///
/// Commands issued through one handle execute in issue order on the home
/// thread. Dropping the handle tears the session down.
pub struct CameraSession {
    id: Uuid,
    config: SessionConfig,
    home: mpsc::UnboundedSender<Message>,
    release: ReleaseContext,
    thread: Option<JoinHandle<()>>,
}

impl CameraSession {
    pub fn new<B: CaptureBackend>(
        config: SessionConfig,
        backend: B,
    ) -> Result<Self, SessionError> {
        SessionBuilder::new(config, backend).spawn()
    }

    pub fn builder<B: CaptureBackend>(config: SessionConfig, backend: B) -> SessionBuilder<B> {
        SessionBuilder::new(config, backend)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn send(&self, command: Command) {
        if let Err(mpsc::error::SendError(message)) = self.home.send(Message::Command(command)) {
            if let Message::Command(command) = &message {
                log::debug!("session {}: home context gone, {} dropped", self.id, command.name());
            }
        }
    }

    pub fn start(&self) {
        self.send(Command::Start);
    }

    /// Stop the session. With `invalidate`, every port is detached first and
    /// all later commands on this handle become no-ops.
    pub fn stop(&self, invalidate: bool) {
        self.send(Command::Stop { invalidate });
    }

    pub fn set_position(&self, position: Position) {
        self.send(Command::SetPosition(position));
    }

    pub fn toggle_position(&self) {
        self.send(Command::TogglePosition);
    }

    pub fn focus(&self, point: Point) {
        self.send(Command::Focus(point));
    }

    pub fn set_fps(&self, fps: f64) {
        self.send(Command::SetFps(fps));
    }

    pub fn set_zoom_level(&self, level: f64) {
        self.send(Command::SetZoom(level));
    }

    pub fn set_torch_active(&self, active: bool) {
        self.send(Command::SetTorchActive(active));
    }

    pub fn set_flash_mode(&self, mode: FlashMode) {
        self.send(Command::SetFlashMode(mode));
    }

    /// Capture a still using the last observed frame orientation
    /// (portrait until a frame arrives) and the current flash mode.
    pub fn take_photo(&self) -> Reply<PhotoResult> {
        let (tx, reply) = Reply::channel();
        self.send(Command::TakePhoto(tx));
        reply
    }

    /// Elapsed-time ticks until the recording stops.
    pub fn start_recording(&self) -> EventStream<Duration> {
        let (tx, stream) = EventStream::channel();
        self.send(Command::StartRecording(tx));
        stream
    }

    /// Resolves to the recorded artifact, or `None` if recording failed.
    pub fn stop_recording(&self) -> Reply<ArtifactId> {
        let (tx, reply) = Reply::channel();
        self.send(Command::StopRecording(tx));
        reply
    }

    pub fn attach_preview_node(&self, sink: Arc<dyn PreviewSink>) {
        self.attach_preview(SinkKind::Node, sink);
    }

    pub fn attach_preview_view(&self, sink: Arc<dyn PreviewSink>) {
        self.attach_preview(SinkKind::View, sink);
    }

    /// Hand `sink` to the home context. If the context cannot take it, the
    /// reference is released on this session's release context.
    pub fn attach_preview(&self, kind: SinkKind, sink: Arc<dyn PreviewSink>) {
        let handoff = Handoff::new(sink, self.release.clone());
        self.send(Command::AttachPreview(kind, handoff));
    }

    fn subscribe<T>(&self, topic: impl FnOnce(mpsc::UnboundedSender<T>) -> Topic) -> EventStream<T> {
        let (tx, stream) = EventStream::channel();
        self.send(Command::Subscribe(topic(tx)));
        stream
    }

    pub fn has_torch(&self) -> EventStream<bool> {
        self.subscribe(Topic::HasTorch)
    }

    pub fn is_flash_active(&self) -> EventStream<bool> {
        self.subscribe(Topic::FlashActive)
    }

    pub fn flash_mode(&self) -> EventStream<FlashMode> {
        self.subscribe(Topic::FlashMode)
    }

    pub fn detected_codes(&self) -> EventStream<Vec<CodeRecord>> {
        self.subscribe(Topic::DetectedCodes)
    }

    pub fn changing_position(&self) -> EventStream<bool> {
        self.subscribe(Topic::ChangingPosition)
    }

    pub fn position(&self) -> EventStream<Position> {
        self.subscribe(Topic::Position)
    }

    /// Resolves once every command issued before it has executed.
    pub fn flush(&self) -> Reply<()> {
        let (tx, reply) = Reply::channel();
        self.send(Command::Flush(tx));
        reply
    }

    /// Tear the session down and wait for the home thread to exit.
    pub fn shutdown(mut self) {
        let _ = self.home.send(Message::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("session {}: home thread panicked", self.id);
            }
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if self.thread.take().is_some() {
            let _ = self.home.send(Message::Shutdown);
        }
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish()
    }
}
