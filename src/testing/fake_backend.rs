//! In-memory capture backend.
//!
//! Every collaborator call is appended to a shared log together with the name
//! of the thread it ran on. A [`FakeProbe`] gives tests access to that log and
//! plays the part of the platform: it delivers frames and codes from whatever
//! thread the test uses, flips torch availability and flash activity, and
//! drives recording ticks.

use crate::backend::{
    CaptureBackend, CaptureOutput, CaptureSession, DeviceHandle, OutputSet, PortBindings,
    PreviewSink, Transaction,
};
use crate::config::SessionConfig;
use crate::errors::CameraError;
use crate::events::{EventStream, StatePublisher};
use crate::session::FrameIngest;
use crate::types::{
    ArtifactId, CodeRecord, ExposureMode, FaceObservation, FlashMode, FocusMode, FrameBuffer,
    FrameHints, PhotoResult, Point, Position, VideoOrientation,
};
use bytes::Bytes;
use futures::future::{self, BoxFuture};
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    BeginConfiguration,
    CommitConfiguration,
    StartRunning,
    StopRunning,
    ConfigureDevice(Position),
    InvalidateDevice(Position),
    Focus {
        point: Point,
        focus: FocusMode,
        exposure: ExposureMode,
        monitor: bool,
    },
    SetFps(f64),
    SetZoom(f64),
    SetTorchActive(bool),
    AttachInput { position: Position, audio: bool },
    DetachInput,
    AttachOutputs(OutputSet),
    DetachAll,
    TakePhoto {
        orientation: VideoOrientation,
        flash: FlashMode,
    },
    StartRecording,
    StopRecording,
}

#[derive(Default)]
struct ProbeInner {
    calls: Mutex<Vec<(Call, Option<String>)>>,
    ingest: Mutex<Option<FrameIngest>>,
    torch_available: Mutex<StatePublisher<bool>>,
    flash_active: Mutex<StatePublisher<bool>>,
    recording: Mutex<Option<mpsc::UnboundedSender<Duration>>>,
    fail_session: AtomicBool,
    fail_controls: AtomicBool,
    running: AtomicBool,
}

/// Test-side view of a [`FakeBackend`].
#[derive(Clone, Default)]
pub struct FakeProbe {
    inner: Arc<ProbeInner>,
}

impl FakeProbe {
    fn record(&self, call: Call) {
        let thread = std::thread::current().name().map(str::to_string);
        self.inner.calls.lock().unwrap().push((call, thread));
    }

    fn controls_result(&self, what: &str) -> Result<(), CameraError> {
        if self.inner.fail_controls.load(Ordering::SeqCst) {
            Err(CameraError::ControlError(format!("{what} rejected")))
        } else {
            Ok(())
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    /// Names of the threads each recorded call ran on.
    pub fn call_threads(&self) -> Vec<Option<String>> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, thread)| thread.clone())
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().unwrap().clear();
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Make the next `create_session` fail.
    pub fn fail_session_creation(&self, fail: bool) {
        self.inner.fail_session.store(fail, Ordering::SeqCst);
    }

    /// Make every device control call fail.
    pub fn fail_controls(&self, fail: bool) {
        self.inner.fail_controls.store(fail, Ordering::SeqCst);
    }

    /// Whether the output has been bound to a session yet.
    pub fn is_bound(&self) -> bool {
        self.inner.ingest.lock().unwrap().is_some()
    }

    fn ingest(&self) -> Option<FrameIngest> {
        self.inner.ingest.lock().unwrap().clone()
    }

    /// Deliver a frame as the platform would, on the calling thread.
    /// Returns whether any preview sink received it.
    pub fn deliver_frame(
        &self,
        buffer: FrameBuffer,
        source: Position,
        orientation: VideoOrientation,
    ) -> bool {
        self.ingest()
            .map(|ingest| ingest.frame(buffer, source, orientation))
            .unwrap_or(false)
    }

    pub fn deliver_codes(&self, codes: Vec<CodeRecord>) {
        if let Some(ingest) = self.ingest() {
            ingest.codes(codes);
        }
    }

    pub fn deliver_faces(&self, faces: Vec<FaceObservation>) {
        if let Some(ingest) = self.ingest() {
            ingest.faces(faces);
        }
    }

    pub fn set_torch_available(&self, available: bool) {
        self.inner
            .torch_available
            .lock()
            .unwrap()
            .publish(available);
    }

    pub fn set_flash_active(&self, active: bool) {
        self.inner.flash_active.lock().unwrap().publish(active);
    }

    /// Emit one recording tick. Returns false when no recording is running.
    pub fn tick_recording(&self, elapsed: Duration) -> bool {
        match self.inner.recording.lock().unwrap().as_ref() {
            Some(tx) => tx.send(elapsed).is_ok(),
            None => false,
        }
    }
}

/// In-memory [`CaptureBackend`].
pub struct FakeBackend {
    probe: FakeProbe,
}

impl FakeBackend {
    pub fn new() -> (Self, FakeProbe) {
        let probe = FakeProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl CaptureBackend for FakeBackend {
    type Session = FakeSession;
    type Device = FakeDevice;
    type Ports = FakePorts;
    type Output = FakeOutput;

    fn create_session(&mut self, _config: &SessionConfig) -> Result<FakeSession, CameraError> {
        if self.probe.inner.fail_session.load(Ordering::SeqCst) {
            return Err(CameraError::InitializationError(
                "capture session rejected".to_string(),
            ));
        }
        Ok(FakeSession {
            probe: self.probe.clone(),
            in_transaction: false,
        })
    }

    fn create_device(&mut self) -> FakeDevice {
        FakeDevice {
            probe: self.probe.clone(),
            position: Position::Back,
        }
    }

    fn create_ports(&mut self) -> FakePorts {
        FakePorts {
            probe: self.probe.clone(),
        }
    }

    fn create_output(&mut self, _config: &SessionConfig) -> FakeOutput {
        FakeOutput {
            probe: self.probe.clone(),
        }
    }
}

pub struct FakeSession {
    probe: FakeProbe,
    in_transaction: bool,
}

impl FakeSession {
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

impl CaptureSession for FakeSession {
    fn begin_configuration(&mut self) {
        self.in_transaction = true;
        self.probe.record(Call::BeginConfiguration);
    }

    fn commit_configuration(&mut self) {
        self.in_transaction = false;
        self.probe.record(Call::CommitConfiguration);
    }

    fn start_running(&mut self) -> Result<(), CameraError> {
        self.probe.record(Call::StartRunning);
        self.probe.inner.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_running(&mut self) {
        self.probe.record(Call::StopRunning);
        self.probe.inner.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.probe.is_running()
    }
}

pub struct FakeDevice {
    probe: FakeProbe,
    position: Position,
}

impl DeviceHandle for FakeDevice {
    fn configure_for_session(&mut self, position: Position) -> Result<(), CameraError> {
        self.position = position;
        self.probe.record(Call::ConfigureDevice(position));
        Ok(())
    }

    fn invalidate(&mut self) {
        self.probe.record(Call::InvalidateDevice(self.position));
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_focus(
        &mut self,
        point: Point,
        focus: FocusMode,
        exposure: ExposureMode,
        monitor_subject_area_change: bool,
    ) -> Result<(), CameraError> {
        self.probe.record(Call::Focus {
            point,
            focus,
            exposure,
            monitor: monitor_subject_area_change,
        });
        self.probe.controls_result("focus")
    }

    fn set_fps(&mut self, fps: f64) -> Result<(), CameraError> {
        self.probe.record(Call::SetFps(fps));
        self.probe.controls_result("fps")
    }

    fn set_zoom(&mut self, level: f64) -> Result<(), CameraError> {
        self.probe.record(Call::SetZoom(level));
        self.probe.controls_result("zoom")
    }

    fn set_torch_active(&mut self, active: bool) -> Result<(), CameraError> {
        self.probe.record(Call::SetTorchActive(active));
        self.probe.controls_result("torch")
    }

    fn torch_availability(&self) -> BoxStream<'static, bool> {
        self.probe
            .inner
            .torch_available
            .lock()
            .unwrap()
            .subscribe()
            .boxed()
    }
}

pub struct FakePorts {
    probe: FakeProbe,
}

impl PortBindings for FakePorts {
    type Session = FakeSession;
    type Device = FakeDevice;

    fn attach_input(
        &mut self,
        txn: &mut Transaction<'_, FakeSession>,
        device: &FakeDevice,
        audio: bool,
    ) -> Result<(), CameraError> {
        debug_assert!(txn.session().in_transaction());
        self.probe.record(Call::AttachInput {
            position: device.position(),
            audio,
        });
        Ok(())
    }

    fn detach_input(&mut self, txn: &mut Transaction<'_, FakeSession>) {
        debug_assert!(txn.session().in_transaction());
        self.probe.record(Call::DetachInput);
    }

    fn attach_outputs(
        &mut self,
        txn: &mut Transaction<'_, FakeSession>,
        outputs: OutputSet,
    ) -> Result<(), CameraError> {
        debug_assert!(txn.session().in_transaction());
        self.probe.record(Call::AttachOutputs(outputs));
        Ok(())
    }

    fn detach_all(&mut self, txn: &mut Transaction<'_, FakeSession>) {
        debug_assert!(txn.session().in_transaction());
        self.probe.record(Call::DetachAll);
    }
}

pub struct FakeOutput {
    probe: FakeProbe,
}

impl CaptureOutput for FakeOutput {
    fn bind(&mut self, ingest: FrameIngest) {
        *self.probe.inner.ingest.lock().unwrap() = Some(ingest);
    }

    fn take_photo(
        &mut self,
        orientation: VideoOrientation,
        flash: FlashMode,
    ) -> BoxFuture<'static, PhotoResult> {
        self.probe.record(Call::TakePhoto { orientation, flash });
        future::ready(PhotoResult {
            data: Some(Bytes::from_static(b"\xFF\xD8fake-jpeg\xFF\xD9")),
            orientation,
            flash_mode: flash,
        })
        .boxed()
    }

    fn start_recording(&mut self) -> BoxStream<'static, Duration> {
        self.probe.record(Call::StartRecording);
        let (tx, ticks) = EventStream::channel();
        *self.probe.inner.recording.lock().unwrap() = Some(tx);
        ticks.boxed()
    }

    fn stop_recording(&mut self) -> BoxFuture<'static, Option<ArtifactId>> {
        self.probe.record(Call::StopRecording);
        let was_recording = self.probe.inner.recording.lock().unwrap().take().is_some();
        future::ready(was_recording.then(ArtifactId::generate)).boxed()
    }

    fn flash_active(&self) -> BoxStream<'static, bool> {
        self.probe
            .inner
            .flash_active
            .lock()
            .unwrap()
            .subscribe()
            .boxed()
    }
}

/// Shared record of where tracked sinks were dropped.
#[derive(Clone, Default)]
pub struct ReleaseLog {
    releases: Arc<Mutex<Vec<Option<String>>>>,
}

impl ReleaseLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thread names on which tracked values were dropped, in order.
    pub fn releases(&self) -> Vec<Option<String>> {
        self.releases.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.releases.lock().unwrap().len()
    }

    /// Wait until at least `count` releases were logged.
    pub async fn wait_for(&self, count: usize, within: Duration) -> bool {
        let deadline = Instant::now() + within;
        while self.count() < count {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }

    /// Log the current thread as the place a tracked value was dropped.
    pub fn record(&self) {
        let thread = std::thread::current().name().map(str::to_string);
        self.releases.lock().unwrap().push(thread);
    }
}

/// Preview sink that remembers what it was shown.
#[derive(Default)]
pub struct RecordingSink {
    hints: Mutex<Vec<FrameHints>>,
    faces: AtomicUsize,
    release_log: Option<ReleaseLog>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A sink that logs the thread it is finally dropped on.
    pub fn tracked(log: &ReleaseLog) -> Arc<Self> {
        Arc::new(Self {
            hints: Mutex::new(Vec::new()),
            faces: AtomicUsize::new(0),
            release_log: Some(log.clone()),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.hints.lock().unwrap().len()
    }

    pub fn hints(&self) -> Vec<FrameHints> {
        self.hints.lock().unwrap().clone()
    }

    pub fn face_count(&self) -> usize {
        self.faces.load(Ordering::SeqCst)
    }
}

impl PreviewSink for RecordingSink {
    fn display(&self, _frame: &FrameBuffer, hints: FrameHints) {
        self.hints.lock().unwrap().push(hints);
    }

    fn faces(&self, faces: &[FaceObservation]) {
        self.faces.fetch_add(faces.len(), Ordering::SeqCst);
    }
}

impl Drop for RecordingSink {
    fn drop(&mut self) {
        if let Some(log) = &self.release_log {
            log.record();
        }
    }
}
