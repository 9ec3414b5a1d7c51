//! Session context: the serialized owner of the capture session.
//!
//! Everything in here runs on the home context. The only state shared with
//! other threads lives in [`FrameIngest`] (sink slots and the switch gate).

mod ingest;
pub(crate) mod message;
mod switch;

pub use ingest::{hints_for, rotation_for, FrameIngest};
pub use switch::SwitchState;

use crate::backend::{
    CaptureBackend, CaptureOutput, CaptureSession, DeviceHandle, OutputSet, PortBindings,
    Transaction,
};
use crate::config::SessionConfig;
use crate::errors::{CameraError, Fault, FaultSink};
use crate::events::{BroadcastPublisher, StatePublisher};
use crate::handoff::ReleaseContext;
use crate::types::{
    CodeRecord, ExposureMode, FlashMode, FocusMode, Position, SinkKind, VideoOrientation,
};
use futures::stream::BoxStream;
use futures::StreamExt;
use message::{Command, Event, Message, Topic};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use switch::PositionSwitch;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

fn absorb(faults: &dyn FaultSink, operation: &'static str, result: Result<(), CameraError>) {
    if let Err(error) = result {
        faults.report(Fault::new(operation, error));
    }
}

/// Pump a collaborator stream into the home queue.
fn forward<T, F>(
    mut stream: BoxStream<'static, T>,
    home: mpsc::UnboundedSender<Message>,
    wrap: F,
) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Fn(T) -> Event + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(value) = stream.next().await {
            if home.send(Message::Event(wrap(value))).is_err() {
                break;
            }
        }
    })
}

pub(crate) struct SessionContext<B: CaptureBackend> {
    id: Uuid,
    config: SessionConfig,
    backend: B,
    session: B::Session,
    device: B::Device,
    device_generation: u64,
    ports: B::Ports,
    output: B::Output,
    ingest: FrameIngest,
    switch: PositionSwitch,
    position: StatePublisher<Position>,
    has_torch: StatePublisher<bool>,
    flash_active: StatePublisher<bool>,
    flash_mode: StatePublisher<FlashMode>,
    changing_position: StatePublisher<bool>,
    detected_codes: BroadcastPublisher<Vec<CodeRecord>>,
    last_orientation: Option<VideoOrientation>,
    invalidated: bool,
    torch_forwarder: Option<JoinHandle<()>>,
    flash_forwarder: Option<JoinHandle<()>>,
    home: mpsc::UnboundedSender<Message>,
    faults: Box<dyn FaultSink>,
}

impl<B: CaptureBackend> SessionContext<B> {
    /// Build the session graph. Must run inside the home runtime.
    ///
    /// Returns `None` if the backend cannot create a session; the failure is
    /// reported to `faults`.
    pub(crate) fn build(
        id: Uuid,
        config: SessionConfig,
        mut backend: B,
        home: mpsc::UnboundedSender<Message>,
        faults: Box<dyn FaultSink>,
        release: ReleaseContext,
    ) -> Option<Self> {
        let mut session = match backend.create_session(&config) {
            Ok(session) => session,
            Err(error) => {
                faults.report(Fault::new("create_session", error));
                return None;
            }
        };

        let mut device = backend.create_device();
        absorb(
            faults.as_ref(),
            "configure_device",
            device.configure_for_session(config.position),
        );

        let mut ports = backend.create_ports();
        let mut output = backend.create_output(&config);

        let gate = Arc::new(AtomicBool::new(false));
        let switch = PositionSwitch::new(gate.clone());
        let ingest = FrameIngest::new(gate, home.clone(), release);
        output.bind(ingest.clone());

        {
            let mut txn = Transaction::begin(&mut session);
            absorb(
                faults.as_ref(),
                "attach_input",
                ports.attach_input(&mut txn, &device, config.audio_enabled),
            );
            absorb(
                faults.as_ref(),
                "attach_outputs",
                ports.attach_outputs(&mut txn, OutputSet::from_config(&config)),
            );
        }

        let torch_forwarder = Some(forward(device.torch_availability(), home.clone(), |available| {
            Event::TorchAvailability {
                device: 0,
                available,
            }
        }));
        let flash_forwarder = Some(forward(output.flash_active(), home.clone(), Event::FlashActive));

        log::info!(
            "session {}: built with {} camera, preset {:?}",
            id,
            config.position.as_str(),
            config.preset
        );

        Some(Self {
            id,
            position: StatePublisher::new(config.position),
            config,
            backend,
            session,
            device,
            device_generation: 0,
            ports,
            output,
            ingest,
            switch,
            has_torch: StatePublisher::new(false),
            flash_active: StatePublisher::new(false),
            flash_mode: StatePublisher::new(FlashMode::default()),
            changing_position: StatePublisher::new(false),
            detected_codes: BroadcastPublisher::new(),
            last_orientation: None,
            invalidated: false,
            torch_forwarder,
            flash_forwarder,
            home,
            faults,
        })
    }

    pub(crate) fn handle_command(&mut self, command: Command) {
        log::debug!("session {}: {}", self.id, command.name());

        if self.invalidated && !matches!(command, Command::Subscribe(_) | Command::Flush(_)) {
            log::debug!(
                "session {}: ignoring {} after invalidation",
                self.id,
                command.name()
            );
            return;
        }

        match command {
            Command::Start => {
                absorb(self.faults.as_ref(), "start", self.session.start_running());
            }
            Command::Stop { invalidate: true } => self.invalidate(),
            Command::Stop { invalidate: false } => {
                if self.session.is_running() {
                    self.session.stop_running();
                }
            }
            Command::SetPosition(position) => self.switch_to(position),
            Command::TogglePosition => self.switch_to(self.position.get().opposite()),
            Command::Focus(point) => absorb(
                self.faults.as_ref(),
                "focus",
                self.device.set_focus(
                    point,
                    FocusMode::AutoFocus,
                    ExposureMode::AutoExpose,
                    true,
                ),
            ),
            Command::SetFps(fps) => {
                absorb(self.faults.as_ref(), "set_fps", self.device.set_fps(fps));
            }
            Command::SetZoom(level) => {
                absorb(self.faults.as_ref(), "set_zoom", self.device.set_zoom(level));
            }
            Command::SetTorchActive(active) => absorb(
                self.faults.as_ref(),
                "set_torch_active",
                self.device.set_torch_active(active),
            ),
            Command::SetFlashMode(mode) => self.flash_mode.publish(mode),
            Command::TakePhoto(reply) => {
                let orientation = self.last_orientation.unwrap_or_default();
                let capture = self.output.take_photo(orientation, *self.flash_mode.get());
                tokio::spawn(async move {
                    let _ = reply.send(capture.await);
                });
            }
            Command::StartRecording(ticks_tx) => {
                let mut ticks = self.output.start_recording();
                tokio::spawn(async move {
                    while let Some(elapsed) = ticks.next().await {
                        if ticks_tx.send(elapsed).is_err() {
                            break;
                        }
                    }
                });
            }
            Command::StopRecording(reply) => {
                let finished = self.output.stop_recording();
                tokio::spawn(async move {
                    match finished.await {
                        Some(artifact) => {
                            let _ = reply.send(artifact);
                        }
                        None => log::warn!("recording finished without an artifact"),
                    }
                });
            }
            Command::AttachPreview(kind, handoff) => {
                let replaced = self.ingest.install(kind, Some(handoff.claim()));
                if replaced.is_some() {
                    log::debug!("session {}: replaced {:?} preview sink", self.id, kind);
                }
            }
            Command::Subscribe(topic) => self.subscribe(topic),
            Command::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }

    pub(crate) fn handle_event(&mut self, event: Event) {
        match event {
            Event::OrientationObserved(orientation) => self.last_orientation = Some(orientation),
            Event::CodesDetected(codes) => self.detected_codes.publish(codes),
            Event::ReleaseSink(sink) => {
                log::debug!("session {}: releasing retired preview sink", self.id);
                drop(sink);
            }
            Event::TorchAvailability { device, available } => {
                if device == self.device_generation {
                    self.has_torch.publish_if_changed(available);
                }
            }
            Event::FlashActive(active) => {
                self.flash_active.publish_if_changed(active);
            }
            Event::SettleElapsed { generation } => {
                if self.switch.settle(generation) {
                    log::debug!("session {}: position switch settled", self.id);
                    self.changing_position.publish(false);
                } else {
                    log::debug!(
                        "session {}: stale settle timer {} ignored, now {:?}",
                        self.id,
                        generation,
                        self.switch.state()
                    );
                }
            }
        }
    }

    fn subscribe(&mut self, topic: Topic) {
        match topic {
            Topic::HasTorch(tx) => self.has_torch.attach(tx),
            Topic::FlashActive(tx) => self.flash_active.attach(tx),
            Topic::FlashMode(tx) => self.flash_mode.attach(tx),
            Topic::DetectedCodes(tx) => self.detected_codes.attach(tx),
            Topic::ChangingPosition(tx) => self.changing_position.attach(tx),
            Topic::Position(tx) => self.position.attach(tx),
        }
    }

    /// Replace the device with one bound to `target`.
    ///
    /// Always performs the full cycle, even when `target` is already active.
    fn switch_to(&mut self, target: Position) {
        let (generation, entered) = self.switch.begin();
        log::info!(
            "session {}: switching to {} camera",
            self.id,
            target.as_str()
        );

        {
            let mut txn = Transaction::begin(&mut self.session);
            self.ports.detach_input(&mut txn);
            self.device.invalidate();

            let mut device = self.backend.create_device();
            absorb(
                self.faults.as_ref(),
                "configure_device",
                device.configure_for_session(target),
            );
            absorb(
                self.faults.as_ref(),
                "attach_input",
                self.ports
                    .attach_input(&mut txn, &device, self.config.audio_enabled),
            );
            self.device = device;
            txn.commit();
        }

        self.device_generation = self.device_generation.wrapping_add(1);
        self.watch_torch();
        self.position.publish(target);

        if entered {
            self.changing_position.publish(true);
        }
        self.schedule_settle(generation);
    }

    fn watch_torch(&mut self) {
        if let Some(previous) = self.torch_forwarder.take() {
            previous.abort();
        }
        let device = self.device_generation;
        self.torch_forwarder = Some(forward(
            self.device.torch_availability(),
            self.home.clone(),
            move |available| Event::TorchAvailability { device, available },
        ));
    }

    fn schedule_settle(&self, generation: u64) {
        let home = self.home.clone();
        let delay = self.config.settle_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = home.send(Message::Event(Event::SettleElapsed { generation }));
        });
    }

    /// Detach every port, stop the session and drop the preview sinks.
    /// Irreversible.
    fn invalidate(&mut self) {
        log::info!("session {}: invalidating", self.id);
        {
            let mut txn = Transaction::begin(&mut self.session);
            self.ports.detach_all(&mut txn);
        }
        self.session.stop_running();
        self.device.invalidate();
        if let Some(forwarder) = self.torch_forwarder.take() {
            forwarder.abort();
        }
        for kind in [SinkKind::Node, SinkKind::View] {
            drop(self.ingest.install(kind, None));
        }
        self.invalidated = true;
    }

    /// Release hardware before the context is dropped.
    pub(crate) fn teardown(&mut self) {
        if !self.invalidated {
            self.invalidate();
        }
        if let Some(forwarder) = self.flash_forwarder.take() {
            forwarder.abort();
        }
    }
}
