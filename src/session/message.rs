use crate::backend::PreviewSink;
use crate::handoff::Handoff;
use crate::types::{
    ArtifactId, CodeRecord, FlashMode, PhotoResult, Point, Position, SinkKind, VideoOrientation,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Everything the home context consumes, in arrival order.
pub(crate) enum Message {
    Command(Command),
    Event(Event),
    Shutdown,
}

/// Requests issued through the facade.
pub(crate) enum Command {
    Start,
    Stop { invalidate: bool },
    SetPosition(Position),
    TogglePosition,
    Focus(Point),
    SetFps(f64),
    SetZoom(f64),
    SetTorchActive(bool),
    SetFlashMode(FlashMode),
    TakePhoto(oneshot::Sender<PhotoResult>),
    StartRecording(mpsc::UnboundedSender<Duration>),
    StopRecording(oneshot::Sender<ArtifactId>),
    AttachPreview(SinkKind, Handoff<Arc<dyn PreviewSink>>),
    Subscribe(Topic),
    Flush(oneshot::Sender<()>),
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop { .. } => "stop",
            Command::SetPosition(_) => "set_position",
            Command::TogglePosition => "toggle_position",
            Command::Focus(_) => "focus",
            Command::SetFps(_) => "set_fps",
            Command::SetZoom(_) => "set_zoom",
            Command::SetTorchActive(_) => "set_torch_active",
            Command::SetFlashMode(_) => "set_flash_mode",
            Command::TakePhoto(_) => "take_photo",
            Command::StartRecording(_) => "start_recording",
            Command::StopRecording(_) => "stop_recording",
            Command::AttachPreview(..) => "attach_preview",
            Command::Subscribe(_) => "subscribe",
            Command::Flush(_) => "flush",
        }
    }
}

/// A subscriber waiting to be registered with one of the context's publishers.
pub(crate) enum Topic {
    HasTorch(mpsc::UnboundedSender<bool>),
    FlashActive(mpsc::UnboundedSender<bool>),
    FlashMode(mpsc::UnboundedSender<FlashMode>),
    DetectedCodes(mpsc::UnboundedSender<Vec<CodeRecord>>),
    ChangingPosition(mpsc::UnboundedSender<bool>),
    Position(mpsc::UnboundedSender<Position>),
}

/// Internal notifications from the delivery context, collaborator streams
/// and timers.
pub(crate) enum Event {
    OrientationObserved(VideoOrientation),
    /// A sink reference the delivery context still held after its slot was
    /// cleared. Dropped on arrival.
    ReleaseSink(Arc<dyn PreviewSink>),
    CodesDetected(Vec<CodeRecord>),
    TorchAvailability { device: u64, available: bool },
    FlashActive(bool),
    SettleElapsed { generation: u64 },
}
