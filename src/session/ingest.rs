//! Frame delivery path.
//!
//! [`FrameIngest`] is handed to the capture output, which calls it on its own
//! delivery thread. It only reads the switch gate and the sink slots and
//! posts everything else to the home context.
//!
//! The delivery thread never drops the last reference to a sink. A clone
//! whose slot was emptied or replaced while it was rendering is sent back to
//! the home context (or the release context once home is gone).

use super::message::{Event, Message};
use crate::backend::PreviewSink;
use crate::handoff::ReleaseContext;
use crate::types::{
    CodeRecord, FaceObservation, FrameBuffer, FrameHints, Position, Rotation, SinkKind,
    UiOrientation, VideoOrientation,
};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Rotation a sink must apply so a frame reads upright in `ui`.
pub fn rotation_for(ui: UiOrientation, video: VideoOrientation, position: Position) -> Rotation {
    let delta = (video.degrees() + 360 - ui.degrees()) % 360;
    let delta = match position {
        Position::Front => (360 - delta) % 360,
        Position::Back => delta,
    };
    Rotation::from_degrees(delta)
}

pub fn hints_for(source: Position, orientation: VideoOrientation) -> FrameHints {
    FrameHints {
        mirrored: source == Position::Front,
        rotation: rotation_for(UiOrientation::Portrait, orientation, source),
        orientation,
    }
}

#[derive(Default)]
pub(crate) struct SinkSlots {
    node: Option<Arc<dyn PreviewSink>>,
    view: Option<Arc<dyn PreviewSink>>,
}

impl SinkSlots {
    fn slot(&mut self, kind: SinkKind) -> &mut Option<Arc<dyn PreviewSink>> {
        match kind {
            SinkKind::Node => &mut self.node,
            SinkKind::View => &mut self.view,
        }
    }

    fn attached(&self) -> Vec<Arc<dyn PreviewSink>> {
        self.node.iter().chain(self.view.iter()).cloned().collect()
    }

    fn holds(&self, sink: &Arc<dyn PreviewSink>) -> bool {
        self.node
            .iter()
            .chain(self.view.iter())
            .any(|held| Arc::ptr_eq(held, sink))
    }
}

struct Shared {
    sinks: Mutex<SinkSlots>,
    switching: Arc<AtomicBool>,
    last_orientation: AtomicU8,
    home: mpsc::UnboundedSender<Message>,
    release: ReleaseContext,
}

/// Entry point for the capture output's delivery thread.
#[derive(Clone)]
pub struct FrameIngest {
    shared: Arc<Shared>,
}

impl FrameIngest {
    pub(crate) fn new(
        switching: Arc<AtomicBool>,
        home: mpsc::UnboundedSender<Message>,
        release: ReleaseContext,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                sinks: Mutex::new(SinkSlots::default()),
                switching,
                last_orientation: AtomicU8::new(0),
                home,
                release,
            }),
        }
    }

    fn slots(&self) -> MutexGuard<'_, SinkSlots> {
        self.shared
            .sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn sinks(&self) -> Vec<Arc<dyn PreviewSink>> {
        self.slots().attached()
    }

    /// Give back the clones taken by [`Self::sinks`].
    ///
    /// Clones still referenced by a slot are dropped under the slot lock, so
    /// the slot keeps them alive. Orphaned clones go to the home context.
    fn put_back(&self, sinks: Vec<Arc<dyn PreviewSink>>) {
        let orphans: Vec<_> = {
            let slots = self.slots();
            sinks.into_iter().filter(|sink| !slots.holds(sink)).collect()
        };
        for sink in orphans {
            let message = Message::Event(Event::ReleaseSink(sink));
            if let Err(mpsc::error::SendError(message)) = self.shared.home.send(message) {
                self.shared.release.release(message);
            }
        }
    }

    /// Install `sink` in its slot, returning the sink it replaces.
    /// Home context only.
    pub(crate) fn install(
        &self,
        kind: SinkKind,
        sink: Option<Arc<dyn PreviewSink>>,
    ) -> Option<Arc<dyn PreviewSink>> {
        let mut slots = self.slots();
        std::mem::replace(slots.slot(kind), sink)
    }

    /// Deliver one captured frame. Returns whether any sink received it.
    pub fn frame(
        &self,
        buffer: FrameBuffer,
        source: Position,
        orientation: VideoOrientation,
    ) -> bool {
        self.observe_orientation(orientation);

        if self.shared.switching.load(Ordering::Acquire) {
            return false;
        }

        let sinks = self.sinks();
        if sinks.is_empty() {
            return false;
        }

        let hints = hints_for(source, orientation);
        for sink in &sinks {
            sink.display(&buffer, hints);
        }
        self.put_back(sinks);
        true
    }

    pub fn codes(&self, codes: Vec<CodeRecord>) {
        let _ = self
            .shared
            .home
            .send(Message::Event(Event::CodesDetected(codes)));
    }

    pub fn faces(&self, faces: Vec<FaceObservation>) {
        let sinks = self.sinks();
        for sink in &sinks {
            sink.faces(&faces);
        }
        self.put_back(sinks);
    }

    fn observe_orientation(&self, orientation: VideoOrientation) {
        let tag = orientation.to_u8();
        if self.shared.last_orientation.swap(tag, Ordering::AcqRel) != tag {
            let _ = self
                .shared
                .home
                .send(Message::Event(Event::OrientationObserved(orientation)));
        }
    }
}

impl std::fmt::Debug for FrameIngest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameIngest")
            .field("switching", &self.shared.switching.load(Ordering::Relaxed))
            .finish()
    }
}
